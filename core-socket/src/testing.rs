//! Shared mockall doubles for the capability traits.

use bridge_traits::error::Result;
use bridge_traits::{
    CloseDescriptor, FactoryContext, Frame, OptionsBlob, SocketAddress, SocketEventSink,
    SocketHandle, SocketTransport,
};
use mockall::mock;
use std::sync::Arc;

mock! {
    pub Transport {}

    #[async_trait::async_trait]
    impl SocketTransport for Transport {
        fn attach_event_sink(&self, sink: Arc<dyn SocketEventSink>);
        async fn open(
            &self,
            ctx: &FactoryContext,
            handle: SocketHandle,
            address: &SocketAddress,
            options: &OptionsBlob,
        ) -> Result<()>;
        async fn write(&self, ctx: &FactoryContext, handle: SocketHandle, frame: Frame) -> Result<()>;
        async fn acknowledge_received(
            &self,
            ctx: &FactoryContext,
            handle: SocketHandle,
            byte_count: u64,
        ) -> Result<()>;
        async fn request_close(
            &self,
            ctx: &FactoryContext,
            handle: SocketHandle,
            status: i32,
            message: &str,
        ) -> Result<()>;
        async fn close(
            &self,
            ctx: &FactoryContext,
            handle: SocketHandle,
            descriptor: &CloseDescriptor,
        ) -> Result<()>;
        async fn dispose(&self, ctx: &FactoryContext, handle: SocketHandle) -> Result<()>;
    }
}

mock! {
    pub EventSink {}

    #[async_trait::async_trait]
    impl SocketEventSink for EventSink {
        async fn got_http_response(&self, handle: SocketHandle, status: u16, headers: OptionsBlob);
        async fn opened(&self, handle: SocketHandle);
        async fn received(&self, handle: SocketHandle, frame: Frame);
        async fn completed_write(&self, handle: SocketHandle, byte_count: u64);
        async fn close_requested(&self, handle: SocketHandle, status: i32, message: String);
        async fn closed(&self, handle: SocketHandle, descriptor: CloseDescriptor);
    }
}
