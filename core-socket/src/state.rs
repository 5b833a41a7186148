//! Connection state machine.
//!
//! `Idle → Opening → Open → Closing → Closed → Disposed`, with two
//! shortcuts: `Open → Closed` (abnormal termination without a close
//! handshake) and `Opening → Closed` (connect failure reported before
//! `opened` was ever delivered).
//!
//! Transition checks are pure functions on the enum; the bridge applies
//! them under the per-connection state lock so that a racing event and
//! close cannot both pass.

/// Lifecycle state of one logical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created but not yet opened. Only observable through
    /// [`EventKind`]/[`OpKind`] tables; the bridge registers handles
    /// directly into `Opening`.
    Idle,
    /// `open` issued; waiting for the transport to report `opened`.
    Opening,
    /// Established; frames flow in both directions.
    Open,
    /// A close was initiated by either side; awaiting the terminal
    /// `closed`.
    Closing,
    /// Terminal outcome delivered. Only `dispose` remains.
    Closed,
    /// Handle released. No further calls may reference it.
    Disposed,
}

impl ConnectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Disposed)
    }
}

/// Upward events, for transition checks and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventKind {
    GotHttpResponse,
    Opened,
    Received,
    CompletedWrite,
    CloseRequested,
    Closed,
}

impl EventKind {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            EventKind::GotHttpResponse => "got_http_response",
            EventKind::Opened => "opened",
            EventKind::Received => "received",
            EventKind::CompletedWrite => "completed_write",
            EventKind::CloseRequested => "close_requested",
            EventKind::Closed => "closed",
        }
    }
}

/// Downward operations, for validity checks and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpKind {
    Write,
    AcknowledgeReceived,
    RequestClose,
    Close,
    Dispose,
}

impl OpKind {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            OpKind::Write => "write",
            OpKind::AcknowledgeReceived => "acknowledge_received",
            OpKind::RequestClose => "request_close",
            OpKind::Close => "close",
            OpKind::Dispose => "dispose",
        }
    }
}

impl ConnectionState {
    /// State after delivering `event`, or `None` when the event is not
    /// valid here and must be dropped.
    pub(crate) fn on_event(self, event: EventKind) -> Option<ConnectionState> {
        use ConnectionState::*;
        match (self, event) {
            // Informational, before opened; no state change. At most
            // one occurrence, counted by the entry gate.
            (Opening, EventKind::GotHttpResponse) => Some(Opening),
            (Opening, EventKind::Opened) => Some(Open),
            // Data may still drain during a graceful shutdown.
            (Open | Closing, EventKind::Received) => Some(self),
            (Open | Closing, EventKind::CompletedWrite) => Some(self),
            (Open, EventKind::CloseRequested) => Some(Closing),
            // Terminal, including connect failure and abnormal
            // termination shortcuts.
            (Opening | Open | Closing, EventKind::Closed) => Some(Closed),
            _ => None,
        }
    }

    /// State after issuing `op`, or `None` when the operation is not
    /// valid here and must be dropped.
    pub(crate) fn on_op(self, op: OpKind) -> Option<ConnectionState> {
        use ConnectionState::*;
        match (self, op) {
            (Open, OpKind::Write) => Some(Open),
            (Open | Closing, OpKind::AcknowledgeReceived) => Some(self),
            (Open, OpKind::RequestClose) => Some(Closing),
            (Opening | Open | Closing, OpKind::Close) => Some(Closing),
            (Closed, OpKind::Dispose) => Some(Disposed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionState::*;
    use super::*;

    #[test]
    fn test_happy_path() {
        assert_eq!(Opening.on_event(EventKind::GotHttpResponse), Some(Opening));
        assert_eq!(Opening.on_event(EventKind::Opened), Some(Open));
        assert_eq!(Open.on_op(OpKind::Write), Some(Open));
        assert_eq!(Open.on_event(EventKind::Received), Some(Open));
        assert_eq!(Open.on_event(EventKind::CompletedWrite), Some(Open));
        assert_eq!(Open.on_op(OpKind::RequestClose), Some(Closing));
        assert_eq!(Closing.on_event(EventKind::Closed), Some(Closed));
        assert_eq!(Closed.on_op(OpKind::Dispose), Some(Disposed));
    }

    #[test]
    fn test_abnormal_termination_shortcuts() {
        // Transport failed without a preceding close handshake.
        assert_eq!(Open.on_event(EventKind::Closed), Some(Closed));
        // Connect failure before opened.
        assert_eq!(Opening.on_event(EventKind::Closed), Some(Closed));
    }

    #[test]
    fn test_closed_is_delivered_once() {
        assert_eq!(Closed.on_event(EventKind::Closed), None);
        assert_eq!(Disposed.on_event(EventKind::Closed), None);
    }

    #[test]
    fn test_no_events_after_closed() {
        for event in [
            EventKind::GotHttpResponse,
            EventKind::Opened,
            EventKind::Received,
            EventKind::CompletedWrite,
            EventKind::CloseRequested,
        ] {
            assert_eq!(Closed.on_event(event), None, "{event:?}");
            assert_eq!(Disposed.on_event(event), None, "{event:?}");
        }
    }

    #[test]
    fn test_downward_noop_in_terminal_states() {
        for op in [
            OpKind::Write,
            OpKind::AcknowledgeReceived,
            OpKind::RequestClose,
            OpKind::Close,
        ] {
            assert_eq!(Closed.on_op(op), None, "{op:?}");
            assert_eq!(Disposed.on_op(op), None, "{op:?}");
        }
        assert_eq!(Disposed.on_op(OpKind::Dispose), None);
    }

    #[test]
    fn test_dispose_never_precedes_closed() {
        for state in [Idle, Opening, Open, Closing] {
            assert_eq!(state.on_op(OpKind::Dispose), None, "{state:?}");
        }
    }

    #[test]
    fn test_write_requires_open() {
        assert_eq!(Opening.on_op(OpKind::Write), None);
        assert_eq!(Closing.on_op(OpKind::Write), None);
    }

    #[test]
    fn test_drain_during_closing() {
        assert_eq!(Closing.on_event(EventKind::Received), Some(Closing));
        assert_eq!(Closing.on_event(EventKind::CompletedWrite), Some(Closing));
        assert_eq!(Closing.on_op(OpKind::AcknowledgeReceived), Some(Closing));
    }

    #[test]
    fn test_close_requested_only_once() {
        assert_eq!(Closing.on_event(EventKind::CloseRequested), None);
    }

    #[test]
    fn test_http_response_only_while_opening() {
        assert_eq!(Open.on_event(EventKind::GotHttpResponse), None);
    }
}
