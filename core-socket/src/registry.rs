//! Handle table: the sole synchronization point for connection
//! resolution.
//!
//! Maps a [`SocketHandle`] to its entry (state, transport reference,
//! event queue). The map lock is held only for the map operation itself,
//! never across an await or a transport call; readers clone the `Arc`
//! out and never observe a half-removed entry.

use crate::bridge::QueuedEvent;
use crate::state::{ConnectionState, EventKind, OpKind};
use bridge_traits::{FactoryContext, FramingMode, SocketAddress, SocketHandle, SocketTransport};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::mpsc;

/// Everything the bridge tracks per logical connection.
pub(crate) struct SocketEntry {
    pub(crate) handle: SocketHandle,
    pub(crate) address: SocketAddress,
    pub(crate) framing: FramingMode,
    pub(crate) transport: Arc<dyn SocketTransport>,
    pub(crate) context: FactoryContext,
    gate: Mutex<Gate>,
    pub(crate) events_tx: mpsc::Sender<QueuedEvent>,
}

/// Admission state guarded by one lock: the lifecycle state plus the
/// per-connection one-shot flags the pure state table cannot express.
struct Gate {
    state: ConnectionState,
    http_response_seen: bool,
}

impl SocketEntry {
    pub(crate) fn new(
        handle: SocketHandle,
        address: SocketAddress,
        framing: FramingMode,
        transport: Arc<dyn SocketTransport>,
        context: FactoryContext,
        events_tx: mpsc::Sender<QueuedEvent>,
    ) -> Self {
        Self {
            handle,
            address,
            framing,
            transport,
            context,
            gate: Mutex::new(Gate {
                state: ConnectionState::Opening,
                http_response_seen: false,
            }),
            events_tx,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner).state
    }

    /// Validates an upward event, applies its transition, and enqueues
    /// it through `permit` as one atomic step under the gate lock. Two
    /// racing events therefore enqueue in the same order they
    /// transitioned; nothing admitted before a terminal event can land
    /// behind it. Returns the unchanged current state as the error when
    /// the event must be dropped (the permit is released unused).
    pub(crate) fn admit_event(
        &self,
        kind: EventKind,
        event: QueuedEvent,
        permit: mpsc::Permit<'_, QueuedEvent>,
    ) -> Result<ConnectionState, ConnectionState> {
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        match gate.state.on_event(kind) {
            Some(next) => {
                // The HTTP response is informational and at most once;
                // the pure table cannot count, so the gate does.
                if kind == EventKind::GotHttpResponse {
                    if gate.http_response_seen {
                        return Err(gate.state);
                    }
                    gate.http_response_seen = true;
                }
                gate.state = next;
                permit.send(event);
                Ok(next)
            }
            None => Err(gate.state),
        }
    }

    /// Validates and applies a downward operation transition atomically.
    pub(crate) fn transition_op(&self, op: OpKind) -> Result<ConnectionState, ConnectionState> {
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        match gate.state.on_op(op) {
            Some(next) => {
                gate.state = next;
                Ok(next)
            }
            None => Err(gate.state),
        }
    }
}

/// Concurrent handle table.
pub(crate) struct HandleRegistry {
    entries: RwLock<HashMap<SocketHandle, Arc<SocketEntry>>>,
    next_handle: AtomicU64,
}

impl HandleRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Allocates the next handle. Handles are never reused within the
    /// lifetime of the registry.
    pub(crate) fn allocate(&self) -> SocketHandle {
        SocketHandle::from_raw(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn register(&self, entry: Arc<SocketEntry>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry.handle, entry);
    }

    /// `None` means the connection was already finalized; callers drop
    /// the operation or event rather than erroring.
    pub(crate) fn resolve(&self, handle: SocketHandle) -> Option<Arc<SocketEntry>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle)
            .cloned()
    }

    pub(crate) fn unregister(&self, handle: SocketHandle) -> Option<Arc<SocketEntry>> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
