//! Asynchronous request dispatch and completion delivery
//!
//! `issue` signs the request, records `id -> kind` in the in-flight table,
//! spawns the transport call and returns at once. When the call finishes the
//! router turns the reply into a typed [`Completion`], and the entry is
//! removed and the completion queued under the table lock, so an id is either
//! in flight or already delivered, never neither.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::upyun::error::{Result, UpYunError};
use crate::upyun::request::{Endpoint, RequestParts};
use crate::upyun::router;
use crate::upyun::signer::{gmt_date, UpYunSigner};
use crate::upyun::transport::Transport;
use crate::upyun::types::{Completion, OperationKind, RequestId};

/// Outstanding requests keyed by correlation id
#[derive(Debug, Default)]
pub struct InFlightTable {
    entries: Mutex<HashMap<RequestId, OperationKind>>,
}

impl InFlightTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestId, OperationKind>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a newly issued request; returns false if the id is already present
    pub fn insert(&self, id: RequestId, kind: OperationKind) -> bool {
        let mut entries = self.lock();
        if entries.contains_key(&id) {
            return false;
        }
        entries.insert(id, kind);
        true
    }

    pub fn kind_of(&self, id: RequestId) -> Option<OperationKind> {
        self.lock().get(&id).copied()
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove `id` and hand its completion to `deliver` while holding the lock
    ///
    /// Returns false when the id was not in flight; `deliver` is not called then.
    pub(crate) fn finish<F>(&self, id: RequestId, deliver: F) -> bool
    where
        F: FnOnce(),
    {
        let mut entries = self.lock();
        if entries.remove(&id).is_none() {
            return false;
        }
        deliver();
        true
    }
}

/// Receiving side of the completion channel
///
/// Completions pulled while waiting for a specific id are parked and handed
/// out first by later calls, so none are lost.
pub(crate) struct CompletionQueue {
    rx: UnboundedReceiver<Completion>,
    parked: VecDeque<Completion>,
}

impl CompletionQueue {
    pub(crate) async fn next(&mut self) -> Option<Completion> {
        if let Some(completion) = self.parked.pop_front() {
            return Some(completion);
        }
        self.rx.recv().await
    }

    pub(crate) fn try_next(&mut self) -> Option<Completion> {
        self.parked.pop_front().or_else(|| self.rx.try_recv().ok())
    }

    /// Wait for the completion of `id`; `None` if it is unknown or already taken
    pub(crate) async fn wait_for(&mut self, id: RequestId, table: &InFlightTable) -> Option<Completion> {
        if let Some(pos) = self.parked.iter().position(|c| c.id == id) {
            return self.parked.remove(pos);
        }

        if !table.contains(id) {
            // Already delivered: it is either still in the channel or was consumed
            while let Ok(completion) = self.rx.try_recv() {
                if completion.id == id {
                    return Some(completion);
                }
                self.parked.push_back(completion);
            }
            return None;
        }

        while let Some(completion) = self.rx.recv().await {
            if completion.id == id {
                return Some(completion);
            }
            self.parked.push_back(completion);
        }
        None
    }
}

/// Issues signed requests and routes their replies
pub(crate) struct Dispatcher {
    transport: Arc<dyn Transport>,
    signer: UpYunSigner,
    endpoint: Endpoint,
    in_flight: Arc<InFlightTable>,
    completions: UnboundedSender<Completion>,
    next_id: AtomicU64,
    runtime: Handle,
}

impl Dispatcher {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        signer: UpYunSigner,
        endpoint: Endpoint,
    ) -> Result<(Self, CompletionQueue)> {
        let runtime = Handle::try_current().map_err(|_| UpYunError::NoRuntime)?;
        let (tx, rx) = mpsc::unbounded_channel();

        let dispatcher = Self {
            transport,
            signer,
            endpoint,
            in_flight: Arc::new(InFlightTable::new()),
            completions: tx,
            next_id: AtomicU64::new(1),
            runtime,
        };
        let queue = CompletionQueue {
            rx,
            parked: VecDeque::new(),
        };
        Ok((dispatcher, queue))
    }

    pub(crate) fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub(crate) fn set_endpoint(&mut self, endpoint: Endpoint) {
        self.endpoint = endpoint;
    }

    pub(crate) fn signer(&self) -> &UpYunSigner {
        &self.signer
    }

    pub(crate) fn in_flight(&self) -> &InFlightTable {
        &self.in_flight
    }

    /// Sign and send `parts` without waiting for the reply
    ///
    /// Errors here mean the request could not be built; nothing was sent and
    /// no completion will follow.
    pub(crate) fn issue(&self, parts: RequestParts, kind: OperationKind) -> Result<RequestId> {
        let date = gmt_date();
        let request = parts.build(&self.signer, &self.endpoint, &date)?;

        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(
            request_id = %id,
            kind = %kind,
            method = %request.method(),
            url = %request.uri(),
            content_length = parts.body.len(),
            headers = ?request.headers().keys().map(|k| k.as_str()).collect::<Vec<_>>(),
            "issue request"
        );

        if !self.in_flight.insert(id, kind) {
            // Ids come from a monotonic counter; a clash means the table is corrupt
            warn!(request_id = %id, "request id already in flight");
            return Err(UpYunError::Protocol(format!("request id {} already in flight", id)));
        }

        let transport = Arc::clone(&self.transport);
        let table = Arc::clone(&self.in_flight);
        let tx = self.completions.clone();
        self.runtime.spawn(async move {
            // A panicking transport still completes the request
            let call = tokio::spawn(async move { transport.execute(request).await });
            let result = match call.await {
                Ok(result) => result,
                Err(e) => Err(UpYunError::Transport(format!("transport task failed: {}", e))),
            };
            router::complete(&table, &tx, id, result);
        });

        Ok(id)
    }
}
