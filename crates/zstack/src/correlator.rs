//! Request/response correlation and the indication bus.
//!
//! Synchronous exchanges (`SREQ` → `SRSP`) are serialized: at most one is
//! outstanding at a time, so every `SRSP` belongs to the request currently
//! holding the exchange lock. Asynchronous frames (`AREQ`) are fanned out to
//! subscribers registered for their identity, independently of any exchange.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace, warn};
use zstack_protocol::{MessageKind, ZStackMessage};
use zstack_unpi::{Frame, MessageType};

use crate::error::{Result, ZStackError};
use crate::registry::{MessageIdentity, MessageRegistry};
use crate::transport::FrameTransport;

type Handler = Box<dyn Fn(&Frame) + Send + Sync>;

struct Subscriber {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct BusState {
    closed: bool,
    subscribers: HashMap<MessageIdentity, Vec<Subscriber>>,
}

/// Fan-out of received indications to subscribers.
///
/// Dispatch holds the read lock for the whole delivery, and removal takes the
/// write lock, so a cancelled handler is never invoked after `cancel` returns.
#[derive(Default)]
struct IndicationBus {
    next_id: AtomicU64,
    state: RwLock<BusState>,
}

impl IndicationBus {
    fn add(self: &Arc<Self>, identity: MessageIdentity, handler: Handler) -> Result<Subscription> {
        let mut state = self.state.write();
        if state.closed {
            return Err(ZStackError::TransportClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        state
            .subscribers
            .entry(identity)
            .or_default()
            .push(Subscriber { id, handler });

        Ok(Subscription {
            bus: Some(Arc::clone(self)),
            identity,
            id,
        })
    }

    fn remove(&self, identity: MessageIdentity, id: u64) {
        let mut state = self.state.write();
        if let Some(subscribers) = state.subscribers.get_mut(&identity) {
            subscribers.retain(|s| s.id != id);
            if subscribers.is_empty() {
                state.subscribers.remove(&identity);
            }
        }
    }

    fn dispatch(&self, frame: &Frame) {
        let identity = MessageIdentity::of_frame(frame);
        let state = self.state.read();
        match state.subscribers.get(&identity) {
            Some(subscribers) => {
                for subscriber in subscribers {
                    (subscriber.handler)(frame);
                }
            }
            None => trace!(%identity, "no subscribers for indication"),
        }
    }

    /// Drop every handler; pending waiters observe a closed channel.
    fn close(&self) {
        let mut state = self.state.write();
        state.closed = true;
        state.subscribers.clear();
    }

    fn is_closed(&self) -> bool {
        self.state.read().closed
    }

    fn subscriber_count(&self) -> usize {
        self.state.read().subscribers.values().map(Vec::len).sum()
    }
}

/// Handle to an indication subscription. Dropping it cancels the subscription.
pub struct Subscription {
    bus: Option<Arc<IndicationBus>>,
    identity: MessageIdentity,
    id: u64,
}

impl Subscription {
    /// Stop delivery. Waits for a delivery in progress on another task to
    /// finish; afterwards the callback is never invoked again.
    pub fn cancel(&mut self) {
        if let Some(bus) = self.bus.take() {
            bus.remove(self.identity, self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.bus.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("identity", &self.identity)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// A one-shot wait for the first matching indication.
///
/// The subscription is live from creation, so an indication arriving before
/// [`Waiter::wait`] is polled is not lost.
pub struct Waiter<M> {
    subscription: Subscription,
    receiver: oneshot::Receiver<M>,
}

impl<M> Waiter<M> {
    pub async fn wait(self, deadline: Instant) -> Result<M> {
        let Waiter {
            subscription: _subscription,
            receiver,
        } = self;

        match timeout_at(deadline, receiver).await {
            Ok(Ok(message)) => Ok(message),
            Ok(Err(_)) => Err(ZStackError::TransportClosed),
            Err(_) => Err(ZStackError::DeadlineExceeded("waiting for indication")),
        }
    }
}

/// Clears the pending reply slot when an exchange ends on any path.
struct PendingReply<'a>(&'a Mutex<Option<oneshot::Sender<Frame>>>);

impl<'a> PendingReply<'a> {
    fn arm(slot: &'a Mutex<Option<oneshot::Sender<Frame>>>, sender: oneshot::Sender<Frame>) -> Self {
        *slot.lock() = Some(sender);
        PendingReply(slot)
    }
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        self.0.lock().take();
    }
}

/// Correlates requests with replies over one frame transport.
pub struct Correlator {
    registry: Arc<MessageRegistry>,
    outbound: mpsc::Sender<Frame>,
    exchange_lock: tokio::sync::Mutex<()>,
    pending_reply: Mutex<Option<oneshot::Sender<Frame>>>,
    bus: Arc<IndicationBus>,
}

impl Correlator {
    /// Attach to a transport and start the receive task.
    pub fn start(
        registry: Arc<MessageRegistry>,
        transport: FrameTransport,
    ) -> (Arc<Correlator>, JoinHandle<()>) {
        let FrameTransport { outbound, inbound } = transport;
        let correlator = Arc::new(Correlator {
            registry,
            outbound,
            exchange_lock: tokio::sync::Mutex::new(()),
            pending_reply: Mutex::new(None),
            bus: Arc::new(IndicationBus::default()),
        });

        let handle = tokio::spawn(Arc::clone(&correlator).receive_loop(inbound));
        (correlator, handle)
    }

    pub fn registry(&self) -> &MessageRegistry {
        &self.registry
    }

    /// Send `request` and wait for its reply.
    ///
    /// A synchronous request is answered by the paired `SRSP`; an
    /// asynchronous one by the first indication of the reply's identity.
    /// A reply carrying a non-success status becomes
    /// [`ZStackError::DeviceFailure`].
    pub async fn request_response<Req, Rep>(&self, deadline: Instant, request: &Req) -> Result<Rep>
    where
        Req: ZStackMessage,
        Rep: ZStackMessage,
    {
        let request_identity = self.identity(Req::KIND)?;
        let reply_identity = self.identity(Rep::KIND)?;

        let payload = request.to_bytes().map_err(|source| ZStackError::Encode {
            kind: Req::KIND,
            source,
        })?;
        let frame = request_identity.frame(payload);

        let reply = if request_identity.message_type.is_synchronous_request() {
            let reply = self.exchange(deadline, frame).await?;
            let actual = MessageIdentity::of_frame(&reply);
            if actual != reply_identity {
                return Err(ZStackError::UnexpectedReply {
                    expected: reply_identity,
                    actual,
                });
            }
            reply
        } else {
            let waiter = self.raw_waiter(reply_identity)?;
            self.send_frame(deadline, frame).await?;
            waiter.wait(deadline).await?
        };

        let reply = Rep::from_bytes(&reply.payload).map_err(|source| ZStackError::Decode {
            kind: Rep::KIND,
            source,
        })?;
        check_status(&reply)?;
        Ok(reply)
    }

    /// Deliver every decoded `M` accepted by `predicate` to `callback`, in
    /// arrival order, until the returned subscription is cancelled.
    ///
    /// Callbacks run on the receive task and must not subscribe or cancel.
    pub fn subscribe<M, P, F>(&self, predicate: P, callback: F) -> Result<Subscription>
    where
        M: ZStackMessage,
        P: Fn(&M) -> bool + Send + Sync + 'static,
        F: Fn(M) + Send + Sync + 'static,
    {
        let identity = self.identity(M::KIND)?;
        let handler: Handler = Box::new(move |frame: &Frame| {
            match M::from_bytes(&frame.payload) {
                Ok(message) => {
                    if predicate(&message) {
                        callback(message);
                    }
                }
                Err(e) => warn!(kind = ?M::KIND, error = %e, "skipping undecodable indication"),
            }
        });
        self.bus.add(identity, handler)
    }

    /// Register a one-shot wait for the first `M` accepted by `predicate`.
    pub fn waiter<M, P>(&self, predicate: P) -> Result<Waiter<M>>
    where
        M: ZStackMessage,
        P: Fn(&M) -> bool + Send + Sync + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let slot = Mutex::new(Some(sender));
        let subscription = self.subscribe(predicate, move |message: M| {
            if let Some(sender) = slot.lock().take() {
                let _ = sender.send(message);
            }
        })?;
        Ok(Waiter {
            subscription,
            receiver,
        })
    }

    /// Wait for the first `M` accepted by `predicate`.
    pub async fn wait_for<M, P>(&self, deadline: Instant, predicate: P) -> Result<M>
    where
        M: ZStackMessage,
        P: Fn(&M) -> bool + Send + Sync + 'static,
    {
        self.waiter(predicate)?.wait(deadline).await
    }

    /// Number of live subscriptions, waiters included.
    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }

    fn identity(&self, kind: MessageKind) -> Result<MessageIdentity> {
        self.registry
            .lookup_by_kind(kind)
            .ok_or(ZStackError::UnrecognisedMessage(kind))
    }

    fn raw_waiter(&self, identity: MessageIdentity) -> Result<Waiter<Frame>> {
        let (sender, receiver) = oneshot::channel();
        let slot = Mutex::new(Some(sender));
        let handler: Handler = Box::new(move |frame: &Frame| {
            if let Some(sender) = slot.lock().take() {
                let _ = sender.send(frame.clone());
            }
        });
        let subscription = self.bus.add(identity, handler)?;
        Ok(Waiter {
            subscription,
            receiver,
        })
    }

    async fn exchange(&self, deadline: Instant, frame: Frame) -> Result<Frame> {
        let _exclusive = timeout_at(deadline, self.exchange_lock.lock())
            .await
            .map_err(|_| ZStackError::DeadlineExceeded("waiting for a previous exchange"))?;

        let (sender, receiver) = oneshot::channel();
        let _pending = PendingReply::arm(&self.pending_reply, sender);
        if self.bus.is_closed() {
            return Err(ZStackError::TransportClosed);
        }

        self.send_frame(deadline, frame).await?;

        match timeout_at(deadline, receiver).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(ZStackError::TransportClosed),
            Err(_) => Err(ZStackError::DeadlineExceeded("waiting for synchronous reply")),
        }
    }

    async fn send_frame(&self, deadline: Instant, frame: Frame) -> Result<()> {
        trace!(
            identity = %MessageIdentity::of_frame(&frame),
            len = frame.payload.len(),
            "sending frame"
        );
        match timeout_at(deadline, self.outbound.send(frame)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(ZStackError::TransportClosed),
            Err(_) => Err(ZStackError::DeadlineExceeded("sending frame")),
        }
    }

    async fn receive_loop(self: Arc<Self>, mut inbound: mpsc::Receiver<Frame>) {
        while let Some(frame) = inbound.recv().await {
            let identity = MessageIdentity::of_frame(&frame);
            trace!(%identity, kind = ?self.registry.lookup_by_identity(&identity), "received frame");

            match frame.message_type {
                MessageType::Srsp => match self.pending_reply.lock().take() {
                    Some(sender) => {
                        let _ = sender.send(frame);
                    }
                    None => warn!(%identity, "dropping unsolicited synchronous reply"),
                },
                MessageType::Areq => self.bus.dispatch(&frame),
                other => warn!(%identity, message_type = ?other, "ignoring frame"),
            }
        }

        debug!("transport closed, releasing waiters");
        self.bus.close();
        self.pending_reply.lock().take();
    }
}

fn check_status<M: ZStackMessage>(message: &M) -> Result<()> {
    match message.status() {
        Some(status) if !status.is_success() => Err(ZStackError::DeviceFailure(status)),
        _ => Ok(()),
    }
}
