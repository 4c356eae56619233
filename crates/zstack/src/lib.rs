//! Z-Stack coprocessor driver
//!
//! Drives a Texas Instruments Z-Stack network processor as a Zigbee
//! coordinator. The driver is layered over a [`FrameTransport`]:
//!
//! - [`MessageRegistry`] maps payload kinds to frame identities
//! - [`Correlator`] pairs requests with replies and fans out indications
//! - [`ZStack::initialise`] brings the adapter up as a configured coordinator
//! - node operations resolve addresses, send application data and remove nodes
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tokio::time::Instant;
//! use zstack::{spawn_stream_transport, DriverConfig, ZStack};
//!
//! # async fn run(stream: tokio::net::TcpStream) -> Result<(), Box<dyn std::error::Error>> {
//! let config = DriverConfig::load("zstack.yaml")?;
//! let (transport, _io) = spawn_stream_transport(stream);
//! let zstack = ZStack::new(transport, config.driver)?;
//!
//! zstack
//!     .initialise(Instant::now() + Duration::from_secs(120), config.network)
//!     .await?;
//!
//! let event = zstack.read_event(Instant::now() + Duration::from_secs(60)).await?;
//! println!("{:?}", event);
//! # Ok(())
//! # }
//! ```

mod background;
mod bootstrap;
pub mod config;
mod correlator;
mod error;
mod events;
mod node;
mod node_table;
mod nv;
pub mod registry;
mod retry;
mod transaction_ids;
pub mod transport;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use zstack_protocol::{ExtendedPanId, IeeeAddress, NetworkAddress, NetworkKey, PanId};

pub use config::{DriverConfig, NetworkConfiguration, ZStackConfig};
pub use correlator::{Correlator, Subscription, Waiter};
pub use error::{ConfigError, RegistryError, Result, ZStackError};
pub use events::ZStackEvent;
pub use node_table::{Node, NodeTable, NodeUpsert};
pub use registry::{MessageIdentity, MessageRegistry};
pub use transaction_ids::{TransactionId, TransactionIdPool};
pub use transport::{channel_transport, spawn_stream_transport, AdapterEnd, FrameTransport};

use events::EventQueue;
use retry::RetryPolicy;

/// Network parameters of the running coordinator.
///
/// The addresses are known only after a successful [`ZStack::initialise`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkProperties {
    pub pan_id: PanId,
    pub extended_pan_id: ExtendedPanId,
    pub network_key: NetworkKey,
    pub channel: u8,
    pub ieee_address: Option<IeeeAddress>,
    pub network_address: Option<NetworkAddress>,
}

/// A Z-Stack adapter.
///
/// Must be created inside a Tokio runtime. Dropping it stops the receive task
/// and the background indication loops.
pub struct ZStack {
    config: ZStackConfig,
    correlator: Arc<Correlator>,
    network: RwLock<NetworkProperties>,
    nodes: Arc<NodeTable>,
    transaction_ids: Arc<TransactionIdPool>,
    gate: Semaphore,
    resolving: Mutex<HashMap<IeeeAddress, Arc<tokio::sync::Mutex<()>>>>,
    events: Arc<EventQueue>,
    background: Mutex<Vec<Subscription>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ZStack {
    /// Attach to an adapter over `transport`.
    pub fn new(transport: FrameTransport, config: ZStackConfig) -> Result<Self> {
        Self::with_node_table(transport, config, Arc::new(NodeTable::new()))
    }

    /// Attach to an adapter, sharing an existing node table.
    pub fn with_node_table(
        transport: FrameTransport,
        config: ZStackConfig,
        nodes: Arc<NodeTable>,
    ) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(MessageRegistry::populate()?);
        let (correlator, receiver) = Correlator::start(registry, transport);

        Ok(ZStack {
            correlator,
            network: RwLock::new(NetworkProperties::default()),
            nodes,
            transaction_ids: TransactionIdPool::new(config.transaction_ids),
            gate: Semaphore::new(config.concurrency),
            resolving: Mutex::new(HashMap::new()),
            events: Arc::new(EventQueue::new(config.event_capacity)),
            background: Mutex::new(Vec::new()),
            tasks: Mutex::new(vec![receiver]),
            config,
        })
    }

    pub fn config(&self) -> &ZStackConfig {
        &self.config
    }

    pub fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    pub fn network_properties(&self) -> NetworkProperties {
        *self.network.read()
    }

    pub fn node_table(&self) -> &NodeTable {
        &self.nodes
    }

    pub fn transaction_ids(&self) -> &TransactionIdPool {
        &self.transaction_ids
    }

    /// Wait for the next event.
    pub async fn read_event(&self, deadline: Instant) -> Result<ZStackEvent> {
        self.events.next(deadline).await
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempt_timeout: self.config.attempt_timeout(),
            attempts: self.config.attempts,
        }
    }

    fn reset_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempt_timeout: self.config.attempt_timeout(),
            attempts: self.config.reset_attempts,
        }
    }
}

impl Drop for ZStack {
    fn drop(&mut self) {
        self.background.lock().clear();
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}
