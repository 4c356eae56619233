//! Known nodes, keyed by IEEE address.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::time::Instant;
use zstack_protocol::{IeeeAddress, LogicalType, NetworkAddress};

/// What the driver knows about a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub ieee_address: IeeeAddress,
    pub network_address: NetworkAddress,
    pub logical_type: Option<LogicalType>,
    pub last_updated: Instant,
}

/// Result of [`NodeTable::add_or_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeUpsert {
    Added(Node),
    Updated(Node),
}

impl NodeUpsert {
    pub fn node(&self) -> Node {
        match self {
            NodeUpsert::Added(node) | NodeUpsert::Updated(node) => *node,
        }
    }
}

/// Thread-safe node table. Every operation is atomic.
#[derive(Debug, Default)]
pub struct NodeTable {
    nodes: RwLock<HashMap<IeeeAddress, Node>>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ieee_address: IeeeAddress) -> Option<Node> {
        self.nodes.read().get(&ieee_address).copied()
    }

    /// Find a node by its current network address.
    pub fn get_by_network_address(&self, network_address: NetworkAddress) -> Option<Node> {
        self.nodes
            .read()
            .values()
            .find(|node| node.network_address == network_address)
            .copied()
    }

    /// Insert a node or refresh its network address. A known logical type is
    /// kept when `logical_type` is `None`.
    pub fn add_or_update(
        &self,
        ieee_address: IeeeAddress,
        network_address: NetworkAddress,
        logical_type: Option<LogicalType>,
    ) -> NodeUpsert {
        let now = Instant::now();
        let mut nodes = self.nodes.write();
        match nodes.get_mut(&ieee_address) {
            Some(node) => {
                node.network_address = network_address;
                if logical_type.is_some() {
                    node.logical_type = logical_type;
                }
                node.last_updated = now;
                NodeUpsert::Updated(*node)
            }
            None => {
                let node = Node {
                    ieee_address,
                    network_address,
                    logical_type,
                    last_updated: now,
                };
                nodes.insert(ieee_address, node);
                NodeUpsert::Added(node)
            }
        }
    }

    pub fn remove(&self, ieee_address: IeeeAddress) -> Option<Node> {
        self.nodes.write().remove(&ieee_address)
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.nodes.read().values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}
