//! Background handling of unsolicited indications.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use zstack_protocol::{
    AfIncomingMsg, ApplicationMessage, LogicalType, ZStackMessage, ZdoEndDeviceAnnceInd,
    ZdoLeaveInd, ZdoNwkAddrRsp,
};

use crate::error::Result;
use crate::events::{EventQueue, ZStackEvent};
use crate::node_table::{NodeTable, NodeUpsert};
use crate::{Subscription, ZStack};

#[derive(Debug)]
enum Indication {
    Announce(ZdoEndDeviceAnnceInd),
    Leave(ZdoLeaveInd),
    Incoming(AfIncomingMsg),
    NetworkAddress(ZdoNwkAddrRsp),
}

impl ZStack {
    /// Subscribe to network management indications and start the task that
    /// applies them. Restarting replaces the previous loops.
    pub(crate) fn start_background_loops(&self) -> Result<()> {
        let (sender, receiver) = mpsc::unbounded_channel();

        let subscriptions = vec![
            self.forward(&sender, |_: &ZdoEndDeviceAnnceInd| true, Indication::Announce)?,
            self.forward(&sender, |_: &ZdoLeaveInd| true, Indication::Leave)?,
            self.forward(&sender, |_: &AfIncomingMsg| true, Indication::Incoming)?,
            self.forward(
                &sender,
                |rsp: &ZdoNwkAddrRsp| rsp.status.is_success(),
                Indication::NetworkAddress,
            )?,
        ];

        let task = tokio::spawn(apply_indications(
            receiver,
            Arc::clone(&self.nodes),
            Arc::clone(&self.events),
        ));

        // Dropping the old subscriptions closes the old task's channel.
        let mut background = self.background.lock();
        background.clear();
        background.extend(subscriptions);
        drop(background);

        self.tasks.lock().push(task);
        debug!("background indication loops started");
        Ok(())
    }

    fn forward<M, P>(
        &self,
        sender: &mpsc::UnboundedSender<Indication>,
        predicate: P,
        wrap: fn(M) -> Indication,
    ) -> Result<Subscription>
    where
        M: ZStackMessage,
        P: Fn(&M) -> bool + Send + Sync + 'static,
    {
        let sender = sender.clone();
        self.correlator.subscribe(predicate, move |message: M| {
            let _ = sender.send(wrap(message));
        })
    }
}

async fn apply_indications(
    mut receiver: mpsc::UnboundedReceiver<Indication>,
    nodes: Arc<NodeTable>,
    events: Arc<EventQueue>,
) {
    while let Some(indication) = receiver.recv().await {
        match indication {
            Indication::Announce(announce) => {
                let logical_type = if announce.is_router() {
                    LogicalType::Router
                } else {
                    LogicalType::EndDevice
                };
                let event = match nodes.add_or_update(
                    announce.ieee_address,
                    announce.network_address,
                    Some(logical_type),
                ) {
                    NodeUpsert::Added(node) => {
                        info!(ieee = %node.ieee_address, network = %node.network_address, "node joined");
                        ZStackEvent::NodeJoin(node)
                    }
                    NodeUpsert::Updated(node) => {
                        debug!(ieee = %node.ieee_address, network = %node.network_address, "node announced");
                        ZStackEvent::NodeUpdate(node)
                    }
                };
                events.emit(event);
            }

            Indication::Leave(leave) => match nodes.remove(leave.ieee_address) {
                Some(node) => {
                    info!(ieee = %node.ieee_address, rejoin = leave.rejoin, "node left");
                    events.emit(ZStackEvent::NodeLeave(node));
                }
                None => debug!(ieee = %leave.ieee_address, "leave from unknown node"),
            },

            Indication::Incoming(incoming) => {
                match nodes.get_by_network_address(incoming.source_address) {
                    Some(node) => {
                        events.emit(ZStackEvent::ApplicationMessage {
                            source_ieee: node.ieee_address,
                            source_network: incoming.source_address,
                            message: ApplicationMessage {
                                cluster_id: incoming.cluster_id,
                                source_endpoint: incoming.source_endpoint,
                                destination_endpoint: incoming.destination_endpoint,
                                data: incoming.data,
                            },
                        });
                    }
                    None => warn!(
                        network = %incoming.source_address,
                        cluster = incoming.cluster_id.0,
                        "dropping message from unknown node"
                    ),
                }
            }

            Indication::NetworkAddress(rsp) => {
                nodes.add_or_update(rsp.ieee_address, rsp.network_address, None);
            }
        }
    }
    debug!("background indication loop stopped");
}
