//! Node communication: address resolution, application data, departures,
//! endpoint registration and join control.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};
use zstack_protocol::{
    AfDataConfirm, AfDataRequest, AfDataRequestOptions, AfDataRequestReply, AfRegister,
    AfRegisterReply, ApplicationMessage, ClusterId, Endpoint, IeeeAddress, NetworkAddress,
    ProfileId, ZStackMessage, ZdoMgmtLeaveReq, ZdoMgmtLeaveReqReply, ZdoMgmtLeaveRsp,
    ZdoMgmtPermitJoinReq, ZdoMgmtPermitJoinReqReply, ZdoNwkAddrReq, ZdoNwkAddrReqReply,
    ZdoNwkAddrRsp,
};

use crate::error::{Result, ZStackError};
use crate::events::ZStackEvent;
use crate::ZStack;

type ResolveLocks = Mutex<HashMap<IeeeAddress, Arc<tokio::sync::Mutex<()>>>>;

/// Membership in the per-address resolution map. The entry is removed when
/// its last member leaves.
struct ResolveSlot<'a> {
    locks: &'a ResolveLocks,
    ieee_address: IeeeAddress,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> ResolveSlot<'a> {
    fn join(locks: &'a ResolveLocks, ieee_address: IeeeAddress) -> Self {
        let lock = Arc::clone(locks.lock().entry(ieee_address).or_default());
        ResolveSlot {
            locks,
            ieee_address,
            lock,
        }
    }
}

impl Drop for ResolveSlot<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        // One reference held by the map, one by this slot.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.ieee_address);
        }
    }
}

async fn acquire_gate(gate: &Semaphore, deadline: Instant) -> Result<SemaphorePermit<'_>> {
    timeout_at(deadline, gate.acquire())
        .await
        .map_err(|_| ZStackError::DeadlineExceeded("waiting for a free request slot"))?
        .map_err(|_| ZStackError::TransportClosed)
}

impl ZStack {
    /// Network address of a node, from the node table or by asking the
    /// network. Concurrent lookups of the same address share one query.
    pub async fn resolve_node_network_address(
        &self,
        deadline: Instant,
        ieee_address: IeeeAddress,
    ) -> Result<NetworkAddress> {
        if let Some(node) = self.nodes.get(ieee_address) {
            return Ok(node.network_address);
        }

        let slot = ResolveSlot::join(&self.resolving, ieee_address);
        let _resolving = timeout_at(deadline, slot.lock.lock())
            .await
            .map_err(|_| ZStackError::DeadlineExceeded("waiting for a concurrent resolution"))?;

        if let Some(node) = self.nodes.get(ieee_address) {
            return Ok(node.network_address);
        }

        debug!(ieee = %ieee_address, "querying network address");
        let rsp: ZdoNwkAddrRsp = self
            .node_request::<_, ZdoNwkAddrReqReply, _, _>(
                deadline,
                &ZdoNwkAddrReq::single(ieee_address),
                move |rsp: &ZdoNwkAddrRsp| rsp.ieee_address == ieee_address,
            )
            .await?;

        self.nodes.add_or_update(ieee_address, rsp.network_address, None);
        Ok(rsp.network_address)
    }

    /// Send application data to a node.
    ///
    /// With `require_ack` the call succeeds only once the adapter has both
    /// accepted the request and confirmed delivery.
    pub async fn send_application_message(
        &self,
        deadline: Instant,
        destination: IeeeAddress,
        message: ApplicationMessage,
        require_ack: bool,
    ) -> Result<()> {
        let network_address = match self.resolve_node_network_address(deadline, destination).await {
            Ok(address) => address,
            Err(e) => {
                warn!(ieee = %destination, error = %e, "failed to resolve destination");
                return Err(e);
            }
        };

        let _slot = acquire_gate(&self.gate, deadline).await?;
        let transaction = self.transaction_ids.acquire(deadline).await?;
        let transaction_id = transaction.value();
        let endpoint = message.destination_endpoint;

        let request = AfDataRequest {
            destination_address: network_address,
            destination_endpoint: message.destination_endpoint,
            source_endpoint: message.source_endpoint,
            cluster_id: message.cluster_id,
            transaction_id,
            options: AfDataRequestOptions {
                ack_request: require_ack,
                ..Default::default()
            },
            radius: self.config.radius,
            data: message.data,
        };
        debug!(
            ieee = %destination,
            network = %network_address,
            transaction_id,
            require_ack,
            "sending application message"
        );

        if require_ack {
            self.node_request::<_, AfDataRequestReply, AfDataConfirm, _>(
                deadline,
                &request,
                move |confirm: &AfDataConfirm| {
                    confirm.transaction_id == transaction_id && confirm.endpoint == endpoint
                },
            )
            .await?;
        } else {
            self.correlator
                .request_response::<_, AfDataRequestReply>(deadline, &request)
                .await?;
        }
        Ok(())
    }

    /// Ask a node to leave the network and wait for it to confirm.
    pub async fn request_node_leave(&self, deadline: Instant, ieee_address: IeeeAddress) -> Result<()> {
        let network_address = self
            .resolve_node_network_address(deadline, ieee_address)
            .await?;

        let _slot = acquire_gate(&self.gate, deadline).await?;
        let request = ZdoMgmtLeaveReq {
            network_address,
            ieee_address,
            remove_children: false,
        };
        self.node_request::<_, ZdoMgmtLeaveReqReply, ZdoMgmtLeaveRsp, _>(
            deadline,
            &request,
            move |rsp: &ZdoMgmtLeaveRsp| rsp.source_address == network_address,
        )
        .await?;

        info!(ieee = %ieee_address, network = %network_address, "node left on request");
        self.remove_node(ieee_address);
        Ok(())
    }

    /// Forget a node without talking to it.
    pub async fn force_node_leave(&self, ieee_address: IeeeAddress) -> Result<()> {
        if self.remove_node(ieee_address) {
            info!(ieee = %ieee_address, "node forcibly removed");
            Ok(())
        } else {
            Err(ZStackError::NodeNotFound(ieee_address))
        }
    }

    /// Register an application endpoint on the adapter.
    #[allow(clippy::too_many_arguments)]
    pub async fn register_adapter_endpoint(
        &self,
        deadline: Instant,
        endpoint: Endpoint,
        app_profile_id: ProfileId,
        app_device_id: u16,
        app_device_version: u8,
        in_clusters: Vec<ClusterId>,
        out_clusters: Vec<ClusterId>,
    ) -> Result<()> {
        let _slot = acquire_gate(&self.gate, deadline).await?;
        let request = AfRegister {
            endpoint,
            app_profile_id,
            app_device_id,
            app_device_version,
            latency_req: 0x00,
            app_in_clusters: in_clusters,
            app_out_clusters: out_clusters,
        };
        self.correlator
            .request_response::<_, AfRegisterReply>(deadline, &request)
            .await?;
        debug!(endpoint = endpoint.0, "registered adapter endpoint");
        Ok(())
    }

    /// Allow devices to join through any router for `duration` seconds.
    pub async fn permit_join(&self, deadline: Instant, duration: u8) -> Result<()> {
        self.correlator
            .request_response::<_, ZdoMgmtPermitJoinReqReply>(
                deadline,
                &ZdoMgmtPermitJoinReq::all_routers(duration),
            )
            .await?;
        info!(duration, "join permitted");
        Ok(())
    }

    /// Close the network to joining devices.
    pub async fn deny_join(&self, deadline: Instant) -> Result<()> {
        self.correlator
            .request_response::<_, ZdoMgmtPermitJoinReqReply>(
                deadline,
                &ZdoMgmtPermitJoinReq::all_routers(0),
            )
            .await?;
        info!("join denied");
        Ok(())
    }

    /// A synchronous request followed by the indication it triggers.
    ///
    /// The indication waiter is registered before the request is sent; both
    /// phases must report success.
    async fn node_request<Req, Rep, Ind, P>(
        &self,
        deadline: Instant,
        request: &Req,
        predicate: P,
    ) -> Result<Ind>
    where
        Req: ZStackMessage,
        Rep: ZStackMessage,
        Ind: ZStackMessage,
        P: Fn(&Ind) -> bool + Send + Sync + 'static,
    {
        let waiter = self.correlator.waiter(predicate)?;
        self.correlator
            .request_response::<Req, Rep>(deadline, request)
            .await?;
        let indication = waiter.wait(deadline).await?;

        match indication.status() {
            Some(status) if !status.is_success() => Err(ZStackError::DeviceFailure(status)),
            _ => Ok(indication),
        }
    }

    /// Remove a node and report its departure. Returns whether it was known.
    pub(crate) fn remove_node(&self, ieee_address: IeeeAddress) -> bool {
        match self.nodes.remove(ieee_address) {
            Some(node) => {
                self.events.emit(ZStackEvent::NodeLeave(node));
                true
            }
            None => false,
        }
    }
}
