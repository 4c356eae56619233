//! Bringing the adapter up as a configured coordinator.

use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};
use zstack_protocol::nv::{
    ChannelListItem, ExtendedPanIdItem, LogicalTypeItem, NvItem, PanIdItem, PreCfgKeyItem,
    PreCfgKeysEnableItem, SecurityModeItem, StartUpOption, TclkTableStartItem,
    UseDefaultTclkItem, ZdoDirectCallbackItem, STARTUP_CLEAR_STATE_AND_CONFIG,
};
use zstack_protocol::{
    DeviceState, LogicalType, ResetType, SapiZbStartRequest, SapiZbStartRequestReply,
    SysGetExtAddr, SysGetExtAddrReply, SysResetInd, SysResetReq, UtilGetDeviceInfo,
    UtilGetDeviceInfoReply, Version, ZdoStateChangeInd,
};

use crate::config::NetworkConfiguration;
use crate::error::{Result, ZStackError};
use crate::retry::retry;
use crate::ZStack;

impl ZStack {
    /// Bring the adapter up as a coordinator for `network`.
    ///
    /// The stored configuration is verified first and the adapter is only
    /// wiped and reconfigured when it differs. On success the adapter
    /// addresses are known, joining is denied and the background indication
    /// loops are running.
    pub async fn initialise(&self, deadline: Instant, network: NetworkConfiguration) -> Result<()> {
        network.validate()?;
        {
            let mut properties = self.network.write();
            properties.pan_id = network.pan_id;
            properties.extended_pan_id = network.extended_pan_id;
            properties.network_key = network.network_key;
            properties.channel = network.channel;
        }

        let version = self.wait_for_reset(deadline).await?;
        info!(?version, "adapter reset");

        if self.verify_network_config(deadline, &network).await {
            info!("adapter configuration matches, skipping reconfiguration");
        } else {
            info!("adapter configuration differs, reconfiguring");
            self.wipe_adapter(deadline).await?;
            self.assume_coordinator_role(deadline).await?;
            self.configure_network(deadline, &network, version).await?;
        }

        self.start_stack(deadline).await?;
        self.retrieve_adapter_addresses(deadline).await?;
        self.deny_join(deadline).await?;
        self.start_background_loops()?;

        let properties = self.network_properties();
        info!(
            ieee = ?properties.ieee_address,
            network = ?properties.network_address,
            "adapter initialised"
        );
        Ok(())
    }

    async fn soft_reset(&self, deadline: Instant) -> Result<Version> {
        let request = SysResetReq {
            reset_type: ResetType::Soft,
        };
        let indication: SysResetInd = self.correlator.request_response(deadline, &request).await?;
        Ok(indication.version)
    }

    async fn wait_for_reset(&self, deadline: Instant) -> Result<Version> {
        retry(self.reset_retry_policy(), deadline, "waiting for adapter reset", move |d| {
            self.soft_reset(d)
        })
        .await
    }

    /// Compare the stored configuration with `network`, item by item.
    /// A read failure counts as a mismatch.
    async fn verify_network_config(&self, deadline: Instant, network: &NetworkConfiguration) -> bool {
        let logical_type = LogicalTypeItem {
            logical_type: LogicalType::Coordinator,
        };
        if !self.nv_matches(deadline, logical_type).await {
            return false;
        }

        let pan_id = PanIdItem {
            pan_id: network.pan_id,
        };
        if !self.nv_matches(deadline, pan_id).await {
            return false;
        }

        let extended_pan_id = ExtendedPanIdItem {
            extended_pan_id: network.extended_pan_id,
        };
        if !self.nv_matches(deadline, extended_pan_id).await {
            return false;
        }

        self.nv_matches(deadline, ChannelListItem::for_channel(network.channel))
            .await
    }

    async fn nv_matches<I: NvItem>(&self, deadline: Instant, expected: I) -> bool {
        let attempt_deadline = (Instant::now() + self.config.attempt_timeout()).min(deadline);
        match self.read_nv::<I>(attempt_deadline).await {
            Ok(actual) if actual == expected => true,
            Ok(actual) => {
                debug!(item = I::NAME, ?actual, "stored item differs");
                false
            }
            Err(e) => {
                warn!(item = I::NAME, error = %e, "failed to read stored item");
                false
            }
        }
    }

    async fn write_nv_retried<I: NvItem>(&self, deadline: Instant, item: I) -> Result<()> {
        let step = format!("writing {}", I::NAME);
        let item = &item;
        retry(self.retry_policy(), deadline, &step, move |d| self.write_nv(d, item)).await
    }

    async fn soft_reset_retried(&self, deadline: Instant) -> Result<()> {
        retry(self.retry_policy(), deadline, "resetting adapter", move |d| {
            self.soft_reset(d)
        })
        .await
        .map(|_| ())
    }

    async fn wipe_adapter(&self, deadline: Instant) -> Result<()> {
        self.write_nv_retried(
            deadline,
            StartUpOption {
                start_option: STARTUP_CLEAR_STATE_AND_CONFIG,
            },
        )
        .await?;
        self.soft_reset_retried(deadline).await
    }

    async fn assume_coordinator_role(&self, deadline: Instant) -> Result<()> {
        self.write_nv_retried(
            deadline,
            LogicalTypeItem {
                logical_type: LogicalType::Coordinator,
            },
        )
        .await?;
        self.soft_reset_retried(deadline).await
    }

    async fn configure_network(
        &self,
        deadline: Instant,
        network: &NetworkConfiguration,
        version: Version,
    ) -> Result<()> {
        self.write_nv_retried(deadline, SecurityModeItem { enabled: true })
            .await?;
        self.write_nv_retried(deadline, PreCfgKeysEnableItem { enabled: true })
            .await?;
        self.write_nv_retried(
            deadline,
            PreCfgKeyItem {
                network_key: network.network_key,
            },
        )
        .await?;
        self.write_nv_retried(deadline, ZdoDirectCallbackItem { enabled: true })
            .await?;
        self.write_nv_retried(deadline, ChannelListItem::for_channel(network.channel))
            .await?;
        self.write_nv_retried(
            deadline,
            PanIdItem {
                pan_id: network.pan_id,
            },
        )
        .await?;
        self.write_nv_retried(
            deadline,
            ExtendedPanIdItem {
                extended_pan_id: network.extended_pan_id,
            },
        )
        .await?;

        // 3.x firmware ships a valid default trust-centre link key.
        if !version.is_v3() {
            self.write_nv_retried(deadline, UseDefaultTclkItem { enabled: true })
                .await?;
            self.write_nv_retried(deadline, TclkTableStartItem::default_for_all_devices())
                .await?;
        }

        Ok(())
    }

    async fn start_stack(&self, deadline: Instant) -> Result<()> {
        // Subscribe before starting so an early state change is not missed.
        let (sender, mut states) = mpsc::unbounded_channel();
        let _subscription = self.correlator.subscribe(
            |_: &ZdoStateChangeInd| true,
            move |ind: ZdoStateChangeInd| {
                let _ = sender.send(ind.state);
            },
        )?;

        retry(self.retry_policy(), deadline, "starting stack", move |d| {
            self.correlator
                .request_response::<_, SapiZbStartRequestReply>(d, &SapiZbStartRequest)
        })
        .await?;

        loop {
            match timeout_at(deadline, states.recv()).await {
                Ok(Some(DeviceState::Coordinator)) => {
                    info!("stack started as coordinator");
                    return Ok(());
                }
                Ok(Some(state)) if state.is_terminal_non_coordinator() => {
                    return Err(ZStackError::UnexpectedDeviceState(state));
                }
                Ok(Some(state)) => debug!(?state, "adapter state changed"),
                Ok(None) => return Err(ZStackError::TransportClosed),
                Err(_) => {
                    return Err(ZStackError::DeadlineExceeded(
                        "waiting for the stack to start as coordinator",
                    ))
                }
            }
        }
    }

    async fn retrieve_adapter_addresses(&self, deadline: Instant) -> Result<()> {
        let reply: SysGetExtAddrReply =
            retry(self.retry_policy(), deadline, "reading adapter IEEE address", move |d| {
                self.correlator.request_response(d, &SysGetExtAddr)
            })
            .await?;
        self.network.write().ieee_address = Some(reply.ieee_address);

        let info: UtilGetDeviceInfoReply =
            retry(self.retry_policy(), deadline, "reading adapter network address", move |d| {
                self.correlator.request_response(d, &UtilGetDeviceInfo)
            })
            .await?;
        self.network.write().network_address = Some(info.network_address);

        Ok(())
    }
}
