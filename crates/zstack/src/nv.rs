//! Reading and writing persisted configuration items.

use tokio::time::Instant;
use tracing::debug;
use zstack_protocol::nv::NvItem;
use zstack_protocol::{
    MessageKind, SysOsalNvRead, SysOsalNvReadReply, SysOsalNvWrite, SysOsalNvWriteReply,
};

use crate::error::{Result, ZStackError};
use crate::ZStack;

impl ZStack {
    /// Read an NV item from the adapter.
    pub async fn read_nv<I: NvItem>(&self, deadline: Instant) -> Result<I> {
        let request = SysOsalNvRead {
            item_id: I::ITEM_ID,
            offset: 0,
        };
        let reply: SysOsalNvReadReply = self.correlator.request_response(deadline, &request).await?;

        I::from_bytes(&reply.value).map_err(|source| ZStackError::Decode {
            kind: MessageKind::SysOsalNvReadReply,
            source,
        })
    }

    /// Write an NV item to the adapter.
    pub async fn write_nv<I: NvItem>(&self, deadline: Instant, item: &I) -> Result<()> {
        let value = item.to_bytes().map_err(|source| ZStackError::Encode {
            kind: MessageKind::SysOsalNvWrite,
            source,
        })?;
        debug!(item = I::NAME, id = I::ITEM_ID, len = value.len(), "writing NV item");

        let request = SysOsalNvWrite {
            item_id: I::ITEM_ID,
            offset: 0,
            value,
        };
        self.correlator
            .request_response::<_, SysOsalNvWriteReply>(deadline, &request)
            .await?;
        Ok(())
    }
}
