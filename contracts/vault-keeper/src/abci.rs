//! Block hooks
//!
//! `begin_block` sweeps deactivated vaults before any message runs.
//! `end_block` matures share locks and then requotes every vault against
//! the state the block's messages left behind.

use megavault_common::VaultResult;

use crate::interfaces::Collaborators;
use crate::keeper::{BlockContext, VaultKeeper};

/// What one `end_block` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EndBlockSummary {
    pub active_vaults: usize,
}

impl<E: Collaborators> VaultKeeper<E> {
    pub fn begin_block(&mut self, block: BlockContext) -> VaultResult<()> {
        self.set_block(block);
        let removed = self.decommission_vaults()?;
        if !removed.is_empty() {
            log::info!("block {}: decommissioned {} vaults", block.height, removed.len());
        }
        Ok(())
    }

    pub fn end_block(&mut self) -> VaultResult<EndBlockSummary> {
        self.atomically(|k| k.release_matured_locks())?;
        let active_vaults = self.refresh_all_vault_orders()?;
        Ok(EndBlockSummary { active_vaults })
    }
}
