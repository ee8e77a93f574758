//! Vault keeper
//!
//! Owns the persisted store, the collaborator handle, and the event log.
//! Operations live in sibling modules as further `impl` blocks.

use megavault_common::{
    Authorities, EventLog, QuotingParams, VaultError, VaultEvent, VaultId, VaultParams,
    VaultResult,
};

use crate::genesis::ModuleParams;
use crate::interfaces::Collaborators;
use crate::store::KvStore;

/// Height and time of the block being executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockContext {
    pub height: u32,
    /// Unix seconds
    pub time: u32,
}

impl BlockContext {
    pub fn new(height: u32, time: u32) -> Self {
        Self { height, time }
    }
}

pub struct VaultKeeper<E: Collaborators> {
    pub(crate) store: KvStore,
    pub(crate) env: E,
    pub(crate) events: EventLog,
    pub(crate) block: BlockContext,
}

impl<E: Collaborators> VaultKeeper<E> {
    /// Keeper with an empty store and the given module params
    ///
    /// # Errors
    /// Returns the validation error of `module_params`.
    pub fn new(env: E, module_params: ModuleParams) -> VaultResult<Self> {
        module_params.validate()?;
        let mut keeper = Self {
            store: KvStore::new(),
            env,
            events: EventLog::new(),
            block: BlockContext::default(),
        };
        keeper.store.set_module_params(&module_params)?;
        Ok(keeper)
    }

    pub fn set_block(&mut self, block: BlockContext) {
        self.block = block;
    }

    pub fn block(&self) -> BlockContext {
        self.block
    }

    pub fn store(&self) -> &KvStore {
        &self.store
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Drain the events emitted so far
    pub fn take_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events).into_events()
    }

    pub(crate) fn emit(&mut self, event: VaultEvent) {
        self.events.emit(event);
    }

    /// Run `op` so that either all of its effects land or none do
    ///
    /// Store, collaborator state, and events are restored when `op` fails.
    pub fn atomically<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> VaultResult<T>,
    ) -> VaultResult<T> {
        let store = self.store.clone();
        let env = self.env.clone();
        let events_len = self.events.len();

        let result = op(self);
        if result.is_err() {
            self.store = store;
            self.env = env;
            self.events.truncate(events_len);
        }
        result
    }

    // ============ Params ============

    pub fn module_params(&self) -> VaultResult<ModuleParams> {
        self.store.module_params()
    }

    pub fn authorities(&self) -> VaultResult<Authorities> {
        Ok(self.store.module_params()?.authorities)
    }

    pub fn default_quoting_params(&self) -> VaultResult<QuotingParams> {
        self.store.default_quoting_params()
    }

    /// Params of an existing vault
    ///
    /// # Errors
    /// `VaultNotFound` if the vault was never allocated or has been decommissioned.
    pub fn vault_params(&self, vault_id: &VaultId) -> VaultResult<VaultParams> {
        self.store
            .vault_params(vault_id)?
            .ok_or_else(|| VaultError::VaultNotFound { vault: vault_id.to_string() })
    }

    /// Vault params together with the quoting params in effect
    pub fn vault_and_quoting_params(
        &self,
        vault_id: &VaultId,
    ) -> VaultResult<(VaultParams, QuotingParams)> {
        let params = self.vault_params(vault_id)?;
        let quoting = match &params.quoting_params {
            Some(quoting) => quoting.clone(),
            None => self.store.default_quoting_params()?,
        };
        Ok((params, quoting))
    }

    pub fn most_recent_client_ids(&self, vault_id: &VaultId) -> VaultResult<Vec<u32>> {
        self.store.most_recent_client_ids(vault_id)
    }
}
