//! Megavault Keeper - share ledger, quoting, and vault lifecycle
//!
//! The keeper owns the megavault's persisted state and drives it through
//! messages and block hooks. Funds, positions, prices, and the order book
//! belong to other modules, reached through the traits in [`interfaces`].
//!
//! ## Core Operations
//!
//! - **DepositToMegavault**: mint shares against pooled equity, locked for a while
//! - **WithdrawFromMegavault**: redeem shares for a slice of every quoting vault, net of slippage
//! - **AllocateFundsToVault / RetrieveFundsFromVault**: move capital between the main pool and vaults
//! - **SetVaultParams**: walk a vault through its status machine
//! - **EndBlock**: refresh every vault's skewed bid/ask ladder
//! - **BeginBlock**: decommission deactivated vaults with no equity
//!
//! ## Atomicity
//!
//! Every mutating operation runs inside [`VaultKeeper::atomically`]. An error
//! leaves the store, the collaborators, and the event log untouched.

pub mod interfaces;
pub mod store;
pub mod keeper;
pub mod equity;
pub mod shares;
pub mod withdraw;
pub mod orders;
pub mod lifecycle;
pub mod msg_server;
pub mod queries;
pub mod genesis;
pub mod abci;

#[cfg(test)]
mod testutil;


pub use abci::EndBlockSummary;
pub use equity::VaultMarket;
pub use genesis::{GenesisState, ModuleParams, ScopeSharesGenesis, VaultGenesis};
pub use interfaces::{
    AccountService, Collaborators, MarginTierService, OracleService, OrderBookService,
};
pub use keeper::{BlockContext, VaultKeeper};
pub use msg_server::{MsgResponse, VaultMsg};
pub use orders::{build_ladder, LadderInputs};
pub use queries::{OwnerSharesResponse, ParamsResponse, VaultDetail};
pub use store::KvStore;
pub use withdraw::{withdrawal_slippage_ppm, RedemptionPlan};
