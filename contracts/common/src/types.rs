//! Core Types for the Megavault Protocol
//!
//! Vault identity, parameters, share records, and the read-only market and
//! order structures exchanged with the order book.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::{addresses, client_ids, quoting};
use crate::errors::{VaultError, VaultResult};
use crate::num_shares::NumShares;
use crate::serializable_int::SerializableInt;

/// Type alias for addresses (32-byte hash)
pub type Address = [u8; 32];

/// Deterministic module address for a seed string
pub fn module_address(seed: &str) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.finalize().into()
}

// ============ Accounts ============

/// One settlement account of an owner
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct SubaccountId {
    pub owner: Address,
    pub number: u32,
}

impl SubaccountId {
    pub fn new(owner: Address, number: u32) -> Self {
        Self { owner, number }
    }

    /// Main liquidity pool of the megavault
    pub fn megavault_main() -> Self {
        Self::new(module_address(addresses::MEGAVAULT_SEED), 0)
    }
}

// ============ Vault Identity ============

/// Kind of market a vault makes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum VaultType {
    #[default]
    Unspecified = 0,
    /// Quotes on a central limit order book
    Clob = 1,
}

impl VaultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "VAULT_TYPE_UNSPECIFIED",
            Self::Clob => "VAULT_TYPE_CLOB",
        }
    }

    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unspecified),
            1 => Some(Self::Clob),
            _ => None,
        }
    }
}

/// Identifies one sub-vault
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct VaultId {
    pub vault_type: VaultType,
    /// For clob vaults, the clob pair id the vault quotes on
    pub number: u32,
}

impl VaultId {
    pub fn clob(number: u32) -> Self {
        Self { vault_type: VaultType::Clob, number }
    }

    pub fn validate(&self) -> VaultResult<()> {
        if self.vault_type == VaultType::Unspecified {
            return Err(VaultError::InvalidVaultId { reason: "vault type is unspecified" });
        }
        Ok(())
    }

    /// Canonical store key. Orders by type, then number.
    pub fn state_key(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(5);
        key.push(self.vault_type as u8);
        key.extend_from_slice(&self.number.to_be_bytes());
        key
    }

    pub fn from_state_key(key: &[u8]) -> VaultResult<Self> {
        let invalid = VaultError::InvalidVaultId { reason: "malformed state key" };
        let (type_byte, number) = key.split_first().ok_or(invalid.clone())?;
        let number: [u8; 4] = number.try_into().map_err(|_| invalid.clone())?;
        let vault_type = VaultType::from_u8(*type_byte).ok_or(invalid)?;
        Ok(Self { vault_type, number: u32::from_be_bytes(number) })
    }

    /// Address owning the vault's settlement subaccount
    pub fn module_address(&self) -> Address {
        module_address(&format!(
            "{}-{}-{}",
            addresses::VAULT_SEED_PREFIX,
            self.vault_type.as_str(),
            self.number
        ))
    }

    pub fn to_subaccount_id(&self) -> SubaccountId {
        SubaccountId::new(self.module_address(), 0)
    }

    pub fn clob_pair_id(&self) -> u32 {
        self.number
    }

    pub fn order_id(&self, client_id: u32) -> OrderId {
        OrderId {
            subaccount_id: self.to_subaccount_id(),
            client_id,
            clob_pair_id: self.clob_pair_id(),
        }
    }
}

impl fmt::Display for VaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.vault_type.as_str(), self.number)
    }
}

/// Base client id of the order at (`side`, `layer`)
///
/// Side sits in the top bit (sell = 1) and the layer in the next eight.
pub fn vault_client_id(side: Side, layer: u8) -> u32 {
    let side_bit = match side {
        Side::Sell => 1u32,
        Side::Buy => 0u32,
    };
    (side_bit << client_ids::SIDE_SHIFT) | ((layer as u32) << client_ids::LAYER_SHIFT)
}

/// Client id a replacement order uses
pub fn flip_client_id(client_id: u32) -> u32 {
    client_id ^ client_ids::REPLACEMENT_BIT
}

// ============ Vault Params ============

/// Lifecycle status of a vault
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum VaultStatus {
    /// Invalid, rejected on validation
    #[default]
    Unspecified = 0,
    /// Terminal. Eligible for decommissioning once equity is gone.
    Deactivated = 1,
    /// Allocated but not quoting
    StandBy = 2,
    /// Quoting both sides
    Quoting = 3,
    /// Only quoting the side that reduces inventory
    CloseOnly = 4,
}

impl VaultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "UNSPECIFIED",
            Self::Deactivated => "DEACTIVATED",
            Self::StandBy => "STAND_BY",
            Self::Quoting => "QUOTING",
            Self::CloseOnly => "CLOSE_ONLY",
        }
    }

    /// Whether the refresh driver places orders for this status
    pub fn places_orders(&self) -> bool {
        matches!(self, Self::Quoting | Self::CloseOnly)
    }

    /// Whether `next` is reachable from this status
    ///
    /// Equity requirements for deactivation are checked separately.
    pub fn can_transition_to(&self, next: VaultStatus) -> bool {
        match (self, next) {
            (_, Self::Unspecified) => false,
            (Self::Deactivated, next) => next == Self::Deactivated,
            (Self::Quoting, next) => matches!(next, Self::Quoting | Self::CloseOnly),
            (Self::Unspecified, _) | (Self::StandBy, _) | (Self::CloseOnly, _) => true,
        }
    }
}

/// Parameters controlling a vault's order ladder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct QuotingParams {
    /// Number of price levels on each side
    pub layers: u32,
    /// Minimum spread
    pub spread_min_ppm: u32,
    /// Added to the market's minimum price change to form the spread
    pub spread_buffer_ppm: u32,
    /// How strongly leverage skews prices
    pub skew_factor_ppm: u32,
    /// Size of each order as a share of equity
    pub order_size_pct_ppm: u32,
    /// Lifetime of placed orders
    pub order_expiration_seconds: u32,
    /// Equity a flat vault needs before it quotes
    pub activation_threshold_quote_quantums: SerializableInt,
}

impl Default for QuotingParams {
    fn default() -> Self {
        Self {
            layers: quoting::DEFAULT_LAYERS,
            spread_min_ppm: quoting::DEFAULT_SPREAD_MIN_PPM,
            spread_buffer_ppm: quoting::DEFAULT_SPREAD_BUFFER_PPM,
            skew_factor_ppm: quoting::DEFAULT_SKEW_FACTOR_PPM,
            order_size_pct_ppm: quoting::DEFAULT_ORDER_SIZE_PCT_PPM,
            order_expiration_seconds: quoting::DEFAULT_ORDER_EXPIRATION_SECONDS,
            activation_threshold_quote_quantums: SerializableInt::from(
                quoting::DEFAULT_ACTIVATION_THRESHOLD_QUOTE_QUANTUMS,
            ),
        }
    }
}

impl QuotingParams {
    pub fn validate(&self) -> VaultResult<()> {
        if self.layers > quoting::MAX_LAYERS {
            return Err(VaultError::InvalidQuotingParams { reason: "layers exceeds 255" });
        }
        if self.spread_min_ppm == 0 {
            return Err(VaultError::InvalidQuotingParams { reason: "spread_min_ppm is zero" });
        }
        if self.order_size_pct_ppm == 0 {
            return Err(VaultError::InvalidQuotingParams { reason: "order_size_pct_ppm is zero" });
        }
        if self.order_expiration_seconds == 0 {
            return Err(VaultError::InvalidQuotingParams {
                reason: "order_expiration_seconds is zero",
            });
        }
        if self.activation_threshold_quote_quantums.is_negative() {
            return Err(VaultError::InvalidQuotingParams {
                reason: "activation threshold is negative",
            });
        }
        // Both factors are u32 so the product fits in u64
        let skew_times_size = self.skew_factor_ppm as u64 * self.order_size_pct_ppm as u64;
        if skew_times_size >= quoting::MAX_SKEW_TIMES_ORDER_SIZE_PPM2 {
            return Err(VaultError::InvalidQuotingParams {
                reason: "skew_factor_ppm * order_size_pct_ppm too large",
            });
        }
        Ok(())
    }
}

/// Per-vault configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct VaultParams {
    pub status: VaultStatus,
    /// Falls back to the module default when absent
    pub quoting_params: Option<QuotingParams>,
}

impl VaultParams {
    pub fn new(status: VaultStatus) -> Self {
        Self { status, quoting_params: None }
    }

    pub fn validate(&self) -> VaultResult<()> {
        if self.status == VaultStatus::Unspecified {
            return Err(VaultError::UnspecifiedVaultStatus);
        }
        if let Some(params) = &self.quoting_params {
            params.validate()?;
        }
        Ok(())
    }
}

/// Address allowed to operate vaults alongside governance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct OperatorParams {
    pub operator: Address,
}

impl OperatorParams {
    pub fn validate(&self) -> VaultResult<()> {
        if self.operator == [0u8; 32] {
            return Err(VaultError::InvalidAddress { reason: "operator cannot be zero address" });
        }
        Ok(())
    }
}

// ============ Share Records ============

/// Pool a share record belongs to
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub enum ShareScope {
    /// The aggregate pool of the main account and every sub-vault
    Megavault,
    /// A single sub-vault
    Vault(VaultId),
}

impl ShareScope {
    /// Canonical store key. The megavault sorts before every vault.
    pub fn state_key(&self) -> Vec<u8> {
        match self {
            Self::Megavault => vec![0],
            Self::Vault(vault_id) => {
                let mut key = vec![1];
                key.extend(vault_id.state_key());
                key
            }
        }
    }

    /// Number of key bytes `state_key` produces
    pub fn state_key_len(&self) -> usize {
        match self {
            Self::Megavault => 1,
            Self::Vault(_) => 6,
        }
    }

    pub fn from_state_key(key: &[u8]) -> VaultResult<Self> {
        match key.split_first() {
            Some((0, [])) => Ok(Self::Megavault),
            Some((1, rest)) => Ok(Self::Vault(VaultId::from_state_key(rest)?)),
            _ => Err(VaultError::InvalidVaultId { reason: "malformed share scope key" }),
        }
    }
}

/// One depositor's claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct OwnerShare {
    pub owner: Address,
    pub shares: NumShares,
}

/// A locked tranche of shares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ShareUnlock {
    pub shares: NumShares,
    /// First height at which the tranche no longer counts as locked
    pub unlock_block_height: u32,
}

/// All locked tranches of one owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct OwnerShareUnlocks {
    pub owner_address: Address,
    pub share_unlocks: Vec<ShareUnlock>,
}

impl OwnerShareUnlocks {
    pub fn new(owner_address: Address) -> Self {
        Self { owner_address, share_unlocks: Vec::new() }
    }

    /// Sum of every tranche regardless of height
    pub fn total_locked(&self) -> NumShares {
        self.share_unlocks
            .iter()
            .fold(NumShares::zero(), |acc, unlock| acc.add(&unlock.shares))
    }

    /// Sum of tranches still locked at `height`
    pub fn locked_at(&self, height: u32) -> NumShares {
        self.share_unlocks
            .iter()
            .filter(|unlock| unlock.unlock_block_height > height)
            .fold(NumShares::zero(), |acc, unlock| acc.add(&unlock.shares))
    }

    /// Drops tranches that matured by `height`, returning the released amount
    pub fn release_matured(&mut self, height: u32) -> NumShares {
        let released = self
            .share_unlocks
            .iter()
            .filter(|unlock| unlock.unlock_block_height <= height)
            .fold(NumShares::zero(), |acc, unlock| acc.add(&unlock.shares));
        self.share_unlocks.retain(|unlock| unlock.unlock_block_height > height);
        released
    }
}

// ============ Markets ============

/// What a clob pair trades
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum MarketKind {
    Perpetual { perpetual_id: u32 },
    Spot { asset_id: u32 },
}

/// Trading status of a clob pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum ClobPairStatus {
    Active,
    Initializing,
    FinalSettlement,
}

/// Order book parameters of one market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ClobPair {
    pub id: u32,
    pub market: MarketKind,
    /// Order sizes must be multiples of this
    pub step_base_quantums: u64,
    /// Order prices must be multiples of this
    pub subticks_per_tick: u32,
    pub quantum_conversion_exponent: i32,
    pub status: ClobPairStatus,
}

impl ClobPair {
    pub fn perpetual_id(&self) -> VaultResult<u32> {
        match self.market {
            MarketKind::Perpetual { perpetual_id } => Ok(perpetual_id),
            MarketKind::Spot { .. } => Err(VaultError::UnsupportedMarket { clob_pair_id: self.id }),
        }
    }
}

/// Perpetual contract parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Perpetual {
    pub id: u32,
    pub market_id: u32,
    pub atomic_resolution: i32,
    /// Initial margin fraction in ppm
    pub initial_margin_ppm: u32,
}

/// Oracle price as `price * 10^exponent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct MarketPrice {
    pub price: u64,
    pub exponent: i32,
}

/// Oracle market configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct MarketParam {
    pub id: u32,
    pub min_price_change_ppm: u32,
}

// ============ Orders ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum TimeInForce {
    #[default]
    Unspecified,
    /// Rejected instead of crossing the book
    PostOnly,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct OrderId {
    pub subaccount_id: SubaccountId,
    pub client_id: u32,
    pub clob_pair_id: u32,
}

/// Long-term limit order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub side: Side,
    pub quantums: u64,
    pub subticks: u64,
    /// Unix seconds after which the order expires
    pub good_til_block_time: u32,
    pub time_in_force: TimeInForce,
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn test_vault_state_key_roundtrip_and_order() {
        let a = VaultId::clob(1);
        let b = VaultId::clob(256);
        assert!(a.state_key() < b.state_key());
        assert_eq!(VaultId::from_state_key(&b.state_key()).unwrap(), b);
        assert!(VaultId::from_state_key(&[1, 0, 0]).is_err());
        assert!(VaultId::from_state_key(&[9, 0, 0, 0, 1]).is_err());
    }

    #[test]
    fn test_vault_addresses_are_distinct() {
        let a = VaultId::clob(0).to_subaccount_id();
        let b = VaultId::clob(1).to_subaccount_id();
        assert_ne!(a, b);
        assert_ne!(a, SubaccountId::megavault_main());
        assert_eq!(a, VaultId::clob(0).to_subaccount_id());
    }

    #[test]
    fn test_client_ids() {
        assert_eq!(vault_client_id(Side::Buy, 0), 0);
        assert_eq!(vault_client_id(Side::Sell, 0), 1 << 31);
        assert_eq!(vault_client_id(Side::Buy, 1), 1 << 23);
        assert_eq!(vault_client_id(Side::Sell, 255), (1 << 31) | (255 << 23));
        assert_eq!(flip_client_id(flip_client_id(7 << 23)), 7 << 23);
        assert_eq!(flip_client_id(0), 1);
    }

    #[test]
    fn test_quoting_params_validation() {
        assert!(QuotingParams::default().validate().is_ok());

        let mut params = QuotingParams { layers: 256, ..Default::default() };
        assert!(params.validate().is_err());

        params = QuotingParams { spread_min_ppm: 0, ..Default::default() };
        assert!(params.validate().is_err());

        params = QuotingParams { order_size_pct_ppm: 0, ..Default::default() };
        assert!(params.validate().is_err());

        params = QuotingParams { order_expiration_seconds: 0, ..Default::default() };
        assert!(params.validate().is_err());

        params = QuotingParams {
            activation_threshold_quote_quantums: SerializableInt::new(BigInt::from(-1)),
            ..Default::default()
        };
        assert!(params.validate().is_err());

        // 2_000_000 * 1_000_000 hits the ceiling exactly
        params = QuotingParams {
            skew_factor_ppm: 2_000_000,
            order_size_pct_ppm: 1_000_000,
            ..Default::default()
        };
        assert!(params.validate().is_err());
        params.order_size_pct_ppm = 999_999;
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_vault_params_validation() {
        assert_eq!(
            VaultParams::new(VaultStatus::Unspecified).validate(),
            Err(VaultError::UnspecifiedVaultStatus)
        );
        assert!(VaultParams::new(VaultStatus::StandBy).validate().is_ok());
    }

    #[test]
    fn test_status_transitions() {
        use VaultStatus::*;
        assert!(StandBy.can_transition_to(Quoting));
        assert!(StandBy.can_transition_to(Deactivated));
        assert!(Quoting.can_transition_to(CloseOnly));
        assert!(!Quoting.can_transition_to(Deactivated));
        assert!(CloseOnly.can_transition_to(Quoting));
        assert!(CloseOnly.can_transition_to(Deactivated));
        assert!(!Deactivated.can_transition_to(Quoting));
        assert!(Deactivated.can_transition_to(Deactivated));
        assert!(!StandBy.can_transition_to(Unspecified));
    }

    #[test]
    fn test_share_scope_keys() {
        let megavault = ShareScope::Megavault;
        let vault = ShareScope::Vault(VaultId::clob(3));
        assert_eq!(megavault.state_key().len(), megavault.state_key_len());
        assert_eq!(vault.state_key().len(), vault.state_key_len());
        assert!(megavault.state_key() < vault.state_key());
        assert_eq!(ShareScope::from_state_key(&vault.state_key()).unwrap(), vault);
    }

    #[test]
    fn test_release_matured() {
        let mut unlocks = OwnerShareUnlocks::new([1u8; 32]);
        unlocks.share_unlocks.push(ShareUnlock {
            shares: NumShares::from_int(100u64),
            unlock_block_height: 10,
        });
        unlocks.share_unlocks.push(ShareUnlock {
            shares: NumShares::from_int(50u64),
            unlock_block_height: 20,
        });

        assert_eq!(unlocks.locked_at(9), NumShares::from_int(150u64));
        assert_eq!(unlocks.locked_at(10), NumShares::from_int(50u64));
        assert_eq!(unlocks.release_matured(10), NumShares::from_int(100u64));
        assert_eq!(unlocks.share_unlocks.len(), 1);
        assert_eq!(unlocks.total_locked(), NumShares::from_int(50u64));
    }

    #[test]
    fn test_spot_market_unsupported() {
        let pair = ClobPair {
            id: 4,
            market: MarketKind::Spot { asset_id: 1 },
            step_base_quantums: 1,
            subticks_per_tick: 1,
            quantum_conversion_exponent: 0,
            status: ClobPairStatus::Active,
        };
        assert_eq!(pair.perpetual_id(), Err(VaultError::UnsupportedMarket { clob_pair_id: 4 }));
    }
}
