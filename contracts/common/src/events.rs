//! Protocol Events for the Megavault
//!
//! Events are emitted by every mutating operation and can be indexed
//! off-chain. A failed operation drops the events it emitted.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::num_shares::NumShares;
use crate::types::{Address, QuotingParams, ShareScope, Side, VaultId, VaultStatus};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Vault Events (0x01 - 0x1F)
    FundsAllocated = 0x01,
    FundsRetrieved = 0x02,
    VaultParamsUpdated = 0x03,
    VaultDecommissioned = 0x04,

    // Share Events (0x20 - 0x3F)
    SharesMinted = 0x20,
    SharesRedeemed = 0x21,
    SharesLocked = 0x22,
    SharesUnlocked = 0x23,

    // Order Events (0x40 - 0x5F)
    OrderPlaced = 0x40,
    OrderCancelled = 0x41,

    // Module Events (0x60 - 0x7F)
    DefaultQuotingParamsUpdated = 0x60,
    OperatorParamsUpdated = 0x61,
}

/// Main event enum containing all megavault events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum VaultEvent {
    // ============ Vault Events ============

    /// Emitted when the main pool funds a vault
    FundsAllocated {
        vault_id: VaultId,
        quote_quantums: u64,
        block_height: u32,
    },

    /// Emitted when funds move from a vault back to the main pool
    FundsRetrieved {
        vault_id: VaultId,
        quote_quantums: u64,
        block_height: u32,
    },

    /// Emitted when a vault's status or quoting override changes
    VaultParamsUpdated {
        vault_id: VaultId,
        status: VaultStatus,
        block_height: u32,
    },

    /// Emitted when a deactivated vault's records are erased
    VaultDecommissioned {
        vault_id: VaultId,
        block_height: u32,
    },

    // ============ Share Events ============

    /// Emitted on every deposit
    SharesMinted {
        scope: ShareScope,
        owner: Address,
        deposit_quote_quantums: u64,
        minted_shares: NumShares,
        total_shares: NumShares,
        block_height: u32,
    },

    /// Emitted on every withdrawal
    SharesRedeemed {
        scope: ShareScope,
        owner: Address,
        redeemed_shares: NumShares,
        redeemed_quote_quantums: u64,
        total_shares: NumShares,
        block_height: u32,
    },

    /// Emitted when a tranche is locked
    SharesLocked {
        scope: ShareScope,
        owner: Address,
        shares: NumShares,
        unlock_block_height: u32,
        block_height: u32,
    },

    /// Emitted when locks are released, early or on maturity
    SharesUnlocked {
        scope: ShareScope,
        owner: Address,
        shares: NumShares,
        block_height: u32,
    },

    // ============ Order Events ============

    /// Emitted for every vault order placement
    OrderPlaced {
        vault_id: VaultId,
        client_id: u32,
        side: Side,
        quantums: u64,
        subticks: u64,
        block_height: u32,
    },

    /// Emitted for every vault order cancellation
    OrderCancelled {
        vault_id: VaultId,
        client_id: u32,
        block_height: u32,
    },

    // ============ Module Events ============

    /// Emitted when the module-wide quoting defaults change
    DefaultQuotingParamsUpdated {
        params: QuotingParams,
        block_height: u32,
    },

    /// Emitted when governance replaces the operator
    OperatorParamsUpdated {
        operator: Address,
        block_height: u32,
    },
}

impl VaultEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::FundsAllocated { .. } => EventType::FundsAllocated,
            Self::FundsRetrieved { .. } => EventType::FundsRetrieved,
            Self::VaultParamsUpdated { .. } => EventType::VaultParamsUpdated,
            Self::VaultDecommissioned { .. } => EventType::VaultDecommissioned,
            Self::SharesMinted { .. } => EventType::SharesMinted,
            Self::SharesRedeemed { .. } => EventType::SharesRedeemed,
            Self::SharesLocked { .. } => EventType::SharesLocked,
            Self::SharesUnlocked { .. } => EventType::SharesUnlocked,
            Self::OrderPlaced { .. } => EventType::OrderPlaced,
            Self::OrderCancelled { .. } => EventType::OrderCancelled,
            Self::DefaultQuotingParamsUpdated { .. } => EventType::DefaultQuotingParamsUpdated,
            Self::OperatorParamsUpdated { .. } => EventType::OperatorParamsUpdated,
        }
    }

    /// Get the block height when event occurred
    pub fn block_height(&self) -> u32 {
        match self {
            Self::FundsAllocated { block_height, .. }
            | Self::FundsRetrieved { block_height, .. }
            | Self::VaultParamsUpdated { block_height, .. }
            | Self::VaultDecommissioned { block_height, .. }
            | Self::SharesMinted { block_height, .. }
            | Self::SharesRedeemed { block_height, .. }
            | Self::SharesLocked { block_height, .. }
            | Self::SharesUnlocked { block_height, .. }
            | Self::OrderPlaced { block_height, .. }
            | Self::OrderCancelled { block_height, .. }
            | Self::DefaultQuotingParamsUpdated { block_height, .. }
            | Self::OperatorParamsUpdated { block_height, .. } => *block_height,
        }
    }
}

/// Event log for collecting events during execution
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<VaultEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: VaultEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    /// Take ownership of all events
    pub fn into_events(self) -> Vec<VaultEvent> {
        self.events
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&VaultEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop every event emitted after the first `len`
    pub fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type() {
        let event = VaultEvent::FundsAllocated {
            vault_id: VaultId::clob(0),
            quote_quantums: 1_000_000,
            block_height: 100,
        };

        assert_eq!(event.event_type(), EventType::FundsAllocated);
        assert_eq!(event.block_height(), 100);
    }

    #[test]
    fn test_event_serialization() {
        let event = VaultEvent::SharesMinted {
            scope: ShareScope::Megavault,
            owner: [2u8; 32],
            deposit_quote_quantums: 1_000,
            minted_shares: NumShares::from_int(1_250u64),
            total_shares: NumShares::from_int(6_250u64),
            block_height: 200,
        };

        let bytes = borsh::to_vec(&event).unwrap();
        let restored: VaultEvent = borsh::from_slice(&bytes).unwrap();

        assert_eq!(event, restored);
    }

    #[test]
    fn test_event_log() {
        let mut log = EventLog::new();

        log.emit(VaultEvent::FundsAllocated {
            vault_id: VaultId::clob(0),
            quote_quantums: 100,
            block_height: 1,
        });
        log.emit(VaultEvent::OrderCancelled {
            vault_id: VaultId::clob(0),
            client_id: 1,
            block_height: 1,
        });

        assert_eq!(log.len(), 2);
        assert!(!log.is_empty());
        assert_eq!(log.filter_by_type(EventType::OrderCancelled).len(), 1);

        log.truncate(1);
        assert_eq!(log.len(), 1);
        assert_eq!(log.events()[0].event_type(), EventType::FundsAllocated);
    }
}
