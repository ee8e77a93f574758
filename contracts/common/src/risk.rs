//! Margin Risk Primitive
//!
//! `Risk` aggregates the maintenance margin requirement (MMR), initial margin
//! requirement (IMR) and net collateral (NC) of an account, all in quote
//! quantums. Folding the risk of every position yields the account's equity.

use std::cmp::Ordering;

use borsh::{BorshDeserialize, BorshSerialize};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};

use crate::serializable_int::SerializableInt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Risk {
    /// Maintenance margin requirement
    pub mmr: SerializableInt,
    /// Initial margin requirement
    pub imr: SerializableInt,
    /// Net collateral
    pub nc: SerializableInt,
}

impl Risk {
    pub fn new(mmr: impl Into<BigInt>, imr: impl Into<BigInt>, nc: impl Into<BigInt>) -> Self {
        Self {
            mmr: SerializableInt::new(mmr.into()),
            imr: SerializableInt::new(imr.into()),
            nc: SerializableInt::new(nc.into()),
        }
    }

    /// Pointwise sum
    pub fn add(&self, other: &Risk) -> Risk {
        Risk {
            mmr: SerializableInt::new(self.mmr.big_int() + other.mmr.big_int()),
            imr: SerializableInt::new(self.imr.big_int() + other.imr.big_int()),
            nc: SerializableInt::new(self.nc.big_int() + other.nc.big_int()),
        }
    }

    /// Net collateral, i.e. the account's equity
    pub fn equity(&self) -> &BigInt {
        self.nc.big_int()
    }

    pub fn is_initial_collateralized(&self) -> bool {
        self.nc.big_int() >= self.imr.big_int()
    }

    pub fn is_maintenance_collateralized(&self) -> bool {
        self.nc.big_int() >= self.mmr.big_int()
    }

    pub fn is_liquidatable(&self) -> bool {
        self.nc.big_int() < self.mmr.big_int()
    }

    /// Orders two accounts by riskiness
    ///
    /// Sort key is `NC / MMR` descending, then `MMR` ascending, then `NC`
    /// ascending. A lower ratio is riskier, so `Greater` means `self` is the
    /// riskier account. Zero MMR with non-negative NC is risk-free; with
    /// negative NC it ranks below every margined account.
    pub fn cmp_riskiness(&self, other: &Risk) -> Ordering {
        let ratio = Self::ratio_key(self).cmp(&Self::ratio_key(other)).reverse();
        ratio
            .then_with(|| self.mmr.big_int().cmp(other.mmr.big_int()))
            .then_with(|| self.nc.big_int().cmp(other.nc.big_int()))
    }

    /// `compare` with an integer result in {-1, 0, 1}
    pub fn compare(&self, other: &Risk) -> i8 {
        match self.cmp_riskiness(other) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }

    fn ratio_key(risk: &Risk) -> RatioKey {
        let mmr = risk.mmr.big_int();
        let nc = risk.nc.big_int();
        if mmr.is_zero() {
            if nc.is_negative() {
                RatioKey::Bankrupt
            } else {
                RatioKey::RiskFree
            }
        } else {
            RatioKey::Ratio(nc.clone(), mmr.clone())
        }
    }
}

/// Collateralization ratio used for ranking, larger is safer
#[derive(Debug, Clone, PartialEq, Eq)]
enum RatioKey {
    Bankrupt,
    Ratio(BigInt, BigInt),
    RiskFree,
}

impl PartialOrd for RatioKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RatioKey {
    fn cmp(&self, other: &Self) -> Ordering {
        use RatioKey::*;
        match (self, other) {
            (Bankrupt, Bankrupt) | (RiskFree, RiskFree) => Ordering::Equal,
            (Bankrupt, _) | (_, RiskFree) => Ordering::Less,
            (_, Bankrupt) | (RiskFree, _) => Ordering::Greater,
            (Ratio(nc_a, mmr_a), Ratio(nc_b, mmr_b)) => {
                // Scale both sides by |mmr_a * mmr_b|
                let lhs = nc_a * mmr_b.abs() * mmr_a.signum();
                let rhs = nc_b * mmr_a.abs() * mmr_b.signum();
                lhs.cmp(&rhs)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_pointwise() {
        let a = Risk::new(10, 20, 100);
        let b = Risk::new(5, 7, -30);
        assert_eq!(a.add(&b), Risk::new(15, 27, 70));
    }

    #[test]
    fn test_predicates() {
        let risk = Risk::new(50, 100, 75);
        assert!(!risk.is_initial_collateralized());
        assert!(risk.is_maintenance_collateralized());
        assert!(!risk.is_liquidatable());

        let underwater = Risk::new(50, 100, 49);
        assert!(underwater.is_liquidatable());
        assert!(!underwater.is_maintenance_collateralized());

        let healthy = Risk::new(50, 100, 100);
        assert!(healthy.is_initial_collateralized());
    }

    #[test]
    fn test_riskiness_by_ratio() {
        // 2x covered vs 4x covered
        let risky = Risk::new(100, 0, 200);
        let safe = Risk::new(100, 0, 400);
        assert_eq!(risky.compare(&safe), 1);
        assert_eq!(safe.compare(&risky), -1);
        assert_eq!(safe.compare(&safe), 0);
    }

    #[test]
    fn test_riskiness_ties() {
        // Same ratio: larger MMR is riskier
        let small = Risk::new(100, 0, 200);
        let large = Risk::new(200, 0, 400);
        assert_eq!(large.compare(&small), 1);
    }

    #[test]
    fn test_zero_mmr() {
        let risk_free = Risk::new(0, 0, 10);
        let margined = Risk::new(1, 0, 1_000_000);
        let bankrupt = Risk::new(0, 0, -1);
        assert_eq!(risk_free.compare(&margined), -1);
        assert_eq!(bankrupt.compare(&margined), 1);
        // Both risk free: ascending NC
        assert_eq!(Risk::new(0, 0, 5).compare(&risk_free), -1);
    }

    #[test]
    fn test_equity() {
        let total = Risk::new(1, 2, 4_000).add(&Risk::new(3, 4, -1_000));
        assert_eq!(total.equity(), &BigInt::from(3_000));
    }
}
