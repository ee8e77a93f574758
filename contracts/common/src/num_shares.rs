//! Exact share amounts
//!
//! Shares are non-negative rationals so repeated mint and redeem cycles never
//! accumulate rounding bias. The denominator is never zero.

use std::cmp::Ordering;
use std::fmt;
use std::io;

use borsh::{BorshDeserialize, BorshSerialize};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use serde::{Deserialize, Serialize};

use crate::errors::{VaultError, VaultResult};
use crate::math;
use crate::serializable_int::SerializableInt;

/// Wire form of `NumShares`
#[derive(Debug, Clone, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
struct RawNumShares {
    numerator: SerializableInt,
    denominator: SerializableInt,
}

/// Non-negative rational share amount
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawNumShares", into = "RawNumShares")]
pub struct NumShares(BigRational);

impl NumShares {
    pub fn zero() -> Self {
        Self(BigRational::zero())
    }

    /// Whole number of shares
    pub fn from_int(count: impl Into<BigInt>) -> Self {
        let count = count.into();
        if count.is_negative() {
            return Self::zero();
        }
        Self(BigRational::from_integer(count))
    }

    /// Build from a numerator/denominator pair
    ///
    /// # Errors
    /// `InvalidNumShares` if the denominator is zero or the value is negative.
    pub fn from_parts(numerator: BigInt, denominator: BigInt) -> VaultResult<Self> {
        if denominator.is_zero() {
            return Err(VaultError::InvalidNumShares { reason: "denominator is zero" });
        }
        Self::from_rational(BigRational::new(numerator, denominator))
    }

    pub fn from_rational(value: BigRational) -> VaultResult<Self> {
        if value.is_negative() {
            return Err(VaultError::InvalidNumShares { reason: "shares are negative" });
        }
        Ok(Self(value))
    }

    pub fn as_rational(&self) -> &BigRational {
        &self.0
    }

    pub fn numerator(&self) -> &BigInt {
        self.0.numer()
    }

    pub fn denominator(&self) -> &BigInt {
        self.0.denom()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn add(&self, other: &NumShares) -> NumShares {
        Self(&self.0 + &other.0)
    }

    /// Subtraction that refuses to go negative
    pub fn checked_sub(&self, other: &NumShares) -> Option<NumShares> {
        if other.0 > self.0 {
            return None;
        }
        Some(Self(&self.0 - &other.0))
    }

    /// Whole shares, rounded down
    pub fn floor(&self) -> BigInt {
        math::floor(&self.0)
    }

    /// `self / total`, the fraction of a pool these shares represent
    pub fn fraction_of(&self, total: &NumShares) -> VaultResult<BigRational> {
        if total.is_zero() {
            return Err(VaultError::DivisionByZero);
        }
        Ok(&self.0 / &total.0)
    }
}

impl Default for NumShares {
    fn default() -> Self {
        Self::zero()
    }
}

impl PartialOrd for NumShares {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NumShares {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for NumShares {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.denom().is_one() {
            write!(f, "{}", self.0.numer())
        } else {
            write!(f, "{}/{}", self.0.numer(), self.0.denom())
        }
    }
}

impl From<NumShares> for RawNumShares {
    fn from(shares: NumShares) -> Self {
        let (numerator, denominator) = shares.0.into_raw();
        Self {
            numerator: SerializableInt::new(numerator),
            denominator: SerializableInt::new(denominator),
        }
    }
}

impl TryFrom<RawNumShares> for NumShares {
    type Error = VaultError;

    fn try_from(raw: RawNumShares) -> Result<Self, Self::Error> {
        NumShares::from_parts(raw.numerator.into_big_int(), raw.denominator.into_big_int())
    }
}

impl BorshSerialize for NumShares {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        BorshSerialize::serialize(&RawNumShares::from(self.clone()), writer)
    }
}

impl BorshDeserialize for NumShares {
    fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
        let raw = RawNumShares::deserialize_reader(reader)?;
        NumShares::try_from(raw)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    }
}
