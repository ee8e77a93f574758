//! Arbitrary-precision integer with a canonical byte encoding
//!
//! Layout: one header byte (`0x02` for non-negative, `0x03` for negative)
//! followed by the big-endian magnitude with no leading zeros. Zero is the
//! single byte `0x02`. JSON carries the value as a decimal string.

use std::fmt;
use std::io;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{Signed, ToPrimitive, Zero};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{VaultError, VaultResult};

const VERSION: u8 = 1;
const HEADER_NON_NEGATIVE: u8 = VERSION << 1;
const HEADER_NEGATIVE: u8 = (VERSION << 1) | 1;

/// Signed integer of unbounded size
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerializableInt(BigInt);

impl SerializableInt {
    pub fn new(value: BigInt) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(BigInt::zero())
    }

    pub fn big_int(&self) -> &BigInt {
        &self.0
    }

    pub fn into_big_int(self) -> BigInt {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.0.to_u64()
    }

    /// Encode into the canonical sign-prefixed big-endian form
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let (sign, magnitude) = self.0.to_bytes_be();
        let header = if sign == Sign::Minus { HEADER_NEGATIVE } else { HEADER_NON_NEGATIVE };
        let mut out = Vec::with_capacity(magnitude.len() + 1);
        out.push(header);
        if sign != Sign::NoSign {
            out.extend_from_slice(&magnitude);
        }
        out
    }

    /// Decode from the canonical form, rejecting non-canonical input
    pub fn from_canonical_bytes(bytes: &[u8]) -> VaultResult<Self> {
        let (header, magnitude) = bytes
            .split_first()
            .ok_or(VaultError::InvalidSerializedInt { reason: "empty input" })?;
        if header >> 1 != VERSION {
            return Err(VaultError::InvalidSerializedInt { reason: "unsupported version" });
        }
        if magnitude.first() == Some(&0) {
            return Err(VaultError::InvalidSerializedInt { reason: "leading zero byte" });
        }
        let negative = header & 1 == 1;
        if negative && magnitude.is_empty() {
            return Err(VaultError::InvalidSerializedInt { reason: "negative zero" });
        }

        let magnitude = BigUint::from_bytes_be(magnitude);
        let sign = if negative { Sign::Minus } else { Sign::Plus };
        Ok(Self(BigInt::from_biguint(sign, magnitude)))
    }
}

impl From<BigInt> for SerializableInt {
    fn from(value: BigInt) -> Self {
        Self(value)
    }
}

impl From<u64> for SerializableInt {
    fn from(value: u64) -> Self {
        Self(BigInt::from(value))
    }
}

impl From<i64> for SerializableInt {
    fn from(value: i64) -> Self {
        Self(BigInt::from(value))
    }
}

impl fmt::Display for SerializableInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SerializableInt {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigInt::from_str(s)
            .map(Self)
            .map_err(|_| VaultError::InvalidSerializedInt { reason: "not a decimal integer" })
    }
}

impl BorshSerialize for SerializableInt {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        BorshSerialize::serialize(&self.to_canonical_bytes(), writer)
    }
}

impl BorshDeserialize for SerializableInt {
    fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
        let bytes = Vec::<u8>::deserialize_reader(reader)?;
        Self::from_canonical_bytes(&bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    }
}

impl Serialize for SerializableInt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for SerializableInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
