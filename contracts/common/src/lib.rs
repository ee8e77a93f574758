//! Megavault Common Library
//!
//! Shared types, exact arithmetic, and errors for the megavault protocol.
//!
//! The megavault pools depositor capital and allocates it across sub-vaults,
//! each of which quotes a skewed bid/ask ladder on one perpetual market.
//! Depositors hold rational shares of the pooled equity.
//!
//! ## Modules
//!
//! - **Risk**: margin arithmetic (MMR, IMR, net collateral) and riskiness ordering
//! - **NumShares**: exact non-negative rational share amounts
//! - **SerializableInt**: big integers with a canonical sign-prefixed encoding
//! - **Math**: ppm rounding helpers, unit conversions, and the skew antiderivative
//! - **Types**: vault identity, params, share records, market and order structures
//! - **Events**: audit trail emitted by every mutating operation
//! - **Access Control**: governance and operator authorities
//!
//! ## Determinism
//!
//! Nothing in this crate uses floating point, hash iteration order, or the
//! wall clock. Every division states its rounding direction.

pub mod constants;
pub mod errors;
pub mod serializable_int;
pub mod num_shares;
pub mod types;
pub mod math;
pub mod risk;
pub mod events;
pub mod access_control;
pub mod validation;


pub use constants::*;
pub use errors::*;
pub use serializable_int::SerializableInt;
pub use num_shares::NumShares;
pub use types::*;
pub use risk::Risk;
pub use events::*;
pub use access_control::*;
