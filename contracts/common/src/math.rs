//! Mathematical Utilities for the Megavault Protocol
//!
//! Exact integer and rational helpers. Nothing here touches floating point:
//! every rounding direction is explicit so all nodes agree bit for bit.

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::constants::{assets::QUOTE_ATOMIC_RESOLUTION, precision::ONE_MILLION};
use crate::errors::{VaultError, VaultResult};
use crate::types::{ClobPair, MarketParam, MarketPrice, QuotingParams};

/// 1_000_000 as a big integer
pub fn big_one_million() -> BigInt {
    BigInt::from(ONE_MILLION)
}

/// 1_000_000_000_000 as a big integer
pub fn big_one_trillion() -> BigInt {
    BigInt::from(crate::constants::precision::ONE_TRILLION)
}

/// Division rounded toward positive infinity
pub fn div_ceil(numerator: &BigInt, denominator: &BigInt) -> VaultResult<BigInt> {
    if denominator.is_zero() {
        return Err(VaultError::DivisionByZero);
    }
    let (quotient, remainder) = numerator.div_rem(denominator);
    if !remainder.is_zero() && numerator.is_negative() == denominator.is_negative() {
        Ok(quotient + 1)
    } else {
        Ok(quotient)
    }
}

/// Division rounded toward negative infinity
pub fn div_floor(numerator: &BigInt, denominator: &BigInt) -> VaultResult<BigInt> {
    if denominator.is_zero() {
        return Err(VaultError::DivisionByZero);
    }
    Ok(numerator.div_floor(denominator))
}

/// Multiply by a parts-per-million factor
///
/// # Arguments
/// * `value` - Value to scale
/// * `ppm` - Factor where 1_000_000 is 1.0
/// * `round_up` - Round toward positive infinity instead of negative infinity
pub fn mul_ppm(value: &BigInt, ppm: &BigInt, round_up: bool) -> BigInt {
    let product = value * ppm;
    let one_million = big_one_million();
    if round_up {
        // one_million is never zero
        let (quotient, remainder) = product.div_rem(&one_million);
        if !remainder.is_zero() && product.is_positive() {
            quotient + 1
        } else {
            quotient
        }
    } else {
        product.div_floor(&one_million)
    }
}

/// Round to a multiple of `multiple`, up or down
pub fn round_to_multiple(value: &BigInt, multiple: &BigInt, round_up: bool) -> VaultResult<BigInt> {
    let steps = if round_up {
        div_ceil(value, multiple)?
    } else {
        div_floor(value, multiple)?
    };
    Ok(steps * multiple)
}

/// Clamp a big integer into `[lower, upper]` and narrow it to u64
pub fn clamp_to_u64(value: &BigInt, lower: u64, upper: u64) -> u64 {
    if value <= &BigInt::from(lower) {
        return lower;
    }
    if value >= &BigInt::from(upper) {
        return upper;
    }
    // Strictly between two u64 values
    value.to_u64().unwrap_or(upper)
}

/// `ceil(rational * 1_000_000)`
pub fn rational_to_ppm_ceil(value: &BigRational) -> VaultResult<BigInt> {
    div_ceil(&(value.numer() * big_one_million()), value.denom())
}

/// `numerator / ONE_MILLION` as an exact rational
pub fn ppm_to_rational(ppm: u32) -> BigRational {
    BigRational::new(BigInt::from(ppm), big_one_million())
}

/// `10^exponent` as an exact rational (exponent may be negative)
pub fn pow10(exponent: i32) -> BigRational {
    let magnitude = num_traits::pow(BigInt::from(10u8), exponent.unsigned_abs() as usize);
    if exponent >= 0 {
        BigRational::from_integer(magnitude)
    } else {
        BigRational::new(BigInt::one(), magnitude)
    }
}

/// Integer part of a rational, truncated toward zero
pub fn truncate(value: &BigRational) -> BigInt {
    value.numer() / value.denom()
}

/// Integer part of a rational, rounded toward negative infinity
pub fn floor(value: &BigRational) -> BigInt {
    value.numer().div_floor(value.denom())
}

// ============ Unit Conversions ============

/// Value in quote quantums of a base position, as an exact rational
///
/// quote = base * price * 10^(price_exponent + atomic_resolution - quote_atomic_resolution)
pub fn base_to_quote_quantums(
    base_quantums: &BigInt,
    atomic_resolution: i32,
    price: &MarketPrice,
) -> BigRational {
    let exponent = price.exponent + atomic_resolution - QUOTE_ATOMIC_RESOLUTION;
    BigRational::from_integer(base_quantums * BigInt::from(price.price)) * pow10(exponent)
}

/// Base quantums purchasable with `quote_quantums`, truncated toward zero
pub fn quote_to_base_quantums(
    quote_quantums: &BigInt,
    atomic_resolution: i32,
    price: &MarketPrice,
) -> VaultResult<BigInt> {
    if price.price == 0 {
        return Err(VaultError::DivisionByZero);
    }
    let exponent = QUOTE_ATOMIC_RESOLUTION - price.exponent - atomic_resolution;
    let base = BigRational::from_integer(quote_quantums.clone()) * pow10(exponent)
        / BigRational::from_integer(BigInt::from(price.price));
    Ok(truncate(&base))
}

/// Oracle price expressed in subticks of `clob_pair`
pub fn price_to_subticks(
    price: &MarketPrice,
    clob_pair: &ClobPair,
    base_atomic_resolution: i32,
) -> BigRational {
    let exponent = price.exponent - clob_pair.quantum_conversion_exponent + base_atomic_resolution
        - QUOTE_ATOMIC_RESOLUTION;
    BigRational::from_integer(BigInt::from(price.price)) * pow10(exponent)
}

// ============ Quoting Math ============

/// Quoting spread: `max(spread_min, spread_buffer + min_price_change)`
pub fn spread_ppm(params: &QuotingParams, market: &MarketParam) -> u32 {
    let buffered = params
        .spread_buffer_ppm
        .saturating_add(market.min_price_change_ppm);
    params.spread_min_ppm.max(buffered)
}

/// Antiderivative of the skew curve in ppm, `A(k) = s * k^2 + s^2 * k^3 / 3`
///
/// Each term is rounded up on its own before the two are added.
///
/// # Arguments
/// * `skew_factor_ppm` - Skew factor where 1_000_000 is 1.0
/// * `leverage_ppm` - Leverage where 1_000_000 is 1.0
pub fn skew_antiderivative_ppm(skew_factor_ppm: u32, leverage_ppm: &BigInt) -> VaultResult<BigInt> {
    let skew = BigInt::from(skew_factor_ppm);
    let leverage_sq = leverage_ppm * leverage_ppm;

    // ppm^3 / ppm^2
    let quadratic = div_ceil(&(&skew * &leverage_sq), &big_one_trillion())?;
    // ppm^5 / (3 * ppm^4)
    let cubic_denominator = big_one_trillion() * big_one_trillion() * BigInt::from(3u8);
    let cubic = div_ceil(&(&skew * &skew * &leverage_sq * leverage_ppm), &cubic_denominator)?;
    Ok(quadratic + cubic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClobPairStatus, MarketKind};

    fn big(value: i64) -> BigInt {
        BigInt::from(value)
    }

    #[test]
    fn test_div_ceil() {
        assert_eq!(div_ceil(&big(7), &big(2)).unwrap(), big(4));
        assert_eq!(div_ceil(&big(-7), &big(2)).unwrap(), big(-3));
        assert_eq!(div_ceil(&big(-7), &big(-2)).unwrap(), big(4));
        assert_eq!(div_ceil(&big(6), &big(2)).unwrap(), big(3));
        assert_eq!(div_ceil(&big(1), &big(0)), Err(VaultError::DivisionByZero));
    }

    #[test]
    fn test_div_floor() {
        assert_eq!(div_floor(&big(7), &big(2)).unwrap(), big(3));
        assert_eq!(div_floor(&big(-7), &big(2)).unwrap(), big(-4));
    }

    #[test]
    fn test_mul_ppm() {
        assert_eq!(mul_ppm(&big(3), &big(500_000), false), big(1));
        assert_eq!(mul_ppm(&big(3), &big(500_000), true), big(2));
        assert_eq!(mul_ppm(&big(-3), &big(500_000), false), big(-2));
        assert_eq!(mul_ppm(&big(-3), &big(500_000), true), big(-1));
        assert_eq!(mul_ppm(&big(2_000_000), &big(2_000_000), true), big(4_000_000));
    }

    #[test]
    fn test_round_to_multiple() {
        assert_eq!(round_to_multiple(&big(105), &big(10), true).unwrap(), big(110));
        assert_eq!(round_to_multiple(&big(105), &big(10), false).unwrap(), big(100));
        assert_eq!(round_to_multiple(&big(110), &big(10), true).unwrap(), big(110));
        assert_eq!(round_to_multiple(&big(-5), &big(10), false).unwrap(), big(-10));
    }

    #[test]
    fn test_clamp_to_u64() {
        assert_eq!(clamp_to_u64(&big(-5), 10, 100), 10);
        assert_eq!(clamp_to_u64(&big(50), 10, 100), 50);
        let huge = BigInt::from(u64::MAX) * 3;
        assert_eq!(clamp_to_u64(&huge, 10, 100), 100);
    }

    #[test]
    fn test_rational_to_ppm_ceil() {
        let third = BigRational::new(big(1), big(3));
        assert_eq!(rational_to_ppm_ceil(&third).unwrap(), big(333_334));
        assert_eq!(rational_to_ppm_ceil(&(-third)).unwrap(), big(-333_333));
    }

    #[test]
    fn test_skew_antiderivative_ppm() {
        assert_eq!(skew_antiderivative_ppm(500_000, &big(800_000)).unwrap(), big(362_667));
        assert_eq!(skew_antiderivative_ppm(0, &big(800_000)).unwrap(), big(0));
        assert_eq!(skew_antiderivative_ppm(1_000_000, &big(0)).unwrap(), big(0));
        // 2 * 1 + 4 * 1 / 3 = 3.333...
        assert_eq!(skew_antiderivative_ppm(2_000_000, &big(1_000_000)).unwrap(), big(3_333_334));
        // 2 * 1.500002^2 and 4 * 1.500002^3 / 3 round up separately
        assert_eq!(skew_antiderivative_ppm(2_000_000, &big(1_500_002)).unwrap(), big(9_000_032));
    }

    #[test]
    fn test_spread_ppm() {
        let params = QuotingParams::default();
        let quiet = MarketParam { id: 0, min_price_change_ppm: 1_000 };
        let volatile = MarketParam { id: 0, min_price_change_ppm: 20_000 };
        assert_eq!(spread_ppm(&params, &quiet), 10_000);
        assert_eq!(spread_ppm(&params, &volatile), 21_500);
    }

    #[test]
    fn test_base_quote_conversions() {
        // BTC: atomic resolution -10, price 50_000 with exponent 0
        let price = MarketPrice { price: 50_000, exponent: 0 };
        let notional = base_to_quote_quantums(&big(10_000_000_000), -10, &price);
        assert_eq!(notional, BigRational::from_integer(big(50_000_000_000)));

        let base = quote_to_base_quantums(&big(50_000_000_000), -10, &price).unwrap();
        assert_eq!(base, big(10_000_000_000));

        let zero_price = MarketPrice { price: 0, exponent: 0 };
        assert!(quote_to_base_quantums(&big(1), -10, &zero_price).is_err());
    }

    #[test]
    fn test_price_to_subticks() {
        let price = MarketPrice { price: 5_000_000_000, exponent: -5 };
        let clob_pair = ClobPair {
            id: 0,
            market: MarketKind::Perpetual { perpetual_id: 0 },
            step_base_quantums: 10,
            subticks_per_tick: 100,
            quantum_conversion_exponent: -9,
            status: ClobPairStatus::Active,
        };
        // 5e9 * 10^(-5 + 9 - 10 + 6) = 5e9
        let subticks = price_to_subticks(&price, &clob_pair, -10);
        assert_eq!(subticks, BigRational::from_integer(big(5_000_000_000)));
    }
}
