//! Withdrawal slippage and redemption value
//!
//! A redeeming owner takes a slice of every sub-vault. Leveraged vaults give
//! up part of that slice to account for the price impact of unwinding the
//! extra leverage the remaining depositors would be left with.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};

use megavault_common::{
    math, NumShares, ShareScope, SubaccountId, VaultError, VaultId, VaultResult, VaultStatus,
};

use crate::interfaces::Collaborators;
use crate::keeper::VaultKeeper;

/// Estimated share of a vault slice lost when `shares` of `total` are redeemed, in ppm
///
/// With `l = |leverage|` in ppm, `f = s / T` and `A` the skew antiderivative:
///
/// ```text
/// posterior = ceil(l / (1 - f))
/// avg_skew  = ceil((A(posterior) - A(l)) / (posterior - l))
/// estimated = ceil(spread * (1 + avg_skew) * l)
/// simple    = ceil(l * initial_margin)
/// slippage  = max(0, min(simple, estimated))
/// ```
///
/// A full withdrawal returns `simple`.
///
/// # Errors
/// `InvalidSharesToWithdraw` unless `0 < shares <= total`.
pub fn withdrawal_slippage_ppm(
    leverage: &BigRational,
    skew_factor_ppm: u32,
    spread_ppm: u32,
    initial_margin_ppm: u32,
    shares: &NumShares,
    total: &NumShares,
) -> VaultResult<BigInt> {
    if shares.is_zero() || shares > total {
        return Err(VaultError::InvalidSharesToWithdraw {
            requested: shares.to_string(),
            total: total.to_string(),
        });
    }
    let one_million = math::big_one_million();
    let leverage_ppm =
        math::truncate(&(leverage.abs() * BigRational::from_integer(one_million.clone())));
    if leverage_ppm.is_zero() {
        return Ok(BigInt::zero());
    }

    let simple = math::mul_ppm(&leverage_ppm, &BigInt::from(initial_margin_ppm), true);
    if shares == total {
        return Ok(simple);
    }

    let t = total.as_rational();
    let remaining = t - shares.as_rational();
    let posterior_ppm = math::div_ceil(
        &(&leverage_ppm * t.numer() * remaining.denom()),
        &(t.denom() * remaining.numer()),
    )?;
    let integral = math::skew_antiderivative_ppm(skew_factor_ppm, &posterior_ppm)?
        - math::skew_antiderivative_ppm(skew_factor_ppm, &leverage_ppm)?;
    let average_skew_ppm =
        math::div_ceil(&(integral * &one_million), &(&posterior_ppm - &leverage_ppm))?;
    let estimated = math::div_ceil(
        &((one_million + average_skew_ppm) * BigInt::from(spread_ppm) * &leverage_ppm),
        &math::big_one_trillion(),
    )?;

    let slippage = simple.min(estimated);
    if slippage.is_negative() {
        Ok(BigInt::zero())
    } else {
        Ok(slippage)
    }
}

/// What a megavault redemption pays out and where it comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionPlan {
    /// Taken from the main pool
    pub main_quote_quantums: BigInt,
    /// Taken from each contributing vault, in vault key order
    pub vault_quote_quantums: Vec<(VaultId, BigInt)>,
    pub total_quote_quantums: BigInt,
}

impl<E: Collaborators> VaultKeeper<E> {
    /// Slippage in ppm a megavault redemption of `shares` of `total` incurs on one vault
    pub fn vault_withdrawal_slippage_ppm(
        &self,
        vault_id: &VaultId,
        shares: &NumShares,
        total: &NumShares,
    ) -> VaultResult<BigInt> {
        let (_, quoting) = self.vault_and_quoting_params(vault_id)?;
        let market = self.vault_market(vault_id)?;
        let (leverage, _) = self.vault_leverage_and_equity(vault_id, &market)?;
        withdrawal_slippage_ppm(
            &leverage,
            quoting.skew_factor_ppm,
            math::spread_ppm(&quoting, &market.market_param),
            market.perpetual.initial_margin_ppm,
            shares,
            total,
        )
    }

    /// Value of `shares` megavault shares without moving any funds
    ///
    /// Only quoting vaults in which the megavault holds positive equity
    /// contribute, and only from that stake. Every slice is rounded down.
    pub fn plan_megavault_redemption(
        &self,
        shares: &NumShares,
        total: &NumShares,
    ) -> VaultResult<RedemptionPlan> {
        if shares.is_zero() {
            return Err(VaultError::NonPositiveShares);
        }
        if shares > total {
            return Err(VaultError::InvalidSharesToWithdraw {
                requested: shares.to_string(),
                total: total.to_string(),
            });
        }
        let fraction = shares.fraction_of(total)?;

        let main_balance = self.env.quote_balance(&SubaccountId::megavault_main());
        let main_quote_quantums = if main_balance.is_positive() {
            math::floor(&(&fraction * BigRational::from_integer(main_balance)))
        } else {
            BigInt::zero()
        };

        let mut total_quote_quantums = main_quote_quantums.clone();
        let mut vault_quote_quantums = Vec::new();
        for (vault_id, params) in self.store.all_vault_params()? {
            if params.status != VaultStatus::Quoting {
                continue;
            }
            let equity = self.megavault_stake_equity(&vault_id)?;
            if !equity.is_positive() {
                continue;
            }
            let slippage_ppm = self.vault_withdrawal_slippage_ppm(&vault_id, shares, total)?;
            let kept = BigRational::new(math::big_one_million() - slippage_ppm, math::big_one_million());
            let slice = math::floor(&(&fraction * BigRational::from_integer(equity) * kept));
            if slice.is_positive() {
                total_quote_quantums += &slice;
                vault_quote_quantums.push((vault_id, slice));
            }
        }

        Ok(RedemptionPlan { main_quote_quantums, vault_quote_quantums, total_quote_quantums })
    }

    /// Quote quantums a redemption of `shares` would currently return
    pub fn megavault_withdrawal_preview(&self, shares: &NumShares) -> VaultResult<BigInt> {
        let total = self.store.total_shares(&ShareScope::Megavault)?;
        Ok(self.plan_megavault_redemption(shares, &total)?.total_quote_quantums)
    }
}
