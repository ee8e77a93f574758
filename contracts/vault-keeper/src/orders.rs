//! Quote generation and order refresh
//!
//! A vault quotes `layers` asks and bids around the oracle price. The ladder
//! widens on the side that would add to its position and tightens on the
//! side that reduces it, more so the more levered the vault is.
//!
//! Orders are returned as `[a_0, b_0, a_1, b_1, ...]`. For layer `i`:
//!
//! ```text
//! leverage_i = leverage -/+ i * order_size_pct     (ask / bid)
//! ask skew   = -sf * l_i                 (long or flat)
//!              (sf * l_i - 1)^2 - 1      (short)
//! bid skew   = -((sf * l_i + 1)^2 - 1)   (long or flat)
//!              -sf * l_i                 (short)
//! ask        = oracle * (1 + (1 + skew) * spread)
//! bid        = oracle * (1 - (1 - skew) * spread)
//! ```

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};

use megavault_common::{
    flip_client_id, math, vault_client_id, ClobPairStatus, Order, OrderId, QuotingParams, Side,
    TimeInForce, VaultError, VaultEvent, VaultId, VaultResult, VaultStatus, VaultType,
};

use crate::equity::VaultMarket;
use crate::interfaces::Collaborators;
use crate::keeper::VaultKeeper;

/// Everything needed to price one vault's ladder
#[derive(Debug, Clone)]
pub struct LadderInputs<'a> {
    pub vault_id: VaultId,
    pub status: VaultStatus,
    pub quoting: &'a QuotingParams,
    pub market: &'a VaultMarket,
    pub leverage: &'a BigRational,
    pub equity: &'a BigInt,
    /// Signed base quantums held, used to cap close-only orders
    pub inventory: &'a BigInt,
    pub block_time: u32,
}

/// Price and size the ladder of one vault
///
/// Returns no orders when the order size rounds down to zero or when a
/// close-only vault has nothing to close.
///
/// # Errors
/// `InvalidOrderSize` if the order size does not fit in u64.
pub fn build_ladder(inputs: &LadderInputs<'_>) -> VaultResult<Vec<Order>> {
    let quoting = inputs.quoting;
    let market = inputs.market;
    let clob_pair = &market.clob_pair;
    let atomic_resolution = market.perpetual.atomic_resolution;
    let one_million = math::big_one_million();

    let leverage_ppm = math::rational_to_ppm_ceil(inputs.leverage)?;

    // 1. Order size in base quantums, truncated to a whole step
    let order_size_pct_ppm = BigInt::from(quoting.order_size_pct_ppm);
    let order_size = math::quote_to_base_quantums(
        &(inputs.equity * &order_size_pct_ppm),
        atomic_resolution,
        &market.market_price,
    )? / &one_million;
    let step = BigInt::from(clob_pair.step_base_quantums);
    if step.is_zero() {
        return Err(VaultError::DivisionByZero);
    }
    let order_size = &order_size / &step * &step;
    if order_size.is_zero() {
        return Ok(Vec::new());
    }
    let quantums = order_size
        .to_u64()
        .ok_or_else(|| VaultError::InvalidOrderSize { size: order_size.clone() })?;

    // 2. Shared pricing inputs
    let spread_ppm = BigInt::from(math::spread_ppm(quoting, &market.market_param));
    let oracle_subticks =
        math::price_to_subticks(&market.market_price, clob_pair, atomic_resolution);
    let skew_factor_ppm = BigInt::from(quoting.skew_factor_ppm);
    let subticks_per_tick = BigInt::from(clob_pair.subticks_per_tick);
    let min_subticks = u64::from(clob_pair.subticks_per_tick);
    let max_subticks = u64::MAX - u64::MAX % min_subticks.max(1);
    let good_til_block_time = inputs
        .block_time
        .checked_add(quoting.order_expiration_seconds)
        .ok_or(VaultError::Overflow)?;

    let construct = |side: Side, layer: u32| -> VaultResult<Order> {
        let is_sell = side == Side::Sell;

        // Leverage after this layer fills
        let mut leverage_i = BigInt::from(layer) * &order_size_pct_ppm;
        if is_sell {
            leverage_i = -leverage_i;
        }
        leverage_i += &leverage_ppm;

        let scaled = math::mul_ppm(&leverage_i, &skew_factor_ppm, true);
        let skew = match (leverage_ppm.is_negative(), side) {
            (true, Side::Sell) => {
                let shifted = scaled - &one_million;
                math::mul_ppm(&shifted, &shifted, true) - &one_million
            }
            (true, Side::Buy) | (false, Side::Sell) => -scaled,
            (false, Side::Buy) => {
                let shifted = scaled + &one_million;
                -(math::mul_ppm(&shifted, &shifted, true) - &one_million)
            }
        };

        // Division by one million is deferred until after the oracle multiply
        let skewed_spread = if is_sell { &one_million + skew } else { skew - &one_million };
        let factor = skewed_spread * &spread_ppm + math::big_one_trillion();
        let numerator = math::mul_ppm(oracle_subticks.numer(), &factor, is_sell);
        let divisor = &one_million * oracle_subticks.denom();
        let subticks = if is_sell {
            math::div_ceil(&numerator, &divisor)?
        } else {
            &numerator / &divisor
        };
        let subticks = math::round_to_multiple(&subticks, &subticks_per_tick, is_sell)?;
        let subticks = math::clamp_to_u64(&subticks, min_subticks, max_subticks);

        // Orders that move inventory away from flat must not take liquidity
        let time_in_force = if (is_sell && !leverage_ppm.is_positive())
            || (!is_sell && !leverage_ppm.is_negative())
        {
            TimeInForce::PostOnly
        } else {
            TimeInForce::Unspecified
        };

        let layer = u8::try_from(layer)
            .map_err(|_| VaultError::InvalidQuotingParams { reason: "layers exceeds 255" })?;
        Ok(Order {
            order_id: inputs.vault_id.order_id(vault_client_id(side, layer)),
            side,
            quantums,
            subticks,
            good_til_block_time,
            time_in_force,
        })
    };

    let mut orders = Vec::with_capacity(2 * quoting.layers as usize);
    for layer in 0..quoting.layers {
        orders.push(construct(Side::Sell, layer)?);
        orders.push(construct(Side::Buy, layer)?);
    }

    if inputs.status != VaultStatus::CloseOnly {
        return Ok(orders);
    }

    // 3. Close-only keeps the reducing side, capped at the open position
    let close_total = inputs.inventory.abs() / &step * &step;
    let mut remaining = close_total
        .to_u64()
        .ok_or_else(|| VaultError::InvalidOrderSize { size: close_total.clone() })?;
    let reducing_side = if inputs.leverage.is_negative() { Side::Buy } else { Side::Sell };
    let mut reducing = Vec::new();
    for mut order in orders.into_iter().filter(|order| order.side == reducing_side) {
        if remaining == 0 {
            break;
        }
        order.quantums = order.quantums.min(remaining);
        remaining -= order.quantums;
        reducing.push(order);
    }
    Ok(reducing)
}

fn is_same_quote(resting: &Order, wanted: &Order) -> bool {
    resting.quantums == wanted.quantums
        && resting.subticks == wanted.subticks
        && resting.side == wanted.side
}

impl<E: Collaborators> VaultKeeper<E> {
    /// Orders the vault should currently have resting
    ///
    /// Missing or settling clob pairs and non-quoting statuses yield no orders.
    ///
    /// # Errors
    /// - `ZeroMarketPrice` if the oracle has no price yet
    /// - `NonPositiveEquity` if the vault has no equity
    pub fn vault_clob_orders(&self, vault_id: &VaultId) -> VaultResult<Vec<Order>> {
        let (params, quoting) = self.vault_and_quoting_params(vault_id)?;

        let clob_pair = match self.env.clob_pair(vault_id.clob_pair_id()) {
            Some(clob_pair) if clob_pair.status != ClobPairStatus::FinalSettlement => clob_pair,
            _ => return Ok(Vec::new()),
        };
        let perpetual = self.env.perpetual(clob_pair.perpetual_id()?)?;
        let market_param = self.env.market_param(perpetual.market_id)?;
        let market_price = self.env.market_price(perpetual.market_id)?;
        if market_price.price == 0 {
            return Err(VaultError::ZeroMarketPrice { market_id: perpetual.market_id });
        }
        let market = VaultMarket { clob_pair, perpetual, market_param, market_price };

        let (leverage, equity) = self.vault_leverage_and_equity(vault_id, &market)?;
        match params.status {
            VaultStatus::Quoting => {}
            VaultStatus::CloseOnly if !leverage.is_zero() => {}
            _ => return Ok(Vec::new()),
        }
        let inventory = self
            .env
            .perpetual_position(&vault_id.to_subaccount_id(), market.perpetual.id);

        build_ladder(&LadderInputs {
            vault_id: *vault_id,
            status: params.status,
            quoting: &quoting,
            market: &market,
            leverage: &leverage,
            equity: &equity,
            inventory: &inventory,
            block_time: self.block.time,
        })
    }

    /// Bring a vault's resting orders in line with its current ladder
    ///
    /// Slots whose resting order already matches are left alone. Changed,
    /// filled, or expired slots get a fresh order under the flipped client
    /// id, and slots beyond the new ladder are cancelled.
    pub fn refresh_vault_orders(&mut self, vault_id: &VaultId) -> VaultResult<()> {
        self.atomically(|k| k.refresh_vault_orders_unchecked(vault_id))
    }

    fn refresh_vault_orders_unchecked(&mut self, vault_id: &VaultId) -> VaultResult<()> {
        let recent = self.store.most_recent_client_ids(vault_id)?;
        let orders = self.vault_clob_orders(vault_id)?;
        let (_, quoting) = self.vault_and_quoting_params(vault_id)?;
        let cancel_good_til = self
            .block
            .time
            .checked_add(quoting.order_expiration_seconds)
            .ok_or(VaultError::Overflow)?;

        let mut client_ids = Vec::with_capacity(orders.len());
        for (i, mut order) in orders.into_iter().enumerate() {
            if let Some(&old_client_id) = recent.get(i) {
                let old_order_id = vault_id.order_id(old_client_id);
                match self.live_order(&old_order_id) {
                    Some(resting) if is_same_quote(&resting, &order) => {
                        client_ids.push(old_client_id);
                        continue;
                    }
                    Some(_) => {
                        order.order_id.client_id = flip_client_id(old_client_id);
                        self.cancel_vault_order(vault_id, &old_order_id, cancel_good_til)?;
                    }
                    None => order.order_id.client_id = flip_client_id(old_client_id),
                }
            }
            self.place_vault_order(vault_id, &order)?;
            client_ids.push(order.order_id.client_id);
        }

        for &stale in recent.iter().skip(client_ids.len()) {
            let order_id = vault_id.order_id(stale);
            if self.env.resting_order(&order_id).is_some() {
                self.cancel_vault_order(vault_id, &order_id, cancel_good_til)?;
            }
        }

        self.store.set_most_recent_client_ids(vault_id, &client_ids)
    }

    /// Refresh every vault that should be quoting
    ///
    /// A vault that fails is logged and skipped; its changes are rolled back.
    /// Returns the number of vaults that were active.
    pub fn refresh_all_vault_orders(&mut self) -> VaultResult<usize> {
        let default_quoting = self.store.default_quoting_params()?;
        let mut active = 0usize;

        for (vault_id, params) in self.store.all_vault_params()? {
            if !params.status.places_orders() {
                continue;
            }

            // Vaults without any position wait for enough quote balance
            let quoting = params.quoting_params.as_ref().unwrap_or(&default_quoting);
            let subaccount = vault_id.to_subaccount_id();
            if !self.env.has_perpetual_positions(&subaccount)
                && &self.env.quote_balance(&subaccount)
                    < quoting.activation_threshold_quote_quantums.big_int()
            {
                continue;
            }
            active += 1;

            if vault_id.vault_type != VaultType::Clob {
                log::error!("failed to refresh vault {}: unknown vault type", vault_id);
                continue;
            }
            if let Err(err) = self.refresh_vault_orders(&vault_id) {
                log::error!("failed to refresh orders of vault {}: {} ({})", vault_id, err, err.code());
            }
        }

        log::debug!("refreshed orders, {} active vaults", active);
        Ok(active)
    }

    /// Resting order under `order_id` that has not reached its expiry
    fn live_order(&self, order_id: &OrderId) -> Option<Order> {
        self.env
            .resting_order(order_id)
            .filter(|order| order.good_til_block_time > self.block.time)
    }

    fn place_vault_order(&mut self, vault_id: &VaultId, order: &Order) -> VaultResult<()> {
        self.env.place_order(order)?;
        self.emit(VaultEvent::OrderPlaced {
            vault_id: *vault_id,
            client_id: order.order_id.client_id,
            side: order.side,
            quantums: order.quantums,
            subticks: order.subticks,
            block_height: self.block.height,
        });
        Ok(())
    }

    fn cancel_vault_order(
        &mut self,
        vault_id: &VaultId,
        order_id: &OrderId,
        good_til_block_time: u32,
    ) -> VaultResult<()> {
        self.env.cancel_order(order_id, good_til_block_time)?;
        self.emit(VaultEvent::OrderCancelled {
            vault_id: *vault_id,
            client_id: order_id.client_id,
            block_height: self.block.height,
        });
        Ok(())
    }
}
