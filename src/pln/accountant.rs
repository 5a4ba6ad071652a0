//! Average-cost PLN accounting over a list of trades.
//!
//! Everything is computed with exact integers; the only division that can
//! lose precision is the final truncation of realized PLN to whole satoshis.

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use crate::models::{Action, PlnError, PlnResult, Trade};

/// Running totals over the trades of one token.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub total_buy_quantity: i128,
    pub total_buy_cost: i128,
    pub total_sell_quantity: i128,
    pub total_sell_income: i128,
    pub current_holdings: i128,
    /// BUY/SELL trades dropped for missing or non-integer amounts.
    pub skipped: usize,
}

impl Aggregation {
    pub fn from_trades(trades: &[Trade]) -> Result<Self, PlnError> {
        let mut agg = Aggregation::default();
        for trade in trades {
            agg.add(trade)?;
        }
        Ok(agg)
    }

    fn add(&mut self, trade: &Trade) -> Result<(), PlnError> {
        let Some(action) = trade.action() else {
            return Ok(());
        };
        let (Some(quantity), Some(btc_amount)) = (trade.quantity()?, trade.btc_amount()?) else {
            debug!(id = ?trade.id, "Skipping trade with missing or malformed amounts");
            self.skipped += 1;
            return Ok(());
        };

        match action {
            Action::Buy => {
                self.total_buy_quantity = checked_add(self.total_buy_quantity, quantity)?;
                self.total_buy_cost = checked_add(self.total_buy_cost, btc_amount)?;
                self.current_holdings = checked_add(self.current_holdings, quantity)?;
            }
            Action::Sell => {
                self.total_sell_quantity = checked_add(self.total_sell_quantity, quantity)?;
                self.total_sell_income = checked_add(self.total_sell_income, btc_amount)?;
                self.current_holdings = self
                    .current_holdings
                    .checked_sub(quantity)
                    .ok_or(PlnError::Overflow("current holdings"))?;
            }
        }
        Ok(())
    }

    /// Average buy cost per token unit in satoshis, if anything was bought.
    pub fn average_cost(&self) -> Option<Decimal> {
        if self.total_buy_quantity <= 0 {
            return None;
        }
        let cost = to_decimal(self.total_buy_cost).ok()?;
        let quantity = to_decimal(self.total_buy_quantity).ok()?;
        cost.checked_div(quantity)
    }

    /// Cost of the sold units at the average buy cost, truncated to satoshis.
    pub fn cost_basis_sold(&self) -> Result<i128, PlnError> {
        if self.total_buy_quantity <= 0 {
            return Ok(0);
        }
        let numerator = self
            .total_buy_cost
            .checked_mul(self.total_sell_quantity)
            .ok_or(PlnError::Overflow("cost basis"))?;
        Ok(numerator / self.total_buy_quantity)
    }

    pub fn realized_pln(&self) -> Result<i128, PlnError> {
        if self.total_sell_quantity <= 0 {
            return Ok(0);
        }
        if self.total_buy_quantity <= 0 {
            // Position opened before the window: the whole proceeds count as profit.
            return Ok(self.total_sell_income);
        }
        // sell_income - buy_cost * sell_qty / buy_qty, over a common denominator.
        let income = self
            .total_sell_income
            .checked_mul(self.total_buy_quantity)
            .ok_or(PlnError::Overflow("realized PLN"))?;
        let basis = self
            .total_buy_cost
            .checked_mul(self.total_sell_quantity)
            .ok_or(PlnError::Overflow("realized PLN"))?;
        let numerator = income
            .checked_sub(basis)
            .ok_or(PlnError::Overflow("realized PLN"))?;
        Ok(numerator / self.total_buy_quantity)
    }

    pub fn to_result(&self) -> Result<PlnResult, PlnError> {
        let realized_pln = self.realized_pln()?;
        let unrealized_pln = 0;
        let total_pln = checked_add(realized_pln, unrealized_pln)?;

        Ok(PlnResult {
            realized_pln,
            unrealized_pln,
            total_pln,
            yield_rate: yield_rate(total_pln, self.total_buy_cost)?,
            current_value: 0,
            current_holdings: self.current_holdings,
        })
    }
}

/// PLN of a chronologically ordered trade list.
pub fn account(trades: &[Trade]) -> Result<PlnResult, PlnError> {
    if trades.is_empty() {
        return Ok(PlnResult::default());
    }
    Aggregation::from_trades(trades)?.to_result()
}

/// Same as [`account`] for an untyped JSON list of trade records.
///
/// Entries that are not objects are skipped like any other malformed record;
/// anything other than an array is rejected.
pub fn account_json(trades: &Value) -> Result<PlnResult, PlnError> {
    let Some(entries) = trades.as_array() else {
        return Err(PlnError::MalformedInput(format!(
            "expected a list of trades, got {}",
            json_kind(trades)
        )));
    };
    let mut parsed: Vec<Trade> = entries.iter().filter_map(Trade::from_entry).collect();
    parsed.sort_by_key(Trade::timestamp);
    account(&parsed)
}

/// `total_pln / total_buy_cost * 100`, or zero without any buy cost.
pub fn yield_rate(total_pln: i128, total_buy_cost: i128) -> Result<Decimal, PlnError> {
    if total_buy_cost <= 0 {
        return Ok(Decimal::ZERO);
    }
    let pln = to_decimal(total_pln)?;
    let cost = to_decimal(total_buy_cost)?;
    pln.checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.checked_div(cost))
        .map(|rate| rate.normalize())
        .ok_or(PlnError::Overflow("yield rate"))
}

fn checked_add(a: i128, b: i128) -> Result<i128, PlnError> {
    a.checked_add(b).ok_or(PlnError::Overflow("trade totals"))
}

fn to_decimal(value: i128) -> Result<Decimal, PlnError> {
    Decimal::try_from_i128_with_scale(value, 0)
        .map_err(|_| PlnError::Overflow("decimal conversion"))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
