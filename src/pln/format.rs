use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{FormattedFigures, PlnResult};

pub const SATS_PER_BTC: i128 = 100_000_000;

/// `+1.00000000 BTC` style rendering of a satoshi amount.
pub fn signed_btc(sats: i128) -> String {
    let sign = if sats < 0 { '-' } else { '+' };
    format!("{}{}", sign, unsigned_btc(sats.unsigned_abs()))
}

pub fn btc(sats: i128) -> String {
    if sats < 0 {
        format!("-{}", unsigned_btc(sats.unsigned_abs()))
    } else {
        unsigned_btc(sats.unsigned_abs())
    }
}

fn unsigned_btc(sats: u128) -> String {
    let per_btc = SATS_PER_BTC as u128;
    format!("{}.{:08} BTC", sats / per_btc, sats % per_btc)
}

/// Yield rate as a signed percentage with two decimals, e.g. `+10.00%`.
pub fn percentage(rate: Decimal) -> String {
    let rounded = rate.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        '-'
    } else {
        '+'
    };
    let mut magnitude = rounded.abs();
    magnitude.rescale(2);
    format!("{}{}%", sign, magnitude)
}

pub fn time_range(days: u32) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}

pub fn figures(result: &PlnResult, days: u32) -> FormattedFigures {
    FormattedFigures {
        realized_pln: signed_btc(result.realized_pln),
        unrealized_pln: signed_btc(result.unrealized_pln),
        total_pln: signed_btc(result.total_pln),
        yield_rate: percentage(result.yield_rate),
        current_value: btc(result.current_value),
        current_holdings: result.current_holdings,
        time_range: time_range(days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_btc() {
        assert_eq!(signed_btc(100_000_000), "+1.00000000 BTC");
        assert_eq!(signed_btc(0), "+0.00000000 BTC");
        assert_eq!(signed_btc(100), "+0.00000100 BTC");
        assert_eq!(signed_btc(-250_000_001), "-2.50000001 BTC");
        assert_eq!(signed_btc(i128::MIN + 1).chars().next(), Some('-'));
    }

    #[test]
    fn test_unsigned_btc() {
        assert_eq!(btc(0), "0.00000000 BTC");
        assert_eq!(btc(123_456_789), "1.23456789 BTC");
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(Decimal::from(10)), "+10.00%");
        assert_eq!(percentage(Decimal::ZERO), "+0.00%");
        assert_eq!(percentage(Decimal::new(-33333, 3)), "-33.33%");
        assert_eq!(percentage(Decimal::new(12345, 4)), "+1.23%");
        assert_eq!(percentage(Decimal::new(-1, 3)), "+0.00%");
    }

    #[test]
    fn test_figures() {
        let result = PlnResult {
            realized_pln: 100,
            total_pln: 100,
            yield_rate: Decimal::from(10),
            current_holdings: 50,
            ..PlnResult::default()
        };
        let figures = figures(&result, 30);
        assert_eq!(figures.realized_pln, "+0.00000100 BTC");
        assert_eq!(figures.unrealized_pln, "+0.00000000 BTC");
        assert_eq!(figures.total_pln, "+0.00000100 BTC");
        assert_eq!(figures.yield_rate, "+10.00%");
        assert_eq!(figures.current_value, "0.00000000 BTC");
        assert_eq!(figures.current_holdings, 50);
        assert_eq!(figures.time_range, "30 days");
        assert_eq!(time_range(1), "1 day");
    }
}
