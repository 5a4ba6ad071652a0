use rust_decimal::Decimal;
use serde::Serialize;

/// Raw PLN figures, all money in satoshis.
#[derive(Debug, Default, Serialize, Clone, PartialEq)]
pub struct PlnResult {
    pub realized_pln: i128,
    /// Needs a live market price; always 0 for now.
    pub unrealized_pln: i128,
    pub total_pln: i128,
    /// Percentage of the buy cost, e.g. `10` means 10%.
    pub yield_rate: Decimal,
    /// Needs a live market price; always 0 for now.
    pub current_value: i128,
    pub current_holdings: i128,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FormattedFigures {
    pub realized_pln: String,
    pub unrealized_pln: String,
    pub total_pln: String,
    pub yield_rate: String,
    pub current_value: String,
    pub current_holdings: i128,
    pub time_range: String,
}

/// Display-ready PLN record. `figures` is set on success, `error` on failure.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FormattedPln {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub figures: Option<FormattedFigures>,
}

impl FormattedPln {
    pub fn success(figures: FormattedFigures) -> Self {
        FormattedPln {
            success: true,
            error: None,
            figures: Some(figures),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        FormattedPln {
            success: false,
            error: Some(message.into()),
            figures: None,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TotalPln {
    pub total_pln: i128,
    pub yield_rate: Decimal,
    pub token_count: usize,
}
