pub mod accountant;
pub mod fetcher;
pub mod format;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};

use crate::{
    external::External,
    models::{FormattedPln, PlnError, PlnResult, TotalPln},
    Config,
};
use accountant::Aggregation;
use fetcher::{ActivityFetcher, FetchStatus, TimeWindow};

/// Result of one token PLN computation together with how it was obtained.
#[derive(Debug)]
pub struct PlnReport {
    pub result: PlnResult,
    pub aggregation: Aggregation,
    pub window: TimeWindow,
    pub trade_count: usize,
    pub pages_fetched: u32,
    pub status: FetchStatus,
}

pub struct PlnCalculator {
    external: External,
    config: Config,
}

impl PlnCalculator {
    pub fn new(config: Config) -> Result<Self, PlnError> {
        let external = External::new(&config)?;
        Ok(PlnCalculator { external, config })
    }

    pub fn external(&self) -> &External {
        &self.external
    }

    /// Realized PLN of `token_id` for `user_id` over the last `days` days.
    ///
    /// Fetch failures never make this fail: a failed first page reads as "no
    /// trades" and a later failure as the trades gathered so far. Check
    /// [`PlnReport::status`] to tell these apart.
    #[instrument(skip(self))]
    pub async fn compute_token_pln(
        &self,
        user_id: &str,
        token_id: &str,
        days: u32,
    ) -> Result<PlnReport, PlnError> {
        info!(
            "Starting PLN calculation for user {}, token {} (last {} days)",
            user_id, token_id, days
        );
        let window = TimeWindow::last_days(days, Utc::now());
        let outcome = ActivityFetcher::new(&self.external, &self.config)
            .fetch(user_id, token_id, window)
            .await;
        if !outcome.is_complete() {
            warn!(
                "Activity for user {} is incomplete after {} page(s), PLN covers partial data",
                user_id, outcome.pages_fetched
            );
        }

        let aggregation = Aggregation::from_trades(&outcome.trades)?;
        let result = if outcome.trades.is_empty() {
            PlnResult::default()
        } else {
            aggregation.to_result()?
        };

        Ok(PlnReport {
            result,
            aggregation,
            window,
            trade_count: outcome.trades.len(),
            pages_fetched: outcome.pages_fetched,
            status: outcome.status,
        })
    }

    /// Display-ready variant of [`compute_token_pln`](Self::compute_token_pln).
    pub async fn format_token_pln(&self, user_id: &str, token_id: &str, days: u32) -> FormattedPln {
        match self.compute_token_pln(user_id, token_id, days).await {
            Ok(report) => FormattedPln::success(format::figures(&report.result, days)),
            Err(e) => {
                error!("Error formatting token PLN results: {}", e);
                FormattedPln::failure(e.to_string())
            }
        }
    }

    /// PLN across all tokens of a user.
    ///
    /// Placeholder figures until the API exposes a user's token list.
    pub fn calculate_total_pln(&self, user_id: &str, days: u32, top_n: usize) -> TotalPln {
        info!(
            "Starting total PLN calculation for user {} (last {} days)",
            user_id, days
        );
        TotalPln {
            total_pln: 1_000_000,
            yield_rate: Decimal::new(52, 1),
            token_count: top_n,
        }
    }
}
