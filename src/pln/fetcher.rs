use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    external::External,
    models::{PlnError, Trade},
    Config,
};

/// Closed interval of epoch seconds the activity feed is queried for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn last_days(days: u32, now: DateTime<Utc>) -> Self {
        let end = now.timestamp();
        let start = (now - Duration::days(i64::from(days))).timestamp();
        TimeWindow { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Fewer raw entries than the page limit: last page.
    ShortPage,
    EmptyPage,
    /// Response had no `data` array.
    MissingData,
    PageCap,
}

#[derive(Debug)]
pub enum FetchStatus {
    Complete(StopReason),
    /// A page after the first failed; trades from earlier pages are kept.
    Partial { failed_page: u32, error: PlnError },
    /// The first page failed; there is no data at all.
    Unavailable { error: PlnError },
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub trades: Vec<Trade>,
    pub pages_fetched: u32,
    pub status: FetchStatus,
}

impl FetchOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self.status, FetchStatus::Complete(_))
    }
}

/// Walks the paginated activity feed of one user and keeps the BUY/SELL
/// trades of one token.
pub struct ActivityFetcher<'a> {
    external: &'a External,
    page_limit: usize,
    max_pages: u32,
}

impl<'a> ActivityFetcher<'a> {
    pub fn new(external: &'a External, config: &Config) -> Self {
        ActivityFetcher {
            external,
            page_limit: config.page_limit.max(1),
            max_pages: config.max_pages.max(1),
        }
    }

    pub async fn fetch(&self, user_id: &str, token_id: &str, window: TimeWindow) -> FetchOutcome {
        let mut trades = Vec::new();
        let mut seen = HashSet::new();
        let mut page = 1;

        let status = loop {
            info!("Getting page {} of trade records", page);
            let response = self
                .external
                .get_user_activity(
                    user_id,
                    page,
                    self.page_limit,
                    Some(window.start),
                    Some(window.end),
                )
                .await;

            let activity = match response {
                Ok(activity) => activity,
                Err(error) if page == 1 => {
                    warn!("First activity page failed, no trades available: {}", error);
                    break FetchStatus::Unavailable { error };
                }
                Err(error) => {
                    warn!(
                        "Activity page {} failed, keeping {} trades from earlier pages: {}",
                        page,
                        trades.len(),
                        error
                    );
                    break FetchStatus::Partial { failed_page: page, error };
                }
            };

            let Some(data) = activity.data else {
                break FetchStatus::Complete(StopReason::MissingData);
            };
            if data.is_empty() {
                break FetchStatus::Complete(StopReason::EmptyPage);
            }

            let kept = collect_page(&data, token_id, &mut seen, &mut trades);
            info!(
                "Found {} new relevant trades on page {} (total: {})",
                kept,
                page,
                trades.len()
            );

            let limit = activity.limit.unwrap_or(self.page_limit);
            if data.len() < limit {
                break FetchStatus::Complete(StopReason::ShortPage);
            }
            if page >= self.max_pages {
                warn!("Stopped paging at the {} page safety limit", self.max_pages);
                break FetchStatus::Complete(StopReason::PageCap);
            }
            page += 1;
        };

        let pages_fetched = match status {
            FetchStatus::Complete(_) => page,
            _ => page - 1,
        };

        trades.sort_by_key(Trade::timestamp);
        info!("Found a total of {} relevant trades", trades.len());

        FetchOutcome {
            trades,
            pages_fetched,
            status,
        }
    }
}

/// Appends the entries of one page that belong to `token_id` and are BUY or
/// SELL, skipping ids already in `seen`. Returns how many were kept.
pub fn collect_page(
    data: &[Value],
    token_id: &str,
    seen: &mut HashSet<String>,
    trades: &mut Vec<Trade>,
) -> usize {
    let mut kept = 0;
    for entry in data {
        let Some(trade) = Trade::from_entry(entry) else {
            continue;
        };
        let Some(id) = trade.id_key() else {
            continue;
        };
        if seen.contains(&id) {
            continue;
        }
        if trade.is_for_token(token_id) && trade.action().is_some() {
            seen.insert(id);
            trades.push(trade);
            kept += 1;
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn trade(id: impl Into<Value>, token: &str, action: &str, time: i64) -> Value {
        json!({
            "id": id.into(),
            "action": action,
            "token": {"id": token},
            "amount_token": "10",
            "amount_btc": "100",
            "time": time
        })
    }

    fn full_page(prefix: &str, token: &str, len: usize) -> Vec<Value> {
        (0..len)
            .map(|i| trade(format!("{prefix}-{i}"), token, "BUY", 1_700_000_000 + i as i64))
            .collect()
    }

    fn config_for(server: &MockServer) -> Config {
        Config {
            api_base_url: server.uri(),
            max_attempts: 1,
            retry_delay: std::time::Duration::from_millis(1),
            ..Config::default()
        }
    }

    fn window() -> TimeWindow {
        TimeWindow {
            start: 1_690_000_000,
            end: 1_710_000_000,
        }
    }

    async fn mount_page(server: &MockServer, page: u32, body: Value) {
        Mock::given(method("GET"))
            .and(path("/user/u-1/activity"))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn test_last_days_window() {
        let now = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();
        let window = TimeWindow::last_days(30, now);
        assert_eq!(window.end, now.timestamp());
        assert_eq!(window.end - window.start, 30 * 86_400);
    }

    #[test]
    fn test_collect_page_filters_and_dedups() {
        let mut seen = HashSet::new();
        let mut trades = Vec::new();
        let page = vec![
            trade("a", "2933", "BUY", 1),
            trade("b", "1111", "BUY", 2),
            trade("c", "2933", "DEPOSIT", 3),
            json!("not a record"),
            json!({"action": "SELL", "token": {"id": "2933"}}),
            trade("d", "2933", "SELL", 4),
            trade("a", "2933", "BUY", 1),
        ];

        assert_eq!(collect_page(&page, "2933", &mut seen, &mut trades), 2);
        assert_eq!(trades.len(), 2);
        assert!(seen.contains("a") && seen.contains("d"));
    }

    #[test]
    fn test_same_id_on_two_pages_counted_once() {
        let mut seen = HashSet::new();
        let mut trades = Vec::new();
        collect_page(&[trade(7, "2933", "BUY", 1)], "2933", &mut seen, &mut trades);
        let kept = collect_page(
            &[trade("7", "2933", "BUY", 1), trade(8, "2933", "SELL", 2)],
            "2933",
            &mut seen,
            &mut trades,
        );
        assert_eq!(kept, 1);
        assert_eq!(trades.len(), 2);
    }

    #[tokio::test]
    async fn test_short_page_of_irrelevant_trades_stops_paging() {
        let server = MockServer::start().await;
        mount_page(&server, 1, json!({"data": full_page("p1", "2933", 100), "limit": 100})).await;
        mount_page(&server, 2, json!({"data": full_page("p2", "other", 40), "limit": 100})).await;

        let external = External::new(&config_for(&server)).unwrap();
        let outcome = ActivityFetcher::new(&external, &config_for(&server))
            .fetch("u-1", "2933", window())
            .await;

        assert_eq!(outcome.trades.len(), 100);
        assert_eq!(outcome.pages_fetched, 2);
        assert!(matches!(outcome.status, FetchStatus::Complete(StopReason::ShortPage)));
        assert!(outcome.is_complete());
    }

    #[tokio::test]
    async fn test_full_page_of_irrelevant_trades_keeps_paging() {
        let server = MockServer::start().await;
        mount_page(&server, 1, json!({"data": full_page("p1", "other", 100), "limit": 100})).await;
        mount_page(
            &server,
            2,
            json!({"data": [trade("x", "2933", "SELL", 5)], "limit": 100}),
        )
        .await;

        let external = External::new(&config_for(&server)).unwrap();
        let outcome = ActivityFetcher::new(&external, &config_for(&server))
            .fetch("u-1", "2933", window())
            .await;

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.pages_fetched, 2);
    }

    #[tokio::test]
    async fn test_duplicate_across_pages_and_sorted_result() {
        let server = MockServer::start().await;
        let mut first = full_page("p1", "other", 98);
        first.push(trade("dup", "2933", "BUY", 1_700_000_500));
        first.push(trade("late", "2933", "SELL", 1_700_000_900));
        mount_page(&server, 1, json!({"data": first, "limit": 100})).await;
        mount_page(
            &server,
            2,
            json!({"data": [
                trade("dup", "2933", "BUY", 1_700_000_500),
                trade("early", "2933", "BUY", 1_700_000_100)
            ], "limit": 100}),
        )
        .await;

        let external = External::new(&config_for(&server)).unwrap();
        let outcome = ActivityFetcher::new(&external, &config_for(&server))
            .fetch("u-1", "2933", window())
            .await;

        let ids: Vec<_> = outcome.trades.iter().filter_map(Trade::id_key).collect();
        assert_eq!(ids, vec!["early", "dup", "late"]);
    }

    #[tokio::test]
    async fn test_never_fetches_past_page_cap() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/u-1/activity"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": full_page("same", "2933", 100), "limit": 100})),
            )
            .expect(50)
            .mount(&server)
            .await;

        let external = External::new(&config_for(&server)).unwrap();
        let outcome = ActivityFetcher::new(&external, &config_for(&server))
            .fetch("u-1", "2933", window())
            .await;

        assert_eq!(outcome.pages_fetched, 50);
        assert_eq!(outcome.trades.len(), 100);
        assert!(matches!(outcome.status, FetchStatus::Complete(StopReason::PageCap)));
    }

    #[tokio::test]
    async fn test_first_page_failure_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let external = External::new(&config_for(&server)).unwrap();
        let outcome = ActivityFetcher::new(&external, &config_for(&server))
            .fetch("u-1", "2933", window())
            .await;

        assert!(outcome.trades.is_empty());
        assert_eq!(outcome.pages_fetched, 0);
        assert!(matches!(outcome.status, FetchStatus::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_later_page_failure_keeps_earlier_trades() {
        let server = MockServer::start().await;
        mount_page(&server, 1, json!({"data": full_page("p1", "2933", 100), "limit": 100})).await;
        Mock::given(method("GET"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&server)
            .await;

        let external = External::new(&config_for(&server)).unwrap();
        let outcome = ActivityFetcher::new(&external, &config_for(&server))
            .fetch("u-1", "2933", window())
            .await;

        assert_eq!(outcome.trades.len(), 100);
        assert_eq!(outcome.pages_fetched, 1);
        assert!(matches!(outcome.status, FetchStatus::Partial { failed_page: 2, .. }));
        assert!(!outcome.is_complete());
    }

    #[tokio::test]
    async fn test_missing_or_empty_data_stops() {
        let server = MockServer::start().await;
        mount_page(&server, 1, json!({"message": "no activity"})).await;

        let external = External::new(&config_for(&server)).unwrap();
        let outcome = ActivityFetcher::new(&external, &config_for(&server))
            .fetch("u-1", "2933", window())
            .await;
        assert!(matches!(outcome.status, FetchStatus::Complete(StopReason::MissingData)));

        let server = MockServer::start().await;
        mount_page(&server, 1, json!({"data": [], "limit": 100})).await;

        let external = External::new(&config_for(&server)).unwrap();
        let outcome = ActivityFetcher::new(&external, &config_for(&server))
            .fetch("u-1", "2933", window())
            .await;
        assert!(matches!(outcome.status, FetchStatus::Complete(StopReason::EmptyPage)));
        assert!(outcome.trades.is_empty());
    }
}
