use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::{
    models::{ActivityPage, PlnError},
    Config,
};

/// Client for the Odin REST API.
pub struct External {
    client: Client,
    base_url: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl External {
    pub fn new(config: &Config) -> Result<Self, PlnError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(External {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay,
        })
    }

    /// GET `{base}/{path}` and decode the body as JSON.
    ///
    /// Retryable failures are retried with exponential backoff, starting at the
    /// configured delay and doubling after each attempt. The last error is
    /// returned once the attempts run out.
    pub async fn get_json(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Value, PlnError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut delay = self.retry_delay;
        let mut attempt = 1;

        loop {
            match self.get_json_once(&url, params).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(%url, attempt, "Request succeeded after retrying");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        "Request failed (attempt {}/{}): {}; retrying in {:?}",
                        attempt, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        error!("Maximum attempts reached, abandoning request {}: {}", url, e);
                    } else {
                        error!("API call failed ({}): {}", url, e);
                    }
                    return Err(e);
                }
            }
        }
    }

    async fn get_json_once(&self, url: &str, params: &[(&str, String)]) -> Result<Value, PlnError> {
        let body = self
            .client
            .get(url)
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn get_user_info(&self, user_id: &str) -> Result<Value, PlnError> {
        self.get_json(&format!("user/{user_id}"), &[]).await
    }

    /// One page of a user's activity feed, oldest first.
    pub async fn get_user_activity(
        &self,
        user_id: &str,
        page: u32,
        limit: usize,
        start_time: Option<i64>,
        end_time: Option<i64>,
    ) -> Result<ActivityPage, PlnError> {
        let mut params = vec![
            ("sort", "time:asc".to_string()),
            ("page", page.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(start) = start_time {
            params.push(("start_time", start.to_string()));
        }
        if let Some(end) = end_time {
            params.push(("end_time", end.to_string()));
        }

        debug!(user = user_id, page, limit, "Calling get_user_activity");
        let response = self
            .get_json(&format!("user/{user_id}/activity"), &params)
            .await?;
        Ok(ActivityPage::from_response(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, max_attempts: u32) -> Config {
        Config {
            api_base_url: server.uri(),
            max_attempts,
            retry_delay: Duration::from_millis(1),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_get_user_activity_sends_window_and_paging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/u-1/activity"))
            .and(query_param("sort", "time:asc"))
            .and(query_param("page", "3"))
            .and(query_param("limit", "100"))
            .and(query_param("start_time", "1000"))
            .and(query_param("end_time", "2000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": 1}],
                "limit": 100,
                "page": 3
            })))
            .expect(1)
            .mount(&server)
            .await;

        let external = External::new(&config_for(&server, 1)).unwrap();
        let page = external
            .get_user_activity("u-1", 3, 100, Some(1000), Some(2000))
            .await
            .unwrap();

        assert_eq!(page.data, Some(vec![json!({"id": 1})]));
        assert_eq!(page.limit, Some(100));
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/u-1"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/u-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "satoshi"})))
            .expect(1)
            .mount(&server)
            .await;

        let external = External::new(&config_for(&server, 3)).unwrap();
        let user = external.get_user_info("u-1").await.unwrap();
        assert_eq!(user["username"], "satoshi");
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let external = External::new(&config_for(&server, 3)).unwrap();
        let err = external.get_user_info("u-1").await.unwrap_err();
        assert!(matches!(err, PlnError::ReqwestError(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_bad_base_url_is_not_retried() {
        let config = Config {
            api_base_url: "not a url".to_string(),
            max_attempts: 3,
            retry_delay: Duration::from_secs(60),
            ..Config::default()
        };
        let external = External::new(&config).unwrap();

        let err = tokio::time::timeout(Duration::from_secs(5), external.get_user_info("u-1"))
            .await
            .expect("a malformed URL should fail without backoff")
            .unwrap_err();
        assert!(matches!(err, PlnError::ReqwestError(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_client_errors_and_bad_json_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let external = External::new(&config_for(&server, 3)).unwrap();
        assert!(external.get_user_info("missing").await.is_err());
        let err = external.get_user_info("garbled").await.unwrap_err();
        assert!(matches!(err, PlnError::JsonError(_)));
    }
}
