// =============================================================================
// Tiingo REST API Client — daily end-of-day prices
// =============================================================================
//
// SECURITY: The API token is sent as an `Authorization: Token ...` header and
// is never logged. Every request is bounded by a 10 s client timeout so a
// stalled upstream cannot wedge a refresh run.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::FetchError;
use crate::types::{RawObservation, Symbol};

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_BASE_URL: &str = "https://api.tiingo.com";

/// Source of daily closing prices.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch date-ascending closes for `symbol` in `[from, to)`.
    async fn fetch(
        &self,
        symbol: &Symbol,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RawObservation>, FetchError>;
}

#[derive(Debug, Deserialize)]
struct RawPrice {
    date: String,
    close: f64,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    detail: String,
}

/// Tiingo daily prices client.
#[derive(Clone)]
pub struct TiingoClient {
    base_url: String,
    client: reqwest::Client,
}

impl TiingoClient {
    /// Create a client against the public Tiingo API.
    pub fn new(token: &str) -> Result<Self, FetchError> {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    /// Create a client against an alternative base URL.
    pub fn with_base_url(token: &str, base_url: impl Into<String>) -> Result<Self, FetchError> {
        let mut default_headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Token {token}"))
            .map_err(|e| FetchError::Transport(format!("invalid token header: {e}")))?;
        auth.set_sensitive(true);
        default_headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "TiingoClient initialised");

        Ok(Self { base_url, client })
    }

    fn prices_url(&self, symbol: &Symbol) -> String {
        format!("{}/tiingo/daily/{}/prices", self.base_url, symbol)
    }
}

#[async_trait]
impl DataSource for TiingoClient {
    /// GET /tiingo/daily/{symbol}/prices
    #[instrument(skip(self, symbol), fields(symbol = %symbol), name = "tiingo::fetch")]
    async fn fetch(
        &self,
        symbol: &Symbol,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RawObservation>, FetchError> {
        // Tiingo's endDate is inclusive.
        let last = to.pred_opt().unwrap_or(to);
        let resp = self
            .client
            .get(self.prices_url(symbol))
            .query(&[
                ("startDate", from.format("%Y-%m-%d").to_string()),
                ("endDate", last.format("%Y-%m-%d").to_string()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        let body = resp.bytes().await?;

        if !status.is_success() {
            let detail: ErrorDetail = serde_json::from_slice(&body).map_err(|e| {
                FetchError::Malformed(format!(
                    "unable to parse tiingo error message ({}): {e}",
                    String::from_utf8_lossy(&body)
                ))
            })?;
            return Err(FetchError::Upstream {
                status: status.as_u16(),
                message: detail.detail,
            });
        }

        let raw: Vec<RawPrice> =
            serde_json::from_slice(&body).map_err(|e| FetchError::Malformed(e.to_string()))?;
        let observations = parse_prices(raw)?;
        debug!(count = observations.len(), "prices retrieved");
        Ok(observations)
    }
}

/// Convert raw rows into observations, enforcing strictly ascending dates.
fn parse_prices(raw: Vec<RawPrice>) -> Result<Vec<RawObservation>, FetchError> {
    let mut out: Vec<RawObservation> = Vec::with_capacity(raw.len());
    for row in raw {
        let day = row.date.get(..10).unwrap_or(row.date.as_str());
        let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| {
            FetchError::Malformed(format!(
                "unable to parse date {:?} from tiingo response: {e}",
                row.date
            ))
        })?;
        if let Some(prev) = out.last() {
            if prev.date >= date {
                return Err(FetchError::Malformed(format!(
                    "dates out of order: {} then {}",
                    prev.date, date
                )));
            }
        }
        out.push(RawObservation {
            date,
            close: row.close,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query},
        http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus},
        response::IntoResponse,
        routing::get,
        Router,
    };
    use std::collections::HashMap;

    /// Stand-in for the Tiingo prices endpoint on a loopback port.
    async fn fake_tiingo() -> String {
        async fn prices(
            Path(symbol): Path<String>,
            Query(q): Query<HashMap<String, String>>,
            headers: AxumHeaders,
        ) -> impl IntoResponse {
            let authorized = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some("Token secret");
            if !authorized {
                return (AxumStatus::UNAUTHORIZED, r#"{"detail":"Invalid token."}"#.to_string());
            }
            match symbol.as_str() {
                "spy" => {
                    assert_eq!(q.get("startDate").map(String::as_str), Some("2024-01-01"));
                    assert_eq!(q.get("endDate").map(String::as_str), Some("2024-01-31"));
                    (
                        AxumStatus::OK,
                        r#"[{"date":"2024-01-02T00:00:00.000Z","close":470.5,"open":1.0},
                            {"date":"2024-01-03T00:00:00.000Z","close":468.0,"open":1.0}]"#
                            .to_string(),
                    )
                }
                "missing" => (AxumStatus::NOT_FOUND, String::new()),
                "limited" => (
                    AxumStatus::TOO_MANY_REQUESTS,
                    r#"{"detail":"hourly request allocation exceeded"}"#.to_string(),
                ),
                "garbled" => (AxumStatus::BAD_GATEWAY, "<html>oops</html>".to_string()),
                "baddate" => (
                    AxumStatus::OK,
                    r#"[{"date":"01/02/2024","close":1.0}]"#.to_string(),
                ),
                "unordered" => (
                    AxumStatus::OK,
                    r#"[{"date":"2024-01-03","close":1.0},{"date":"2024-01-02","close":1.0}]"#
                        .to_string(),
                ),
                _ => (AxumStatus::OK, "not json".to_string()),
            }
        }

        let app = Router::new().route("/tiingo/daily/:symbol/prices", get(prices));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        )
    }

    async fn fetch(token: &str, symbol: &str) -> Result<Vec<RawObservation>, FetchError> {
        let base = fake_tiingo().await;
        let client = TiingoClient::with_base_url(token, base).unwrap();
        let (from, to) = range();
        client.fetch(&Symbol::new(symbol), from, to).await
    }

    #[tokio::test]
    async fn fetch_parses_prices() {
        let obs = fetch("secret", "SPY").await.unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(obs[0].close, 470.5);
        assert_eq!(obs[1].close, 468.0);
    }

    #[tokio::test]
    async fn fetch_not_found() {
        assert!(matches!(fetch("secret", "missing").await, Err(FetchError::NotFound)));
    }

    #[tokio::test]
    async fn fetch_upstream_detail() {
        match fetch("secret", "limited").await {
            Err(FetchError::Upstream { status, message }) => {
                assert_eq!(status, 429);
                assert_eq!(message, "hourly request allocation exceeded");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            fetch("wrong", "spy").await,
            Err(FetchError::Upstream { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn fetch_malformed_payloads() {
        for symbol in ["garbled", "baddate", "unordered", "junk"] {
            assert!(
                matches!(fetch("secret", symbol).await, Err(FetchError::Malformed(_))),
                "{symbol} should be malformed"
            );
        }
    }

    #[tokio::test]
    async fn fetch_transport_failure() {
        // Nothing listens on port 9 of the loopback interface.
        let client = TiingoClient::with_base_url("secret", "http://127.0.0.1:9").unwrap();
        let (from, to) = range();
        let err = client.fetch(&Symbol::new("spy"), from, to).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_) | FetchError::Timeout));
    }
}
