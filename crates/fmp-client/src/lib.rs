//! Async client for the Financial Modeling Prep (FMP) fundamentals API.
//!
//! Every endpoint call goes through a shared 1-hour response cache and a
//! sliding-window rate limiter, with automatic retry on HTTP 429. Bundle
//! assembly is best-effort: a failed sub-request degrades to empty data
//! instead of failing the whole bundle.

pub mod cache;
pub mod mock;

use async_trait::async_trait;
use reqwest::Client;
use score_core::{
    BalanceSheet, BundleProvider, CashFlowStatement, FinancialBundle, IncomeStatement, Quote,
    RatioSnapshot, ScoreError, StockMatch, TtmRatios,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub use cache::{CacheStats, ResponseCache, CACHE_TTL_SECS};

const BASE_URL: &str = "https://financialmodelingprep.com/api/v3";

/// Annual statements fetched per ticker; also bounds the valuation history
const STATEMENT_LIMIT: u32 = 5;

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let wait_until = ts.front().unwrap().checked_add(self.window).unwrap();
            let sleep_dur = wait_until.duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for FMP API slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

#[derive(Clone)]
pub struct FmpClient {
    api_key: String,
    client: Client,
    rate_limiter: RateLimiter,
    cache: Arc<ResponseCache>,
}

impl FmpClient {
    pub fn new(api_key: String) -> Self {
        // FMP Starter allows 300 req/min; free tier users should set
        // FMP_RATE_LIMIT=10.
        let rate_limit: usize = std::env::var("FMP_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
            cache: Arc::new(ResponseCache::new()),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }

    /// Cache-first GET with rate limiting and automatic 429 retry
    async fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, ScoreError> {
        let cache_key = ResponseCache::key(endpoint, params);
        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached);
        }

        let url = format!("{BASE_URL}{endpoint}");
        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("apikey", self.api_key.clone()));

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let response = self
                .client
                .get(&url)
                .query(&query)
                .send()
                .await
                .map_err(|e| ScoreError::ApiError(e.to_string()))?;

            if response.status().as_u16() == 429 {
                let wait_secs = 15u64;
                tracing::warn!(endpoint, "FMP 429 rate limited, waiting {}s before retry {}/3", wait_secs, attempt + 1);
                tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                continue;
            }

            if !response.status().is_success() {
                return Err(ScoreError::ApiError(format!(
                    "HTTP {}: {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                )));
            }

            let value: Value = response
                .json()
                .await
                .map_err(|e| ScoreError::ApiError(e.to_string()))?;
            self.cache.put(cache_key, value.clone());
            return Ok(value);
        }

        Err(ScoreError::ApiError("Rate limited by FMP after 3 retries".to_string()))
    }

    fn decode_list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, ScoreError> {
        if !value.is_array() {
            // FMP signals errors as JSON objects with an "Error Message" key
            return Err(ScoreError::InvalidData(format!(
                "expected array, got: {}",
                value
            )));
        }
        serde_json::from_value(value).map_err(|e| ScoreError::InvalidData(e.to_string()))
    }

    /// Annual income statements, most-recent-first
    pub async fn get_income_statements(&self, symbol: &str) -> Result<Vec<IncomeStatement>, ScoreError> {
        let value = self
            .request(&format!("/income-statement/{symbol}"), &[("limit", STATEMENT_LIMIT.to_string())])
            .await?;
        Self::decode_list(value)
    }

    /// Annual balance sheets, most-recent-first
    pub async fn get_balance_sheets(&self, symbol: &str) -> Result<Vec<BalanceSheet>, ScoreError> {
        let value = self
            .request(&format!("/balance-sheet-statement/{symbol}"), &[("limit", STATEMENT_LIMIT.to_string())])
            .await?;
        Self::decode_list(value)
    }

    /// Annual cash flow statements, most-recent-first
    pub async fn get_cash_flows(&self, symbol: &str) -> Result<Vec<CashFlowStatement>, ScoreError> {
        let value = self
            .request(&format!("/cash-flow-statement/{symbol}"), &[("limit", STATEMENT_LIMIT.to_string())])
            .await?;
        Self::decode_list(value)
    }

    /// Yearly historical ratios, most-recent-first (valuation baselines)
    pub async fn get_historical_ratios(&self, symbol: &str) -> Result<Vec<RatioSnapshot>, ScoreError> {
        let value = self
            .request(&format!("/ratios/{symbol}"), &[("limit", STATEMENT_LIMIT.to_string())])
            .await?;
        Self::decode_list(value)
    }

    /// TTM ratios merged from the ratios-ttm and key-metrics-ttm endpoints.
    /// The provider splits e.g. roicTTM and the margin ratios across the two.
    pub async fn get_ratios_ttm(&self, symbol: &str) -> Result<Option<TtmRatios>, ScoreError> {
        let ratios: Vec<TtmRatios> =
            Self::decode_list(self.request(&format!("/ratios-ttm/{symbol}"), &[]).await?)?;
        let key_metrics: Vec<TtmRatios> =
            Self::decode_list(self.request(&format!("/key-metrics-ttm/{symbol}"), &[]).await?)?;

        Ok(match (ratios.into_iter().next(), key_metrics.into_iter().next()) {
            (Some(r), Some(k)) => Some(r.merge(k)),
            (Some(r), None) => Some(r),
            (None, Some(k)) => Some(k),
            (None, None) => None,
        })
    }

    /// Current quote (price, market cap)
    pub async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>, ScoreError> {
        let quotes: Vec<Quote> =
            Self::decode_list(self.request(&format!("/quote/{symbol}"), &[]).await?)?;
        Ok(quotes.into_iter().next())
    }

    /// Ticker search
    pub async fn search(&self, query: &str) -> Result<Vec<StockMatch>, ScoreError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let value = self
            .request("/search", &[("query", query.to_string()), ("limit", "10".to_string())])
            .await?;
        Self::decode_list(value)
    }

    /// Assemble the full bundle for one ticker with concurrent sub-requests.
    ///
    /// Best-effort by contract: any failed sub-request is logged and
    /// replaced by empty data so the scoring engine always gets a bundle.
    pub async fn get_financial_bundle(&self, symbol: &str) -> FinancialBundle {
        let (ratios, history, income, balance, cashflow) = tokio::join!(
            self.get_ratios_ttm(symbol),
            self.get_historical_ratios(symbol),
            self.get_income_statements(symbol),
            self.get_balance_sheets(symbol),
            self.get_cash_flows(symbol),
        );

        fn or_degrade<T: Default>(result: Result<T, ScoreError>, symbol: &str, what: &str) -> T {
            match result {
                Ok(data) => data,
                Err(err) => {
                    tracing::warn!(symbol, what, %err, "sub-request failed, degrading to empty");
                    T::default()
                }
            }
        }

        FinancialBundle {
            symbol: symbol.to_string(),
            ratios: or_degrade(ratios, symbol, "ratios-ttm"),
            ratios_history: or_degrade(history, symbol, "historical ratios"),
            income: or_degrade(income, symbol, "income statements"),
            balance: or_degrade(balance, symbol, "balance sheets"),
            cashflow: or_degrade(cashflow, symbol, "cash flows"),
        }
    }
}

#[async_trait]
impl BundleProvider for FmpClient {
    async fn financial_bundle(&self, symbol: &str) -> Result<FinancialBundle, ScoreError> {
        Ok(self.get_financial_bundle(symbol).await)
    }
}
