use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::Value;
use time::{Date, Month, OffsetDateTime, Weekday};
use tracing::{debug, warn};

use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::data_source::{
    FundamentalsSource, HealthState, HealthStatus, SourceError, SourceFuture,
};
use crate::domain::parse_date;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse, NoopHttpClient};
use crate::{
    CashFlowPoint, CashFlowSeries, FinancialSnapshot, HistoryRange, PriceHistory, PricePoint,
    ProviderId, Symbol, UtcDateTime, ValidationError,
};

const QUERY_HOST: &str = "https://query2.finance.yahoo.com";
const REFERER: &str = "https://finance.yahoo.com/";
const CRUMB_ENDPOINTS: [&str; 2] = [
    "https://query1.finance.yahoo.com/v1/test/getcrumb",
    "https://query2.finance.yahoo.com/v1/test/getcrumb",
];
/// Earliest period Yahoo's timeseries endpoint accepts (mid-1985).
const TIMESERIES_PERIOD_START: i64 = 493_590_046;

const FREE_CASH_FLOW: &str = "annualFreeCashFlow";
const EBITDA: &str = "annualEBITDA";
const LONG_TERM_DEBT: &str = "annualLongTermDebt";
const CASH: &str = "annualCashAndCashEquivalents";

// ============================================================================
// Session crumb
// ============================================================================

/// Caches the crumb Yahoo requires next to the session cookie.
///
/// The cookie itself lives in the transport's jar (or in [`HttpAuth`]);
/// the crumb goes into every query string.
#[derive(Debug)]
pub struct YahooAuthManager {
    crumb: Mutex<Option<(String, Instant)>>,
    ttl: Duration,
}

impl Default for YahooAuthManager {
    fn default() -> Self {
        Self {
            crumb: Mutex::new(None),
            ttl: Duration::from_secs(3600),
        }
    }
}

impl YahooAuthManager {
    fn cached(&self) -> Option<String> {
        let guard = self.crumb.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|(_, fetched_at)| fetched_at.elapsed() < self.ttl)
            .map(|(crumb, _)| crumb.clone())
    }

    pub fn invalidate(&self) {
        *self.crumb.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Return the cached crumb or obtain a new one.
    pub async fn crumb(
        &self,
        http_client: &dyn HttpClient,
        auth: &HttpAuth,
        timeout_ms: u64,
    ) -> Result<String, SourceError> {
        if let Some(crumb) = self.cached() {
            return Ok(crumb);
        }

        // Visiting fc.yahoo.com seeds the session cookie; its status is irrelevant.
        let cookie_request = HttpRequest::get("https://fc.yahoo.com")
            .with_header("referer", REFERER)
            .with_auth(auth)
            .with_timeout_ms(timeout_ms);
        http_client.execute(cookie_request).await.map_err(|e| {
            SourceError::unavailable(format!("failed to fetch yahoo session cookie: {}", e.message()))
        })?;

        for endpoint in CRUMB_ENDPOINTS {
            let request = HttpRequest::get(endpoint)
                .with_header("referer", REFERER)
                .with_auth(auth)
                .with_timeout_ms(timeout_ms);

            let Ok(response) = http_client.execute(request).await else {
                continue;
            };
            let body = response.body.trim();
            if body.to_ascii_lowercase().contains("too many requests") {
                return Err(SourceError::rate_limited(
                    "yahoo rate limited the crumb request",
                ));
            }
            if !response.is_success() || !is_plausible_crumb(body) {
                continue;
            }

            let crumb = body.to_owned();
            *self.crumb.lock().unwrap_or_else(PoisonError::into_inner) =
                Some((crumb.clone(), Instant::now()));
            debug!("obtained yahoo crumb");
            return Ok(crumb);
        }

        Err(SourceError::unavailable(
            "failed to fetch yahoo crumb from all endpoints",
        ))
    }
}

fn is_plausible_crumb(body: &str) -> bool {
    !body.is_empty()
        && body.len() < 100
        && !body.contains(char::is_whitespace)
        && !body.contains('<')
}

// ============================================================================
// Yahoo Adapter
// ============================================================================

/// Yahoo Finance source.
///
/// With an offline transport (the default) it serves deterministic,
/// symbol-seeded data so the CLI and tests run without network access.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    auth: HttpAuth,
    circuit_breaker: Arc<CircuitBreaker>,
    auth_manager: Arc<YahooAuthManager>,
    timeout_ms: u64,
}

impl Default for YahooAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            auth: HttpAuth::None,
            circuit_breaker: Arc::new(CircuitBreaker::default()),
            auth_manager: Arc::new(YahooAuthManager::default()),
            timeout_ms: 10_000,
        }
    }
}

impl YahooAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>, auth: HttpAuth) -> Self {
        Self {
            http_client,
            auth,
            ..Self::default()
        }
    }

    /// Real transport, with the cookie taken from `YAHOO_COOKIE` when set.
    pub fn from_env(http_client: Arc<dyn HttpClient>) -> Self {
        let auth = std::env::var("YAHOO_COOKIE")
            .ok()
            .filter(|cookie| !cookie.trim().is_empty())
            .map_or(HttpAuth::None, HttpAuth::Cookie);
        Self::with_http_client(http_client, auth)
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn is_offline(&self) -> bool {
        self.http_client.is_offline()
    }

    /// GET `build_url(crumb)` through the breaker, refreshing the crumb and
    /// retrying once when Yahoo rejects the session.
    async fn fetch_body<F>(&self, build_url: F) -> Result<String, SourceError>
    where
        F: Fn(&str) -> String + Send + Sync,
    {
        if !self.circuit_breaker.allow_request() {
            return Err(SourceError::unavailable(
                "yahoo circuit breaker is open; skipping upstream call",
            ));
        }

        let crumb = self.crumb().await?;
        let response = self.send(&build_url(&crumb)).await?;

        let (response, context) = if response.is_auth_rejection() {
            warn!(status = response.status, "yahoo rejected session; refreshing crumb");
            self.auth_manager.invalidate();
            let crumb = self.crumb().await?;
            (self.send(&build_url(&crumb)).await?, "after auth refresh")
        } else {
            (response, "")
        };

        if response.status == 404 {
            // The provider answered; the ticker is simply unknown.
            self.circuit_breaker.record_success();
            return Err(SourceError::not_found("yahoo has no data for this symbol"));
        }
        if !response.is_success() {
            self.circuit_breaker.record_failure();
            return Err(status_error(&response, context));
        }

        self.circuit_breaker.record_success();
        Ok(response.body)
    }

    async fn crumb(&self) -> Result<String, SourceError> {
        self.auth_manager
            .crumb(self.http_client.as_ref(), &self.auth, self.timeout_ms)
            .await
            .inspect_err(|_| self.circuit_breaker.record_failure())
    }

    async fn send(&self, url: &str) -> Result<HttpResponse, SourceError> {
        let request = HttpRequest::get(url)
            .with_header("referer", REFERER)
            .with_auth(&self.auth)
            .with_timeout_ms(self.timeout_ms);

        self.http_client.execute(request).await.map_err(|error| {
            self.circuit_breaker.record_failure();
            if error.retryable() {
                SourceError::unavailable(format!("yahoo transport error: {}", error.message()))
            } else {
                SourceError::internal(format!("yahoo transport error: {}", error.message()))
            }
        })
    }

    async fn fetch_timeseries(
        &self,
        symbol: &Symbol,
        kinds: &[&str],
    ) -> Result<HashMap<String, Vec<(Date, f64)>>, SourceError> {
        let encoded = urlencoding::encode(symbol.as_str()).into_owned();
        let types = kinds.join(",");
        let period_end = OffsetDateTime::now_utc().unix_timestamp();

        let body = self
            .fetch_body(|crumb| {
                format!(
                    "{QUERY_HOST}/ws/fundamentals-timeseries/v1/finance/timeseries/{encoded}?symbol={encoded}&type={types}&period1={TIMESERIES_PERIOD_START}&period2={period_end}&crumb={}",
                    urlencoding::encode(crumb)
                )
            })
            .await?;
        parse_timeseries(&body)
    }

    async fn fetch_real_cash_flow(&self, symbol: &Symbol) -> Result<CashFlowSeries, SourceError> {
        let mut series = self.fetch_timeseries(symbol, &[FREE_CASH_FLOW]).await?;
        let points = series
            .remove(FREE_CASH_FLOW)
            .unwrap_or_default()
            .into_iter()
            .map(|(date, amount)| CashFlowPoint::new(date, amount))
            .collect::<Result<Vec<_>, _>>()
            .map_err(validation_to_error)?;
        CashFlowSeries::new(points).map_err(validation_to_error)
    }

    async fn fetch_real_snapshot(&self, symbol: &Symbol) -> Result<FinancialSnapshot, SourceError> {
        let series = self
            .fetch_timeseries(symbol, &[EBITDA, LONG_TERM_DEBT, CASH])
            .await?;
        snapshot_from_timeseries(&series)
    }

    async fn fetch_real_price_history(
        &self,
        symbol: &Symbol,
        range: HistoryRange,
    ) -> Result<PriceHistory, SourceError> {
        let encoded = urlencoding::encode(symbol.as_str()).into_owned();
        let body = self
            .fetch_body(|crumb| {
                format!(
                    "{QUERY_HOST}/v8/finance/chart/{encoded}?range={range}&interval=1d&events=div&crumb={}",
                    urlencoding::encode(crumb)
                )
            })
            .await?;
        parse_chart(&body)
    }

    async fn fetch_real_trailing_eps(&self, symbol: &Symbol) -> Result<Option<f64>, SourceError> {
        let encoded = urlencoding::encode(symbol.as_str()).into_owned();
        let body = self
            .fetch_body(|crumb| {
                format!(
                    "{QUERY_HOST}/v10/finance/quoteSummary/{encoded}?modules=defaultKeyStatistics&crumb={}",
                    urlencoding::encode(crumb)
                )
            })
            .await?;
        parse_trailing_eps(&body)
    }
}

impl FundamentalsSource for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn cash_flow<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, CashFlowSeries> {
        Box::pin(async move {
            if self.is_offline() {
                return fake_cash_flow(symbol);
            }
            self.fetch_real_cash_flow(symbol).await
        })
    }

    fn price_history<'a>(
        &'a self,
        symbol: &'a Symbol,
        range: HistoryRange,
    ) -> SourceFuture<'a, PriceHistory> {
        Box::pin(async move {
            if self.is_offline() {
                return fake_price_history(symbol, range);
            }
            self.fetch_real_price_history(symbol, range).await
        })
    }

    fn trailing_eps<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, Option<f64>> {
        Box::pin(async move {
            if self.is_offline() {
                return Ok(Some(2.0 + (symbol_seed(symbol) % 300) as f64 / 100.0));
            }
            self.fetch_real_trailing_eps(symbol).await
        })
    }

    fn financial_snapshot<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, FinancialSnapshot> {
        Box::pin(async move {
            if self.is_offline() {
                return fake_snapshot(symbol);
            }
            self.fetch_real_snapshot(symbol).await
        })
    }

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
        Box::pin(async move {
            match self.circuit_breaker.state() {
                CircuitState::Closed => HealthStatus::healthy(),
                CircuitState::HalfOpen => HealthStatus::new(HealthState::Degraded, true),
                CircuitState::Open => HealthStatus::new(HealthState::Unhealthy, false),
            }
        })
    }
}

fn status_error(response: &HttpResponse, context: &str) -> SourceError {
    let suffix = if context.is_empty() {
        String::new()
    } else {
        format!(" {context}")
    };
    let message = format!("yahoo returned status {}{suffix}", response.status);
    if response.status == 429 {
        SourceError::rate_limited(message)
    } else {
        SourceError::unavailable(message)
    }
}

// ============================================================================
// Payload parsing
// ============================================================================

#[derive(Debug, Deserialize)]
struct YahooApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl YahooApiError {
    fn into_source_error(self, endpoint: &str) -> SourceError {
        let code = self.code.unwrap_or_default();
        let message = format!(
            "yahoo {endpoint} error: {}",
            self.description.as_deref().unwrap_or(code.as_str())
        );
        if code.eq_ignore_ascii_case("not found") {
            SourceError::not_found(message)
        } else {
            SourceError::unavailable(message)
        }
    }
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`.
#[derive(Debug, Clone, Copy, Deserialize)]
struct YahooRawValue {
    #[serde(default)]
    raw: Option<f64>,
}

impl YahooRawValue {
    fn finite(self) -> Option<f64> {
        self.raw.filter(|value| value.is_finite())
    }
}

#[derive(Debug, Deserialize)]
struct YahooTimeseriesResponse {
    timeseries: YahooTimeseriesData,
}

#[derive(Debug, Deserialize)]
struct YahooTimeseriesData {
    #[serde(default)]
    result: Vec<YahooTimeseriesResult>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct YahooTimeseriesResult {
    meta: YahooTimeseriesMeta,
    /// Observations live under a key named after the requested type.
    #[serde(flatten)]
    series: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct YahooTimeseriesMeta {
    #[serde(rename = "type", default)]
    kinds: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct YahooTimeseriesEntry {
    #[serde(rename = "asOfDate")]
    as_of_date: String,
    #[serde(rename = "reportedValue", default)]
    reported_value: Option<YahooRawValue>,
}

/// Map of timeseries type to `(date, value)` observations, oldest first.
/// Null entries and entries without a reported value are skipped.
fn parse_timeseries(body: &str) -> Result<HashMap<String, Vec<(Date, f64)>>, SourceError> {
    let response: YahooTimeseriesResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse yahoo timeseries: {e}")))?;
    if let Some(error) = response.timeseries.error {
        return Err(error.into_source_error("timeseries"));
    }

    let mut out = HashMap::new();
    for mut result in response.timeseries.result {
        for kind in result.meta.kinds {
            let Some(raw) = result.series.remove(&kind) else {
                continue;
            };
            let entries: Vec<Option<YahooTimeseriesEntry>> = serde_json::from_value(raw)
                .map_err(|e| {
                    SourceError::internal(format!("malformed yahoo timeseries '{kind}': {e}"))
                })?;

            let mut observations = entries
                .into_iter()
                .flatten()
                .filter_map(|entry| {
                    let value = entry.reported_value.and_then(YahooRawValue::finite)?;
                    let date = parse_date(&entry.as_of_date).ok()?;
                    Some((date, value))
                })
                .collect::<Vec<_>>();
            observations.sort_by_key(|(date, _)| *date);
            out.insert(kind, observations);
        }
    }
    Ok(out)
}

/// Builds the snapshot for one reporting period: the latest year with
/// EBITDA (or, failing that, the latest year with any line). Lines not
/// reported for that year stay `None`.
fn snapshot_from_timeseries(
    series: &HashMap<String, Vec<(Date, f64)>>,
) -> Result<FinancialSnapshot, SourceError> {
    let period = observations(series, EBITDA)
        .last()
        .or_else(|| {
            [LONG_TERM_DEBT, CASH]
                .into_iter()
                .filter_map(|kind| observations(series, kind).last())
                .max_by_key(|(date, _)| *date)
        })
        .map(|(date, _)| *date);

    let value_at = |kind: &str| {
        let period = period?;
        observations(series, kind)
            .iter()
            .find(|(date, _)| *date == period)
            .map(|(_, value)| *value)
    };

    FinancialSnapshot::new(
        period,
        value_at(EBITDA),
        value_at(LONG_TERM_DEBT),
        value_at(CASH),
    )
    .map_err(validation_to_error)
}

fn observations<'a>(
    series: &'a HashMap<String, Vec<(Date, f64)>>,
    kind: &str,
) -> &'a [(Date, f64)] {
    series.get(kind).map(Vec::as_slice).unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Deserialize)]
struct YahooChartData {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    events: Option<YahooChartEvents>,
    indicators: YahooChartIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooChartEvents {
    #[serde(default)]
    dividends: BTreeMap<String, YahooDividend>,
}

#[derive(Debug, Deserialize)]
struct YahooDividend {
    amount: f64,
    date: i64,
}

#[derive(Debug, Deserialize)]
struct YahooChartIndicators {
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Daily closes joined with dividend events on the same UTC date.
fn parse_chart(body: &str) -> Result<PriceHistory, SourceError> {
    let response: YahooChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse yahoo chart: {e}")))?;
    if let Some(error) = response.chart.error {
        return Err(error.into_source_error("chart"));
    }

    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| SourceError::not_found("yahoo chart returned no result"))?;

    let mut dividends: HashMap<Date, f64> = HashMap::new();
    for dividend in result.events.map(|e| e.dividends).unwrap_or_default().into_values() {
        let day = UtcDateTime::from_unix_timestamp(dividend.date)
            .map_err(validation_to_error)?
            .date();
        *dividends.entry(day).or_default() += dividend.amount;
    }

    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|quote| quote.close)
        .unwrap_or_default();

    let mut points = Vec::with_capacity(result.timestamp.len());
    for (ts, close) in result.timestamp.iter().zip(closes) {
        let Some(close) = close else {
            continue;
        };
        let date = UtcDateTime::from_unix_timestamp(*ts)
            .map_err(validation_to_error)?
            .date();
        let dividend = dividends.remove(&date).unwrap_or(0.0);
        points.push(PricePoint::new(date, close, dividend).map_err(validation_to_error)?);
    }

    if !dividends.is_empty() {
        debug!(unmatched = dividends.len(), "dividends without a matching close were dropped");
    }

    PriceHistory::new(points).map_err(validation_to_error)
}

#[derive(Debug, Deserialize)]
struct YahooQuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: YahooQuoteSummaryData,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteSummaryData {
    #[serde(default)]
    result: Option<Vec<YahooQuoteSummaryResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteSummaryResult {
    #[serde(rename = "defaultKeyStatistics", default)]
    default_key_statistics: Option<YahooKeyStatistics>,
}

#[derive(Debug, Deserialize)]
struct YahooKeyStatistics {
    #[serde(rename = "trailingEps", default)]
    trailing_eps: Option<YahooRawValue>,
}

fn parse_trailing_eps(body: &str) -> Result<Option<f64>, SourceError> {
    let response: YahooQuoteSummaryResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse yahoo quoteSummary: {e}")))?;
    if let Some(error) = response.quote_summary.error {
        return Err(error.into_source_error("quoteSummary"));
    }

    Ok(response
        .quote_summary
        .result
        .unwrap_or_default()
        .into_iter()
        .find_map(|result| result.default_key_statistics?.trailing_eps?.finite()))
}

// ============================================================================
// Offline data
// ============================================================================

fn fake_cash_flow(symbol: &Symbol) -> Result<CashFlowSeries, SourceError> {
    let seed = symbol_seed(symbol);
    let mut amount = 800_000_000.0 + (seed % 500) as f64 * 10_000_000.0;
    let mut points = Vec::with_capacity(4);
    for year in 2020..=2023 {
        let date = Date::from_calendar_date(year, Month::December, 31)
            .map_err(|e| SourceError::internal(e.to_string()))?;
        points.push(CashFlowPoint::new(date, amount).map_err(validation_to_error)?);
        amount *= 1.06;
    }
    CashFlowSeries::new(points).map_err(validation_to_error)
}

fn fake_snapshot(symbol: &Symbol) -> Result<FinancialSnapshot, SourceError> {
    let seed = symbol_seed(symbol);
    FinancialSnapshot::new(
        Date::from_calendar_date(2023, Month::December, 31).ok(),
        Some(2_500_000_000.0 + (seed % 400) as f64 * 5_000_000.0),
        Some(1_200_000_000.0 + (seed % 90) as f64 * 10_000_000.0),
        Some(400_000_000.0 + (seed % 70) as f64 * 3_000_000.0),
    )
    .map_err(validation_to_error)
}

fn fake_price_history(symbol: &Symbol, range: HistoryRange) -> Result<PriceHistory, SourceError> {
    let years = match range {
        HistoryRange::OneYear => 1,
        HistoryRange::TwoYears => 2,
        HistoryRange::FiveYears => 5,
        HistoryRange::TenYears | HistoryRange::Max => 10,
    };
    let end = Date::from_calendar_date(2024, Month::December, 31)
        .map_err(|e| SourceError::internal(e.to_string()))?;
    let start = Date::from_calendar_date(2024 - years, Month::December, 31)
        .map_err(|e| SourceError::internal(e.to_string()))?;

    let seed = symbol_seed(symbol);
    let base = 20.0 + (seed % 400) as f64 / 10.0;
    let mut points = Vec::new();
    let mut day = start;
    let mut index = 0_u64;
    while day < end {
        day = day.next_day().unwrap_or(end);
        if matches!(day.weekday(), Weekday::Saturday | Weekday::Sunday) {
            continue;
        }
        let close = base + (seed.wrapping_add(index) % 90) as f64 / 10.0;
        let dividend = if index % 63 == 62 { close * 0.012 } else { 0.0 };
        points.push(PricePoint::new(day, close, dividend).map_err(validation_to_error)?);
        index += 1;
    }
    PriceHistory::new(points).map_err(validation_to_error)
}

fn symbol_seed(symbol: &Symbol) -> u64 {
    symbol.as_str().bytes().fold(0_u64, |acc, byte| {
        acc.wrapping_mul(33).wrapping_add(u64::from(byte))
    })
}

fn validation_to_error(error: ValidationError) -> SourceError {
    SourceError::internal(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitBreakerConfig;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::HttpError;
    use time::macros::date;

    /// Answers by URL fragment and records every request. A fragment listed
    /// more than once answers with each entry in turn, then keeps the last.
    struct ScriptedHttpClient {
        routes: Mutex<Vec<(&'static str, Result<HttpResponse, HttpError>)>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        fn new(routes: Vec<(&'static str, Result<HttpResponse, HttpError>)>) -> Self {
            Self {
                routes: Mutex::new(routes),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .expect("request log")
                .iter()
                .map(|r| r.url.clone())
                .collect()
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            let response = {
                let mut routes = self.routes.lock().expect("routes");
                let matching = routes
                    .iter()
                    .enumerate()
                    .filter(|(_, (fragment, _))| request.url.contains(fragment))
                    .map(|(index, _)| index)
                    .collect::<Vec<_>>();
                match matching.as_slice() {
                    [] => Ok(HttpResponse::with_status(404, "")),
                    [only] => routes[*only].1.clone(),
                    [first, ..] => routes.remove(*first).1,
                }
            };
            self.requests.lock().expect("request log").push(request);
            Box::pin(async move { response })
        }
    }

    fn session_routes() -> Vec<(&'static str, Result<HttpResponse, HttpError>)> {
        vec![
            ("fc.yahoo.com", Ok(HttpResponse::with_status(404, ""))),
            ("getcrumb", Ok(HttpResponse::ok_json("crumb123"))),
        ]
    }

    const TIMESERIES_BODY: &str = r#"{"timeseries":{"result":[
        {"meta":{"symbol":["MGLU3.SA"],"type":["annualFreeCashFlow"]},
         "timestamp":[1,2,3],
         "annualFreeCashFlow":[
            null,
            {"asOfDate":"2023-12-31","reportedValue":{"raw":121.0,"fmt":"121"}},
            {"asOfDate":"2021-12-31","reportedValue":{"raw":100.0,"fmt":"100"}},
            {"asOfDate":"2022-12-31","reportedValue":{"raw":110.0,"fmt":"110"}}
         ]}
    ],"error":null}}"#;

    #[tokio::test]
    async fn parses_free_cash_flow_timeseries_ascending() {
        let mut routes = session_routes();
        routes.push(("timeseries", Ok(HttpResponse::ok_json(TIMESERIES_BODY))));
        let client = Arc::new(ScriptedHttpClient::new(routes));
        let adapter = YahooAdapter::with_http_client(client.clone(), HttpAuth::None);

        let symbol = Symbol::parse("MGLU3.SA").expect("valid");
        let series = adapter.cash_flow(&symbol).await.expect("parses");

        assert_eq!(series.amounts().collect::<Vec<_>>(), vec![100.0, 110.0, 121.0]);
        let urls = client.urls();
        let data_url = urls.iter().find(|u| u.contains("timeseries")).expect("called");
        assert!(data_url.contains("type=annualFreeCashFlow"));
        assert!(data_url.contains("crumb=crumb123"));
    }

    #[test]
    fn snapshot_takes_lines_reported_for_the_latest_year() {
        let body = r#"{"timeseries":{"result":[
            {"meta":{"type":["annualEBITDA"]},"annualEBITDA":[
                {"asOfDate":"2022-12-31","reportedValue":{"raw":40.0}},
                {"asOfDate":"2023-12-31","reportedValue":{"raw":50.0}}]},
            {"meta":{"type":["annualLongTermDebt"]},"annualLongTermDebt":[
                {"asOfDate":"2023-12-31","reportedValue":{"raw":20.0}}]},
            {"meta":{"type":["annualCashAndCashEquivalents"]}}
        ]}}"#;
        let series = parse_timeseries(body).expect("parses");
        let snapshot = snapshot_from_timeseries(&series).expect("valid");

        assert_eq!(snapshot.ebitda, Some(50.0));
        assert_eq!(snapshot.long_term_debt, Some(20.0));
        assert_eq!(snapshot.cash, None);
        assert_eq!(snapshot.as_of, Some(date!(2023 - 12 - 31)));
    }

    #[test]
    fn snapshot_keeps_lines_from_the_latest_ebitda_year_only() {
        let body = r#"{"timeseries":{"result":[
            {"meta":{"type":["annualEBITDA"]},"annualEBITDA":[
                {"asOfDate":"2023-12-31","reportedValue":{"raw":40.0}},
                {"asOfDate":"2024-12-31","reportedValue":{"raw":50.0}}]},
            {"meta":{"type":["annualLongTermDebt"]},"annualLongTermDebt":[
                {"asOfDate":"2023-12-31","reportedValue":{"raw":20.0}}]},
            {"meta":{"type":["annualCashAndCashEquivalents"]},"annualCashAndCashEquivalents":[
                {"asOfDate":"2022-12-31","reportedValue":{"raw":5.0}}]}
        ]}}"#;
        let series = parse_timeseries(body).expect("parses");
        let snapshot = snapshot_from_timeseries(&series).expect("valid");

        assert_eq!(snapshot.as_of, Some(date!(2024 - 12 - 31)));
        assert_eq!(snapshot.ebitda, Some(50.0));
        assert_eq!(snapshot.long_term_debt, None);
        assert_eq!(snapshot.cash, None);
    }

    #[test]
    fn snapshot_without_ebitda_uses_latest_reported_year() {
        let body = r#"{"timeseries":{"result":[
            {"meta":{"type":["annualLongTermDebt"]},"annualLongTermDebt":[
                {"asOfDate":"2023-12-31","reportedValue":{"raw":20.0}}]},
            {"meta":{"type":["annualCashAndCashEquivalents"]},"annualCashAndCashEquivalents":[
                {"asOfDate":"2022-12-31","reportedValue":{"raw":5.0}}]}
        ]}}"#;
        let series = parse_timeseries(body).expect("parses");
        let snapshot = snapshot_from_timeseries(&series).expect("valid");

        assert_eq!(snapshot.as_of, Some(date!(2023 - 12 - 31)));
        assert_eq!(snapshot.ebitda, None);
        assert_eq!(snapshot.long_term_debt, Some(20.0));
        assert_eq!(snapshot.cash, None);
    }

    #[test]
    fn chart_attaches_dividends_to_their_day() {
        // 2024-01-02 and 2024-01-03 at 14:30 UTC
        let body = r#"{"chart":{"result":[{
            "timestamp":[1704205800,1704292200],
            "events":{"dividends":{"1704292200":{"amount":0.5,"date":1704292200}}},
            "indicators":{"quote":[{"close":[10.0,12.5]}]}
        }],"error":null}}"#;
        let history = parse_chart(body).expect("parses");

        assert_eq!(history.len(), 2);
        assert_eq!(history.points()[0].dividend, 0.0);
        assert_eq!(history.points()[1].date, date!(2024 - 01 - 03));
        assert_eq!(history.points()[1].dividend, 0.5);
    }

    #[test]
    fn chart_skips_null_closes() {
        let body = r#"{"chart":{"result":[{
            "timestamp":[1704205800,1704292200],
            "indicators":{"quote":[{"close":[null,12.5]}]}
        }]}}"#;
        let history = parse_chart(body).expect("parses");
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn chart_not_found_maps_to_not_found() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let error = parse_chart(body).expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::NotFound);
        assert!(error.message().contains("delisted"));
    }

    #[test]
    fn reads_trailing_eps() {
        let body = r#"{"quoteSummary":{"result":[{"defaultKeyStatistics":{"trailingEps":{"raw":1.87,"fmt":"1.87"}}}],"error":null}}"#;
        assert_eq!(parse_trailing_eps(body).expect("parses"), Some(1.87));

        let empty = r#"{"quoteSummary":{"result":[{"defaultKeyStatistics":{"trailingEps":{}}}]}}"#;
        assert_eq!(parse_trailing_eps(empty).expect("parses"), None);
    }

    #[tokio::test]
    async fn refreshes_crumb_once_after_unauthorized() {
        let routes = vec![
            ("fc.yahoo.com", Ok(HttpResponse::with_status(404, ""))),
            ("getcrumb", Ok(HttpResponse::ok_json("crumb123"))),
            ("quoteSummary", Ok(HttpResponse::with_status(401, "Unauthorized"))),
        ];
        let client = Arc::new(ScriptedHttpClient::new(routes));
        let adapter = YahooAdapter::with_http_client(client.clone(), HttpAuth::None);

        let error = adapter
            .trailing_eps(&Symbol::parse("PCAR3.SA").expect("valid"))
            .await
            .expect_err("still unauthorized");

        assert!(error.message().contains("after auth refresh"));
        let summary_calls = client
            .urls()
            .iter()
            .filter(|url| url.contains("quoteSummary"))
            .count();
        assert_eq!(summary_calls, 2);
    }

    #[tokio::test]
    async fn not_found_after_crumb_refresh_is_not_a_breaker_failure() {
        let mut routes = session_routes();
        routes.push(("quoteSummary", Ok(HttpResponse::with_status(401, "Unauthorized"))));
        routes.push(("quoteSummary", Ok(HttpResponse::with_status(404, ""))));
        let client = Arc::new(ScriptedHttpClient::new(routes));
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            open_timeout: Duration::from_secs(60),
        }));
        let adapter = YahooAdapter::with_http_client(client, HttpAuth::None)
            .with_circuit_breaker(breaker.clone());

        let error = adapter
            .trailing_eps(&Symbol::parse("ZZZZ3.SA").expect("valid"))
            .await
            .expect_err("unknown symbol");

        assert_eq!(error.kind(), SourceErrorKind::NotFound);
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn circuit_breaker_opens_after_repeated_transport_failures() {
        let mut routes = session_routes();
        routes.push(("chart", Err(HttpError::new("upstream timeout"))));
        let client = Arc::new(ScriptedHttpClient::new(routes));
        let adapter = YahooAdapter::with_http_client(client, HttpAuth::None);
        let symbol = Symbol::parse("BHIA3.SA").expect("valid");

        for _ in 0..3 {
            let error = adapter
                .price_history(&symbol, HistoryRange::OneYear)
                .await
                .expect_err("call should fail");
            assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        }

        let health = adapter.health().await;
        assert_eq!(health.state, HealthState::Unhealthy);

        let error = adapter
            .price_history(&symbol, HistoryRange::OneYear)
            .await
            .expect_err("breaker should block request");
        assert!(error.message().contains("circuit breaker is open"));
    }

    #[tokio::test]
    async fn offline_mode_is_deterministic() {
        let adapter = YahooAdapter::default();
        let symbol = Symbol::parse("NTCO3.SA").expect("valid");

        let first = adapter.cash_flow(&symbol).await.expect("offline data");
        let second = adapter.cash_flow(&symbol).await.expect("offline data");
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);

        let history = adapter
            .price_history(&symbol, HistoryRange::OneYear)
            .await
            .expect("offline data");
        assert!(history.points().iter().any(|p| p.dividend > 0.0));
    }
}
