// =============================================================================
// Yahoo Finance REST Client — daily OHLCV history
// =============================================================================
//
// Uses the public (unauthenticated) chart endpoint:
//   GET /v8/finance/chart/{symbol}?period1=..&period2=..&interval=1d
//
// `period1` / `period2` are UNIX seconds; `period2` is exclusive, so the
// requested end date is pushed forward one day to make the range inclusive.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{StatusCode, Url};
use tracing::{debug, instrument, warn};

use super::{Candle, HistoryRequest, PriceSeries, PriceSource};

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// The endpoint answers 429 to reqwest's default agent.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Yahoo Finance chart API client.
#[derive(Clone)]
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
}

impl YahooClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a client against `base_url` (normally [`DEFAULT_BASE_URL`]).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "YahooClient initialised");

        Ok(Self { base_url, client })
    }

    /// Full request URL for `request`.
    pub fn chart_url(&self, request: &HistoryRequest) -> Result<String> {
        if request.start > request.end {
            anyhow::bail!(
                "start date {} is after end date {}",
                request.start,
                request.end
            );
        }

        let period1 = unix_midnight(request.start);
        let period2 = unix_midnight(
            request
                .end
                .succ_opt()
                .context("end date is out of the supported calendar range")?,
        );

        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid base url {}", self.base_url))?;
        // Pushed as a path segment so `/`, `?` and `#` in a symbol are escaped.
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("base url {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", request.symbol.as_str()]);
        url.query_pairs_mut()
            .append_pair("period1", &period1.to_string())
            .append_pair("period2", &period2.to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "history");

        Ok(url.into())
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// GET /v8/finance/chart/{symbol} — daily candles for the request range.
    #[instrument(skip(self, request), fields(request = %request), name = "yahoo::get_daily_history")]
    pub async fn get_daily_history(&self, request: &HistoryRequest) -> Result<PriceSeries> {
        let url = self.chart_url(request)?;

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("GET /v8/finance/chart request failed")?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .context("failed to read chart response body")?;

        let series = decode_chart_body(&request.symbol, status, &text)?;

        debug!(
            symbol = %request.symbol,
            count = series.len(),
            first = ?series.first_date(),
            last = ?series.last_date(),
            "daily history fetched"
        );
        Ok(series)
    }
}

impl PriceSource for YahooClient {
    async fn fetch_history(&self, request: &HistoryRequest) -> Result<PriceSeries> {
        self.get_daily_history(request).await
    }
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Response parsing
// -----------------------------------------------------------------------------

/// Longest slice of a non-JSON error body quoted in an error message.
const ERROR_BODY_PREVIEW: usize = 200;

/// Turn a raw HTTP answer into a [`PriceSeries`], checking the status first.
///
/// A non-success status is always an error that carries the status. When the
/// body is the usual JSON envelope its `chart.error` is quoted, otherwise the
/// start of the raw text.
pub fn decode_chart_body(symbol: &str, status: StatusCode, text: &str) -> Result<PriceSeries> {
    if !status.is_success() {
        let detail = match serde_json::from_str::<serde_json::Value>(text) {
            Ok(body) => match parse_chart_response(symbol, &body) {
                Err(e) => format!("{e:#}"),
                Ok(_) => body.to_string(),
            },
            Err(_) => text.trim().chars().take(ERROR_BODY_PREVIEW).collect(),
        };
        anyhow::bail!("Yahoo GET /v8/finance/chart/{symbol} returned {status}: {detail}");
    }

    let body: serde_json::Value = serde_json::from_str(text)
        .with_context(|| format!("failed to parse chart response ({status})"))?;
    parse_chart_response(symbol, &body)
}

/// Parse the chart JSON envelope into a [`PriceSeries`].
///
/// Expected shape:
/// ```json
/// { "chart": { "result": [ {
///     "meta": { "gmtoffset": -14400, ... },
///     "timestamp": [1672756200, ...],
///     "indicators": { "quote": [ { "open": [..], "high": [..], "low": [..],
///                                  "close": [..], "volume": [..] } ] } } ],
///   "error": null } }
/// ```
///
/// Rows with a null open/high/low/close are dropped; a null volume is 0.
pub fn parse_chart_response(symbol: &str, body: &serde_json::Value) -> Result<PriceSeries> {
    let chart = body.get("chart").context("missing field chart")?;

    if let Some(err) = chart.get("error").filter(|e| !e.is_null()) {
        let code = err["code"].as_str().unwrap_or("unknown");
        let description = err["description"].as_str().unwrap_or("no description");
        anyhow::bail!("Yahoo chart error for {symbol}: {code}: {description}");
    }

    let result = chart["result"]
        .as_array()
        .and_then(|arr| arr.first())
        .context("chart response has no result entry")?;

    let gmt_offset = result["meta"]["gmtoffset"].as_i64().unwrap_or(0);

    let timestamps: &[serde_json::Value] = match result.get("timestamp") {
        Some(ts) => ts.as_array().context("field timestamp is not an array")?.as_slice(),
        // No trading days in range: the endpoint omits the field entirely.
        None => &[],
    };

    let quote = &result["indicators"]["quote"][0];
    let open = column(quote, "open", timestamps.len())?;
    let high = column(quote, "high", timestamps.len())?;
    let low = column(quote, "low", timestamps.len())?;
    let close = column(quote, "close", timestamps.len())?;
    let volume = column(quote, "volume", timestamps.len())?;

    let mut candles = Vec::with_capacity(timestamps.len());
    let mut skipped = 0usize;

    for (i, ts) in timestamps.iter().enumerate() {
        let ts = ts
            .as_i64()
            .with_context(|| format!("timestamp[{i}] is not an integer"))?;

        let (Some(o), Some(h), Some(l), Some(c)) = (
            open[i].as_f64(),
            high[i].as_f64(),
            low[i].as_f64(),
            close[i].as_f64(),
        ) else {
            skipped += 1;
            continue;
        };
        let v = volume[i].as_f64().unwrap_or(0.0);

        let date = DateTime::<Utc>::from_timestamp(ts + gmt_offset, 0)
            .with_context(|| format!("timestamp {ts} is out of range"))?
            .date_naive();

        candles.push(Candle::new(date, o, h, l, c, v));
    }

    if skipped > 0 {
        warn!(symbol, skipped, "skipping rows with missing prices");
    }

    if candles.is_empty() {
        anyhow::bail!("no price rows returned for {symbol}");
    }

    Ok(PriceSeries::new(symbol, candles))
}

/// Fetch one quote column and check it lines up with the timestamps.
fn column<'a>(
    quote: &'a serde_json::Value,
    name: &str,
    expected_len: usize,
) -> Result<&'a [serde_json::Value]> {
    if expected_len == 0 {
        return Ok(&[]);
    }
    let values = quote[name]
        .as_array()
        .with_context(|| format!("quote column {name} is missing"))?;
    if values.len() != expected_len {
        anyhow::bail!(
            "quote column {name} has {} values, expected {expected_len}",
            values.len()
        );
    }
    Ok(values)
}

/// 00:00 UTC of `date` as UNIX seconds.
fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(start: &str, end: &str) -> HistoryRequest {
        HistoryRequest {
            symbol: "AAPL".into(),
            start: start.parse().unwrap(),
            end: end.parse().unwrap(),
        }
    }

    #[test]
    fn chart_url_makes_end_date_inclusive() {
        let client = YahooClient::new("https://example.test/").unwrap();
        let url = client.chart_url(&request("2023-01-01", "2023-09-01")).unwrap();
        // 2023-01-01T00:00Z = 1672531200, 2023-09-02T00:00Z = 1693612800
        assert_eq!(
            url,
            "https://example.test/v8/finance/chart/AAPL?period1=1672531200&period2=1693612800&interval=1d&events=history"
        );
    }

    #[test]
    fn chart_url_escapes_symbol_segment() {
        let client = YahooClient::new("https://example.test").unwrap();
        let mut req = request("2023-01-01", "2023-09-01");
        req.symbol = "BRK/B?x#y".into();
        let url = client.chart_url(&req).unwrap();
        assert!(
            url.starts_with("https://example.test/v8/finance/chart/BRK%2FB%3Fx%23y?period1="),
            "{url}"
        );
        assert!(url.ends_with("&interval=1d&events=history"), "{url}");
    }

    #[test]
    fn chart_url_keeps_base_path() {
        let client = YahooClient::new("http://127.0.0.1:8080/proxy/").unwrap();
        let url = client.chart_url(&request("2023-01-01", "2023-01-31")).unwrap();
        assert!(url.starts_with("http://127.0.0.1:8080/proxy/v8/finance/chart/AAPL?"), "{url}");
    }

    #[test]
    fn rate_limited_plain_text_keeps_status() {
        let err = decode_chart_body("AAPL", StatusCode::TOO_MANY_REQUESTS, "Too Many Requests\r\n")
            .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("429"), "{msg}");
        assert!(msg.contains("Too Many Requests"), "{msg}");
        assert!(!msg.contains("failed to parse"), "{msg}");
    }

    #[test]
    fn not_found_json_quotes_chart_error() {
        let body = json!({
            "chart": {
                "result": null,
                "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
            }
        });
        let err = decode_chart_body("ZZZZ", StatusCode::NOT_FOUND, &body.to_string()).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("404"), "{msg}");
        assert!(msg.contains("symbol may be delisted"), "{msg}");
    }

    #[test]
    fn success_with_garbage_body_names_status() {
        let err = decode_chart_body("AAPL", StatusCode::OK, "<html>").unwrap_err();
        assert!(format!("{err:#}").contains("200"), "{err:#}");
    }

    #[test]
    fn chart_url_rejects_inverted_range() {
        let client = YahooClient::new(DEFAULT_BASE_URL).unwrap();
        assert!(client.chart_url(&request("2023-09-01", "2023-01-01")).is_err());
    }

    #[test]
    fn parse_ok_with_exchange_offset() {
        // 2023-01-03 14:30 UTC (09:30 New York)
        let body = json!({
            "chart": {
                "result": [{
                    "meta": { "gmtoffset": -18000 },
                    "timestamp": [1672756200, 1672842600],
                    "indicators": { "quote": [{
                        "open":   [130.28, 126.89],
                        "high":   [130.90, 128.66],
                        "low":    [124.17, 125.08],
                        "close":  [125.07, 126.36],
                        "volume": [112117500, 89113600]
                    }]}
                }],
                "error": null
            }
        });
        let series = parse_chart_response("AAPL", &body).unwrap();
        assert_eq!(series.symbol(), "AAPL");
        assert_eq!(series.len(), 2);
        let first = &series.candles()[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2023, 1, 3).unwrap());
        assert!((first.open - 130.28).abs() < 1e-10);
        assert!((first.close - 125.07).abs() < 1e-10);
        assert!((first.volume - 112_117_500.0).abs() < 1e-6);
        assert_eq!(series.last_date(), NaiveDate::from_ymd_opt(2023, 1, 4));
    }

    #[test]
    fn parse_drops_null_rows() {
        let body = json!({
            "chart": {
                "result": [{
                    "meta": {},
                    "timestamp": [1672756200, 1672842600, 1672929000],
                    "indicators": { "quote": [{
                        "open":   [1.0, null, 3.0],
                        "high":   [1.5, null, 3.5],
                        "low":    [0.5, null, 2.5],
                        "close":  [1.2, null, 3.2],
                        "volume": [10, null, null]
                    }]}
                }],
                "error": null
            }
        });
        let series = parse_chart_response("AAPL", &body).unwrap();
        assert_eq!(series.closes(), vec![1.2, 3.2]);
        assert_eq!(series.candles()[1].volume, 0.0);
    }

    #[test]
    fn parse_surfaces_chart_error() {
        let body = json!({
            "chart": {
                "result": null,
                "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
            }
        });
        let err = parse_chart_response("ZZZZ", &body).unwrap_err();
        assert!(err.to_string().contains("Not Found"), "{err}");
    }

    #[test]
    fn parse_empty_range_is_error() {
        let body = json!({
            "chart": {
                "result": [{ "meta": {}, "indicators": { "quote": [{}] } }],
                "error": null
            }
        });
        let err = parse_chart_response("AAPL", &body).unwrap_err();
        assert!(err.to_string().contains("no price rows"), "{err}");
    }

    #[test]
    fn parse_rejects_misaligned_columns() {
        let body = json!({
            "chart": {
                "result": [{
                    "meta": {},
                    "timestamp": [1672756200, 1672842600],
                    "indicators": { "quote": [{
                        "open": [1.0], "high": [1.0], "low": [1.0],
                        "close": [1.0], "volume": [1]
                    }]}
                }],
                "error": null
            }
        });
        assert!(parse_chart_response("AAPL", &body).is_err());
    }
}
