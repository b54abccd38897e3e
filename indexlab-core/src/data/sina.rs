//! Sina Finance provider (secondary source).
//!
//! Sina uses its own symbol space: `sh000001` / `sz399001` for mainland indices
//! and `.INX` / `.IXIC` for US indices. Both endpoints return an array of daily
//! K-line records whose numbers are encoded as strings; the US endpoint wraps
//! the array in a JSONP callback.

use super::close_field::{select_close_values, PayloadColumn};
use super::provider::{clip_or_empty, DataError, DataProvider, DataSource};
use crate::domain::{IndexSeries, PricePoint};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::time::Duration;

const CN_KLINE_URL: &str =
    "https://quotes.sina.cn/cn/api/json_v2.php/CN_MarketDataService.getKLineData";
const US_DAILY_URL: &str =
    "https://stock.finance.sina.com.cn/usstock/api/jsonp.php/var%20_data=/US_MinKService.getDailyK";

const DATE_FIELDS: &[&str] = &["day", "d", "date"];
const IGNORED_FIELDS: &[&str] = &["volume", "v", "amount", "ma_price5", "ma_volume5"];

/// Sina Finance data provider.
pub struct SinaProvider {
    client: reqwest::blocking::Client,
}

impl SinaProvider {
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn url(symbol: &str) -> String {
        if symbol.starts_with('.') {
            format!("{US_DAILY_URL}?symbol={symbol}")
        } else {
            format!("{CN_KLINE_URL}?symbol={symbol}&scale=240&ma=no&datalen=100000")
        }
    }

    /// Parse a K-line payload (plain JSON array or JSONP-wrapped array).
    pub fn parse_payload(
        symbol: &str,
        display_name: &str,
        body: &str,
    ) -> Result<IndexSeries, DataError> {
        let json = strip_jsonp(body.trim());
        if json.is_empty() || json == "null" {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        let records: Vec<Map<String, Value>> = serde_json::from_str(json).map_err(|e| {
            DataError::ResponseFormatChanged(format!("sina payload for {symbol}: {e}"))
        })?;
        if records.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        let date_key = DATE_FIELDS
            .iter()
            .find(|k| records[0].contains_key(**k))
            .ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("no date field in sina payload for {symbol}"))
            })?;

        let mut dates = Vec::with_capacity(records.len());
        for rec in &records {
            let raw = rec.get(*date_key).and_then(Value::as_str).unwrap_or("");
            let date = NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d")
                .map_err(|e| {
                    DataError::ResponseFormatChanged(format!("bad date '{raw}' for {symbol}: {e}"))
                })?;
            dates.push(date);
        }

        let columns: Vec<PayloadColumn> = records[0]
            .keys()
            .filter(|k| !DATE_FIELDS.contains(&k.as_str()) && !IGNORED_FIELDS.contains(&k.as_str()))
            .map(|key| PayloadColumn {
                key: vec![key.clone()],
                values: records.iter().map(|r| r.get(key).and_then(numeric)).collect(),
            })
            .collect();
        let closes = select_close_values(columns)?;

        let points = dates
            .into_iter()
            .zip(closes)
            .filter_map(|(date, close)| close.map(|c| PricePoint::new(date, c)))
            .collect();
        Ok(IndexSeries::new(display_name, points))
    }
}

fn strip_jsonp(body: &str) -> &str {
    if body.starts_with('[') || body == "null" {
        return body;
    }
    match (body.find('('), body.rfind(')')) {
        (Some(open), Some(close)) if close > open => body[open + 1..close].trim(),
        _ => body,
    }
}

fn numeric(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl DataProvider for SinaProvider {
    fn name(&self) -> &str {
        "sina_finance"
    }

    fn source(&self) -> DataSource {
        DataSource::Sina
    }

    fn fetch(
        &self,
        symbol: &str,
        display_name: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<IndexSeries, DataError> {
        let resp = self
            .client
            .get(Self::url(symbol))
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited {
                retry_after_secs: 60,
            });
        }
        if !status.is_success() {
            return Err(DataError::Other(format!("HTTP {status} for {symbol}")));
        }

        let body = resp
            .text()
            .map_err(|e| DataError::ResponseFormatChanged(format!("read body for {symbol}: {e}")))?;
        let series = Self::parse_payload(symbol, display_name, &body)?;
        clip_or_empty(series, symbol, start, end)
    }
}
