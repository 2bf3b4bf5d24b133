// =============================================================================
// KRX Market Data Client — JSON data-portal endpoint
// =============================================================================
//
// Every KRX statistics screen is served by one POST endpoint selected with a
// `bld` form field. Three screens are used:
//   - MDCSTAT01501  all issues of a market on one trading day (listing, names,
//                   and the trading-day probe);
//   - MDCSTAT01701  daily OHLCV of one issue between two dates (by ISIN);
//   - finder_stkisu issue search, used when a ticker is not in the directory.
//
// Numbers arrive as strings with thousands separators ("76,600"); a lone "-"
// marks a missing value.
//
// Every POST takes its own `RequestPacer` slot, so a lookup that needs the
// finder and then the history screen is spaced like two separate calls.
//
// The ticker -> ISIN directory is a transport cache. Each successful listing
// replaces it wholesale; finder results only live until the next listing.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{DailyBar, PriceHistorySource, RequestPacer, SourceError, SymbolSeries};
use crate::types::MarketId;

pub const DEFAULT_BASE_URL: &str = "http://data.krx.co.kr";

const JSON_PATH: &str = "/comm/bldAttendant/getJsonData.cmd";
const REFERER: &str = "http://data.krx.co.kr/contents/MDC/MDI/mdiLoader";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const BLD_MARKET_SNAPSHOT: &str = "dbms/MDC/STAT/standard/MDCSTAT01501";
const BLD_DAILY_HISTORY: &str = "dbms/MDC/STAT/standard/MDCSTAT01701";
const BLD_FINDER: &str = "dbms/comm/finder/finder_stkisu";

/// How many calendar days back the trading-day probe looks.
const TRADING_DAY_PROBE_DAYS: u64 = 7;

const DATE_FMT: &str = "%Y%m%d";

/// One row of the market snapshot screen.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub ticker: String,
    pub isin: String,
    pub name: String,
    pub close: Option<f64>,
}

/// Directory entry mapping a short ticker to its ISIN and display name.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedIssue {
    pub isin: String,
    pub name: String,
}

/// KRX data-portal client implementing [`PriceHistorySource`].
pub struct KrxClient {
    base_url: String,
    client: reqwest::Client,
    pacer: Arc<RequestPacer>,
    directory: RwLock<HashMap<String, ListedIssue>>,
}

impl KrxClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        pacer: Arc<RequestPacer>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("failed to build KRX http client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "KrxClient initialised");

        Ok(Self {
            base_url,
            client,
            pacer,
            directory: RwLock::new(HashMap::new()),
        })
    }

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------

    async fn post_screen(&self, bld: &str, params: &[(&str, &str)]) -> Result<Value, SourceError> {
        let url = format!("{}{}", self.base_url, JSON_PATH);
        let mut form: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 1);
        form.push(("bld", bld));
        form.extend_from_slice(params);

        let _slot = self
            .pacer
            .acquire()
            .await
            .map_err(|_| SourceError::Transient("request pacer closed".to_string()))?;

        let resp = self
            .client
            .post(&url)
            .header(reqwest::header::REFERER, REFERER)
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Transient(format!("KRX {bld} returned {status}")));
        }

        Ok(resp.json::<Value>().await?)
    }

    async fn market_snapshot(
        &self,
        market: MarketId,
        date: NaiveDate,
    ) -> Result<Vec<SnapshotRow>, SourceError> {
        let day = date.format(DATE_FMT).to_string();
        let body = self
            .post_screen(
                BLD_MARKET_SNAPSHOT,
                &[("mktId", market.krx_code()), ("trdDd", day.as_str())],
            )
            .await?;
        parse_market_snapshot(&body)
    }

    /// Directory lookup, falling back to the issue finder.
    async fn lookup(&self, ticker: &str) -> Result<ListedIssue, SourceError> {
        let cached = self.directory.read().get(ticker).cloned();
        if let Some(issue) = cached {
            return Ok(issue);
        }

        let body = self
            .post_screen(BLD_FINDER, &[("mktsel", "ALL"), ("searchText", ticker)])
            .await?;
        let issue = parse_finder(ticker, &body)?;
        self.directory
            .write()
            .insert(ticker.to_string(), issue.clone());
        Ok(issue)
    }
}

#[async_trait]
impl PriceHistorySource for KrxClient {
    #[instrument(skip(self), name = "krx::resolve_trading_day")]
    async fn resolve_trading_day(&self, reference: NaiveDate) -> Result<NaiveDate, SourceError> {
        for offset in 0..TRADING_DAY_PROBE_DAYS {
            let day = reference - Days::new(offset);
            if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }
            let rows = self.market_snapshot(MarketId::Kospi, day).await?;
            if rows.iter().any(|r| r.close.is_some()) {
                debug!(%day, "trading day resolved");
                return Ok(day);
            }
        }
        Err(SourceError::Malformed(format!(
            "no trading day within {TRADING_DAY_PROBE_DAYS} days of {reference}"
        )))
    }

    #[instrument(skip(self), name = "krx::list_symbols")]
    async fn list_symbols(
        &self,
        market: MarketId,
        as_of: NaiveDate,
    ) -> Result<Vec<String>, SourceError> {
        let rows = self.market_snapshot(market, as_of).await?;

        let mut directory = HashMap::with_capacity(rows.len());
        let tickers: Vec<String> = rows
            .into_iter()
            .map(|row| {
                directory.insert(
                    row.ticker.clone(),
                    ListedIssue {
                        isin: row.isin,
                        name: row.name,
                    },
                );
                row.ticker
            })
            .collect();
        *self.directory.write() = directory;

        debug!(%market, count = tickers.len(), "market listing fetched");
        Ok(tickers)
    }

    #[instrument(skip(self), name = "krx::daily_history")]
    async fn daily_history(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<SymbolSeries, SourceError> {
        let issue = self.lookup(ticker).await?;
        let start = from.format(DATE_FMT).to_string();
        let end = to.format(DATE_FMT).to_string();

        let body = self
            .post_screen(
                BLD_DAILY_HISTORY,
                &[
                    ("isuCd", issue.isin.as_str()),
                    ("strtDd", start.as_str()),
                    ("endDd", end.as_str()),
                    ("adjStkPrc", "2"),
                    ("share", "1"),
                    ("money", "1"),
                ],
            )
            .await?;
        parse_daily_history(ticker, &body)
    }

    async fn display_name(&self, ticker: &str) -> Result<String, SourceError> {
        Ok(self.lookup(ticker).await?.name)
    }
}

impl std::fmt::Debug for KrxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KrxClient")
            .field("base_url", &self.base_url)
            .field("pacer", &self.pacer.snapshot())
            .field("directory_len", &self.directory.read().len())
            .finish()
    }
}

// =============================================================================
// Payload parsing
// =============================================================================

/// Parse a KRX numeric string such as `"1,234,500"`. Blank and `"-"` are `None`.
pub fn parse_krx_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

fn field<'a>(row: &'a Value, key: &str) -> Result<&'a str, SourceError> {
    row.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| SourceError::Malformed(format!("row missing '{key}'")))
}

fn rows<'a>(body: &'a Value, block: &str) -> Result<&'a Vec<Value>, SourceError> {
    body.get(block)
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::Malformed(format!("response missing '{block}' array")))
}

pub fn parse_market_snapshot(body: &Value) -> Result<Vec<SnapshotRow>, SourceError> {
    rows(body, "OutBlock_1")?
        .iter()
        .map(|row| -> Result<SnapshotRow, SourceError> {
            Ok(SnapshotRow {
                ticker: field(row, "ISU_SRT_CD")?.trim().to_string(),
                isin: field(row, "ISU_CD")?.trim().to_string(),
                name: field(row, "ISU_ABBRV")?.trim().to_string(),
                close: row
                    .get("TDD_CLSPRC")
                    .and_then(Value::as_str)
                    .and_then(parse_krx_number),
            })
        })
        .collect()
}

pub fn parse_daily_history(ticker: &str, body: &Value) -> Result<SymbolSeries, SourceError> {
    let mut bars = Vec::new();
    for row in rows(body, "output")? {
        let raw_date = field(row, "TRD_DD")?;
        let date = NaiveDate::parse_from_str(raw_date, "%Y/%m/%d")
            .map_err(|e| SourceError::Malformed(format!("{ticker}: bad date '{raw_date}': {e}")))?;

        let Some(close) = parse_krx_number(field(row, "TDD_CLSPRC")?) else {
            warn!(ticker, %date, "skipping bar without close");
            continue;
        };
        let volume = parse_krx_number(field(row, "ACC_TRDVOL")?).unwrap_or(0.0);

        bars.push(DailyBar {
            date,
            close,
            volume: volume.max(0.0) as u64,
        });
    }
    SymbolSeries::new(ticker, bars)
}

pub fn parse_finder(ticker: &str, body: &Value) -> Result<ListedIssue, SourceError> {
    rows(body, "block1")?
        .iter()
        .find(|row| row.get("short_code").and_then(Value::as_str) == Some(ticker))
        .map(|row| -> Result<ListedIssue, SourceError> {
            Ok(ListedIssue {
                isin: field(row, "full_code")?.to_string(),
                name: field(row, "codeName")?.to_string(),
            })
        })
        .unwrap_or_else(|| Err(SourceError::UnknownSymbol(ticker.to_string())))
}
