use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use log::debug;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use super::{PricePoint, PriceSource, SourceError};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Daily closing prices from the Yahoo Finance chart API.
#[derive(Debug, Clone)]
pub struct YahooSource {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl YahooSource {
    /// Creates a new `YahooSource`.
    ///
    /// # Arguments
    /// * `base_url` - The chart API host, e.g. `https://query1.finance.yahoo.com`.
    pub fn new(base_url: &str) -> Result<Self, SourceError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        let invalid = |reason: String| SourceError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };
        let parsed = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(invalid("it can't hold a path".to_string()));
        }

        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    // The symbol is a single path segment, so characters like `/` or `?` get percent-encoded.
    fn chart_url(&self, symbol: &str) -> Result<Url, SourceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SourceError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "it can't hold a path".to_string(),
            })?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);

        Ok(url)
    }
}

#[async_trait]
impl PriceSource for YahooSource {
    async fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, SourceError> {
        let url = self.chart_url(symbol)?;
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        // period2 is exclusive
        let period2 = end.and_time(NaiveTime::MIN).and_utc().timestamp() + 86_400;

        debug!("fetching {symbol} closes from {start} to {end}");

        let response = self
            .client
            .get(url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::UnknownSymbol(symbol.to_string()));
        }

        let body: ChartResponse = response.error_for_status()?.json().await?;
        parse_chart(body, symbol)
    }
}

fn parse_chart(body: ChartResponse, symbol: &str) -> Result<Vec<PricePoint>, SourceError> {
    if let Some(error) = body.chart.error {
        if error.code.eq_ignore_ascii_case("not found") {
            return Err(SourceError::UnknownSymbol(symbol.to_string()));
        }

        return Err(SourceError::Malformed(
            error.description.unwrap_or(error.code),
        ));
    }

    let Some(result) = body.chart.result.and_then(|r| r.into_iter().next()) else {
        return Err(SourceError::UnknownSymbol(symbol.to_string()));
    };

    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    if closes.len() != result.timestamp.len() {
        return Err(SourceError::Malformed(format!(
            "{} timestamps for {} closes",
            result.timestamp.len(),
            closes.len()
        )));
    }

    let mut points: Vec<PricePoint> = result
        .timestamp
        .into_iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let date = DateTime::from_timestamp(ts, 0)?.date_naive();
            Some(PricePoint {
                date,
                close: close.filter(|c| c.is_finite())?,
            })
        })
        .collect();

    points.sort_by_key(|p| p.date);
    Ok(points)
}
