//! TLP auctions price provider implementation

use crate::{
    config::MonitorConfig,
    constants::{PRICE_CHECK_ENDPOINT, RATE_ENDPOINT, SALES_LOG_ENDPOINT, USER_AGENT},
    error::ProviderError,
    provider::MarketDataProvider,
    types::{Auction, ExchangeRate, QuoteLookup, SaleEvent, SaleId},
};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;

/// Naive timestamp layouts used by the sales log
const SALE_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Amounts arrive as JSON numbers or numeric strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireAmount {
    Int(u64),
    Float(f64),
    Text(String),
}

impl WireAmount {
    /// Converts to whole lower units, truncating any fraction
    fn to_units(&self) -> Result<u64, ProviderError> {
        let value = match self {
            WireAmount::Int(v) => return Ok(*v),
            WireAmount::Float(v) => *v,
            WireAmount::Text(s) => {
                let cleaned = s.trim().replace(',', "");
                cleaned.parse::<f64>().map_err(|e| {
                    ProviderError::malformed(format!("amount {:?} is not numeric: {}", s, e))
                })?
            }
        };

        // u64::MAX as f64 rounds up to 2^64, which is already out of range
        if !value.is_finite() || value < 0.0 || value >= u64::MAX as f64 {
            return Err(ProviderError::malformed(format!(
                "amount {} is not a valid price",
                value
            )));
        }
        Ok(value.trunc() as u64)
    }
}

/// Sale ids are numbers on some records and strings on others
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireId {
    Num(u64),
    Text(String),
}

impl From<WireId> for SaleId {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Num(n) => SaleId::new(n.to_string()),
            WireId::Text(s) => SaleId::new(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireAuction {
    price: WireAmount,
    auctioneer: String,
    #[serde(rename = "auctionDate")]
    auction_date: String,
}

/// Price check response
#[derive(Debug, Deserialize)]
struct PriceCheckResponse {
    auctions: Option<Vec<WireAuction>>,
    #[serde(rename = "averagePrice")]
    average_price: Option<WireAmount>,
}

#[derive(Debug, Deserialize)]
struct WireSale {
    id: WireId,
    item: String,
    auctioneer: String,
    datetime: String,
}

/// Sales log response
///
/// Records stay raw so one bad record can be skipped without losing the rest.
#[derive(Debug, Deserialize)]
struct SalesLogResponse {
    items: Option<Vec<serde_json::Value>>,
}

impl WireSale {
    fn into_event(self, offset: FixedOffset) -> Result<SaleEvent, ProviderError> {
        let occurred_at = parse_sale_timestamp(&self.datetime, offset).ok_or_else(|| {
            ProviderError::malformed(format!("unparseable sale datetime {:?}", self.datetime))
        })?;
        Ok(SaleEvent {
            id: self.id.into(),
            item_name: self.item,
            auctioneer: self.auctioneer,
            occurred_at,
        })
    }
}

/// Parses a price check payload
pub fn parse_price_check(body: &str) -> Result<QuoteLookup, ProviderError> {
    let response: PriceCheckResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::malformed(format!("Failed to parse price check response: {}", e))
    })?;

    let wire_auctions = response
        .auctions
        .ok_or_else(|| ProviderError::malformed("price check response has no auctions"))?;

    if wire_auctions.is_empty() {
        return Ok(QuoteLookup::Empty);
    }

    let average_price = response
        .average_price
        .ok_or_else(|| ProviderError::malformed("price check response has no averagePrice"))?
        .to_units()?;

    let auctions = wire_auctions
        .into_iter()
        .map(|a| {
            Ok(Auction {
                price: a.price.to_units()?,
                auctioneer: a.auctioneer,
                auction_date: a.auction_date,
            })
        })
        .collect::<Result<Vec<_>, ProviderError>>()?;

    Ok(QuoteLookup::Quotes {
        auctions,
        average_price,
    })
}

/// Parses a sales log payload, interpreting naive timestamps at `offset`
///
/// Only a missing `items` list fails the payload. Individual records that
/// cannot be read are logged and skipped.
pub fn parse_sales_log(body: &str, offset: FixedOffset) -> Result<Vec<SaleEvent>, ProviderError> {
    let response: SalesLogResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::malformed(format!("Failed to parse sales log response: {}", e))
    })?;

    let items = response
        .items
        .ok_or_else(|| ProviderError::malformed("sales log response has no items"))?;

    let sales = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let item = record
                .get("item")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let parsed = serde_json::from_value::<WireSale>(record)
                .map_err(|e| ProviderError::malformed(e.to_string()))
                .and_then(|sale| sale.into_event(offset));

            match parsed {
                Ok(sale) => Some(sale),
                Err(e) => {
                    tracing::warn!(
                        item = %item,
                        index,
                        error = %e,
                        "Skipping unparseable sale record"
                    );
                    None
                }
            }
        })
        .collect();

    Ok(sales)
}

/// Parses an RFC 3339 timestamp, or a naive one taken to be at `offset`
pub fn parse_sale_timestamp(raw: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    SALE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Client for the TLP auctions API
pub struct TlpAuctionsProvider {
    client: Client,
    base_url: String,
    server_name: String,
    sales_utc_offset: FixedOffset,
}

impl TlpAuctionsProvider {
    /// Creates a new provider from the monitor configuration
    pub fn new(config: &MonitorConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            server_name: config.server_name.clone(),
            sales_utc_offset: config.sales_utc_offset,
        })
    }

    /// Issues a GET against `endpoint` and returns the body of a successful response
    async fn get_text(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<String, ProviderError> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(url = %url, ?query, "Requesting auction data");

        let response = self
            .client
            .get(&url)
            .query(&[("serverName", self.server_name.as_str())])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::upstream("rate limit exceeded"));
        }
        if !status.is_success() {
            return Err(ProviderError::upstream(format!(
                "HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            )));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl MarketDataProvider for TlpAuctionsProvider {
    async fn fetch_rate(&self) -> Result<ExchangeRate, ProviderError> {
        let body = self.get_text(RATE_ENDPOINT, &[]).await?;
        ExchangeRate::from_response_body(&body)
    }

    async fn fetch_quotes(&self, item_name: &str) -> Result<QuoteLookup, ProviderError> {
        let body = self
            .get_text(PRICE_CHECK_ENDPOINT, &[("searchText", item_name)])
            .await?;
        parse_price_check(&body)
    }

    async fn fetch_sales(&self, item_name: &str) -> Result<Vec<SaleEvent>, ProviderError> {
        let body = self
            .get_text(
                SALES_LOG_ENDPOINT,
                &[("exact", "true"), ("searchText", item_name)],
            )
            .await?;
        let sales = parse_sales_log(&body, self.sales_utc_offset)?;

        tracing::debug!(item = %item_name, count = sales.len(), "Fetched sales log");
        Ok(sales)
    }

    fn provider_name(&self) -> &'static str {
        "tlp-auctions"
    }
}
