//! Types for the market monitor

use crate::error::ProviderError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;
use uuid::Uuid;

/// An item on the sales watch list
///
/// Names are case-sensitive as entered and compared by exact equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackedItem {
    pub name: String,
}

impl TrackedItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for TrackedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Server-side identifier of one sale record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaleId(String);

impl SaleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A completed sale reported by the sales log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleEvent {
    pub id: SaleId,
    pub item_name: String,
    pub auctioneer: String,
    pub occurred_at: DateTime<Utc>,
}

/// Conversion rate between the lower and the higher denomination
///
/// Always positive, so it can be used as a divisor without further checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    units_per_higher_denomination: NonZeroU64,
}

impl ExchangeRate {
    /// Returns `None` for a zero rate
    pub fn new(units_per_higher_denomination: u64) -> Option<Self> {
        NonZeroU64::new(units_per_higher_denomination).map(|units| Self {
            units_per_higher_denomination: units,
        })
    }

    /// Lower units that make up one higher unit
    pub fn units(&self) -> u64 {
        self.units_per_higher_denomination.get()
    }

    /// Parses the leading integer of a rate endpoint body
    ///
    /// Everything from the first `.` on is discarded, so `"4321.87"` yields
    /// 4321. A body without a leading integer, or a zero rate, is reported as
    /// the upstream being unavailable.
    pub fn from_response_body(body: &str) -> Result<Self, ProviderError> {
        let leading = body.trim().split('.').next().unwrap_or_default().trim();
        let units = leading.parse::<u64>().map_err(|e| {
            ProviderError::upstream(format!("rate is not an integer ({:?}): {}", leading, e))
        })?;

        Self::new(units).ok_or_else(|| ProviderError::upstream("rate endpoint returned zero"))
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.units())
    }
}

/// A single asking price observed by the price check endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    /// Price in lower units
    pub price: u64,
    pub auctioneer: String,
    pub auction_date: String,
}

/// Raw price check payload, before the rate is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteLookup {
    /// `auctions` was present but empty
    Empty,
    /// At least one auction plus the average price
    Quotes {
        auctions: Vec<Auction>,
        average_price: u64,
    },
}

/// Price statistics for one item, together with the rate used to format them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteReport {
    pub item_name: String,
    pub rate: ExchangeRate,
    pub auctions: Vec<Auction>,
    /// Average price in lower units
    pub average_price: u64,
}

impl QuoteReport {
    /// Cheapest recent asking price
    pub fn lowest_price(&self) -> Option<u64> {
        self.auctions.iter().map(|a| a.price).min()
    }
}

/// A piece of text waiting to be spoken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncementRequest {
    pub text: String,
}

impl AnnouncementRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Events published by the monitor for any interested sink
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorEvent {
    /// A tracked item sold after tracking started
    SaleDetected {
        id: Uuid,
        sale: SaleEvent,
        timestamp: DateTime<Utc>,
    },

    /// A price check returned quotes
    QuoteChecked {
        id: Uuid,
        report: QuoteReport,
        timestamp: DateTime<Utc>,
    },

    /// A price check found no recent auctions
    QuoteEmpty {
        id: Uuid,
        item_name: String,
        timestamp: DateTime<Utc>,
    },

    /// A sales poll or price check failed
    CheckFailed {
        id: Uuid,
        item_name: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl MonitorEvent {
    pub fn sale_detected(sale: SaleEvent) -> Self {
        Self::SaleDetected {
            id: Uuid::new_v4(),
            sale,
            timestamp: Utc::now(),
        }
    }

    pub fn quote_checked(report: QuoteReport) -> Self {
        Self::QuoteChecked {
            id: Uuid::new_v4(),
            report,
            timestamp: Utc::now(),
        }
    }

    pub fn quote_empty(item_name: impl Into<String>) -> Self {
        Self::QuoteEmpty {
            id: Uuid::new_v4(),
            item_name: item_name.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn check_failed(item_name: impl Into<String>, error: &ProviderError) -> Self {
        Self::CheckFailed {
            id: Uuid::new_v4(),
            item_name: item_name.into(),
            error_message: error.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Get the event ID
    pub fn id(&self) -> Uuid {
        match self {
            MonitorEvent::SaleDetected { id, .. } => *id,
            MonitorEvent::QuoteChecked { id, .. } => *id,
            MonitorEvent::QuoteEmpty { id, .. } => *id,
            MonitorEvent::CheckFailed { id, .. } => *id,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            MonitorEvent::SaleDetected { .. } => "SALE_DETECTED",
            MonitorEvent::QuoteChecked { .. } => "QUOTE_CHECKED",
            MonitorEvent::QuoteEmpty { .. } => "QUOTE_EMPTY",
            MonitorEvent::CheckFailed { .. } => "CHECK_FAILED",
        }
    }
}

impl fmt::Display for MonitorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorEvent::SaleDetected { sale, .. } => {
                write!(f, "{} sold ({})", sale.item_name, sale.auctioneer)
            }
            MonitorEvent::QuoteChecked { report, .. } => write!(
                f,
                "{}: {} auctions, average {}",
                report.item_name,
                report.auctions.len(),
                report.average_price
            ),
            MonitorEvent::QuoteEmpty { item_name, .. } => {
                write!(f, "No recent prices for {}", item_name)
            }
            MonitorEvent::CheckFailed {
                item_name,
                error_message,
                ..
            } => write!(f, "Check failed for {}: {}", item_name, error_message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_truncates_fraction() {
        let rate = ExchangeRate::from_response_body("4321.87").unwrap();
        assert_eq!(rate.units(), 4321);

        let rate = ExchangeRate::from_response_body("  980\n").unwrap();
        assert_eq!(rate.units(), 980);
    }

    #[test]
    fn test_rate_rejects_garbage_and_zero() {
        for body in ["", ".5", "abc.1", "0.99", "-12.0"] {
            match ExchangeRate::from_response_body(body) {
                Err(ProviderError::UpstreamUnavailable(_)) => {}
                other => panic!("expected UpstreamUnavailable for {:?}, got {:?}", body, other),
            }
        }
    }

    #[test]
    fn test_zero_rate_not_constructible() {
        assert!(ExchangeRate::new(0).is_none());
        assert_eq!(ExchangeRate::new(1).map(|r| r.units()), Some(1));
    }

    #[test]
    fn test_lowest_price() {
        let report = QuoteReport {
            item_name: "Cloak of Flames".to_string(),
            rate: ExchangeRate::new(1000).unwrap(),
            auctions: vec![
                Auction {
                    price: 4200,
                    auctioneer: "Soandso".to_string(),
                    auction_date: "2026-10-16T10:00:00".to_string(),
                },
                Auction {
                    price: 3900,
                    auctioneer: "Otherguy".to_string(),
                    auction_date: "2026-10-16T09:00:00".to_string(),
                },
            ],
            average_price: 4050,
        };
        assert_eq!(report.lowest_price(), Some(3900));
    }

    #[test]
    fn test_event_type_tags() {
        let event = MonitorEvent::quote_empty("Fungus Covered Scale Tunic");
        assert_eq!(event.event_type(), "QUOTE_EMPTY");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "QUOTE_EMPTY");
        assert_eq!(json["item_name"], "Fungus Covered Scale Tunic");
    }
}
