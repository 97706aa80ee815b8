//! On-demand price checks

use crate::{
    error::ProviderError,
    format::PriceFormatter,
    provider::MarketDataProvider,
    types::{QuoteLookup, QuoteReport},
};
use std::sync::Arc;

/// Outcome of a price check that reached the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteResult {
    Found(QuoteReport),
    /// The service returned an empty auction list
    Empty { item_name: String },
}

impl QuoteResult {
    pub fn item_name(&self) -> &str {
        match self {
            QuoteResult::Found(report) => &report.item_name,
            QuoteResult::Empty { item_name } => item_name,
        }
    }
}

/// Checks current asking prices for single items
#[derive(Clone)]
pub struct MarketPoller {
    provider: Arc<dyn MarketDataProvider>,
    formatter: PriceFormatter,
}

impl MarketPoller {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self::with_formatter(provider, PriceFormatter::default())
    }

    pub fn with_formatter(provider: Arc<dyn MarketDataProvider>, formatter: PriceFormatter) -> Self {
        Self { provider, formatter }
    }

    /// Fetches the rate, then the quotes for `item_name`
    ///
    /// A rate failure skips the quote request entirely: without a rate there
    /// is nothing to format.
    pub async fn check(&self, item_name: &str) -> Result<QuoteResult, ProviderError> {
        let rate = self.provider.fetch_rate().await?;

        match self.provider.fetch_quotes(item_name).await? {
            QuoteLookup::Empty => {
                tracing::info!(item = %item_name, "No recent auctions");
                Ok(QuoteResult::Empty {
                    item_name: item_name.to_string(),
                })
            }
            QuoteLookup::Quotes {
                auctions,
                average_price,
            } => {
                tracing::info!(
                    item = %item_name,
                    rate = rate.units(),
                    "Recent prices using current exchange rate"
                );
                for auction in &auctions {
                    tracing::info!(
                        "{} ({})",
                        self.formatter.format(rate, auction.price),
                        auction.auctioneer
                    );
                }
                tracing::info!(
                    "Average price {}",
                    self.formatter.format(rate, average_price)
                );

                Ok(QuoteResult::Found(QuoteReport {
                    item_name: item_name.to_string(),
                    rate,
                    auctions,
                    average_price,
                }))
            }
        }
    }

    /// Text spoken for a check result
    pub fn announcement_text(&self, result: &QuoteResult) -> String {
        match result {
            QuoteResult::Found(report) => {
                let average = self.formatter.format(report.rate, report.average_price);
                match report.lowest_price() {
                    Some(lowest) => format!(
                        "{}: average {}, lowest {}",
                        report.item_name,
                        average,
                        self.formatter.format(report.rate, lowest)
                    ),
                    None => format!("{}: average {}", report.item_name, average),
                }
            }
            QuoteResult::Empty { item_name } => format!("No recent prices for {}", item_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;
    use crate::types::Auction;

    fn auction(price: u64, auctioneer: &str) -> Auction {
        Auction {
            price,
            auctioneer: auctioneer.to_string(),
            auction_date: "2026-10-16T10:00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn test_check_found() {
        let provider = Arc::new(MockProvider::new());
        provider.set_rate(1000);
        provider.set_quotes(
            "Cloak of Flames",
            Ok(QuoteLookup::Quotes {
                auctions: vec![auction(2500, "Soandso"), auction(1050, "Otherguy")],
                average_price: 1775,
            }),
        );
        let poller = MarketPoller::new(provider.clone());

        let result = poller.check("Cloak of Flames").await.unwrap();
        match &result {
            QuoteResult::Found(report) => {
                assert_eq!(report.rate.units(), 1000);
                assert_eq!(report.auctions.len(), 2);
                assert_eq!(report.average_price, 1775);
            }
            other => panic!("expected quotes, got {:?}", other),
        }
        assert_eq!(
            poller.announcement_text(&result),
            "Cloak of Flames: average 1 krono 775 platinum, lowest 1 krono"
        );
        assert_eq!(provider.calls(), vec!["rate", "quotes:Cloak of Flames"]);
    }

    #[tokio::test]
    async fn test_check_empty() {
        let provider = Arc::new(MockProvider::new());
        provider.set_rate(1000);
        provider.set_quotes("Rusty Dagger", Ok(QuoteLookup::Empty));
        let poller = MarketPoller::new(provider);

        let result = poller.check("Rusty Dagger").await.unwrap();
        assert_eq!(
            result,
            QuoteResult::Empty {
                item_name: "Rusty Dagger".to_string()
            }
        );
        assert_eq!(poller.announcement_text(&result), "No recent prices for Rusty Dagger");
    }

    #[tokio::test]
    async fn test_rate_failure_skips_quote_request() {
        let provider = Arc::new(MockProvider::new());
        provider.set_rate_error(ProviderError::upstream("connection refused"));
        let poller = MarketPoller::new(provider.clone());

        let err = poller.check("Cloak of Flames").await.unwrap_err();
        assert!(matches!(err, ProviderError::UpstreamUnavailable(_)));
        assert_eq!(provider.calls(), vec!["rate"]);
    }

    #[tokio::test]
    async fn test_malformed_quotes_propagate_as_error() {
        let provider = Arc::new(MockProvider::new());
        provider.set_rate(1000);
        provider.set_quotes(
            "Cloak of Flames",
            Err(ProviderError::malformed("no averagePrice")),
        );
        let poller = MarketPoller::new(provider);

        let err = poller.check("Cloak of Flames").await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }
}
