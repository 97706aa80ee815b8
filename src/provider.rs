//! Provider abstraction for the remote auction service

use crate::{
    error::ProviderError,
    types::{ExchangeRate, QuoteLookup, SaleEvent},
};
use async_trait::async_trait;

/// Trait for auction data providers
///
/// One implementation talks to the live service; tests substitute a mock.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches the current exchange rate between the two denominations
    ///
    /// Never cached: every caller gets the rate as of this request.
    async fn fetch_rate(&self) -> Result<ExchangeRate, ProviderError>;

    /// Runs a free-text price check for `item_name`
    ///
    /// # Returns
    /// `QuoteLookup::Empty` when the service knows no recent auctions,
    /// `MalformedResponse` when the expected keys are missing
    async fn fetch_quotes(&self, item_name: &str) -> Result<QuoteLookup, ProviderError>;

    /// Fetches the sales log for an exact item name
    async fn fetch_sales(&self, item_name: &str) -> Result<Vec<SaleEvent>, ProviderError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}
