//! Auction data provider implementations

pub mod tlp;

pub use tlp::TlpAuctionsProvider;
