//! Core business logic abstractions

pub mod aggregator;
pub mod config;
pub mod currency;
pub mod error;
pub mod log;
pub mod resolver;
pub mod site;

// Re-export main types for cleaner imports
pub use aggregator::{AggregationReport, Aggregator, AggregatorOptions, SiteOutcome};
pub use currency::{CollisionPolicy, ConversionTable, CurrencyConversion, CurrencyRateProvider};
pub use error::FetchError;
pub use site::{Site, SiteRepository, SiteSummary};
