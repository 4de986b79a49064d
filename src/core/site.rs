//! Marketplace sites and the repository abstraction that serves them

use super::error::FetchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Entry of the site listing. The listing endpoint returns fewer fields than
/// the per-site endpoint, so it gets its own type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSummary {
    pub id: String,
    pub name: String,
}

/// A regional marketplace and its default currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub name: String,
    pub country_id: String,
    pub default_currency_id: String,
}

#[async_trait]
pub trait SiteRepository: Send + Sync {
    async fn list_sites(&self) -> Result<Vec<SiteSummary>, FetchError>;
    async fn get_site(&self, id: &str) -> Result<Site, FetchError>;
}
