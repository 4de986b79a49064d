//! Resolves a site's default currency into a conversion against a target currency.

use super::currency::{CurrencyConversion, CurrencyRateProvider};
use super::error::FetchError;
use super::site::SiteRepository;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Two sequential hops per site: fetch the site, then fetch the rate from its
/// default currency. Cheap to clone so every resolver task can own one.
#[derive(Clone)]
pub struct ConversionResolver {
    sites: Arc<dyn SiteRepository>,
    rates: Arc<dyn CurrencyRateProvider>,
}

impl ConversionResolver {
    pub fn new(sites: Arc<dyn SiteRepository>, rates: Arc<dyn CurrencyRateProvider>) -> Self {
        Self { sites, rates }
    }

    #[instrument(name = "ResolveSite", skip(self))]
    pub async fn resolve(
        &self,
        site_id: &str,
        target_currency: &str,
    ) -> Result<CurrencyConversion, FetchError> {
        let site = self.sites.get_site(site_id).await?;

        debug!(
            "About to convert from '{}' to '{}'",
            site.default_currency_id, target_currency
        );
        let ratio = self
            .rates
            .get_rate(&site.default_currency_id, target_currency)
            .await?;

        // from/to come from the request, never from the API payload
        Ok(CurrencyConversion {
            from: site.default_currency_id,
            to: target_currency.to_string(),
            ratio,
        })
    }
}
