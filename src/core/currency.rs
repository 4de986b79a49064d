//! Currency conversion types and the rate provider abstraction

use super::error::FetchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    /// Ratio to convert one unit of `from` into `to`.
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64, FetchError>;
}

/// One directed exchange rate observed at fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyConversion {
    pub from: String,
    pub to: String,
    pub ratio: f64,
}

/// Which value survives when two sites share a default currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Later arrivals overwrite earlier ones.
    #[default]
    KeepLast,
    /// The first arrival is kept, later ones are ignored.
    KeepFirst,
}

/// Currency code to ratio mapping. Serializes as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversionTable(BTreeMap<String, f64>);

impl ConversionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `conversion.from -> conversion.ratio`. Returns true when the
    /// currency was already present.
    pub fn merge(&mut self, conversion: &CurrencyConversion, policy: CollisionPolicy) -> bool {
        let collided = self.0.contains_key(&conversion.from);
        if collided {
            debug!(
                currency = %conversion.from,
                ratio = conversion.ratio,
                ?policy,
                "Currency already present in table"
            );
            if policy == CollisionPolicy::KeepFirst {
                return true;
            }
        }
        self.0.insert(conversion.from.clone(), conversion.ratio);
        collided
    }

    pub fn get(&self, currency: &str) -> Option<f64> {
        self.0.get(currency).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
