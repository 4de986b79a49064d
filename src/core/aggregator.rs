//! Fan-out/fan-in aggregation of conversion ratios across all sites.
//!
//! One resolver task is spawned per site. Every task writes exactly one
//! [`SiteOutcome`] to a shared channel, and a single collector task reads
//! exactly as many messages as there are sites, owning the output table.

use super::currency::{CollisionPolicy, ConversionTable, CurrencyConversion, CurrencyRateProvider};
use super::error::FetchError;
use super::resolver::ConversionResolver;
use super::site::SiteRepository;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, warn};

pub const DEFAULT_TARGET_CURRENCY: &str = "USD";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct AggregatorOptions {
    pub target_currency: String,
    /// `None` resolves every site at once.
    pub max_concurrency: Option<usize>,
    /// Deadline for resolving a single site, `None` waits forever.
    pub request_timeout: Option<Duration>,
    pub collision_policy: CollisionPolicy,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            target_currency: DEFAULT_TARGET_CURRENCY.to_string(),
            max_concurrency: None,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            collision_policy: CollisionPolicy::default(),
        }
    }
}

/// The single message each resolver task sends to the collector.
#[derive(Debug, Clone, PartialEq)]
pub enum SiteOutcome {
    Resolved {
        site_id: String,
        conversion: CurrencyConversion,
    },
    Failed {
        site_id: String,
        error: FetchError,
    },
}

impl SiteOutcome {
    pub fn site_id(&self) -> &str {
        match self {
            SiteOutcome::Resolved { site_id, .. } | SiteOutcome::Failed { site_id, .. } => site_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSite {
    pub site_id: String,
    pub conversion: CurrencyConversion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DroppedSite {
    pub site_id: String,
    pub error: FetchError,
}

/// Result of a full aggregation. Sites are listed in arrival order.
///
/// Every listed site ends up in exactly one of `resolved` or `dropped`. A
/// resolver task that dies before reporting is recorded as
/// [`FetchError::Aborted`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationReport {
    pub target_currency: String,
    pub table: ConversionTable,
    pub resolved: Vec<ResolvedSite>,
    pub dropped: Vec<DroppedSite>,
}

impl AggregationReport {
    pub fn site_count(&self) -> usize {
        self.resolved.len() + self.dropped.len()
    }
}

pub struct Aggregator {
    sites: Arc<dyn SiteRepository>,
    resolver: ConversionResolver,
    options: AggregatorOptions,
}

impl Aggregator {
    pub fn new(
        sites: Arc<dyn SiteRepository>,
        rates: Arc<dyn CurrencyRateProvider>,
        options: AggregatorOptions,
    ) -> Self {
        let resolver = ConversionResolver::new(Arc::clone(&sites), rates);
        Self {
            sites,
            resolver,
            options,
        }
    }

    pub fn options(&self) -> &AggregatorOptions {
        &self.options
    }

    pub async fn aggregate(&self) -> Result<AggregationReport, FetchError> {
        self.aggregate_with_progress(|_, _| {}).await
    }

    /// Same as [`Aggregator::aggregate`], calling `on_message` from the
    /// collector with every outcome and the total number of sites.
    ///
    /// Only a failure to list sites is returned as an error. Per-site failures
    /// end up in [`AggregationReport::dropped`].
    pub async fn aggregate_with_progress<F>(
        &self,
        on_message: F,
    ) -> Result<AggregationReport, FetchError>
    where
        F: FnMut(&SiteOutcome, usize) + Send + 'static,
    {
        let sites = self.sites.list_sites().await?;
        let expected = sites.len();
        info!(sites = expected, currency = %self.options.target_currency, "Aggregating conversion ratios");

        let report = AggregationReport {
            target_currency: self.options.target_currency.clone(),
            ..Default::default()
        };
        if expected == 0 {
            return Ok(report);
        }

        let (tx, rx) = mpsc::channel::<SiteOutcome>(1);

        // The collector has to be receiving before any resolver can send.
        let site_ids = sites.iter().map(|site| site.id.clone()).collect();
        let collector = tokio::spawn(collect(
            rx,
            site_ids,
            report,
            self.options.collision_policy,
            on_message,
        ));

        // Zero permits would never admit a task.
        let limiter = self
            .options
            .max_concurrency
            .map(|permits| Arc::new(Semaphore::new(permits.max(1))));

        for site in sites {
            let tx = tx.clone();
            let resolver = self.resolver.clone();
            let target = self.options.target_currency.clone();
            let deadline = self.options.request_timeout;
            let limiter = limiter.clone();

            tokio::spawn(async move {
                let _permit = match limiter {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                let outcome = resolve_site(&resolver, site.id, &target, deadline).await;
                if let Err(e) = tx.send(outcome).await {
                    warn!(site_id = %e.0.site_id(), "Collector stopped before receiving outcome");
                }
            });
        }
        drop(tx);

        let report = collector
            .await
            .unwrap_or_else(|e| std::panic::resume_unwind(e.into_panic()));
        debug!(
            resolved = report.resolved.len(),
            dropped = report.dropped.len(),
            currencies = report.table.len(),
            "Aggregation complete"
        );
        Ok(report)
    }
}

async fn resolve_site(
    resolver: &ConversionResolver,
    site_id: String,
    target_currency: &str,
    deadline: Option<Duration>,
) -> SiteOutcome {
    let result = match deadline {
        Some(after) => tokio::time::timeout(after, resolver.resolve(&site_id, target_currency))
            .await
            .unwrap_or_else(|_| {
                Err(FetchError::Timeout {
                    site_id: site_id.clone(),
                    after,
                })
            }),
        None => resolver.resolve(&site_id, target_currency).await,
    };

    match result {
        Ok(conversion) => SiteOutcome::Resolved {
            site_id,
            conversion,
        },
        Err(error) => SiteOutcome::Failed { site_id, error },
    }
}

async fn collect<F>(
    mut rx: mpsc::Receiver<SiteOutcome>,
    site_ids: Vec<String>,
    mut report: AggregationReport,
    policy: CollisionPolicy,
    mut on_message: F,
) -> AggregationReport
where
    F: FnMut(&SiteOutcome, usize),
{
    let expected = site_ids.len();
    let mut pending: HashMap<String, usize> = HashMap::new();
    for id in site_ids {
        *pending.entry(id).or_default() += 1;
    }

    for received in 0..expected {
        // None only when every sender is gone, i.e. a resolver task panicked
        let Some(outcome) = rx.recv().await else {
            warn!(received, expected, "Result channel closed early");
            break;
        };
        on_message(&outcome, expected);
        if let Some(count) = pending.get_mut(outcome.site_id()) {
            *count = count.saturating_sub(1);
        }

        match outcome {
            SiteOutcome::Resolved {
                site_id,
                conversion,
            } => {
                report.table.merge(&conversion, policy);
                report.resolved.push(ResolvedSite {
                    site_id,
                    conversion,
                });
            }
            SiteOutcome::Failed { site_id, error } => {
                warn!(site_id = %site_id, error = %error, "Dropping site from conversion table");
                report.dropped.push(DroppedSite { site_id, error });
            }
        }
    }

    for (site_id, count) in pending {
        for _ in 0..count {
            warn!(site_id = %site_id, "Dropping site whose resolver never reported");
            report.dropped.push(DroppedSite {
                site_id: site_id.clone(),
                error: FetchError::Aborted {
                    site_id: site_id.clone(),
                },
            });
        }
    }

    report
}
