use super::ui;
use crate::core::config::AppConfig;
use crate::core::{AggregationReport, Aggregator, SiteOutcome};
use crate::providers::MercadoLibreProvider;
use anyhow::{Context, Result};
use comfy_table::Cell;
use std::sync::Arc;
use tracing::debug;

/// Command line overrides for the `rates` command.
#[derive(Debug, Clone, Default)]
pub struct RatesArgs {
    pub currency: Option<String>,
    pub sequential: bool,
    pub report: bool,
}

impl AggregationReport {
    pub fn display_as_table(&self) -> String {
        let target_currency = &self.target_currency;
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Site"),
            ui::header_cell("Currency"),
            ui::header_cell(&format!("Ratio ({target_currency})")),
            ui::header_cell("Status"),
        ]);

        for site in &self.resolved {
            table.add_row(vec![
                Cell::new(&site.site_id),
                Cell::new(&site.conversion.from),
                ui::ratio_cell(site.conversion.ratio),
                ui::status_cell("resolved", true),
            ]);
        }
        for site in &self.dropped {
            table.add_row(vec![
                Cell::new(&site.site_id),
                ui::na_cell(),
                ui::na_cell(),
                ui::status_cell(&site.error.to_string(), false),
            ]);
        }

        let mut output = format!(
            "Conversion ratios to {}\n\n",
            ui::style_text(target_currency, ui::StyleType::Title)
        );
        output.push_str(&table.to_string());

        let dropped_style = if self.dropped.is_empty() {
            ui::StyleType::TotalValue
        } else {
            ui::StyleType::Error
        };
        output.push_str(&format!(
            "\n\n{} {}    {} {}",
            ui::style_text("Currencies:", ui::StyleType::TotalLabel),
            ui::style_text(&self.table.len().to_string(), ui::StyleType::TotalValue),
            ui::style_text("Dropped sites:", ui::StyleType::TotalLabel),
            ui::style_text(&self.dropped.len().to_string(), dropped_style),
        ));

        output
    }
}

pub fn build_aggregator(config: &AppConfig, args: &RatesArgs) -> Result<Aggregator> {
    let mut config = config.clone();
    if let Some(currency) = &args.currency {
        config.currency = currency.clone();
    }
    let mut options = config
        .aggregator_options()
        .context("Invalid rates options")?;
    if args.sequential {
        options.max_concurrency = Some(1);
    }
    debug!(?options, "Aggregator options");

    let provider = Arc::new(
        MercadoLibreProvider::new(config.mercadolibre_url(), config.request_timeout())
            .context("Failed to create marketplace client")?,
    );
    Ok(Aggregator::new(provider.clone(), provider, options))
}

/// Runs a full aggregation, optionally drawing a progress bar on stderr.
pub async fn fetch_report(
    config: &AppConfig,
    args: &RatesArgs,
    show_progress: bool,
) -> Result<AggregationReport> {
    let aggregator = build_aggregator(config, args)?;

    let pb = if show_progress {
        ui::new_progress_bar()
    } else {
        indicatif::ProgressBar::hidden()
    };
    pb.set_message("Resolving sites...");

    let pb_clone = pb.clone();
    let report = aggregator
        .aggregate_with_progress(move |outcome: &SiteOutcome, total| {
            pb_clone.set_length(total as u64);
            pb_clone.set_message(format!("Received {}", outcome.site_id()));
            pb_clone.inc(1);
        })
        .await
        .context("Error when trying to get currencies")?;
    pb.finish_and_clear();

    Ok(report)
}

pub async fn run(config: &AppConfig, args: &RatesArgs) -> Result<()> {
    let report = fetch_report(config, args, true).await?;

    let json = serde_json::to_string(&report.table).context("Failed to serialize currencies")?;
    println!("{json}");

    if args.report {
        eprintln!("{}", report.display_as_table());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregator::{DroppedSite, ResolvedSite};
    use crate::core::{CollisionPolicy, ConversionTable, CurrencyConversion, FetchError};

    fn sample_report() -> AggregationReport {
        let conversion = CurrencyConversion {
            from: "ARS".to_string(),
            to: "USD".to_string(),
            ratio: 0.0025,
        };
        let mut table = ConversionTable::new();
        table.merge(&conversion, CollisionPolicy::KeepLast);

        AggregationReport {
            target_currency: "USD".to_string(),
            table,
            resolved: vec![ResolvedSite {
                site_id: "MLA".to_string(),
                conversion,
            }],
            dropped: vec![DroppedSite {
                site_id: "MLB".to_string(),
                error: FetchError::Status {
                    url: "http://localhost/sites/MLB".to_string(),
                    status: 503,
                },
            }],
        }
    }

    #[test]
    fn test_report_table_lists_resolved_and_dropped_sites() {
        console::set_colors_enabled(false);
        let output = sample_report().display_as_table();

        assert!(output.contains("Conversion ratios to USD"));
        assert!(output.contains("MLA"));
        assert!(output.contains("0.002500"));
        assert!(output.contains("MLB"));
        assert!(output.contains("HTTP error: 503"));
        assert!(output.contains("Dropped sites: 1"));
    }

    #[test]
    fn test_overrides_apply_to_options() {
        let config = AppConfig::default();
        let args = RatesArgs {
            currency: Some("eur".to_string()),
            sequential: true,
            report: false,
        };

        let aggregator = build_aggregator(&config, &args).unwrap();
        assert_eq!(aggregator.options().target_currency, "EUR");
        assert_eq!(aggregator.options().max_concurrency, Some(1));
    }

    #[test]
    fn test_blank_currency_override_is_rejected() {
        let args = RatesArgs {
            currency: Some("  ".to_string()),
            ..Default::default()
        };

        let err = build_aggregator(&AppConfig::default(), &args)
            .err()
            .expect("blank currency should be rejected");
        assert!(format!("{err:#}").contains("Target currency must not be empty"));
    }

    #[test]
    fn test_override_does_not_bypass_config_checks() {
        let mut config = AppConfig::default();
        config.aggregation.request_timeout_secs = Some(0);
        let args = RatesArgs {
            currency: Some("EUR".to_string()),
            ..Default::default()
        };

        assert!(build_aggregator(&config, &args).is_err());
    }
}
