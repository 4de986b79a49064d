use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

const APP_TARGET: &str = "sitefx";

fn app_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::OFF
    }
}

/// Installs the global subscriber. Events go to stderr so stdout only carries
/// the conversion table.
pub fn init_logging(verbose: bool) {
    let level = app_level(verbose);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));
    let app_filter = Targets::new().with_target(APP_TARGET, level);

    let stderr_layer = fmt::layer()
        .pretty()
        .without_time()
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(app_filter)
        .with(env_filter)
        .init();
}
