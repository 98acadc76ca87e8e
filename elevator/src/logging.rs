use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt as _,
};

use crate::config::LoggingConfig;

/// Installs the global subscriber. Keep the returned guard alive for as long
/// as file logging should be flushed.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::Layer::new().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let (json_layer, text_layer) = if config.json {
        let layer = fmt::Layer::new()
            .json()
            .with_writer(std::io::stdout)
            .with_span_events(FmtSpan::CLOSE);
        (Some(layer), None)
    } else {
        let layer = fmt::Layer::new()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_span_events(FmtSpan::CLOSE);
        (None, Some(layer))
    };

    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let subscriber = tracing_subscriber::registry()
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .with(filter);

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(guard)
}
