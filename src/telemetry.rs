use color_eyre::{eyre::eyre, Report};
use tracing::Level;
use tracing_subscriber::{filter::Directive, fmt::format::FmtSpan, EnvFilter};

/// Attaches a tracing subscriber to the daemon, honouring `RUST_LOG`.
///
/// Falls back to INFO when `RUST_LOG` is unset or invalid.
pub fn attach_tracing_logger() -> Result<(), Report> {
    let default_level: Directive = Level::INFO.into();
    let filtering_directive = "trapdoor=debug".parse().unwrap_or(default_level);

    let tracing_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(filtering_directive);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_filter)
        .with_span_events(FmtSpan::CLOSE)
        .try_init()
        .map_err(|err| eyre!("failed to attach tracing subscriber: {err}"))
}
