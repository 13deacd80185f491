//! Logging setup for the command line tool

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install a stderr fmt subscriber filtered by `RUST_LOG`, falling back to
/// `info` for this crate (`debug` when `verbose`) and `warn` elsewhere
pub fn init_tracing(verbose: bool) -> crate::Result<()> {
    let default_directives = if verbose {
        "warn,proxy_probe=debug"
    } else {
        "warn,proxy_probe=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}
