use tracing_subscriber::EnvFilter;

pub(crate) const LOG_ENV: &str = "SUIVM_LOG";

/// Filter for `-v` repetitions when `SUIVM_LOG` is not set. The `suivm`
/// target prefix covers the binary and every `suivm_*` library crate.
pub(crate) fn default_directive(verbose: u8) -> String {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("suivm={level}")
}

pub(crate) fn init_tracing(verbose: u8) {
    let filter = std::env::var(LOG_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive(verbose)));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
