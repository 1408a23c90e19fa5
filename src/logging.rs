use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging for the relay.
///
/// Defaults to `info` for this crate and `warn` for dependencies; `RUST_LOG`
/// overrides it. Output goes to stderr so CLI output stays on stdout.
pub fn init(service_name: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,{service_name}=info,reddit=info")));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
