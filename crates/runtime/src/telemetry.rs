//! Tracing subscriber setup for binaries embedding the engine.

/// Installs a stderr `fmt` subscriber filtered by `RUST_LOG`, defaulting to
/// INFO.
///
/// Does nothing if a global subscriber is already installed, so tests and
/// hosts with their own subscriber can call it freely.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
