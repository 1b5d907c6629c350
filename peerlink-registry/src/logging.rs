use tracing_subscriber::EnvFilter;

/// Installs a stderr `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_filter`. Does nothing if a global
/// subscriber is already set.
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_tracing("debug");
        init_tracing("warn");
        tracing::info!("still logging");
    }
}
