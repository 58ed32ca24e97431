//! Subscriber setup for binaries and tests.

use tracing_subscriber::EnvFilter;

/// Install a stderr fmt subscriber filtered at `level`.
///
/// `RUST_LOG` overrides `level` when set. An unparsable level falls back to
/// `info`. Returns false if a global subscriber was already installed.
pub fn init_logging(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        init_logging("debug");
        assert!(!init_logging("warn"));
    }
}
