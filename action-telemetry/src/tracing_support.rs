//! Structured tracing setup.

use tracing_subscriber::EnvFilter;

/// Installs a formatting subscriber unless the host already installed one.
///
/// `default_filter` applies when `RUST_LOG` is unset, e.g. `"info"` or
/// `"action_bridge=debug,info"`. Returns `true` if this call installed the
/// subscriber.
pub fn init_tracing(default_filter: &str) -> bool {
    if tracing::dispatcher::has_been_set() {
        return false;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
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
    fn second_initialisation_is_a_no_op() {
        init_tracing("warn");
        assert!(!init_tracing("debug"));
    }
}
