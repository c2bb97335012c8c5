//! Log filter setup shared by the stdio and HTTP binaries.

use tracing_subscriber::EnvFilter;

pub const LOG_LEVEL_ENV: &str = "CAPSULECARE_LOG_LEVEL";
/// Appended to every filter to keep rmcp internals quiet unless asked for.
pub const QUIET_TARGETS: &str = "rmcp=warn,serve_inner=warn";

/// `CAPSULECARE_LOG_LEVEL`, else `RUST_LOG`, else `info`.
pub fn log_level_from<F>(get: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    get(LOG_LEVEL_ENV)
        .or_else(|| get("RUST_LOG"))
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "info".to_string())
}

pub fn log_level() -> String {
    log_level_from(|key| std::env::var(key).ok())
}

pub fn filter_directive(level: &str) -> String {
    format!("{},{}", level, QUIET_TARGETS)
}

/// Falls back to `info` when the directive does not parse.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(filter_directive(level))
        .unwrap_or_else(|_| EnvFilter::new(filter_directive("info")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn own_variable_wins_over_rust_log() {
        let level = log_level_from(env(&[(LOG_LEVEL_ENV, "debug"), ("RUST_LOG", "warn")]));
        assert_eq!(level, "debug");
    }

    #[test]
    fn falls_back_to_rust_log_then_info() {
        assert_eq!(log_level_from(env(&[("RUST_LOG", "warn")])), "warn");
        assert_eq!(log_level_from(env(&[])), "info");
        assert_eq!(log_level_from(env(&[(LOG_LEVEL_ENV, " ")])), "info");
    }

    #[test]
    fn directive_quiets_rmcp() {
        assert_eq!(
            filter_directive("debug"),
            "debug,rmcp=warn,serve_inner=warn"
        );
    }
}
