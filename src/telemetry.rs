//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! - LOG_LEVEL holds an EnvFilter directive, e.g. "debug" or
//!   "info,session=debug,daily_pack=trace".
//! - LOG_FORMAT selects "pretty" (default), "compact" or "json".
//!
//! Engine events use the targets `session`, `daily_pack`, `leaderboard` and
//! `content`; process-level events use `trivia_backend`. The TraceLayer on the
//! router adds one span per request on top of these.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str =
    "info,session=debug,leaderboard=debug,trivia_backend=debug,tower_http=info,axum=info";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    fn from_env_value(v: Option<&str>) -> Self {
        match v.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(s) if s.eq_ignore_ascii_case("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // Each arm ends in a different subscriber type, so init inside the match.
    let format = LogFormat::from_env_value(std::env::var("LOG_FORMAT").ok().as_deref());
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_falls_back_to_pretty() {
        assert_eq!(LogFormat::from_env_value(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some("compact")), LogFormat::Compact);
        assert_eq!(LogFormat::from_env_value(Some("fancy")), LogFormat::Pretty);
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Pretty);
    }

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
