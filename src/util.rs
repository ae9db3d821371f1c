use tracing::level_filters::LevelFilter;

const LOG_LEVEL: &str = "LATENCY_GUARD_LOG";

const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::INFO;

pub fn get_log_level() -> LevelFilter {
    let level_from_env = std::env::var(LOG_LEVEL);
    level_from_env.map_or(DEFAULT_LOG_LEVEL, |res| parse_level(&res))
}

fn parse_level(value: &str) -> LevelFilter {
    value.trim().parse().unwrap_or(DEFAULT_LOG_LEVEL)
}
