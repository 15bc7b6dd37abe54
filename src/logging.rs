//! Log output setup.
//!
//! The crate only talks to the `log` facade. Binaries and demos call [`init`]
//! once at startup; `RUST_LOG`, when set, refines the configured level.

use crate::config::LogLevel;

/// Installs `env_logger` at `level`. Returns `false` if a logger was already installed.
pub fn init(level: LogLevel) -> bool {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level.into()).format_timestamp_millis();
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    match builder.try_init() {
        Ok(()) => {
            log::debug!("logging initialised at {level:?}");
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_refused() {
        init(LogLevel::Warn);
        assert!(!init(LogLevel::Debug));
    }
}
