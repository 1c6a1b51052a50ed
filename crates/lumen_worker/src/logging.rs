//! Diagnostics and logger setup

use log::LevelFilter;

/// Process-wide diagnostic flags, set at start-up and by `initialize`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Diagnostics {
    pub debug: bool,
    pub log_level: u32,
}

impl Diagnostics {
    pub fn new(debug: bool, log_level: u32) -> Self {
        Self { debug, log_level }
    }

    /// Log filter for these flags
    pub fn level_filter(&self) -> LevelFilter {
        if self.debug {
            return LevelFilter::Trace;
        }
        match self.log_level {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }

    /// Apply the filter to the running logger
    pub fn apply(&self) {
        log::set_max_level(self.level_filter());
    }
}

/// Initialise `env_logger`; `RUST_LOG` overrides the derived default
pub fn init(diagnostics: Diagnostics) {
    let default = diagnostics.level_filter().to_string().to_lowercase();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(Diagnostics::new(false, 0).level_filter(), LevelFilter::Warn);
        assert_eq!(Diagnostics::new(false, 1).level_filter(), LevelFilter::Info);
        assert_eq!(Diagnostics::new(false, 2).level_filter(), LevelFilter::Debug);
        assert_eq!(Diagnostics::new(false, 9).level_filter(), LevelFilter::Debug);
        assert_eq!(Diagnostics::new(true, 0).level_filter(), LevelFilter::Trace);
    }
}
