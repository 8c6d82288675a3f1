use serde::{Deserialize, Serialize};

/// Verbosity of logging, either from a config file or a count of `-v` flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logging {
    pub level: usize,
}

impl Logging {
    pub const OFF: usize = 0;
    pub const ERROR: usize = 1;
    pub const WARN: usize = 2;
    pub const INFO: usize = 3;
    pub const DEBUG: usize = 4;
    pub const TRACE: usize = 5;

    /// Starts from the default level and raises it once per `-v`.
    pub fn from_verbosity(count: u8) -> Self {
        Self {
            level: Self::INFO + count as usize,
        }
    }

    /// Converts a logging level to a `log::LevelFilter`.
    pub fn filter(&self) -> log::LevelFilter {
        match self.level {
            0 => log::LevelFilter::Off,
            1 => log::LevelFilter::Error,
            2 => log::LevelFilter::Warn,
            3 => log::LevelFilter::Info,
            4 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

impl Default for Logging {
    fn default() -> Self {
        Self { level: Self::INFO }
    }
}
