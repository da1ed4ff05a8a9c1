use chrono::NaiveTime;
use dotenv::dotenv;
use std::env;

const EXPIRY_CUTOFF: &str = "EXPIRY_CUTOFF";

/// Engine construction parameters.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Local time of day at which resting GoodForDay orders are cancelled.
    pub expiry_cutoff: NaiveTime,
}

impl EngineConfig {
    pub fn from_env() -> EngineConfig {
        match Self::try_from_env() {
            Ok(config) => config,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_from_env() -> Result<EngineConfig, String> {
        // Load .env file
        dotenv().ok();

        let expiry_cutoff = match env::var(EXPIRY_CUTOFF) {
            Ok(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S").map_err(|_| {
                format!(
                    "failed to parse environment variable {} as HH:MM:SS: {}",
                    EXPIRY_CUTOFF, raw
                )
            })?,
            Err(_) => default_cutoff(),
        };

        Ok(EngineConfig { expiry_cutoff })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            expiry_cutoff: default_cutoff(),
        }
    }
}

fn default_cutoff() -> NaiveTime {
    NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN)
}
