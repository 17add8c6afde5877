/**
 * Configuration loaded from a TOML file, following the teacher's own
 * `config.rs` (a flat, fully-`Deserialize`-derived struct tree loaded once
 * at startup; see SPEC_FULL.md §4.7).
 */

/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Deserialize;
use std::fs;
use std::time::Duration;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Deserialize, Clone)]
pub struct Config {
    pub hardware: HardwareConfig,
    pub engine: EngineConfig,
}

#[derive(Deserialize, Clone)]
pub struct HardwareConfig {
    pub driver_address: String,
    pub n_floors: u8,
}

#[derive(Deserialize, Clone)]
pub struct EngineConfig {
    pub speed: u32,
    pub wait_threshold_ms: u64,
    pub keep_alive_ms: u64,
    pub tick_interval_ms: u64,
    pub heartbeat_timeout_ms: u64,
    pub watchdog_poll_interval_ms: u64,
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn wait_threshold(&self) -> Duration {
        Duration::from_millis(self.wait_threshold_ms)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    pub fn watchdog_poll_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_poll_interval_ms)
    }
}

/***************************************/
/*             Public API              */
/***************************************/

/// Reads and parses `path`. Kept fallible (unlike the teacher's
/// `load_config`, which panics via `.expect`) so `main` can log through
/// `unwrap_or_exit!` instead of an unannotated panic, see SPEC_FULL.md §4.7.
pub fn load_config(path: &str) -> Result<Config, String> {
    let config_str = fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path, e))?;
    toml::from_str(&config_str).map_err(|e| format!("failed to parse {}: {}", path, e))
}

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_complete_config() {
        let toml_src = r#"
            [hardware]
            driver_address = "127.0.0.1:15657"
            n_floors = 4

            [engine]
            speed = 300
            wait_threshold_ms = 3000
            keep_alive_ms = 15000
            tick_interval_ms = 20
            heartbeat_timeout_ms = 1000
            watchdog_poll_interval_ms = 100
        "#;
        let config: Config = toml::from_str(toml_src).expect("valid config");
        assert_eq!(config.hardware.n_floors, 4);
        assert_eq!(config.engine.wait_threshold(), Duration::from_secs(3));
    }

    #[test]
    fn missing_file_is_reported_not_panicked() {
        let result = load_config("/nonexistent/path/to/config.toml");
        assert!(result.is_err());
    }
}
