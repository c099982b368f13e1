use std::env::var_os;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use dotenv::var;
use keycomb::KbdConfig;
use keycomb_gpio::GpioActiveLevel;
use serde::{Serialize, Deserialize};

const DEFAULT_CONFIG_FILE: &str = "keycomb.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Key pins, least significant bit of the key code first.
    pub key_pins: Vec<u8>,
    pub active_low: bool,
    /// Pins that, held together, start and end a pattern. Empty for the first key.
    pub pattern_key_pins: Vec<u8>,
    pub bounce_ms: u64,
    pub double_click_ms: u64,
    pub long_press_report_ms: u64,
    pub pattern_hold_min_ms: u64,
    pub pattern_hold_max_ms: u64,
    pub pattern_timeout_ms: u64,
    pub max_pattern_len: usize,
    pub wait_for_ack: bool,
    /// Pattern that unlocks the detailed event output. `None` skips the password prompt.
    pub password: Option<String>,
    pub password_tries: u8,
    pub password_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Config {
    pub fn try_load() -> Option<Self> {
        let config_str = var_os("CONFIG_FILE");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new(DEFAULT_CONFIG_FILE));
        let config_path = Path::new(config_str);
        if config_path.exists() {
            let file = std::fs::File::open(config_path).ok()?;
            let reader = std::io::BufReader::new(file);
            serde_json::from_reader(reader).ok()
        } else {
            None
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        let config_str = var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let config_path = Path::new(&config_str);
        let file = std::fs::File::create(config_path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn active_level(&self) -> GpioActiveLevel {
        if self.active_low {
            GpioActiveLevel::Low
        } else {
            GpioActiveLevel::High
        }
    }

    pub fn kbd_config(&self) -> KbdConfig {
        KbdConfig::default()
            .with_bounce_time(Duration::from_millis(self.bounce_ms))
            .with_double_click_time(Duration::from_millis(self.double_click_ms))
            .with_long_press_report(Duration::from_millis(self.long_press_report_ms))
            .with_pattern_hold(
                Duration::from_millis(self.pattern_hold_min_ms),
                Duration::from_millis(self.pattern_hold_max_ms),
            )
            .with_pattern_timeout(Duration::from_millis(self.pattern_timeout_ms))
            .with_max_pattern_len(self.max_pattern_len)
            .with_wait_for_ack(self.wait_for_ack)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            key_pins: vec![0, 2, 4, 36],
            active_low: true,
            pattern_key_pins: vec![0, 2],
            bounce_ms: 50,
            double_click_ms: 300,
            long_press_report_ms: 500,
            pattern_hold_min_ms: 2500,
            pattern_hold_max_ms: 5000,
            pattern_timeout_ms: 30_000,
            max_pattern_len: 8,
            wait_for_ack: false,
            password: Some("12488421".to_string()),
            password_tries: 3,
            password_timeout_ms: 10_000,
            poll_interval_ms: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_keyboard_defaults() {
        assert_eq!(Config::default().kbd_config(), KbdConfig::default());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = serde_json::from_str(r#"{ "key_pins": [5, 6], "password": null }"#).unwrap();
        assert_eq!(config.key_pins, vec![5, 6]);
        assert_eq!(config.password, None);
        assert_eq!(config.bounce_ms, 50);
        assert_eq!(config.active_level(), GpioActiveLevel::Low);
    }
}
