//! Allows engine settings to be read from settings.json
//!
//! The host application drops a json file next to the unit so deployments can
//! tweak analysis parameters without a rebuild.  Anything not in the file
//! falls back to the defaults baked into [`EngineSettings`].
use crate::common::box_error::BoxError;
use json::JsonValue;
use log::{info, warn};
use regex::Regex;
use std::{
    error::Error,
    fmt,
    io::ErrorKind,
};

#[derive(Debug)]
pub struct MissingConfigError {
    key: String,
}

impl fmt::Display for MissingConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Required configuration value '{}' is missing", self.key)
    }
}

impl Error for MissingConfigError {}

pub struct Config {
    filename: String,
    settings: JsonValue,
    defaults: JsonValue,
}

impl Config {
    pub fn build(filename: String, defaults: JsonValue) -> Result<Config, std::io::Error> {
        // Validate filename only contains valid characters and ends in .json
        let filename_regex = Regex::new(r"^[a-zA-Z0-9_\-\.]+\.json$").unwrap();
        if !filename_regex.is_match(&filename) {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "Invalid filename - must contain only letters, numbers, underscore, dash, dot and end in .json"
            ));
        }

        let mut config = Config {
            filename,
            settings: json::object! {},
            defaults,
        };

        if let Err(err) = config.load_from_file() {
            warn!("Using default settings: {}", err);
        }

        Ok(config)
    }

    fn load_from_file(&mut self) -> std::io::Result<()> {
        match std::fs::read_to_string(&self.filename) {
            Ok(raw_data) => {
                match json::parse(&raw_data) {
                    Ok(parsed) => {
                        self.settings.clone_from(&parsed);
                        info!(
                            "Loaded settings from {}: {}",
                            self.filename,
                            self.settings.pretty(2)
                        );
                        Ok(())
                    }
                    Err(err) => {
                        warn!("Failed to parse config file {}: {}", self.filename, err);
                        Ok(())
                    }
                }
            }
            Err(err) => Err(err),
        }
    }

    pub fn get_str_value(
        &self,
        key: &str,
        default: Option<String>,
    ) -> Result<String, MissingConfigError> {
        if let Some(val) = self.settings[key].as_str() {
            return Ok(val.to_string());
        }
        if let Some(def) = default {
            return Ok(def);
        }
        if let Some(val) = self.defaults[key].as_str() {
            return Ok(val.to_string());
        }
        Err(MissingConfigError {
            key: key.to_string(),
        })
    }

    pub fn get_f64_value(&self, key: &str, default: Option<f64>) -> Result<f64, MissingConfigError> {
        if let Some(val) = self.settings[key].as_f64() {
            return Ok(val);
        }
        if let Some(def) = default {
            return Ok(def);
        }
        if let Some(val) = self.defaults[key].as_f64() {
            return Ok(val);
        }
        Err(MissingConfigError {
            key: key.to_string(),
        })
    }

    pub fn get_u32_value(&self, key: &str, default: Option<u32>) -> Result<u32, MissingConfigError> {
        if let Some(val) = self.settings[key].as_u32() {
            return Ok(val);
        }
        if let Some(def) = default {
            return Ok(def);
        }
        if let Some(val) = self.defaults[key].as_u32() {
            return Ok(val);
        }
        Err(MissingConfigError {
            key: key.to_string(),
        })
    }
}

/// Typed view of the tunables the engine cares about.
///
/// Defaults track the values the karaoke unit ships with: 200ms analysis
/// ticks over 2048 sample frames, heavy smoothing on the backing track and a
/// lighter touch on the mic so attacks show up quickly.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub analysis_interval_ms: u32,
    pub frame_size: usize,
    pub overlap: usize,
    pub algorithm: String,
    pub mic_smoothing_factor: f64,
    pub ref_smoothing_factor: f64,
    pub history_size: usize,
    pub min_frequency: f64,
    pub max_frequency: f64,
    pub time_window: f64,
    pub accuracy_threshold: f64,
    pub perfect_match_score: u64,
    pub near_match_score: u64,
}

impl Default for EngineSettings {
    fn default() -> EngineSettings {
        EngineSettings {
            analysis_interval_ms: 200,
            frame_size: 2048,
            overlap: 0,
            algorithm: String::from("autocorrelation"),
            mic_smoothing_factor: 0.8,
            ref_smoothing_factor: 0.98,
            history_size: 10,
            min_frequency: 50.0,
            max_frequency: 2000.0,
            time_window: 0.4,
            accuracy_threshold: 100.0,
            perfect_match_score: 100,
            near_match_score: 50,
        }
    }
}

impl EngineSettings {
    /// Load settings from a json file, filling gaps from the defaults above.
    pub fn load(filename: &str) -> Result<EngineSettings, BoxError> {
        let defs = EngineSettings::default();
        let defaults = json::object! {
            "analysis_interval_ms": defs.analysis_interval_ms,
            "frame_size": defs.frame_size,
            "overlap": defs.overlap,
            "algorithm": defs.algorithm.as_str(),
            "mic_smoothing_factor": defs.mic_smoothing_factor,
            "ref_smoothing_factor": defs.ref_smoothing_factor,
            "history_size": defs.history_size,
            "min_frequency": defs.min_frequency,
            "max_frequency": defs.max_frequency,
            "time_window": defs.time_window,
            "accuracy_threshold": defs.accuracy_threshold,
            "perfect_match_score": defs.perfect_match_score as u32,
            "near_match_score": defs.near_match_score as u32,
        };
        let config = Config::build(String::from(filename), defaults)?;
        Ok(EngineSettings {
            analysis_interval_ms: config.get_u32_value("analysis_interval_ms", None)?,
            frame_size: config.get_u32_value("frame_size", None)? as usize,
            overlap: config.get_u32_value("overlap", None)? as usize,
            algorithm: config.get_str_value("algorithm", None)?,
            mic_smoothing_factor: config.get_f64_value("mic_smoothing_factor", None)?,
            ref_smoothing_factor: config.get_f64_value("ref_smoothing_factor", None)?,
            history_size: config.get_u32_value("history_size", None)? as usize,
            min_frequency: config.get_f64_value("min_frequency", None)?,
            max_frequency: config.get_f64_value("max_frequency", None)?,
            time_window: config.get_f64_value("time_window", None)?,
            accuracy_threshold: config.get_f64_value("accuracy_threshold", None)?,
            perfect_match_score: config.get_u32_value("perfect_match_score", None)? as u64,
            near_match_score: config.get_u32_value("near_match_score", None)? as u64,
        })
    }
}
