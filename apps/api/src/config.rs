use std::path::PathBuf;

use anyhow::{Context, Result};

/// Minimum job-description length accepted by the resume optimizer when
/// `RESUME_JD_MIN_CHARS` is not set.
pub const DEFAULT_JD_MIN_CHARS: usize = 50;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Directory holding the persisted resume library.
    pub data_dir: PathBuf,
    pub jd_min_chars: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            jd_min_chars: match std::env::var("RESUME_JD_MIN_CHARS") {
                Ok(v) => v
                    .parse::<usize>()
                    .context("RESUME_JD_MIN_CHARS must be a non-negative integer")?,
                Err(_) => DEFAULT_JD_MIN_CHARS,
            },
        })
    }

    /// The validation rules derived from this configuration.
    pub fn limits(&self) -> crate::validation::Limits {
        crate::validation::Limits {
            jd_min_chars: self.jd_min_chars,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
