use ini::{Ini, ParseOption};
use log::{debug, info};
use std::path::Path;

use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_FILE: &str = "sparkpost.ini";
pub const DEFAULT_HOST: &str = "https://api.sparkpost.com";
const SECTION: &str = "SparkPost";

/// Settings read once from the INI file and passed down to the send step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    pub host: String,
    pub return_path: String,
    pub binding: String,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let display = path.display().to_string();
        debug!("[config] loading {}", display);

        if !path.is_file() {
            return Err(Error::ConfigNotFound { path: display });
        }
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: display.clone(),
            source,
        })?;

        let config = Config::from_ini(&content, &display)?;
        info!(
            "[config] loaded {}: host={}, return_path={}, binding={}",
            display,
            config.host,
            if config.return_path.is_empty() { "-" } else { config.return_path.as_str() },
            if config.binding.is_empty() { "-" } else { config.binding.as_str() },
        );
        Ok(config)
    }

    /// `origin` only labels diagnostics. Inline `;`/`#` comments are
    /// stripped and quoted values unwrapped; backslashes are kept literally.
    pub fn from_ini(content: &str, origin: &str) -> Result<Config> {
        let opt = ParseOption {
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(content, opt).map_err(|e| Error::ConfigSyntax {
            path: origin.to_string(),
            detail: e.to_string(),
        })?;

        let section = ini.section(Some(SECTION)).ok_or_else(|| Error::ConfigSection {
            path: origin.to_string(),
            section: SECTION.to_string(),
        })?;
        let value = |key: &str| {
            section
                .get(key)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let api_key = value("Authorization").ok_or_else(|| Error::MissingAuthorization {
            path: origin.to_string(),
        })?;
        let host = value("Host")
            .map(|h| normalize_host(&h))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        Ok(Config {
            api_key,
            host,
            return_path: value("Return-Path").unwrap_or_default(),
            binding: value("Binding").unwrap_or_default(),
        })
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}
