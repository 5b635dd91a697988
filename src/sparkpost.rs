use log::{debug, info, warn};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::transmission::{Transmission, TransmissionResults};

const TRANSMISSIONS_PATH: &str = "/api/v1/transmissions";

/// Anything that can deliver a built transmission.
pub trait Transmitter {
    fn send(&self, transmission: &Transmission) -> Result<TransmissionResults>;
}

/// Transmissions API client. Requests have no timeout.
pub struct SparkPost {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    results: Option<TransmissionResults>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

impl SparkPost {
    pub fn new(config: &Config) -> Result<SparkPost> {
        let client = Client::builder()
            .timeout(None::<std::time::Duration>)
            .build()?;
        Ok(SparkPost {
            client,
            endpoint: format!("{}{}", config.host, TRANSMISSIONS_PATH),
            api_key: config.api_key.clone(),
        })
    }
}

impl Transmitter for SparkPost {
    fn send(&self, transmission: &Transmission) -> Result<TransmissionResults> {
        info!(
            "[sparkpost] POST {} ({} recipients)",
            self.endpoint,
            transmission.recipients.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, self.api_key.as_str())
            .header(ACCEPT, "application/json")
            .json(transmission)
            .send()
            .map_err(|e| {
                warn!("[sparkpost] request to {} failed: {}", self.endpoint, e);
                Error::Rejected(format!("Request failed: {}", e))
            })?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| Error::Rejected(format!("HTTP {}: unreadable response: {}", status, e)))?;
        debug!("[sparkpost] HTTP {} body: {}", status, text);

        let parsed = serde_json::from_str::<ApiResponse>(&text);
        if !status.is_success() {
            warn!("[sparkpost] transmission rejected with HTTP {}", status);
            return Err(Error::Rejected(describe_failure(status, parsed.ok(), &text)));
        }

        match parsed {
            Ok(ApiResponse {
                results: Some(results),
                ..
            }) => Ok(results),
            Ok(other) => Err(Error::Rejected(describe_failure(status, Some(other), &text))),
            Err(e) => Err(Error::Rejected(format!(
                "HTTP {}: unexpected response ({}): {}",
                status, e, text
            ))),
        }
    }
}

fn describe_failure(status: StatusCode, parsed: Option<ApiResponse>, raw: &str) -> String {
    let errors = parsed.map(|r| r.errors).unwrap_or_default();
    if errors.is_empty() {
        return if raw.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, raw.trim())
        };
    }

    let mut out = format!("HTTP {}", status);
    for err in errors {
        out.push_str("\n  ");
        out.push_str(&err.message);
        if let Some(description) = err.description {
            out.push_str(": ");
            out.push_str(&description);
        }
        if let Some(code) = err.code {
            out.push_str(&format!(" (code {})", code));
        }
    }
    out
}
