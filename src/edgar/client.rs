// src/edgar/client.rs
use crate::edgar::models::RawFactsDocument;
use crate::utils::error::EdgarError;
use async_trait::async_trait;
use reqwest::header;
use std::time::Duration;

const EDGAR_DATA_BASE_URL: &str = "https://data.sec.gov";
const EDGAR_REQUEST_TIMEOUT_SECS: u64 = 30;
// Enough of an error body to tell a user what went wrong.
const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// Source of raw company facts documents.
#[async_trait]
pub trait FactsFetcher: Send + Sync {
    async fn fetch_facts(&self, cik: &str) -> Result<RawFactsDocument, EdgarError>;
}

/// reqwest client configured for EDGAR interaction.
#[derive(Debug, Clone)]
pub struct EdgarClient {
    http: reqwest::Client,
    base_url: String,
}

impl EdgarClient {
    /// The SEC rejects requests without an identifying User-Agent.
    pub fn new(user_agent: &str) -> Result<Self, EdgarError> {
        Self::with_base_url(user_agent, EDGAR_DATA_BASE_URL)
    }

    pub fn with_base_url(user_agent: &str, base_url: &str) -> Result<Self, EdgarError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent) // Set the required User-Agent
            .timeout(Duration::from_secs(EDGAR_REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn company_facts_url(&self, cik: &str) -> String {
        format!("{}/api/xbrl/companyfacts/CIK{}.json", self.base_url, cik)
    }
}

#[async_trait]
impl FactsFetcher for EdgarClient {
    /// Fetches the company facts document for a given CIK
    async fn fetch_facts(&self, cik: &str) -> Result<RawFactsDocument, EdgarError> {
        if cik.trim().is_empty() {
            return Err(EdgarError::Parse("CIK number cannot be empty.".to_string()));
        }
        let url = self.company_facts_url(cik);
        tracing::info!("Fetching company facts from: {}", url);

        let response = self
            .http
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?; // Propagates reqwest::Error as EdgarError::Network

        let status = response.status();
        if !status.is_success() {
            tracing::error!("HTTP error status: {} for URL: {}", status, url);
            if status == reqwest::StatusCode::FORBIDDEN {
                tracing::warn!("Received 403 Forbidden - check User-Agent and rate limits.");
                return Err(EdgarError::RateLimited);
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(EdgarError::NotFound(url));
            }
            let body = response.text().await.unwrap_or_default();
            return Err(EdgarError::Http {
                status,
                body: body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect(),
            });
        }

        let body = response.text().await?;
        tracing::debug!("Downloaded {} bytes from {}", body.len(), url);
        parse_facts_body(&body)
    }
}

fn parse_facts_body(body: &str) -> Result<RawFactsDocument, EdgarError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        EdgarError::Parse(format!("Failed to decode JSON response from SEC API: {}", e))
    })?;
    if !value.is_object() {
        return Err(EdgarError::Parse(
            "Company facts response is not a JSON object".to_string(),
        ));
    }
    Ok(RawFactsDocument::new(value))
}
