// src/utils/config.rs
use crate::extractors::DedupPolicy;

/// Used when SEC_USER_AGENT is not provided. The SEC expects "AppName/Version (contact)".
pub const DEFAULT_USER_AGENT: &str = "SecMetrics/0.1 (contact@example.com)";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// Runtime settings resolved from CLI flags and environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    pub user_agent: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub dedup: DedupPolicy,
}

impl Settings {
    pub fn resolve(
        user_agent: Option<String>,
        gemini_api_key: Option<String>,
        gemini_model: Option<String>,
        dedup: DedupPolicy,
    ) -> Self {
        Self {
            user_agent: resolve_user_agent(user_agent),
            gemini_api_key: gemini_api_key.filter(|key| !key.trim().is_empty()),
            gemini_model: gemini_model
                .filter(|model| !model.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            dedup,
        }
    }
}

fn resolve_user_agent(user_agent: Option<String>) -> String {
    match user_agent.filter(|ua| !ua.trim().is_empty()) {
        Some(ua) => {
            tracing::info!("Using User-Agent: '{}'", ua);
            ua
        }
        None => {
            tracing::info!(
                "SEC_USER_AGENT not set. Using fallback: '{}'",
                DEFAULT_USER_AGENT
            );
            DEFAULT_USER_AGENT.to_string()
        }
    }
}
