// src/bot/gemini.rs
use crate::bot::tools::ToolDeclaration;
use crate::utils::error::BotError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const GEMINI_REQUEST_TIMEOUT_SECS: u64 = 60;

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

/// What the model answered on the first round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTurn {
    Text(String),
    Call(FunctionCall),
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Sends the user query with the available tools.
    async fn plan(&self, query: &str, tools: &[ToolDeclaration]) -> Result<ModelTurn, BotError>;

    /// Hands a tool result back to the model for a prose answer.
    async fn summarize(
        &self,
        query: &str,
        call: &FunctionCall,
        response: &Value,
    ) -> Result<String, BotError>;
}

// --- generateContent wire types ---

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<FunctionCall>,
}

/// Gemini `generateContent` REST client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self, BotError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(GEMINI_REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    async fn generate(&self, body: Value) -> Result<Vec<Part>, BotError> {
        tracing::debug!("Calling Gemini model {}", self.model);
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Gemini returned HTTP {}", status);
            return Err(BotError::Http { status, body });
        }
        let parsed: GenerateResponse = response.json().await?;
        first_candidate_parts(parsed)
    }
}

fn user_content(query: &str) -> Value {
    json!({"role": "user", "parts": [{"text": query}]})
}

fn first_candidate_parts(response: GenerateResponse) -> Result<Vec<Part>, BotError> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .ok_or_else(|| BotError::Response("no candidates returned".to_string()))
}

fn turn_from_parts(parts: Vec<Part>) -> ModelTurn {
    let mut texts = Vec::new();
    for part in parts {
        if let Some(call) = part.function_call.filter(|c| !c.name.is_empty()) {
            return ModelTurn::Call(call);
        }
        texts.extend(part.text);
    }
    ModelTurn::Text(texts.join(""))
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn plan(&self, query: &str, tools: &[ToolDeclaration]) -> Result<ModelTurn, BotError> {
        let body = json!({
            "contents": [user_content(query)],
            "tools": [{"functionDeclarations": tools}]
        });
        Ok(turn_from_parts(self.generate(body).await?))
    }

    async fn summarize(
        &self,
        query: &str,
        call: &FunctionCall,
        response: &Value,
    ) -> Result<String, BotError> {
        let body = json!({
            "contents": [
                user_content(query),
                {"role": "model", "parts": [{"functionCall": call}]},
                {"role": "user", "parts": [{"functionResponse": {"name": call.name, "response": response}}]}
            ]
        });
        match turn_from_parts(self.generate(body).await?) {
            ModelTurn::Text(text) => Ok(text),
            ModelTurn::Call(call) => Err(BotError::Response(format!(
                "model requested another function call ({}) instead of answering",
                call.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: Value) -> Result<ModelTurn, BotError> {
        let response: GenerateResponse = serde_json::from_value(body).unwrap();
        first_candidate_parts(response).map(turn_from_parts)
    }

    #[test]
    fn function_call_part_wins_over_text() {
        let turn = parse(json!({
            "candidates": [{"content": {"role": "model", "parts": [
                {"text": "Let me look that up."},
                {"functionCall": {"name": "get_company_financial_data",
                                  "args": {"ticker_symbol": "NVDA", "metric_name": "Revenue"}}}
            ]}}]
        }))
        .unwrap();
        match turn {
            ModelTurn::Call(call) => {
                assert_eq!(call.name, "get_company_financial_data");
                assert_eq!(call.args["ticker_symbol"], "NVDA");
            }
            other => panic!("expected a call, got {:?}", other),
        }
    }

    #[test]
    fn text_parts_are_joined() {
        let turn = parse(json!({
            "candidates": [{"content": {"parts": [{"text": "Hello, "}, {"text": "world"}]}}]
        }))
        .unwrap();
        assert_eq!(turn, ModelTurn::Text("Hello, world".to_string()));
    }

    #[test]
    fn empty_candidates_are_an_error() {
        assert!(matches!(parse(json!({})), Err(BotError::Response(_))));
        assert!(matches!(
            parse(json!({"candidates": [{"finishReason": "SAFETY"}]})),
            Err(BotError::Response(_))
        ));
    }

    #[test]
    fn endpoint_targets_configured_model() {
        let client = GeminiClient::new("key", "gemini-1.5-flash").unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
