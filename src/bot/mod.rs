// src/bot/mod.rs
pub mod gemini;
pub mod tools;

use crate::details::DetailsService;
use crate::edgar::FiscalPeriod;
use crate::utils::error::BotError;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub use gemini::{GeminiClient, LanguageModel, ModelTurn};

// Observations sent back to the model per fetch; the most recent ones.
const MAX_TOOL_OBSERVATIONS: usize = 5;

/// What a natural-language question maps onto.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    FetchMetric {
        ticker: String,
        metric: String,
        year: Option<i32>,
        period: Option<FiscalPeriod>,
    },
    RequestPlot {
        ticker: String,
        metric: String,
    },
    DirectAnswer {
        text: String,
    },
}

impl Intent {
    /// Maps a model turn onto an intent; `Err` carries a user-facing summary.
    pub fn from_turn(turn: ModelTurn) -> Result<Self, String> {
        let call = match turn {
            ModelTurn::Text(text) => return Ok(Intent::DirectAnswer { text }),
            ModelTurn::Call(call) => call,
        };
        match call.name.as_str() {
            tools::FETCH_METRIC_TOOL => {
                let (Some(ticker), Some(metric)) = (
                    string_arg(&call.args, "ticker_symbol"),
                    string_arg(&call.args, "metric_name"),
                ) else {
                    return Err(format!("Missing ticker or metric for {}.", call.name));
                };
                Ok(Intent::FetchMetric {
                    ticker,
                    metric,
                    year: year_arg(&call.args),
                    period: string_arg(&call.args, "fiscal_period").and_then(|p| p.parse().ok()),
                })
            }
            tools::PLOT_METRIC_TOOL => {
                let (Some(ticker), Some(metric)) = (
                    string_arg(&call.args, "ticker_symbol"),
                    string_arg(&call.args, "metric_key"),
                ) else {
                    return Err(format!("Missing ticker or metric for {}.", call.name));
                };
                Ok(Intent::RequestPlot { ticker, metric })
            }
            other => Err(format!("Unknown function '{}' requested by the model.", other)),
        }
    }
}

fn string_arg(args: &Map<String, Value>, key: &str) -> Option<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// Models send integers as JSON numbers (often floats) or strings.
fn year_arg(args: &Map<String, Value>) -> Option<i32> {
    match args.get("year")? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Final reply of the bot endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BotAnswer {
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_tool_response: Option<String>,
}

/// Result of running an intent against the pipeline.
#[derive(Debug, Clone, PartialEq)]
struct ToolOutcome {
    response: Option<Value>,
    summary: String,
}

impl ToolOutcome {
    fn failed(summary: String) -> Self {
        Self {
            response: None,
            summary,
        }
    }
}

/// Natural-language front end over the details pipeline.
pub struct FinancialBot {
    details: Arc<DetailsService>,
    model: Arc<dyn LanguageModel>,
}

impl FinancialBot {
    pub fn new(details: Arc<DetailsService>, model: Arc<dyn LanguageModel>) -> Self {
        Self { details, model }
    }

    pub async fn ask(&self, query: &str) -> Result<BotAnswer, BotError> {
        tracing::info!("Received query for bot: {}", query);
        let tools = tools::declarations(self.details.catalog());
        let turn = self.model.plan(query, &tools).await?;

        let call = match &turn {
            ModelTurn::Call(call) => call.clone(),
            ModelTurn::Text(text) => {
                return Ok(BotAnswer {
                    answer: text.clone(),
                    debug_tool_response: None,
                })
            }
        };
        tracing::info!("Model wants to call {} with args: {:?}", call.name, call.args);

        let outcome = match Intent::from_turn(turn) {
            Ok(intent) => self.dispatch(intent).await,
            Err(summary) => ToolOutcome::failed(summary),
        };

        let answer = match &outcome.response {
            Some(response) => self.model.summarize(query, &call, response).await?,
            None => outcome.summary.clone(),
        };
        Ok(BotAnswer {
            answer,
            debug_tool_response: Some(outcome.summary),
        })
    }

    async fn dispatch(&self, intent: Intent) -> ToolOutcome {
        match intent {
            Intent::FetchMetric {
                ticker,
                metric,
                year,
                period,
            } => self.fetch_metric(&ticker, &metric, year, period).await,
            Intent::RequestPlot { ticker, metric } => self.plot_metric(&ticker, &metric),
            Intent::DirectAnswer { text } => ToolOutcome::failed(text),
        }
    }

    async fn fetch_metric(
        &self,
        ticker: &str,
        metric: &str,
        year: Option<i32>,
        period: Option<FiscalPeriod>,
    ) -> ToolOutcome {
        let failed = || ToolOutcome::failed(format!("Could not retrieve data for {} for {}.", metric, ticker));
        if self.details.catalog().get(metric).is_none() {
            tracing::warn!("Model asked for unconfigured metric '{}'", metric);
            return failed();
        }
        let details = match self.details.get_details(ticker, year, period).await {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!("Tool call failed: {}", e);
                return failed();
            }
        };
        let Some(result) = details.metric(metric) else {
            return failed();
        };

        let recent = &result.data[result.data.len().saturating_sub(MAX_TOOL_OBSERVATIONS)..];
        ToolOutcome {
            response: Some(json!({
                "function_name": tools::FETCH_METRIC_TOOL,
                "company": details.company_display_name,
                "metric": metric,
                "unit": result.unit,
                "data": recent,
            })),
            summary: format!("Successfully fetched data for {} for {}.", metric, ticker),
        }
    }

    fn plot_metric(&self, ticker: &str, metric: &str) -> ToolOutcome {
        if self.details.catalog().get(metric).is_none() {
            return ToolOutcome::failed(format!("Could not plot {} for {}.", metric, ticker));
        }
        let plot_url = format!(
            "/company/{}/plot/{}",
            encode_path_segment(ticker),
            encode_path_segment(metric)
        );
        ToolOutcome {
            response: Some(json!({
                "function_name": tools::PLOT_METRIC_TOOL,
                "status": "Plot can be generated.",
                "plot_url_suggestion": plot_url,
            })),
            summary: format!("A plot for {} for {} can be generated at {}.", metric, ticker, plot_url),
        }
    }
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
fn encode_path_segment(segment: &str) -> String {
    segment
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}
