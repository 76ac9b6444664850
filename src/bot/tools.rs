// src/bot/tools.rs
use crate::extractors::MetricCatalog;
use serde::Serialize;
use serde_json::{json, Value};

pub const FETCH_METRIC_TOOL: &str = "get_company_financial_data";
pub const PLOT_METRIC_TOOL: &str = "generate_financial_plot";

/// Function declaration offered to the model, in the Gemini schema dialect.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// The two pipeline operations exposed to the model. Metric names come from the catalog.
pub fn declarations(catalog: &MetricCatalog) -> Vec<ToolDeclaration> {
    let supported = catalog.names().collect::<Vec<_>>().join(", ");
    let ticker_param = json!({
        "type": "STRING",
        "description": "The stock ticker symbol of the company (e.g., AAPL for Apple, MSFT for Microsoft)."
    });

    vec![
        ToolDeclaration {
            name: FETCH_METRIC_TOOL.to_string(),
            description: "Fetches historical financial data (like Revenue, Net Income, EPS) for a \
                specific public company. Returns data points with dates and values."
                .to_string(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "ticker_symbol": ticker_param.clone(),
                    "metric_name": {
                        "type": "STRING",
                        "description": format!("The specific financial metric to retrieve. Supported metrics: {}.", supported)
                    },
                    "year": {
                        "type": "INTEGER",
                        "description": "Optional fiscal year to restrict the data to (e.g., 2022)."
                    },
                    "fiscal_period": {
                        "type": "STRING",
                        "enum": ["Q1", "Q2", "Q3", "Q4", "FY"],
                        "description": "Optional fiscal period: a quarter or FY for the full year."
                    }
                },
                "required": ["ticker_symbol", "metric_name"]
            }),
        },
        ToolDeclaration {
            name: PLOT_METRIC_TOOL.to_string(),
            description: "Generates and returns a plot (as an image) for a specific financial \
                metric of a company."
                .to_string(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "ticker_symbol": ticker_param,
                    "metric_key": {
                        "type": "STRING",
                        "description": format!("The financial metric to plot. Supported metrics: {}.", supported)
                    }
                },
                "required": ["ticker_symbol", "metric_key"]
            }),
        },
    ]
}
