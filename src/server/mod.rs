// src/server/mod.rs
use crate::bot::{BotAnswer, FinancialBot};
use crate::details::DetailsService;
use crate::edgar::{CompanyDetails, FiscalPeriod};
use crate::utils::error::{AppError, BotError, DetailsError, MetricError};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

// Shared application state
pub struct AppState {
    pub details: Arc<DetailsService>,
    pub bot: Option<FinancialBot>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FinancialsParams {
    // Parsed by the handler so a bad value still gets a JSON error body.
    pub year: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BotQuery {
    pub query: String,
}

/// Error response: status code plus `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<DetailsError> for ApiError {
    fn from(err: DetailsError) -> Self {
        let status = match err {
            DetailsError::IdentifierNotFound(_) => StatusCode::NOT_FOUND,
            DetailsError::FetchFailed { .. } => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}

impl From<MetricError> for ApiError {
    fn from(err: MetricError) -> Self {
        let status = match err {
            MetricError::NotConfigured { .. } => StatusCode::BAD_REQUEST,
            MetricError::NoData { .. } => StatusCode::NOT_FOUND,
        };
        Self::new(status, err.to_string())
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Details(e) => e.into(),
            AppError::Metric(e) => e.into(),
            AppError::Chart(e) => {
                tracing::error!("Failed to generate plot: {}", e);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate plot.")
            }
            other => Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}

impl From<BotError> for ApiError {
    fn from(err: BotError) -> Self {
        tracing::error!("Error in /ask_financial_bot: {}", err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/company/:ticker/financials", get(financials))
        .route("/company/:ticker/plot/:metric", get(plot))
        .route("/ask_financial_bot", post(ask_bot))
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, bind_addr: &str) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server running on http://{}", bind_addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn home() -> &'static str {
    "Financial Data API is running!"
}

pub async fn financials(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(params): Query<FinancialsParams>,
) -> Result<Json<CompanyDetails>, ApiError> {
    let year = params
        .year
        .as_deref()
        .map(str::trim)
        .filter(|y| !y.is_empty())
        .map(|y| {
            y.parse::<i32>().map_err(|_| {
                ApiError::new(
                    StatusCode::BAD_REQUEST,
                    format!("invalid year '{}', expected an integer such as 2022", y),
                )
            })
        })
        .transpose()?;
    let period = params
        .period
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(str::parse::<FiscalPeriod>)
        .transpose()
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e))?;

    let details = state
        .details
        .get_details(&ticker, year, period)
        .await?;
    Ok(Json(details))
}

pub async fn plot(
    State(state): State<Arc<AppState>>,
    Path((ticker, metric)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let png = state.details.metric_chart(&ticker, &metric).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

pub async fn ask_bot(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BotQuery>,
) -> Result<Json<BotAnswer>, ApiError> {
    let bot = state.bot.as_ref().ok_or(BotError::NotConfigured)?;
    Ok(Json(bot.ask(&body.query).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::{FactsFetcher, RawFactsDocument, TickerTable};
    use crate::extractors::{FactExtractor, METRIC_CATALOG};
    use crate::utils::error::EdgarError;
    use async_trait::async_trait;
    use serde_json::Value;

    struct OfflineFetcher {
        document: Option<Value>,
    }

    #[async_trait]
    impl FactsFetcher for OfflineFetcher {
        async fn fetch_facts(&self, cik: &str) -> Result<RawFactsDocument, EdgarError> {
            self.document
                .clone()
                .map(RawFactsDocument::new)
                .ok_or_else(|| EdgarError::NotFound(format!("CIK{}.json", cik)))
        }
    }

    fn state(document: Option<Value>) -> Arc<AppState> {
        let details = DetailsService::new(
            Arc::new(OfflineFetcher { document }),
            Arc::new(TickerTable::from_pairs([("ACME", "0000000001")])),
            Arc::new((*METRIC_CATALOG).clone()),
            FactExtractor::default(),
        );
        Arc::new(AppState {
            details: Arc::new(details),
            bot: None,
        })
    }

    fn acme() -> Option<Value> {
        Some(json!({
            "entityName": "Acme Corp",
            "facts": {"us-gaap": {"Revenues": {"units": {"USD": [
                {"form": "10-K", "end": "2022-12-31", "val": 5, "fp": "FY", "fy": 2022, "filed": "2023-02-01"},
                {"form": "10-Q", "end": "2023-03-31", "val": 2, "fp": "Q1", "fy": 2023, "filed": "2023-05-01"}
            ]}}}}
        }))
    }

    fn params(year: Option<i32>, period: Option<&str>) -> Query<FinancialsParams> {
        Query(FinancialsParams {
            year: year.map(|y| y.to_string()),
            period: period.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn financials_returns_details_json() {
        let Json(details) = financials(State(state(acme())), Path("ACME".to_string()), params(None, None))
            .await
            .unwrap();
        assert_eq!(details.company_display_name, "Acme Corp (ACME)");
        assert_eq!(details.metric("Revenue").unwrap().data.len(), 2);
    }

    #[tokio::test]
    async fn financials_applies_query_filters() {
        let Json(details) = financials(
            State(state(acme())),
            Path("ACME".to_string()),
            params(Some(2023), Some("q1")),
        )
        .await
        .unwrap();
        let revenue = &details.metric("Revenue").unwrap().data;
        assert_eq!(revenue.len(), 1);
        assert_eq!(revenue[0].value, 2.0);
    }

    #[tokio::test]
    async fn bad_period_is_a_client_error() {
        let err = financials(State(state(acme())), Path("ACME".to_string()), params(None, Some("H1")))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bad_year_is_a_json_client_error() {
        let query = Query(FinancialsParams {
            year: Some("abc".to_string()),
            period: None,
        });
        let err = financials(State(state(acme())), Path("ACME".to_string()), query)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("abc"));
        let response = err.into_response();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn unknown_ticker_and_fetch_failure_map_to_statuses() {
        let missing = financials(State(state(acme())), Path("ZZZZ".to_string()), params(None, None))
            .await
            .unwrap_err();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let upstream = financials(State(state(None)), Path("ACME".to_string()), params(None, None))
            .await
            .unwrap_err();
        assert_eq!(upstream.status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn plot_validates_metric_and_data() {
        let unknown = plot(
            State(state(acme())),
            Path(("ACME".to_string(), "EBITDA".to_string())),
        )
        .await
        .unwrap_err();
        assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
        assert!(unknown.message.contains("Available"));

        let empty = plot(
            State(state(acme())),
            Path(("ACME".to_string(), "Net Income".to_string())),
        )
        .await
        .unwrap_err();
        assert_eq!(empty.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bot_requires_a_model() {
        let err = ask_bot(
            State(state(acme())),
            Json(BotQuery {
                query: "revenue?".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn error_body_is_json() {
        let response = ApiError::new(StatusCode::NOT_FOUND, "nope").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }
}
