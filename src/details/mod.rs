// src/details/mod.rs
use crate::charts;
use crate::edgar::{
    CompanyDetails, FactsFetcher, FiscalPeriod, MetricResult, MetricResults, RawFactsDocument,
    TickerTable, DEFAULT_TICKERS,
};
use crate::extractors::{DedupPolicy, FactExtractor, FactQuery, MetricCatalog, METRIC_CATALOG};
use crate::utils::error::{AppError, DetailsError, MetricError};
use std::sync::Arc;

/// Resolves a ticker, fetches its facts once and extracts every catalog metric.
///
/// Holds only read-only tables; one instance serves any number of concurrent requests.
pub struct DetailsService {
    fetcher: Arc<dyn FactsFetcher>,
    tickers: Arc<TickerTable>,
    catalog: Arc<MetricCatalog>,
    extractor: FactExtractor,
}

impl DetailsService {
    pub fn new(
        fetcher: Arc<dyn FactsFetcher>,
        tickers: Arc<TickerTable>,
        catalog: Arc<MetricCatalog>,
        extractor: FactExtractor,
    ) -> Self {
        Self {
            fetcher,
            tickers,
            catalog,
            extractor,
        }
    }

    /// Built-in ticker table and metric catalog.
    pub fn with_defaults(fetcher: Arc<dyn FactsFetcher>, dedup: DedupPolicy) -> Self {
        Self::new(
            fetcher,
            Arc::new((*DEFAULT_TICKERS).clone()),
            Arc::new((*METRIC_CATALOG).clone()),
            FactExtractor::new(dedup),
        )
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    pub async fn get_details(
        &self,
        ticker: &str,
        year: Option<i32>,
        period: Option<FiscalPeriod>,
    ) -> Result<CompanyDetails, DetailsError> {
        let (cik, document) = self.fetch_document(ticker).await?;
        Ok(self.build_details(ticker, &cik, &document, year, period))
    }

    /// Resolves the CIK and fetches the raw facts document, without extracting anything.
    pub async fn fetch_document(
        &self,
        ticker: &str,
    ) -> Result<(String, RawFactsDocument), DetailsError> {
        let ticker = ticker.trim();
        let Some(cik) = self.tickers.resolve(ticker) else {
            let mut known: Vec<_> = self.tickers.tickers().collect();
            known.sort_unstable();
            tracing::warn!("Ticker '{}' not in lookup table (known: {})", ticker, known.join(", "));
            return Err(DetailsError::IdentifierNotFound(ticker.to_string()));
        };
        let cik = cik.to_string();
        tracing::info!("Resolved {} to CIK {}", ticker, cik);

        let document = self
            .fetcher
            .fetch_facts(&cik)
            .await
            .map_err(|source| DetailsError::FetchFailed {
                ticker: ticker.to_string(),
                cik: cik.clone(),
                source,
            })?;
        Ok((cik, document))
    }

    /// Runs the extractor once per catalog metric over an already fetched document.
    pub fn build_details(
        &self,
        ticker: &str,
        cik: &str,
        document: &RawFactsDocument,
        year: Option<i32>,
        period: Option<FiscalPeriod>,
    ) -> CompanyDetails {
        let ticker = ticker.trim();
        let company_name = document.entity_name().unwrap_or(ticker).to_string();
        let facts = document.facts();

        let mut metrics = MetricResults::default();
        for metric in self.catalog.iter() {
            let query = FactQuery::new(&metric.tag, &metric.unit)
                .year(year)
                .period(period);
            let extraction = self.extractor.extract(facts, &query);
            tracing::debug!(
                "{} {}: {} observations",
                ticker,
                metric.name,
                extraction.observations.len()
            );
            metrics.insert(
                metric.name.clone(),
                MetricResult {
                    data: extraction.observations,
                    unit: metric.unit.clone(),
                    tag: metric.tag.clone(),
                    unit_used: extraction.unit.filter(|used| *used != metric.unit),
                },
            );
        }

        CompanyDetails {
            company_display_name: format!("{} ({})", company_name, ticker),
            company_name,
            ticker: ticker.to_string(),
            cik: cik.to_string(),
            metrics,
        }
    }

    /// Full history of one catalog metric rendered as PNG.
    pub async fn metric_chart(&self, ticker: &str, metric: &str) -> Result<Vec<u8>, AppError> {
        // Unknown metrics are rejected before any network traffic.
        self.catalog.require(metric)?;
        let (cik, document) = self.fetch_document(ticker).await?;
        self.chart_from_document(ticker, &cik, &document, metric)
    }

    /// Same as [`metric_chart`](Self::metric_chart) over an already fetched document.
    pub fn chart_from_document(
        &self,
        ticker: &str,
        cik: &str,
        document: &RawFactsDocument,
        metric: &str,
    ) -> Result<Vec<u8>, AppError> {
        let definition = self.catalog.require(metric)?;
        let details = self.build_details(ticker, cik, document, None, None);
        let no_data = || MetricError::NoData {
            metric: definition.name.clone(),
            ticker: details.ticker.clone(),
        };
        let result = details.metric(&definition.name).ok_or_else(no_data)?;
        if result.data.is_empty() {
            return Err(no_data().into());
        }

        charts::render(
            &result.data,
            &definition.name,
            &details.company_display_name,
            &result.unit,
        )?
        .ok_or_else(|| no_data().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::FiscalYear;
    use crate::utils::error::EdgarError;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

    struct StaticFetcher {
        document: Option<Value>,
        calls: AtomicUsize,
    }

    impl StaticFetcher {
        fn serving(document: Value) -> Arc<Self> {
            Arc::new(Self {
                document: Some(document),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                document: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl FactsFetcher for StaticFetcher {
        async fn fetch_facts(&self, _cik: &str) -> Result<RawFactsDocument, EdgarError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.document {
                Some(doc) => Ok(RawFactsDocument::new(doc.clone())),
                None => Err(EdgarError::Http {
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                    body: "upstream down".to_string(),
                }),
            }
        }
    }

    fn annual(end: &str, val: f64, fy: i64, filed: &str) -> Value {
        json!({"form": "10-K", "end": end, "val": val, "fp": "FY", "fy": fy, "filed": filed})
    }

    fn sample_document() -> Value {
        json!({
            "cik": 42,
            "entityName": "Ticker X Holdings",
            "facts": {
                "us-gaap": {
                    "Revenues": {"units": {"USD": [
                        annual("2023-12-31", 300.0, 2023, "2024-02-01"),
                        annual("2021-12-31", 100.0, 2021, "2022-02-01"),
                        annual("2022-12-31", 200.0, 2022, "2023-02-01")
                    ]}},
                    "NetIncomeLoss": {"units": {"USD": [
                        annual("2022-12-31", 20.0, 2022, "2023-02-01")
                    ]}}
                }
            }
        })
    }

    fn service(fetcher: Arc<StaticFetcher>) -> DetailsService {
        DetailsService::new(
            fetcher,
            Arc::new(TickerTable::from_pairs([("TICKERX", "0000000042")])),
            Arc::new((*METRIC_CATALOG).clone()),
            FactExtractor::default(),
        )
    }

    #[tokio::test]
    async fn assembles_every_catalog_metric() {
        let details = assert_ok!(
            service(StaticFetcher::serving(sample_document()))
                .get_details("TICKERX", None, None)
                .await
        );
        assert_eq!(details.company_name, "Ticker X Holdings");
        assert_eq!(details.company_display_name, "Ticker X Holdings (TICKERX)");
        assert_eq!(details.cik, "0000000042");
        assert_eq!(details.metrics.iter().count(), 3);

        let revenue = details.metric("Revenue").unwrap();
        let years: Vec<_> = revenue
            .data
            .iter()
            .map(|o| o.fiscal_year.as_ref().and_then(FiscalYear::as_year))
            .collect();
        assert_eq!(years, vec![Some(2021), Some(2022), Some(2023)]);
        assert_eq!(revenue.tag, "Revenues");
        assert_eq!(revenue.unit, "USD");

        // Configured but undisclosed metrics stay present with no data.
        let eps = details.metric("EPS (Basic)").unwrap();
        assert!(eps.data.is_empty());
        assert_eq!(details.metric("Net Income").unwrap().data.len(), 1);
        assert!(details.metric("EBITDA").is_none());
    }

    #[tokio::test]
    async fn filters_apply_to_every_metric() {
        let details = service(StaticFetcher::serving(sample_document()))
            .get_details("tickerx", Some(2022), Some(FiscalPeriod::FY))
            .await
            .unwrap();
        assert_eq!(details.metric("Revenue").unwrap().data.len(), 1);
        assert_eq!(details.metric("Revenue").unwrap().data[0].value, 200.0);
        assert_eq!(details.metric("Net Income").unwrap().data.len(), 1);
    }

    #[tokio::test]
    async fn unknown_ticker_never_fetches() {
        let fetcher = StaticFetcher::serving(sample_document());
        let err = assert_err!(service(fetcher.clone()).get_details("ZZZZ", None, None).await);
        assert!(matches!(err, DetailsError::IdentifierNotFound(ref t) if t == "ZZZZ"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_failure_is_reported_once() {
        let fetcher = StaticFetcher::failing();
        let err = service(fetcher.clone())
            .get_details("TICKERX", None, None)
            .await
            .unwrap_err();
        match err {
            DetailsError::FetchFailed { ticker, cik, source } => {
                assert_eq!(ticker, "TICKERX");
                assert_eq!(cik, "0000000042");
                assert!(matches!(source, EdgarError::Http { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn document_without_facts_yields_empty_metrics() {
        let details = service(StaticFetcher::serving(json!({"entityName": "Shell Co"})))
            .get_details("TICKERX", None, None)
            .await
            .unwrap();
        assert_eq!(details.metrics.iter().count(), 3);
        assert!(details.metrics.iter().all(|(_, m)| m.data.is_empty()));

        let nameless = service(StaticFetcher::serving(json!({})))
            .get_details("TICKERX", None, None)
            .await
            .unwrap();
        assert_eq!(nameless.company_name, "TICKERX");
    }

    #[tokio::test]
    async fn unit_fallback_reports_configured_unit() {
        let doc = json!({
            "entityName": "Ticker X Holdings",
            "facts": {"us-gaap": {"EarningsPerShareBasic": {"units": {"EUR/shares": [
                annual("2022-12-31", 1.5, 2022, "2023-02-01")
            ]}}}}
        });
        let details = service(StaticFetcher::serving(doc))
            .get_details("TICKERX", None, None)
            .await
            .unwrap();
        let eps = details.metric("EPS (Basic)").unwrap();
        assert_eq!(eps.data.len(), 1);
        assert_eq!(eps.data[0].value, 1.5);
        assert_eq!(eps.unit, "USD/shares");
        assert_eq!(eps.unit_used.as_deref(), Some("EUR/shares"));

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["metrics"]["EPS (Basic)"]["unit"], "USD/shares");
        assert_eq!(json["metrics"]["EPS (Basic)"]["unit_used"], "EUR/shares");
        assert!(json["metrics"]["Revenue"].get("unit_used").is_none());
    }

    #[tokio::test]
    async fn serializes_to_the_api_shape() {
        let details = service(StaticFetcher::serving(sample_document()))
            .get_details("TICKERX", None, None)
            .await
            .unwrap();
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["ticker"], "TICKERX");
        assert_eq!(json["cik"], "0000000042");
        let first = &json["metrics"]["Revenue"]["data"][0];
        assert_eq!(first["EndDate"], "2021-12-31");
        assert_eq!(first["Form"], "10-K");
        assert_eq!(first["FiscalYear"], 2021);
        assert_eq!(first["Filed"], "2022-02-01");
        assert_eq!(json["metrics"]["EPS (Basic)"]["data"], json!([]));
    }

    #[tokio::test]
    async fn chart_requires_a_configured_metric_with_data() {
        let svc = service(StaticFetcher::serving(sample_document()));
        let unknown = svc.metric_chart("TICKERX", "EBITDA").await.unwrap_err();
        assert!(matches!(
            unknown,
            AppError::Metric(MetricError::NotConfigured { .. })
        ));
        let empty = svc.metric_chart("TICKERX", "EPS (Basic)").await.unwrap_err();
        assert!(matches!(empty, AppError::Metric(MetricError::NoData { .. })));
        let missing = svc.metric_chart("ZZZZ", "Revenue").await.unwrap_err();
        assert!(matches!(
            missing,
            AppError::Details(DetailsError::IdentifierNotFound(_))
        ));
    }

    #[tokio::test]
    async fn chart_fetches_the_document_at_most_once() {
        let fetcher = StaticFetcher::serving(sample_document());
        let svc = service(fetcher.clone());
        assert_err!(svc.metric_chart("TICKERX", "EBITDA").await);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);

        let (cik, document) = assert_ok!(svc.fetch_document("TICKERX").await);
        let empty = svc
            .chart_from_document("TICKERX", &cik, &document, "EPS (Basic)")
            .unwrap_err();
        assert!(matches!(
            empty,
            AppError::Metric(MetricError::NoData { ref ticker, .. }) if ticker == "TICKERX"
        ));
        let png = assert_ok!(svc.chart_from_document("TICKERX", &cik, &document, "Revenue"));
        assert!(png.starts_with(b"\x89PNG"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }
}
