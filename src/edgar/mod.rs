// src/edgar/mod.rs
pub mod client;
pub mod models;
pub mod tickers;

pub use client::{EdgarClient, FactsFetcher};
pub use models::{
    CompanyDetails, FiscalPeriod, FiscalYear, MetricResult, MetricResults, Observation,
    RawFactsDocument,
};
pub use tickers::{TickerTable, DEFAULT_TICKERS};
