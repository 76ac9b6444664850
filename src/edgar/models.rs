// src/edgar/models.rs
use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

static NO_FACTS: Value = Value::Null;

/// Company facts document as returned by the EDGAR XBRL API
/// Example: https://data.sec.gov/api/xbrl/companyfacts/CIK0000320193.json
///
/// Kept as an untyped JSON tree: the shape differs between filers and years,
/// and extraction only ever reads a handful of keys from it.
#[derive(Debug, Clone, Default)]
pub struct RawFactsDocument(Value);

impl RawFactsDocument {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn entity_name(&self) -> Option<&str> {
        self.0.get("entityName").and_then(Value::as_str)
    }

    /// The `facts` mapping (taxonomy -> tag -> units), or JSON null when absent.
    pub fn facts(&self) -> &Value {
        self.0.get("facts").unwrap_or(&NO_FACTS)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for RawFactsDocument {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Fiscal period label as used for filtering: Q1-Q4 or the full fiscal year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FiscalPeriod {
    Q1,
    Q2,
    Q3,
    Q4,
    FY,
}

impl FiscalPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FiscalPeriod::Q1 => "Q1",
            FiscalPeriod::Q2 => "Q2",
            FiscalPeriod::Q3 => "Q3",
            FiscalPeriod::Q4 => "Q4",
            FiscalPeriod::FY => "FY",
        }
    }

    pub fn matches_label(&self, label: &str) -> bool {
        label.trim().eq_ignore_ascii_case(self.as_str())
    }
}

impl fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FiscalPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "Q1" => Ok(FiscalPeriod::Q1),
            "Q2" => Ok(FiscalPeriod::Q2),
            "Q3" => Ok(FiscalPeriod::Q3),
            "Q4" => Ok(FiscalPeriod::Q4),
            "FY" => Ok(FiscalPeriod::FY),
            other => Err(format!(
                "invalid fiscal period '{}', expected one of Q1, Q2, Q3, Q4, FY",
                other
            )),
        }
    }
}

/// Periodic report forms that carry financial statement facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormType {
    #[serde(rename = "10-K")]
    Annual,
    #[serde(rename = "10-Q")]
    Quarterly,
}

impl FormType {
    /// Only exact `10-K` / `10-Q` count; amendments and other forms are ignored.
    pub fn parse(form: &str) -> Option<Self> {
        match form {
            "10-K" => Some(FormType::Annual),
            "10-Q" => Some(FormType::Quarterly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::Annual => "10-K",
            FormType::Quarterly => "10-Q",
        }
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `fy` field exactly as disclosed: usually a number, occasionally text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FiscalYear {
    Number(i64),
    Text(String),
}

impl FiscalYear {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(FiscalYear::Number),
            Value::String(s) => Some(FiscalYear::Text(s.clone())),
            _ => None,
        }
    }

    /// Integer year, if the disclosed value is one.
    pub fn as_year(&self) -> Option<i32> {
        match self {
            FiscalYear::Number(n) => i32::try_from(*n).ok(),
            FiscalYear::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// One canonical data point of a metric's time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Observation {
    pub end_date: NaiveDate,
    pub value: f64,
    pub form: FormType,
    pub fiscal_period: String,
    pub fiscal_year: Option<FiscalYear>,
    pub filed: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResult {
    pub data: Vec<Observation>,
    /// Unit configured in the metric catalog.
    pub unit: String,
    pub tag: String,
    /// Unit the values were actually read from, only when it differs from `unit`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_used: Option<String>,
}

/// Per-metric results keyed by display name, kept in catalog order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricResults(Vec<(String, MetricResult)>);

impl MetricResults {
    pub fn insert(&mut self, name: impl Into<String>, result: MetricResult) {
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = result,
            None => self.0.push((name, result)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&MetricResult> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, result)| result)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricResult)> {
        self.0.iter().map(|(name, result)| (name.as_str(), result))
    }
}

impl Serialize for MetricResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, result) in &self.0 {
            map.serialize_entry(name, result)?;
        }
        map.end()
    }
}

/// Everything the pipeline knows about one company for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyDetails {
    pub company_name: String,
    pub company_display_name: String,
    pub ticker: String,
    pub cik: String,
    pub metrics: MetricResults,
}

impl CompanyDetails {
    pub fn metric(&self, name: &str) -> Option<&MetricResult> {
        self.metrics.get(name)
    }
}
