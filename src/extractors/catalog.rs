// src/extractors/catalog.rs
use crate::utils::error::MetricError;
use once_cell::sync::Lazy;
use serde::Serialize;

/// Metrics reported for every company: display name, us-gaap tag, preferred unit.
const BUILTIN_METRICS: &[(&str, &str, &str)] = &[
    ("Revenue", "Revenues", "USD"),
    ("Net Income", "NetIncomeLoss", "USD"),
    ("EPS (Basic)", "EarningsPerShareBasic", "USD/shares"),
];

pub static METRIC_CATALOG: Lazy<MetricCatalog> = Lazy::new(|| {
    MetricCatalog::new(
        BUILTIN_METRICS
            .iter()
            .map(|(name, tag, unit)| MetricDefinition::new(*name, *tag, *unit)),
    )
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricDefinition {
    pub name: String,
    pub tag: String,
    pub unit: String,
}

impl MetricDefinition {
    pub fn new(name: impl Into<String>, tag: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
            unit: unit.into(),
        }
    }
}

/// Ordered, read-only table of the metrics the pipeline extracts.
#[derive(Debug, Clone, Default)]
pub struct MetricCatalog {
    metrics: Vec<MetricDefinition>,
}

impl MetricCatalog {
    pub fn new(metrics: impl IntoIterator<Item = MetricDefinition>) -> Self {
        let mut catalog = Self::default();
        for metric in metrics {
            // Later definitions replace earlier ones with the same name.
            match catalog.metrics.iter_mut().find(|m| m.name == metric.name) {
                Some(slot) => *slot = metric,
                None => catalog.metrics.push(metric),
            }
        }
        catalog
    }

    pub fn get(&self, name: &str) -> Option<&MetricDefinition> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// Looks up a user-supplied metric key, reporting the valid keys when it is unknown.
    pub fn require(&self, name: &str) -> Result<&MetricDefinition, MetricError> {
        self.get(name).ok_or_else(|| MetricError::NotConfigured {
            metric: name.to_string(),
            available: self.names().map(str::to_string).collect(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(|m| m.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricDefinition> {
        self.metrics.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_keeps_declaration_order() {
        let names: Vec<_> = METRIC_CATALOG.names().collect();
        assert_eq!(names, vec!["Revenue", "Net Income", "EPS (Basic)"]);
        let eps = METRIC_CATALOG.get("EPS (Basic)").unwrap();
        assert_eq!(eps.tag, "EarningsPerShareBasic");
        assert_eq!(eps.unit, "USD/shares");
    }

    #[test]
    fn unknown_metric_lists_available_keys() {
        let err = METRIC_CATALOG.require("EBITDA").unwrap_err();
        assert_eq!(
            err,
            MetricError::NotConfigured {
                metric: "EBITDA".to_string(),
                available: vec![
                    "Revenue".to_string(),
                    "Net Income".to_string(),
                    "EPS (Basic)".to_string()
                ],
            }
        );
        assert!(METRIC_CATALOG.require("Revenue").is_ok());
    }

    #[test]
    fn duplicate_names_replace_in_place() {
        let catalog = MetricCatalog::new([
            MetricDefinition::new("Revenue", "Revenues", "USD"),
            MetricDefinition::new("Cash", "Cash", "USD"),
            MetricDefinition::new("Revenue", "SalesRevenueNet", "USD"),
        ]);
        assert_eq!(catalog.names().count(), 2);
        assert_eq!(catalog.get("Revenue").unwrap().tag, "SalesRevenueNet");
        assert_eq!(catalog.names().next(), Some("Revenue"));
    }
}
