// src/extractors/facts.rs

// --- Imports ---
use crate::edgar::models::{FiscalPeriod, FiscalYear, FormType, Observation};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

// --- Constants ---
const TAXONOMY: &str = "us-gaap";
const DATE_FORMAT: &str = "%Y-%m-%d";

// --- Data Structures ---

/// Which disclosures count as "the same period" when collapsing restatements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DedupPolicy {
    /// One observation per (EndDate, FiscalPeriod, Form).
    #[default]
    #[value(name = "period-form")]
    PeriodAndForm,
    /// One observation per EndDate, regardless of period label or form.
    #[value(name = "end-date")]
    EndDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    end_date: NaiveDate,
    fiscal_period: Option<String>,
    form: Option<FormType>,
}

impl DedupPolicy {
    fn key(&self, obs: &Observation) -> DedupKey {
        match self {
            DedupPolicy::PeriodAndForm => DedupKey {
                end_date: obs.end_date,
                fiscal_period: Some(obs.fiscal_period.clone()),
                form: Some(obs.form),
            },
            DedupPolicy::EndDate => DedupKey {
                end_date: obs.end_date,
                fiscal_period: None,
                form: None,
            },
        }
    }
}

/// What to pull out of a facts mapping.
#[derive(Debug, Clone, Copy)]
pub struct FactQuery<'a> {
    pub tag: &'a str,
    pub unit: &'a str,
    pub year: Option<i32>,
    pub period: Option<FiscalPeriod>,
}

impl<'a> FactQuery<'a> {
    pub fn new(tag: &'a str, unit: &'a str) -> Self {
        Self {
            tag,
            unit,
            year: None,
            period: None,
        }
    }

    pub fn year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn period(mut self, period: Option<FiscalPeriod>) -> Self {
        self.period = period;
        self
    }
}

/// Result of one extraction: the unit actually read and the cleaned series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// `None` when the tag or its units were missing altogether.
    pub unit: Option<String>,
    pub observations: Vec<Observation>,
}

/// Why a single disclosure was left out. Never propagated past the extractor.
#[derive(Debug, Clone, PartialEq)]
enum FactSkip {
    NotPeriodicReport,
    Missing(&'static str),
    BadValue(String),
    BadDate(&'static str, String),
}

impl fmt::Display for FactSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactSkip::NotPeriodicReport => write!(f, "not a 10-K/10-Q disclosure"),
            FactSkip::Missing(field) => write!(f, "missing '{}'", field),
            FactSkip::BadValue(raw) => write!(f, "non-numeric value {}", raw),
            FactSkip::BadDate(field, raw) => write!(f, "malformed '{}' date {}", field, raw),
        }
    }
}

// --- Main Extractor Structure ---

/// Turns a company's raw facts mapping into a deduplicated, date-ordered series per tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct FactExtractor {
    dedup: DedupPolicy,
}

impl FactExtractor {
    pub fn new(dedup: DedupPolicy) -> Self {
        Self { dedup }
    }

    /// Ordered observations for `query.tag` and the unit they came from.
    /// Observations are empty when nothing matched.
    pub fn extract(&self, facts: &Value, query: &FactQuery<'_>) -> Extraction {
        let Some(units) = facts
            .get(TAXONOMY)
            .and_then(|taxonomy| taxonomy.get(query.tag))
            .and_then(|tag| tag.get("units"))
            .and_then(Value::as_object)
        else {
            tracing::debug!("Tag '{}' not present in facts document", query.tag);
            return Extraction::default();
        };

        // Preferred unit, else the first unit the document lists.
        let Some((unit, disclosures)) = units
            .get(query.unit)
            .map(|disclosures| (query.unit, disclosures))
            .or_else(|| units.iter().next().map(|(key, v)| (key.as_str(), v)))
        else {
            tracing::debug!("Tag '{}' has no units", query.tag);
            return Extraction::default();
        };
        if unit != query.unit {
            tracing::warn!(
                "Unit '{}' not found for {}. Using '{}'.",
                query.unit,
                query.tag,
                unit
            );
        }

        let candidates = disclosures
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|raw| match parse_fact(raw) {
                Ok(obs) => Some(obs),
                Err(FactSkip::NotPeriodicReport) => None,
                Err(reason) => {
                    tracing::debug!("Skipping {} fact ({}): {}", query.tag, reason, raw);
                    None
                }
            })
            .filter(|obs| matches_year(obs, query.year))
            .filter(|obs| matches_period(obs, query.period))
            .collect::<Vec<_>>();

        let observations = self.deduplicate(candidates);
        tracing::debug!(
            "Extracted {} observations for {} ({})",
            observations.len(),
            query.tag,
            unit
        );

        Extraction {
            unit: Some(unit.to_string()),
            observations,
        }
    }

    /// Keeps the latest-filed observation per dedup key, ordered by end date.
    fn deduplicate(&self, mut observations: Vec<Observation>) -> Vec<Observation> {
        // Stable: equal (end, filed) pairs keep document order, so the last one listed wins.
        observations.sort_by(|a, b| (a.end_date, a.filed).cmp(&(b.end_date, b.filed)));

        let mut seen = HashSet::new();
        let mut kept: Vec<Observation> = observations
            .into_iter()
            .rev()
            .filter(|obs| seen.insert(self.dedup.key(obs)))
            .collect();
        kept.reverse();
        kept.sort_by_key(|obs| obs.end_date);
        kept
    }
}

// --- Helper Functions ---

fn parse_fact(raw: &Value) -> Result<Observation, FactSkip> {
    let form = raw
        .get("form")
        .and_then(Value::as_str)
        .and_then(FormType::parse)
        .ok_or(FactSkip::NotPeriodicReport)?;
    let value = raw.get("val").ok_or(FactSkip::Missing("val"))?;
    let end = non_empty_str(raw, "end")?;
    let fiscal_period = non_empty_str(raw, "fp")?;
    // Present but null is tolerated; an absent key is not.
    let fiscal_year = raw.get("fy").ok_or(FactSkip::Missing("fy"))?;

    Ok(Observation {
        end_date: parse_date("end", end)?,
        value: parse_value(value)?,
        form,
        fiscal_period: fiscal_period.to_string(),
        fiscal_year: FiscalYear::from_json(fiscal_year),
        filed: parse_date("filed", non_empty_str(raw, "filed")?)?,
    })
}

fn non_empty_str<'a>(raw: &'a Value, field: &'static str) -> Result<&'a str, FactSkip> {
    raw.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(FactSkip::Missing(field))
}

fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, FactSkip> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| FactSkip::BadDate(field, raw.to_string()))
}

fn parse_value(raw: &Value) -> Result<f64, FactSkip> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| FactSkip::BadValue(raw.to_string()))
}

fn matches_year(obs: &Observation, target: Option<i32>) -> bool {
    let Some(target) = target else {
        return true;
    };
    match obs.fiscal_year.as_ref().and_then(FiscalYear::as_year) {
        Some(year) => year == target,
        None => {
            tracing::debug!(
                "Could not parse fiscal year {:?} for filtering",
                obs.fiscal_year
            );
            false
        }
    }
}

fn matches_period(obs: &Observation, target: Option<FiscalPeriod>) -> bool {
    match target {
        None => true,
        // Annual reports count as full-year data whatever their own label says.
        Some(FiscalPeriod::FY) => {
            obs.form == FormType::Annual || FiscalPeriod::FY.matches_label(&obs.fiscal_period)
        }
        Some(period) => period.matches_label(&obs.fiscal_period),
    }
}
