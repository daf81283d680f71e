//! Aggregate statistics for the admin dashboard.

use super::record::Registration;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Rows listed under `derniers_inscrits`.
const RECENT_LIMIT: usize = 5;

pub const EXPORT_URL: &str = "/export";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentRegistration {
    pub prenom: String,
    pub nom: String,
    pub email: String,
    pub timestamp: String,
}

/// Body of `GET /admin` when at least one registration exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationStats {
    pub total: usize,
    pub aujourd_hui: usize,
    pub derniere_inscription: String,
    pub par_niveau: BTreeMap<String, usize>,
    pub par_format: BTreeMap<String, usize>,
    pub derniers_inscrits: Vec<RecentRegistration>,
    pub export_url: String,
    pub csv_path: String,
}

impl RegistrationStats {
    /// Returns `None` for an empty record set.
    pub fn from_records(records: &[Registration], today: NaiveDate, csv_path: &str) -> Option<Self> {
        let last = records.last()?;
        let today = today.format("%Y-%m-%d").to_string();
        let derniere = if last.timestamp.is_empty() {
            "N/A".to_string()
        } else {
            last.timestamp.clone()
        };
        let start = records.len().saturating_sub(RECENT_LIMIT);
        Some(Self {
            total: records.len(),
            aujourd_hui: records.iter().filter(|r| r.timestamp.contains(&today)).count(),
            derniere_inscription: derniere,
            par_niveau: value_counts(records.iter().map(|r| r.niveau.as_str())),
            par_format: value_counts(records.iter().map(|r| r.format.as_str())),
            derniers_inscrits: records[start..]
                .iter()
                .map(|r| RecentRegistration {
                    prenom: r.prenom.clone(),
                    nom: r.nom.clone(),
                    email: r.email.clone(),
                    timestamp: r.timestamp.clone(),
                })
                .collect(),
            export_url: EXPORT_URL.to_string(),
            csv_path: csv_path.to_string(),
        })
    }
}

/// Occurrences per distinct non-empty value.
fn value_counts<'a>(values: impl Iterator<Item = &'a str>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for v in values.filter(|v| !v.is_empty()) {
        *counts.entry(v.to_string()).or_insert(0) += 1;
    }
    counts
}
