//! A course registration: form intake, normalization and validation.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// CSV column order.
pub const CSV_HEADER: [&str; 13] = [
    "id",
    "timestamp",
    "prenom",
    "nom",
    "email",
    "telephone",
    "etablissement",
    "matiere",
    "niveau",
    "format",
    "ip_address",
    "user_agent",
    "status",
];

/// Fields that must be non-empty after normalization, in reporting order.
pub const REQUIRED_FIELDS: [&str; 6] = ["prenom", "nom", "email", "etablissement", "matiere", "niveau"];

pub const DEFAULT_FORMAT: &str = "presentiel";
pub const CONFIRMED_STATUS: &str = "confirmé";
pub const UNKNOWN: &str = "unknown";
const USER_AGENT_MAX_CHARS: usize = 200;

/// Raw `POST /inscription` form fields as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub prenom: Option<String>,
    #[serde(default)]
    pub nom: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
    #[serde(default)]
    pub etablissement: Option<String>,
    #[serde(default)]
    pub matiere: Option<String>,
    #[serde(default)]
    pub niveau: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

/// One stored registration (one CSV row). Field order matches [`CSV_HEADER`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Registration {
    pub id: String,
    pub timestamp: String,
    pub prenom: String,
    pub nom: String,
    pub email: String,
    pub telephone: String,
    pub etablissement: String,
    pub matiere: String,
    pub niveau: String,
    pub format: String,
    pub ip_address: String,
    pub user_agent: String,
    pub status: String,
}

/// Why a submission was refused before being stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Champs obligatoires manquants : {}", field_list(.0))]
    MissingFields(Vec<&'static str>),

    #[error("Format d'email invalide")]
    InvalidEmail,

    #[error("Cette adresse email est déjà inscrite")]
    DuplicateEmail,
}

impl Registration {
    /// Normalizes a submitted form. `ip` and `user_agent` fall back to `unknown`.
    pub fn from_form(
        form: RegistrationForm,
        ip: Option<String>,
        user_agent: Option<&str>,
        now: DateTime<Local>,
    ) -> Self {
        let trimmed = |v: Option<String>| v.map(|s| s.trim().to_string()).unwrap_or_default();
        Self {
            id: now.format("%Y%m%d%H%M%S").to_string(),
            timestamp: now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            prenom: title_case(&trimmed(form.prenom)),
            nom: trimmed(form.nom).to_uppercase(),
            email: trimmed(form.email).to_lowercase(),
            telephone: trimmed(form.telephone),
            etablissement: title_case(&trimmed(form.etablissement)),
            matiere: trimmed(form.matiere),
            niveau: form.niveau.unwrap_or_default(),
            format: form.format.unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
            ip_address: ip.filter(|s| !s.is_empty()).unwrap_or_else(|| UNKNOWN.to_string()),
            user_agent: user_agent
                .map(|ua| ua.chars().take(USER_AGENT_MAX_CHARS).collect())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            status: CONFIRMED_STATUS.to_string(),
        }
    }

    /// Required-field and email-shape checks. Duplicates are checked against the store.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing: Vec<&'static str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|f| self.field(f).map_or(true, str::is_empty))
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }
        if !self.email.contains('@') || !self.email.contains('.') {
            return Err(ValidationError::InvalidEmail);
        }
        Ok(())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.prenom, self.nom)
    }

    /// Value of a column by CSV header name.
    pub fn field(&self, name: &str) -> Option<&str> {
        let v = match name {
            "id" => &self.id,
            "timestamp" => &self.timestamp,
            "prenom" => &self.prenom,
            "nom" => &self.nom,
            "email" => &self.email,
            "telephone" => &self.telephone,
            "etablissement" => &self.etablissement,
            "matiere" => &self.matiere,
            "niveau" => &self.niveau,
            "format" => &self.format,
            "ip_address" => &self.ip_address,
            "user_agent" => &self.user_agent,
            "status" => &self.status,
            _ => return None,
        };
        Some(v.as_str())
    }
}

fn field_list(fields: &[&str]) -> String {
    fields.iter().map(|f| title_case(f)).collect::<Vec<_>>().join(", ")
}

/// Upper-cases the first letter of every alphabetic run and lower-cases the rest
/// ("jean-pierre o'neil" -> "Jean-Pierre O'Neil").
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
