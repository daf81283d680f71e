//! Registration intake: normalize, validate, store, notify.

use crate::rate_limit::client_ip;
use crate::AppState;
use axum::extract::rejection::FormRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::{Form, Json};
use bbc_core::{Appended, MailError, Registration, RegistrationForm, ValidationError};
use std::net::SocketAddr;

pub(crate) const TECHNICAL_ERROR: &str =
    "Erreur technique lors de l'inscription. Veuillez réessayer dans quelques instants.";

fn refuse(error: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "success": false, "error": error })),
    )
}

/// POST /inscription – form-encoded registration.
pub(crate) async fn inscription(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    form: Result<Form<RegistrationForm>, FormRejection>,
) -> (StatusCode, Json<serde_json::Value>) {
    // An unreadable body is treated like an empty form and fails validation below.
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::warn!(target: "bbc::inscription", error = %rejection, "Unreadable registration form");
            RegistrationForm::default()
        }
    };
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    let registration = Registration::from_form(
        form,
        Some(client_ip(connect.as_ref())),
        user_agent,
        chrono::Local::now(),
    );

    if let Err(e) = registration.validate() {
        match &e {
            ValidationError::InvalidEmail => {
                tracing::warn!(target: "bbc::inscription", email = %registration.email, "Invalid email")
            }
            _ => tracing::warn!(target: "bbc::inscription", "Incomplete registration: {}", e),
        }
        return refuse(&e.to_string());
    }

    match state.store.append_unique(&registration) {
        Ok(Appended::Saved) => {}
        Ok(Appended::DuplicateEmail) => {
            tracing::warn!(target: "bbc::inscription", email = %registration.email, "Duplicate email");
            return refuse(&ValidationError::DuplicateEmail.to_string());
        }
        Err(e) => {
            tracing::error!(
                target: "bbc::inscription",
                id = %registration.id,
                error = %e,
                "Registration could not be saved"
            );
            let debug = state.config.debug.then(|| e.to_string());
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "error": TECHNICAL_ERROR,
                    "debug": debug,
                })),
            );
        }
    }

    let email_sent = match state.notifier.notify(&registration).await {
        Ok(()) => true,
        Err(MailError::NotConfigured) => {
            tracing::warn!(target: "bbc::mail", "Notification not sent: mail password not configured");
            false
        }
        Err(e) => {
            tracing::error!(target: "bbc::mail", notifier = state.notifier.name(), error = %e, "Notification failed");
            false
        }
    };

    let full_name = registration.full_name();
    tracing::info!(
        target: "bbc::inscription",
        id = %registration.id,
        email = %registration.email,
        etablissement = %registration.etablissement,
        niveau = %registration.niveau,
        matiere = %registration.matiere,
        email_sent,
        "New registration: {}",
        full_name
    );

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "success": true,
            "message": format!(
                "Votre inscription a bien été enregistrée ! ID de confirmation: {}. Nous vous contacterons bientôt à {}.",
                registration.id, registration.email
            ),
            "id": registration.id,
            "email": registration.email,
            "full_name": full_name,
        })),
    )
}
