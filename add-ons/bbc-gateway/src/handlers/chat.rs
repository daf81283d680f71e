//! Chatbot handler: hands the visitor's message to the FAQ responder.
//!
//! The endpoint always answers with `{"reply": ...}`. Malformed requests get a
//! 400 with a help message; a fault inside the handler is turned into a 200
//! with contact details by [`chatbot_fault`].

use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::any::Any;

pub(crate) const NOT_UNDERSTOOD_REPLY: &str = "Désolé, je n'ai pas compris votre message.";

pub(crate) const FAULT_REPLY: &str = "Désolé, l'assistant IA rencontre un problème temporaire. Vous pouvez nous contacter directement :\n\n📧 contact@bbcschool.dz\n📞 +213 661 12 34 56\n\nNous répondrons dans l'heure !";

fn reply(status: StatusCode, text: &str) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(serde_json::json!({ "reply": text })))
}

/// POST /chatbot – `{"msg": "..."}` in, `{"reply": "..."}` out.
pub(crate) async fn chatbot(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> (StatusCode, Json<serde_json::Value>) {
    let data = match body {
        Ok(Json(serde_json::Value::Object(map))) if !map.is_empty() => map,
        Ok(_) => return reply(StatusCode::BAD_REQUEST, NOT_UNDERSTOOD_REPLY),
        Err(rejection) => {
            tracing::warn!(target: "bbc::chatbot", error = %rejection, "Unreadable chatbot request");
            return reply(StatusCode::BAD_REQUEST, NOT_UNDERSTOOD_REPLY);
        }
    };

    let question = data
        .get("msg")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or("");
    if question.is_empty() {
        return reply(StatusCode::BAD_REQUEST, state.responder.empty_prompt());
    }

    let answer = state.responder.respond(question);
    reply(StatusCode::OK, &answer)
}

/// Response for a panic inside the chatbot route.
pub(crate) fn chatbot_fault(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!(target: "bbc::chatbot", error = %detail, "Chatbot handler failed");
    reply(StatusCode::OK, FAULT_REPLY).into_response()
}
