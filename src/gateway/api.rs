//! Request handlers for the gateway routes.

use super::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub message: String,
    /// Opt-in conversation key. Live replies replay earlier turns stored
    /// under the same key; requests without one share nothing.
    #[serde(default)]
    pub conversation_id: Option<String>,
}

impl AskRequest {
    fn conversation(&self) -> Option<&str> {
        self.conversation_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub reply: String,
}

/// POST /ask - answer one message
pub async fn handle_ask(
    State(state): State<AppState>,
    Json(body): Json<AskRequest>,
) -> impl IntoResponse {
    match state
        .session
        .respond_in(body.conversation(), &body.message)
        .await
    {
        Ok(reply) => Json(AskResponse { reply }).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to answer /ask request");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "detail": format!("Error processing message: {}", e.description())
                })),
            )
                .into_response()
        }
    }
}

/// DELETE /conversations/{id} - drop stored turns for one conversation
pub async fn handle_end_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> impl IntoResponse {
    if state.session.end_conversation(&conversation_id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "detail": "Conversation not found" })),
        )
            .into_response()
    }
}

/// GET /health - liveness and responder mode
pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "mode": state.session.mode(),
        "model": state.session.model(),
        "memory": state.session.memory_backend(),
        "session_id": state.session.id(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_request_conversation_id_is_optional() {
        let req: AskRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(req.message, "hi");
        assert!(req.conversation().is_none());
    }

    #[test]
    fn blank_conversation_id_counts_as_none() {
        let req: AskRequest =
            serde_json::from_str(r#"{"message":"hi","conversation_id":"  "}"#).unwrap();
        assert!(req.conversation().is_none());

        let req: AskRequest =
            serde_json::from_str(r#"{"message":"hi","conversation_id":" c1 "}"#).unwrap();
        assert_eq!(req.conversation(), Some("c1"));
    }
}
