//! Webhook HTTP endpoints: inbound WATI messages and liveness checks.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::RecordError;
use crate::survey::recorder::ResponseRecorder;

/// Liveness string for `GET /`.
pub const ROOT_LIVENESS: &str = concat!("Survey Bot Live ", env!("CARGO_PKG_VERSION"));

/// Liveness string for `GET /webhook`.
pub const WEBHOOK_LIVENESS: &str = "running whatsapp webhook";

/// Inbound message payload. Fields are optional so a missing one becomes a 500
/// with a readable error instead of an extractor rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub text: Option<String>,
    pub wa_id: Option<String>,
}

/// Shared state for webhook routes.
#[derive(Clone)]
pub struct WebhookState {
    pub recorder: Arc<ResponseRecorder>,
}

/// Build the webhook router.
pub fn webhook_routes(recorder: Arc<ResponseRecorder>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/webhook", get(webhook_liveness).post(receive_message))
        .with_state(WebhookState { recorder })
        .layer(TraceLayer::new_for_http())
}

async fn root() -> &'static str {
    ROOT_LIVENESS
}

async fn webhook_liveness() -> &'static str {
    WEBHOOK_LIVENESS
}

/// POST /webhook
///
/// Records one answer. Every failure is answered with 500 `{error}`.
async fn receive_message(State(state): State<WebhookState>, body: Bytes) -> Response {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Malformed webhook body");
            return error_response(format!("invalid JSON body: {e}"));
        }
    };

    let (Some(text), Some(phone_number)) = (payload.text, payload.wa_id) else {
        warn!("Webhook payload missing text or waId");
        return error_response("payload must include 'text' and 'waId'");
    };

    info!(phone_number = %phone_number, "Received webhook message");

    match state.recorder.record(&phone_number, &text).await {
        Ok(recorded) => (
            StatusCode::OK,
            Json(json!({
                "message": "Webhook executed successfully",
                "question_index": recorded.index,
            })),
        )
            .into_response(),
        Err(e @ (RecordError::NoQuestionIndex | RecordError::QuestionIndexOutOfRange { .. })) => {
            warn!(phone_number = %phone_number, error = %e, "Message skipped");
            error_response(e.to_string())
        }
        Err(e) => {
            error!(phone_number = %phone_number, error = %e, "Failed to record answer");
            error_response(e.to_string())
        }
    }
}

fn error_response(message: impl Into<String>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message.into() })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::store::{LibSqlBackend, RespondentStore};
    use crate::survey::questions::StaticQuestionSource;

    async fn app() -> (Router, Arc<LibSqlBackend>) {
        let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let questions = Arc::new(StaticQuestionSource::new(["Opened on time?", "All good?"]));
        let recorder = Arc::new(ResponseRecorder::new(questions, store.clone()));
        (webhook_routes(recorder), store)
    }

    async fn post(app: Router, body: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(
                Request::post("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_text(app: Router, uri: &str) -> String {
        let resp = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn liveness_endpoints() {
        let (app, _) = app().await;
        assert_eq!(get_text(app.clone(), "/").await, ROOT_LIVENESS);
        assert_eq!(get_text(app, "/webhook").await, WEBHOOK_LIVENESS);
    }

    #[tokio::test]
    async fn answer_recorded() {
        let (app, store) = app().await;
        let (status, body) = post(app, r#"{"text": "2. Yes, all good", "waId": "917890000001"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Webhook executed successfully");
        assert_eq!(body["question_index"], 2);

        let record = store.get_respondent("917890000001").await.unwrap().unwrap();
        assert_eq!(record.answers[&2].answer, "Yes, all good");
    }

    #[tokio::test]
    async fn no_index_is_500_and_not_stored() {
        let (app, store) = app().await;
        let (status, body) = post(app, r#"{"text": "no number here", "waId": "9001"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("No question index"));
        assert!(store.list_respondents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_is_500() {
        let (app, _) = app().await;
        let (status, body) = post(app, r#"{"text": "9. late answer", "waId": "9001"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("out of range"));
    }

    #[tokio::test]
    async fn malformed_and_incomplete_bodies_are_500() {
        for body in ["not json", r#"{"text": "1. yes"}"#, r#"{"waId": "9001"}"#] {
            let (app, _) = app().await;
            let (status, json) = post(app, body).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "body: {body}");
            assert!(json["error"].is_string());
        }
    }

    #[tokio::test]
    async fn extra_provider_fields_are_ignored() {
        let (app, _) = app().await;
        let (status, _) = post(
            app,
            r#"{"text": "1. yes", "waId": "9001", "senderName": "Asha", "type": "text"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}
