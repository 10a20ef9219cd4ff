//! HTTP surface of the skill.
//!
//! - `POST /alexa`  — the voice platform's request envelope in, the skill
//!   response out; dispatched envelopes always answer 200.
//! - `GET  /health` — liveness probe.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use sabio_alexa::dispatch::Dispatcher;
use sabio_alexa::envelope::RequestEnvelope;
use sabio_alexa::response::SkillResponse;
use serde::Serialize;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct SkillState {
    dispatcher: Arc<Dispatcher>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub checked_at: String,
}

pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/alexa", post(handle_skill_request))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(SkillState { dispatcher })
}

/// Dispatch never fails: every envelope that deserializes gets a
/// well-formed response, so a handler failure never turns into a 5xx.
pub async fn handle_skill_request(
    State(state): State<SkillState>,
    Json(envelope): Json<RequestEnvelope>,
) -> Json<SkillResponse> {
    Json(state.dispatcher.dispatch(&envelope).await)
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ready",
        service: "sabio-server",
        checked_at: Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use sabio_alexa::dispatch::default_dispatcher;
    use sabio_alexa::handlers::{GENERIC_APOLOGY_SPEECH, GREETING_SPEECH};
    use sabio_gemini::{GenerationError, GenerationRequest, GenerationSettings, TextGenerator};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use super::*;

    struct StubGenerator {
        answer: Option<String>,
    }

    #[async_trait]
    impl TextGenerator for StubGenerator {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
            match &self.answer {
                Some(text) => Ok(text.clone()),
                None => Err(GenerationError::EmptyCandidates),
            }
        }
    }

    fn test_router(answer: Option<&str>) -> Router {
        let settings = GenerationSettings {
            model: "gemini-1.5-flash".to_string(),
            max_output_tokens: 512,
            temperature: 0.7,
        };
        let generator = StubGenerator { answer: answer.map(str::to_string) };
        router(Arc::new(default_dispatcher(generator, settings)))
    }

    fn post_envelope(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/alexa")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn response_json(response: axum::response::Response) -> Value {
        let bytes =
            axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("read body");
        serde_json::from_slice(&bytes).expect("body should be JSON")
    }

    #[tokio::test]
    async fn query_intent_round_trip_speaks_the_generated_text() {
        let app = test_router(Some("Paris."));

        let response = app
            .oneshot(post_envelope(json!({
                "version": "1.0",
                "session": {"new": false, "sessionId": "session-1"},
                "request": {
                    "type": "IntentRequest",
                    "requestId": "req-1",
                    "intent": {
                        "name": "GeminiIntent",
                        "slots": {"message": {"name": "message", "value": "What is the capital of France?"}}
                    }
                }
            })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["response"]["outputSpeech"]["text"], "Paris.");
        assert!(body["response"]["reprompt"]["outputSpeech"]["text"].is_string());
        assert_eq!(body["response"]["shouldEndSession"], json!(false));
    }

    #[tokio::test]
    async fn unrecognized_intent_still_answers_200_with_the_apology() {
        let app = test_router(Some("unused"));

        let response = app
            .oneshot(post_envelope(json!({
                "request": {"type": "IntentRequest", "intent": {"name": "NoSuchIntent"}}
            })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["response"]["outputSpeech"]["text"], GENERIC_APOLOGY_SPEECH);
    }

    #[tokio::test]
    async fn launch_request_round_trip_greets() {
        let app = test_router(Some("unused"));

        let response = app
            .oneshot(post_envelope(json!({
                "session": {"new": true, "sessionId": "session-2"},
                "request": {"type": "LaunchRequest", "requestId": "req-2"}
            })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["response"]["outputSpeech"]["text"], GREETING_SPEECH);
    }

    #[tokio::test]
    async fn model_failure_round_trip_stays_200() {
        let app = test_router(None);

        let response = app
            .oneshot(post_envelope(json!({
                "request": {
                    "type": "IntentRequest",
                    "intent": {
                        "name": "GeminiIntent",
                        "slots": {"message": {"name": "message", "value": "hola"}}
                    }
                }
            })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(
            body["response"]["outputSpeech"]["text"],
            "Hubo un problema al consultar Gemini. Intenta más tarde."
        );
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_before_dispatch() {
        let app = test_router(Some("unused"));

        let request = Request::builder()
            .method("POST")
            .uri("/alexa")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("not json"))
            .expect("request");
        let response = app.oneshot(request).await.expect("response");

        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn health_reports_ready() {
        let app = test_router(Some("unused"));

        let request =
            Request::builder().method("GET").uri("/health").body(Body::empty()).expect("request");
        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["status"], "ready");
        assert_eq!(body["service"], "sabio-server");
    }
}
