use async_trait::async_trait;
use sabio_gemini::{GenerationSettings, TextGenerator};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::envelope::{RequestEnvelope, RequestKind};
use crate::response::{CanFulfillVerdict, ResponseBuilder, SkillResponse};

/// The intent the skill forwards to the language model, and the slot
/// carrying the user's free text.
pub const QUERY_INTENT: &str = "GeminiIntent";
pub const QUERY_SLOT: &str = "message";

pub const STOP_INTENT: &str = "AMAZON.StopIntent";
pub const CANCEL_INTENT: &str = "AMAZON.CancelIntent";

// User-visible strings are fixed constants: no failure path ever speaks raw
// error text.
pub const GREETING_SPEECH: &str =
    "¡Hola! Bienvenido a tu skill con integración de Gemini. Dime qué quieres preguntar.";
pub const GREETING_REPROMPT: &str = "¿Cómo puedo ayudarte?";
pub const CLARIFICATION_SPEECH: &str = "No entendí tu pregunta, por favor repítela.";
pub const CLARIFICATION_REPROMPT: &str = "¿Qué quieres saber?";
pub const FOLLOW_UP_REPROMPT: &str = "¿Quieres preguntar algo más?";
pub const GEMINI_APOLOGY_SPEECH: &str = "Hubo un problema al consultar Gemini. Intenta más tarde.";
pub const GENERIC_APOLOGY_SPEECH: &str = "Ocurrió un error. Por favor, intenta de nuevo.";
pub const STOP_SPEECH: &str = "De acuerdo. ¿Necesitas algo más?";

/// Per-request log correlation. Uses the platform request id when present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    pub correlation_id: String,
}

impl RequestContext {
    pub fn for_envelope(envelope: &RequestEnvelope) -> Self {
        let correlation_id = envelope
            .request_id()
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self { correlation_id }
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("handler failure: {0}")]
    Internal(String),
}

/// A registered handler: a predicate over the envelope and a
/// response-producing action. Handlers are stateless; registration order
/// decides which one answers.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    fn matches(&self, envelope: &RequestEnvelope) -> bool;
    async fn handle(
        &self,
        envelope: &RequestEnvelope,
        ctx: &RequestContext,
    ) -> Result<SkillResponse, HandlerError>;
}

/// Session launch: fixed greeting, session kept open. Pure.
#[derive(Clone, Copy, Debug, Default)]
pub struct LaunchHandler;

#[async_trait]
impl RequestHandler for LaunchHandler {
    fn matches(&self, envelope: &RequestEnvelope) -> bool {
        envelope.request_kind() == RequestKind::LaunchRequest
    }

    async fn handle(
        &self,
        _envelope: &RequestEnvelope,
        _ctx: &RequestContext,
    ) -> Result<SkillResponse, HandlerError> {
        Ok(ResponseBuilder::new().speak(GREETING_SPEECH).reprompt(GREETING_REPROMPT).build())
    }
}

/// The core intent: forward the `message` slot to the language model and
/// speak the answer. Upstream failures are absorbed here, never escalated
/// to the dispatcher fallback.
pub struct GeminiIntentHandler<G> {
    generator: G,
    settings: GenerationSettings,
}

impl<G> GeminiIntentHandler<G>
where
    G: TextGenerator,
{
    pub fn new(generator: G, settings: GenerationSettings) -> Self {
        Self { generator, settings }
    }
}

#[async_trait]
impl<G> RequestHandler for GeminiIntentHandler<G>
where
    G: TextGenerator + 'static,
{
    fn matches(&self, envelope: &RequestEnvelope) -> bool {
        envelope.request_kind() == RequestKind::IntentRequest
            && envelope.intent_name() == Some(QUERY_INTENT)
    }

    async fn handle(
        &self,
        envelope: &RequestEnvelope,
        ctx: &RequestContext,
    ) -> Result<SkillResponse, HandlerError> {
        let Some(message) = envelope.slot_value(QUERY_SLOT) else {
            info!(
                correlation_id = %ctx.correlation_id,
                "query intent arrived without a usable message slot"
            );
            return Ok(ResponseBuilder::new()
                .speak(CLARIFICATION_SPEECH)
                .reprompt(CLARIFICATION_REPROMPT)
                .build());
        };

        let request = self.settings.request(message);
        match self.generator.generate(&request).await {
            Ok(answer) => {
                info!(
                    correlation_id = %ctx.correlation_id,
                    model = %request.model,
                    chars = answer.len(),
                    "query intent answered"
                );
                Ok(ResponseBuilder::new().speak(answer).reprompt(FOLLOW_UP_REPROMPT).build())
            }
            Err(generation_error) => {
                error!(
                    correlation_id = %ctx.correlation_id,
                    model = %request.model,
                    error = %generation_error,
                    "gemini call failed"
                );
                Ok(ResponseBuilder::new().speak(GEMINI_APOLOGY_SPEECH).build())
            }
        }
    }
}

/// Capability probe: platforms may ask whether the query intent is
/// resolvable before invoking it. Always yes, no slot commitments, no
/// model call.
#[derive(Clone, Copy, Debug, Default)]
pub struct CanFulfillProbeHandler;

#[async_trait]
impl RequestHandler for CanFulfillProbeHandler {
    fn matches(&self, envelope: &RequestEnvelope) -> bool {
        envelope.request_kind() == RequestKind::CanFulfillIntentRequest
            && envelope.intent_name() == Some(QUERY_INTENT)
    }

    async fn handle(
        &self,
        _envelope: &RequestEnvelope,
        _ctx: &RequestContext,
    ) -> Result<SkillResponse, HandlerError> {
        Ok(ResponseBuilder::new().can_fulfill(CanFulfillVerdict::Yes).build())
    }
}

/// Stop/cancel acknowledgement. Deliberately keeps the session open for a
/// follow-up question instead of the platform's usual end-on-stop.
#[derive(Clone, Copy, Debug, Default)]
pub struct StopHandler;

#[async_trait]
impl RequestHandler for StopHandler {
    fn matches(&self, envelope: &RequestEnvelope) -> bool {
        envelope.request_kind() == RequestKind::IntentRequest
            && matches!(envelope.intent_name(), Some(STOP_INTENT) | Some(CANCEL_INTENT))
    }

    async fn handle(
        &self,
        _envelope: &RequestEnvelope,
        _ctx: &RequestContext,
    ) -> Result<SkillResponse, HandlerError> {
        Ok(ResponseBuilder::new().speak(STOP_SPEECH).should_end_session(false).build())
    }
}

/// The unconditional fallback: answers anything nothing else matched and
/// absorbs handler failures. Fixed apology, no reprompt, session ends by
/// default.
#[derive(Clone, Copy, Debug, Default)]
pub struct FallbackHandler;

impl FallbackHandler {
    pub fn respond(&self, envelope: &RequestEnvelope, ctx: &RequestContext) -> SkillResponse {
        warn!(
            correlation_id = %ctx.correlation_id,
            request_kind = ?envelope.request_kind(),
            intent = envelope.intent_name().unwrap_or("none"),
            "no handler matched; answering with the fallback apology"
        );
        ResponseBuilder::new().speak(GENERIC_APOLOGY_SPEECH).build()
    }

    pub fn recover(
        &self,
        envelope: &RequestEnvelope,
        ctx: &RequestContext,
        failure: &HandlerError,
    ) -> SkillResponse {
        error!(
            correlation_id = %ctx.correlation_id,
            request_kind = ?envelope.request_kind(),
            intent = envelope.intent_name().unwrap_or("none"),
            error = %failure,
            "handler failed; answering with the fallback apology"
        );
        ResponseBuilder::new().speak(GENERIC_APOLOGY_SPEECH).build()
    }
}

#[async_trait]
impl RequestHandler for FallbackHandler {
    fn matches(&self, _envelope: &RequestEnvelope) -> bool {
        true
    }

    async fn handle(
        &self,
        envelope: &RequestEnvelope,
        ctx: &RequestContext,
    ) -> Result<SkillResponse, HandlerError> {
        Ok(self.respond(envelope, ctx))
    }
}
