use std::sync::Arc;

use sabio_gemini::{GenerationSettings, TextGenerator};

use crate::envelope::RequestEnvelope;
use crate::handlers::{
    CanFulfillProbeHandler, FallbackHandler, GeminiIntentHandler, LaunchHandler, RequestContext,
    RequestHandler, StopHandler,
};
use crate::response::SkillResponse;

/// First-match dispatch over an ordered handler list.
///
/// Predicates are evaluated strictly in registration order and the first
/// accepting handler answers; its failure is routed into the unconditional
/// fallback together with the original envelope. Stateless across requests.
#[derive(Default)]
pub struct Dispatcher {
    handlers: Vec<Arc<dyn RequestHandler>>,
    fallback: FallbackHandler,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: RequestHandler + 'static,
    {
        self.handlers.push(Arc::new(handler));
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Always produces a response: the fallback's predicate is
    /// unconditional, so the scan terminates even for surprise envelopes.
    pub async fn dispatch(&self, envelope: &RequestEnvelope) -> SkillResponse {
        let ctx = RequestContext::for_envelope(envelope);

        for handler in &self.handlers {
            if !handler.matches(envelope) {
                continue;
            }
            return match handler.handle(envelope, &ctx).await {
                Ok(response) => response,
                Err(failure) => self.fallback.recover(envelope, &ctx, &failure),
            };
        }

        self.fallback.respond(envelope, &ctx)
    }
}

/// The production handler set in its significant order: launch, query
/// intent, capability probe, stop/cancel; the fallback sits behind all of
/// them.
pub fn default_dispatcher<G>(generator: G, settings: GenerationSettings) -> Dispatcher
where
    G: TextGenerator + 'static,
{
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(LaunchHandler);
    dispatcher.register(GeminiIntentHandler::new(generator, settings));
    dispatcher.register(CanFulfillProbeHandler);
    dispatcher.register(StopHandler);
    dispatcher
}
