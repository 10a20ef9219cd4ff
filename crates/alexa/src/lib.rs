//! Alexa skill surface: the request envelope model, the response builder,
//! the intent handler set, and the first-match dispatcher.
//!
//! Handlers implement [`handlers::RequestHandler`] (`matches`/`handle`) and
//! are registered in a significant order; the dispatcher invokes the first
//! handler whose predicate accepts the envelope and routes any failure into
//! the unconditional fallback, so every request ends in a well-formed
//! response.

pub mod dispatch;
pub mod envelope;
pub mod handlers;
pub mod response;

pub use dispatch::{default_dispatcher, Dispatcher};
pub use envelope::{Intent, Request, RequestEnvelope, RequestKind, Session, Slot};
pub use handlers::{
    CanFulfillProbeHandler, FallbackHandler, GeminiIntentHandler, HandlerError, LaunchHandler,
    RequestContext, RequestHandler, StopHandler,
};
pub use response::{CanFulfillVerdict, ResponseBuilder, SkillResponse};
