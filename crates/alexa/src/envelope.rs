use std::collections::HashMap;

use serde::Deserialize;

/// One inbound voice interaction turn, as posted by the platform.
/// Immutable once deserialized; handlers only read it.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub session: Option<Session>,
    pub request: Request,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(rename = "type")]
    pub kind: RequestKind,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub intent: Option<Intent>,
}

/// Request discriminator. Types this skill does not model deserialize into
/// `Other` rather than failing, so surprise envelope shapes still reach the
/// fallback handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    LaunchRequest,
    IntentRequest,
    CanFulfillIntentRequest,
    SessionEndedRequest,
    Other,
}

impl<'de> Deserialize<'de> for RequestKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let kind = String::deserialize(deserializer)?;
        Ok(match kind.as_str() {
            "LaunchRequest" => Self::LaunchRequest,
            "IntentRequest" => Self::IntentRequest,
            "CanFulfillIntentRequest" => Self::CanFulfillIntentRequest,
            "SessionEndedRequest" => Self::SessionEndedRequest,
            _ => Self::Other,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub name: String,
    #[serde(default)]
    pub slots: HashMap<String, Slot>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl RequestEnvelope {
    pub fn request_kind(&self) -> RequestKind {
        self.request.kind
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request.request_id.as_deref()
    }

    pub fn intent_name(&self) -> Option<&str> {
        self.request.intent.as_ref().map(|intent| intent.name.as_str())
    }

    /// Slot extraction never fails: a missing intent, a missing slot, or a
    /// blank value all come back as `None`, and the caller decides what a
    /// missing value means.
    pub fn slot_value(&self, name: &str) -> Option<&str> {
        let value = self.request.intent.as_ref()?.slots.get(name)?.value.as_deref()?;
        let trimmed = value.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn is_new_session(&self) -> bool {
        self.session.as_ref().map(|session| session.new).unwrap_or(false)
    }
}
