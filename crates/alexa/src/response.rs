use serde::Serialize;

/// The platform response shape: `{version, response: {outputSpeech,
/// reprompt, shouldEndSession, canFulfillIntent}}`. Built through
/// [`ResponseBuilder`], immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkillResponse {
    pub version: &'static str,
    pub response: ResponseBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_speech: Option<OutputSpeech>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reprompt: Option<Reprompt>,
    pub should_end_session: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_fulfill_intent: Option<CanFulfillIntent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutputSpeech {
    #[serde(rename = "type")]
    pub speech_type: &'static str,
    pub text: String,
}

impl OutputSpeech {
    fn plain(text: String) -> Self {
        Self { speech_type: "PlainText", text }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reprompt {
    pub output_speech: OutputSpeech,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanFulfillVerdict {
    Yes,
    No,
    Maybe,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanFulfillIntent {
    pub can_fulfill: CanFulfillVerdict,
}

/// Accumulates speech, reprompt, and the session-continuation flag.
///
/// Session continuation follows the platform SDK convention: the session
/// ends by default, a reprompt keeps it open, and an explicit
/// `should_end_session` call overrides both.
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    speech: Option<String>,
    reprompt: Option<String>,
    end_session: Option<bool>,
    can_fulfill: Option<CanFulfillVerdict>,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speak(mut self, text: impl Into<String>) -> Self {
        self.speech = Some(text.into());
        self
    }

    pub fn reprompt(mut self, text: impl Into<String>) -> Self {
        self.reprompt = Some(text.into());
        self
    }

    pub fn should_end_session(mut self, end: bool) -> Self {
        self.end_session = Some(end);
        self
    }

    pub fn can_fulfill(mut self, verdict: CanFulfillVerdict) -> Self {
        self.can_fulfill = Some(verdict);
        self
    }

    pub fn build(self) -> SkillResponse {
        let should_end_session = self.end_session.unwrap_or(self.reprompt.is_none());
        SkillResponse {
            version: "1.0",
            response: ResponseBody {
                output_speech: self.speech.map(OutputSpeech::plain),
                reprompt: self
                    .reprompt
                    .map(|text| Reprompt { output_speech: OutputSpeech::plain(text) }),
                should_end_session,
                can_fulfill_intent: self
                    .can_fulfill
                    .map(|verdict| CanFulfillIntent { can_fulfill: verdict }),
            },
        }
    }
}

impl SkillResponse {
    pub fn speech_text(&self) -> Option<&str> {
        self.response.output_speech.as_ref().map(|speech| speech.text.as_str())
    }

    pub fn reprompt_text(&self) -> Option<&str> {
        self.response.reprompt.as_ref().map(|reprompt| reprompt.output_speech.text.as_str())
    }

    pub fn should_end_session(&self) -> bool {
        self.response.should_end_session
    }
}
