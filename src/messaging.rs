use crate::autofill::{AutofillOutcome, Autofiller};
use crate::dom::Dom;
use crate::form_locator::{self, Provenance};
use crate::resume::has_resume_field;
use crate::storage::{AiResponse, ProfileStore};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use ts_rs::TS;

/// Requests exchanged between the page agent and the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "action", rename_all = "camelCase")]
#[ts(export)]
pub enum Message {
    FindJobForm,
    AutofillWithStoredProfile,
    AnalyzeNow,
    JobFormFound { url: String, found: bool },
    PageAnalyzed { url: String, found: bool },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ResponseMessage {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub form_found: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub has_resume_field: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub provenance: Option<Provenance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub fields_filled: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub essays_filled: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub error: Option<String>,
}

impl ResponseMessage {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Page-side endpoint: owns the document and answers coordinator messages.
pub struct ContentAgent<D: Dom> {
    dom: D,
    store: Arc<dyn ProfileStore>,
    autofiller: Autofiller,
}

impl<D: Dom> ContentAgent<D> {
    pub fn new(dom: D, store: Arc<dyn ProfileStore>, autofiller: Autofiller) -> Self {
        Self {
            dom,
            store,
            autofiller,
        }
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn into_dom(self) -> D {
        self.dom
    }

    /// Answers one message. Failures are reported in the response, never raised.
    pub async fn handle(&mut self, message: Message) -> ResponseMessage {
        match message {
            Message::FindJobForm | Message::AnalyzeNow => self.find_job_form().await,
            Message::AutofillWithStoredProfile => self.autofill_with_stored_profile().await,
            Message::JobFormFound { url, found } | Message::PageAnalyzed { url, found } => {
                match self.store.record_job_form(&url, found).await {
                    Ok(()) => ResponseMessage::ok(),
                    Err(e) => ResponseMessage::failure(format!("Failed to record job form: {e}")),
                }
            }
        }
    }

    async fn find_job_form(&mut self) -> ResponseMessage {
        let detected = match form_locator::detect(&self.dom) {
            Ok(detected) => detected,
            Err(e) => return ResponseMessage::failure(e.to_string()),
        };

        let url = self.dom.location().to_string();
        if let Err(e) = self.store.record_job_form(&url, detected.is_some()).await {
            warn!("Failed to record job form for {}: {}", url, e);
        }

        let Some(form) = detected else {
            info!("No job application form on {}", url);
            return ResponseMessage {
                form_found: Some(false),
                ..ResponseMessage::ok()
            };
        };

        let has_resume = has_resume_field(&self.dom, form.element).unwrap_or_else(|e| {
            warn!("Resume field check failed: {}", e);
            false
        });
        ResponseMessage {
            form_found: Some(true),
            has_resume_field: Some(has_resume),
            provenance: Some(form.provenance),
            ..ResponseMessage::ok()
        }
    }

    async fn autofill_with_stored_profile(&mut self) -> ResponseMessage {
        let profile = match self.store.get_profile().await {
            Ok(profile) => profile,
            Err(e) => return ResponseMessage::failure(format!("Failed to load profile: {e}")),
        };

        let Some(outcome) = self.autofiller.autofill_page(&mut self.dom, &profile).await else {
            return ResponseMessage {
                form_found: Some(false),
                ..ResponseMessage::failure("No job application form detected")
            };
        };

        self.save_answers(&outcome).await;

        ResponseMessage {
            form_found: Some(true),
            fields_filled: Some(outcome.result.fields_filled),
            essays_filled: Some(outcome.result.essays_filled),
            ..ResponseMessage::ok()
        }
    }

    async fn save_answers(&self, outcome: &AutofillOutcome) {
        for answer in outcome.answers.iter().filter(|answer| !answer.fallback) {
            let response = AiResponse {
                question: answer.question.clone(),
                response: answer.response.clone(),
                context: answer.context.clone(),
                timestamp: Utc::now(),
            };
            if let Err(e) = self.store.save_ai_response(&answer.question_id, response).await {
                warn!("Failed to save answer for '{}': {}", answer.question, e);
            }
        }
    }
}
