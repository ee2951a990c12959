use crate::dom::{input_type, Dom, DomError, ElementId};
use crate::essay::{classify_textareas, extract_page_context, find_essay_candidates, EssayCandidate};
use crate::field_classifier::{classify_text, match_and_fill, value_for, write_value, FieldText};
use crate::form_locator::{self, DetectedForm};
use crate::llm::{canned_response, question_id, GenerationError, TextGenerator};
use crate::profile::{AttributeKey, Profile};
use crate::resume::autofill_resume_fields;
use crate::site_patterns::{self, SitePattern};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use ts_rs::TS;

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(10);

const STRUCTURED_INPUT_TYPES: [&str; 4] = ["text", "email", "tel", "url"];

#[derive(Error, Debug)]
pub enum AutofillError {
    #[error("DOM error: {0}")]
    Dom(#[from] DomError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutofillConfig {
    /// Upper bound for one essay generation call.
    pub generation_timeout: Duration,
}

impl Default for AutofillConfig {
    fn default() -> Self {
        Self {
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FillResult {
    pub fields_filled: usize,
    pub essays_filled: usize,
}

/// One essay answer written into the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EssayAnswer {
    pub question_id: String,
    pub question: String,
    pub context: String,
    pub response: String,
    /// Set when the generator failed or timed out and canned text was used.
    pub fallback: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutofillOutcome {
    pub result: FillResult,
    pub resumes_attached: usize,
    pub answers: Vec<EssayAnswer>,
}

pub struct Autofiller {
    generator: Arc<dyn TextGenerator>,
    config: AutofillConfig,
}

impl Autofiller {
    pub fn new(generator: Arc<dyn TextGenerator>, config: AutofillConfig) -> Self {
        Self { generator, config }
    }

    pub fn config(&self) -> &AutofillConfig {
        &self.config
    }

    /// Detects the application form and fills it. `None` when no form was found.
    pub async fn autofill_page<D: Dom + ?Sized>(
        &self,
        dom: &mut D,
        profile: &Profile,
    ) -> Option<AutofillOutcome> {
        match form_locator::detect(dom) {
            Ok(Some(form)) => Some(self.run(dom, &form, profile).await),
            Ok(None) => {
                info!("No job application form to fill");
                None
            }
            Err(e) => {
                warn!("Form detection failed: {}", e);
                None
            }
        }
    }

    pub async fn autofill<D: Dom + ?Sized>(
        &self,
        dom: &mut D,
        form: &DetectedForm,
        profile: &Profile,
    ) -> FillResult {
        self.run(dom, form, profile).await.result
    }

    /// Fills `form` and reports what was written. Every failure is logged and
    /// the counts accumulated up to that point are returned.
    pub async fn run<D: Dom + ?Sized>(
        &self,
        dom: &mut D,
        form: &DetectedForm,
        profile: &Profile,
    ) -> AutofillOutcome {
        let mut outcome = AutofillOutcome::default();

        let site = dom.location().host_str().and_then(site_patterns::lookup);
        if let Some(pattern) = site {
            if let Err(e) = fill_site_hints(dom, form.element, pattern, profile, &mut outcome.result) {
                warn!("Site-specific fill for {} failed: {}", pattern.host, e);
            }
        }

        if let Err(e) = fill_structured(dom, Some(form.element), profile, &mut outcome.result) {
            warn!("Structured field fill failed: {}", e);
        }

        let structured = outcome.result.fields_filled;

        if profile.has_resume() {
            match autofill_resume_fields(dom, Some(form.element), profile) {
                Ok(attached) => {
                    outcome.resumes_attached = attached;
                    outcome.result.fields_filled += attached;
                }
                Err(e) => warn!("Resume upload failed: {}", e),
            }
        }

        if structured == 0 {
            debug!("Nothing filled inside the form, scanning the rest of the document");
            if let Err(e) = fill_outside_forms(dom, profile, &mut outcome.result) {
                warn!("Document-wide fill failed: {}", e);
            }
        }

        if let Err(e) = self.fill_essays(dom, form.element, profile, &mut outcome).await {
            warn!("Essay fill failed: {}", e);
        }

        info!(
            "Autofill complete: {} field(s), {} essay(s), {} resume upload(s)",
            outcome.result.fields_filled, outcome.result.essays_filled, outcome.resumes_attached
        );
        outcome
    }

    async fn fill_essays<D: Dom + ?Sized>(
        &self,
        dom: &mut D,
        form: ElementId,
        profile: &Profile,
        outcome: &mut AutofillOutcome,
    ) -> Result<(), AutofillError> {
        let essays: Vec<EssayCandidate> = find_essay_candidates(dom, form)?
            .into_iter()
            .filter(|candidate| candidate.is_essay)
            .collect();
        if essays.is_empty() {
            return Ok(());
        }

        let context = extract_page_context(dom);
        info!("Answering {} essay question(s)", essays.len());

        for candidate in essays {
            let (response, fallback) = match self.generate_answer(&candidate.question, &context, profile).await {
                Ok(response) => (response, false),
                Err(e) => {
                    warn!("Using fallback answer for '{}': {}", candidate.question, e);
                    (canned_response(&candidate.question), true)
                }
            };

            if !dom.value(candidate.element).trim().is_empty() {
                debug!("Essay field was filled while generating, skipping");
                continue;
            }

            write_value(dom, candidate.element, &response);
            outcome.result.essays_filled += 1;
            outcome.answers.push(EssayAnswer {
                question_id: question_id(&candidate.question),
                question: candidate.question,
                context: context.clone(),
                response,
                fallback,
            });
        }
        Ok(())
    }

    async fn generate_answer(
        &self,
        question: &str,
        context: &str,
        profile: &Profile,
    ) -> Result<String, GenerationError> {
        let timeout = self.config.generation_timeout;
        match tokio::time::timeout(timeout, self.generator.generate(question, context, profile)).await {
            Ok(Ok(response)) if !response.trim().is_empty() => Ok(response),
            Ok(Ok(_)) => Err(GenerationError::EmptyResponse("generator".to_string())),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(GenerationError::Timeout(timeout)),
        }
    }
}

/// Fills the first empty match of each site-specific name and email selector.
/// Matches the classifier assigns to another attribute are left alone.
fn fill_site_hints<D: Dom + ?Sized>(
    dom: &mut D,
    form: ElementId,
    pattern: &SitePattern,
    profile: &Profile,
    result: &mut FillResult,
) -> Result<(), DomError> {
    for selector in pattern.name_fields {
        let Some((field, text)) = first_empty_match(dom, form, selector, AttributeKey::Name)? else {
            continue;
        };
        let Some(value) = value_for(AttributeKey::Name, &text, profile) else {
            break;
        };
        let full_name = Some(value) == profile.value(AttributeKey::Name);
        write_value(dom, field, value);
        result.fields_filled += 1;
        if full_name {
            break;
        }
    }

    for selector in pattern.email_fields {
        if let Some((field, _)) = first_empty_match(dom, form, selector, AttributeKey::Email)? {
            if let Some(email) = profile.value(AttributeKey::Email) {
                write_value(dom, field, email);
                result.fields_filled += 1;
            }
            break;
        }
    }
    Ok(())
}

fn first_empty_match<D: Dom + ?Sized>(
    dom: &D,
    form: ElementId,
    selector: &str,
    key: AttributeKey,
) -> Result<Option<(ElementId, FieldText)>, DomError> {
    for field in dom.query_selector_all(Some(form), selector)? {
        if !dom.value(field).trim().is_empty() {
            continue;
        }
        let text = FieldText::resolve(dom, field)?;
        match classify_text(&text) {
            Some(other) if other != key => continue,
            _ => return Ok(Some((field, text))),
        }
    }
    Ok(None)
}

/// Structured inputs, non-essay textareas and selects in `scope`, in that order.
fn structured_fields<D: Dom + ?Sized>(
    dom: &D,
    scope: Option<ElementId>,
) -> Result<Vec<ElementId>, DomError> {
    let mut fields: Vec<ElementId> = dom
        .query_selector_all(scope, "input")?
        .into_iter()
        .filter(|input| STRUCTURED_INPUT_TYPES.contains(&input_type(dom, *input).as_str()))
        .collect();
    fields.extend(
        classify_textareas(dom, scope)?
            .into_iter()
            .filter(|candidate| !candidate.is_essay)
            .map(|candidate| candidate.element),
    );
    fields.extend(dom.query_selector_all(scope, "select")?);
    Ok(fields)
}

fn fill_structured<D: Dom + ?Sized>(
    dom: &mut D,
    scope: Option<ElementId>,
    profile: &Profile,
    result: &mut FillResult,
) -> Result<(), DomError> {
    for field in structured_fields(dom, scope)? {
        if match_and_fill(dom, field, profile)? {
            result.fields_filled += 1;
        }
    }
    Ok(())
}

fn fill_outside_forms<D: Dom + ?Sized>(
    dom: &mut D,
    profile: &Profile,
    result: &mut FillResult,
) -> Result<(), DomError> {
    for field in structured_fields(dom, None)? {
        if dom.closest(field, "form")?.is_some() {
            continue;
        }
        if match_and_fill(dom, field, profile)? {
            result.fields_filled += 1;
        }
    }
    Ok(())
}
