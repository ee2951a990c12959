use crate::dom::{Dom, DomError, ElementId};
use crate::site_patterns::{self, SitePattern};
use crate::utils::contains_any;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use tracing::{debug, info};

const JOB_KEYWORDS: [&str; 6] = ["apply", "application", "resume", "cv", "cover letter", "job"];

const FILE_INPUT_SELECTOR: &str = r#"input[type="file"]"#;
const NAME_FIELD_SELECTOR: &str = r#"input[name*="name"], input[placeholder*="name"]"#;
const EMAIL_FIELD_SELECTOR: &str = r#"input[type="email"], input[name*="email"]"#;
const APPLICATION_CONTAINER_SELECTOR: &str = r#".application, .apply, [id*="apply"], [class*="apply"], [id*="application"], [class*="application"]"#;

/// How a form was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum Provenance {
    SiteSpecific,
    GenericHeuristic,
    FallbackContainer,
}

/// The subtree judged to be the application form. Only valid for the document
/// state it was detected in; detect again after the page changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedForm {
    pub element: ElementId,
    pub provenance: Provenance,
}

/// Looks up the site pattern for the document's host and locates the form.
pub fn detect<D: Dom + ?Sized>(dom: &D) -> Result<Option<DetectedForm>, DomError> {
    let site = dom.location().host_str().and_then(site_patterns::lookup);
    locate(dom, site)
}

/// Finds the single most likely job-application form, trying site selectors,
/// then generic form heuristics, then application-looking containers.
pub fn locate<D: Dom + ?Sized>(
    dom: &D,
    site: Option<&SitePattern>,
) -> Result<Option<DetectedForm>, DomError> {
    if let Some(pattern) = site {
        if let Some(element) = dom.query_selector(None, pattern.form_selector)? {
            info!("Detected job form on {} using site selector", pattern.host);
            return Ok(Some(DetectedForm {
                element,
                provenance: Provenance::SiteSpecific,
            }));
        }
        debug!(
            "Site selector '{}' for {} matched nothing, falling back to heuristics",
            pattern.form_selector, pattern.host
        );
    }

    let forms = dom.query_selector_all(None, "form")?;

    let mut with_file_upload = Vec::new();
    for form in &forms {
        if dom.query_selector(Some(*form), FILE_INPUT_SELECTOR)?.is_some() {
            with_file_upload.push(*form);
        }
    }
    if let [only] = with_file_upload.as_slice() {
        info!("Detected job form with file upload");
        return Ok(Some(DetectedForm {
            element: *only,
            provenance: Provenance::GenericHeuristic,
        }));
    }

    for form in &forms {
        let text = dom.visible_text(*form).to_lowercase();
        let has_job_keyword = contains_any(&text, &JOB_KEYWORDS);
        let has_name_field = dom.query_selector(Some(*form), NAME_FIELD_SELECTOR)?.is_some();
        let has_email_field = dom.query_selector(Some(*form), EMAIL_FIELD_SELECTOR)?.is_some();

        if has_job_keyword || (has_name_field && has_email_field) {
            info!("Detected potential job application form");
            return Ok(Some(DetectedForm {
                element: *form,
                provenance: Provenance::GenericHeuristic,
            }));
        }
    }

    let href = dom.location().as_str().to_lowercase();
    if site.is_some() || href.contains("job") || href.contains("career") {
        if let Some(element) = dom.query_selector(None, APPLICATION_CONTAINER_SELECTOR)? {
            info!("Detected application container");
            return Ok(Some(DetectedForm {
                element,
                provenance: Provenance::FallbackContainer,
            }));
        }
    }

    debug!("No job application form found on {}", dom.location());
    Ok(None)
}
