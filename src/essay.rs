use crate::dom::{Dom, DomError, ElementId};
use crate::field_classifier::resolve_label;
use crate::utils::{contains_any, trim_and_clean_text, truncate_chars};

/// Words that mark a textarea as an open-ended question.
pub const ESSAY_KEYWORDS: [&str; 20] = [
    "why", "explain", "describe", "tell us", "share", "provide", "elaborate", "reason",
    "experience", "background", "skills", "fit", "contribute", "value", "strengths",
    "weaknesses", "achievements", "goals", "interest", "passion",
];

pub const DEFAULT_QUESTION: &str = "General application question";
pub const NO_CONTEXT: &str = "No specific job context available.";

/// Prompt text shorter than this is treated as decoration, even on a large textarea.
const MIN_PROMPT_CHARS: usize = 10;

const TITLE_SELECTOR: &str = r#"h1, .job-title, [class*="job-title"], [class*="jobTitle"], [class*="posting-headline"]"#;
const COMPANY_SELECTOR: &str = r#".company-name, .company, [class*="company-name"], [class*="companyName"], [class*="company"]"#;
const DESCRIPTION_SELECTOR: &str = r#".job-description, [class*="job-description"], [class*="jobDescription"], [id*="description"], [class*="description"]"#;

const MAX_TITLE_CHARS: usize = 200;
const MAX_COMPANY_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 1500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EssayCandidate {
    pub element: ElementId,
    pub question: String,
    pub is_essay: bool,
}

/// Classifies every empty textarea in `form`, in document order. Textareas that
/// already hold text are considered answered and are not returned.
pub fn find_essay_candidates<D: Dom + ?Sized>(
    dom: &D,
    form: ElementId,
) -> Result<Vec<EssayCandidate>, DomError> {
    classify_textareas(dom, Some(form))
}

/// Same as [`find_essay_candidates`] over `scope`, or the whole document.
pub fn classify_textareas<D: Dom + ?Sized>(
    dom: &D,
    scope: Option<ElementId>,
) -> Result<Vec<EssayCandidate>, DomError> {
    let mut candidates = Vec::new();

    for textarea in dom.query_selector_all(scope, "textarea")? {
        if !dom.value(textarea).trim().is_empty() {
            continue;
        }

        let label = resolve_label(dom, textarea)?;
        let placeholder = dom.attr(textarea, "placeholder").unwrap_or_default();
        let aria_label = dom.attr(textarea, "aria-label").unwrap_or_default();

        let prompt = trim_and_clean_text(&format!("{label} {placeholder} {aria_label}")).to_lowercase();
        let is_essay = contains_any(&prompt, &ESSAY_KEYWORDS)
            || (is_large(dom, textarea) && prompt.chars().count() > MIN_PROMPT_CHARS);

        let question = [label, placeholder, aria_label]
            .into_iter()
            .map(|text| text.trim().to_string())
            .find(|text| !text.is_empty())
            .unwrap_or_else(|| DEFAULT_QUESTION.to_string());

        candidates.push(EssayCandidate {
            element: textarea,
            question,
            is_essay,
        });
    }

    Ok(candidates)
}

fn is_large<D: Dom + ?Sized>(dom: &D, textarea: ElementId) -> bool {
    let dimension = |name: &str| {
        dom.attr(textarea, name)
            .and_then(|value| value.trim().parse::<u32>().ok())
            .unwrap_or(0)
    };
    dimension("rows") > 2 || dimension("cols") > 40
}

/// Best-effort description of the job: title, company and description text
/// found on the page, each truncated.
pub fn extract_page_context<D: Dom + ?Sized>(dom: &D) -> String {
    let title = first_text(dom, TITLE_SELECTOR).or_else(|| first_text(dom, "title"));
    let company = first_text(dom, COMPANY_SELECTOR).or_else(|| {
        dom.query_selector(None, r#"meta[property="og:site_name"]"#)
            .ok()
            .flatten()
            .and_then(|meta| dom.attr(meta, "content"))
            .map(|content| trim_and_clean_text(&content))
            .filter(|content| !content.is_empty())
    });
    let description = first_text(dom, DESCRIPTION_SELECTOR);

    let mut sections = Vec::new();
    if let Some(title) = title {
        sections.push(format!("Job title: {}", truncate_chars(&title, MAX_TITLE_CHARS)));
    }
    if let Some(company) = company {
        sections.push(format!("Company: {}", truncate_chars(&company, MAX_COMPANY_CHARS)));
    }
    if let Some(description) = description {
        sections.push(format!(
            "Job description: {}",
            truncate_chars(&description, MAX_DESCRIPTION_CHARS)
        ));
    }

    if sections.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        sections.join("\n")
    }
}

fn first_text<D: Dom + ?Sized>(dom: &D, selector: &str) -> Option<String> {
    dom.query_selector_all(None, selector)
        .ok()?
        .into_iter()
        .map(|element| dom.visible_text(element))
        .find(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::HtmlDocument;
    use url::Url;

    fn document(body: &str) -> HtmlDocument {
        HtmlDocument::parse(
            &format!("<html><head><title>Careers</title></head><body>{body}</body></html>"),
            Url::parse("https://example.com/jobs/7").unwrap(),
        )
    }

    fn candidates(doc: &HtmlDocument) -> Vec<EssayCandidate> {
        let form = doc.query_selector(None, "form").unwrap().unwrap();
        find_essay_candidates(doc, form).unwrap()
    }

    #[test]
    fn test_keyword_placeholder_is_essay() {
        let doc = document(r#"<form><textarea placeholder="Why do you want to work here?"></textarea></form>"#);
        let found = candidates(&doc);
        assert_eq!(found.len(), 1);
        assert!(found[0].is_essay);
        assert_eq!(found[0].question, "Why do you want to work here?");
    }

    #[test]
    fn test_prefilled_textarea_is_not_a_candidate() {
        let doc = document(
            r#"<form><textarea placeholder="Why do you want to work here?">Because I love it.</textarea></form>"#,
        );
        assert!(candidates(&doc).is_empty());
    }

    #[test]
    fn test_large_textarea_needs_enough_prompt() {
        let doc = document(
            r#"<form>
                <textarea id="big" rows="6" placeholder="Anything else we should know?"></textarea>
                <textarea id="tiny" rows="6" placeholder="Notes"></textarea>
                <textarea id="small" placeholder="Anything else we should know?"></textarea>
            </form>"#,
        );
        let found = candidates(&doc);
        assert_eq!(found.len(), 3);
        assert!(found[0].is_essay);
        assert!(!found[1].is_essay);
        assert!(!found[2].is_essay);
    }

    #[test]
    fn test_question_text_precedence() {
        let doc = document(
            r#"<form>
                <label for="a">Cover letter</label><textarea id="a" placeholder="Paste here"></textarea>
                <div><textarea aria-label="Describe a project you led"></textarea></div>
                <div><textarea cols="80"></textarea></div>
            </form>"#,
        );
        let found = candidates(&doc);
        assert_eq!(found[0].question, "Cover letter");
        assert_eq!(found[1].question, "Describe a project you led");
        assert!(found[1].is_essay);
        assert_eq!(found[2].question, DEFAULT_QUESTION);
        assert!(!found[2].is_essay);
    }

    #[test]
    fn test_page_context() {
        let doc = document(
            r#"<h1>Senior Rust Engineer</h1>
               <div class="company-name">Acme Corp</div>
               <section class="job-description"><p>Build   fast systems.</p></section>
               <form></form>"#,
        );
        assert_eq!(
            extract_page_context(&doc),
            "Job title: Senior Rust Engineer\nCompany: Acme Corp\nJob description: Build fast systems."
        );
    }

    #[test]
    fn test_page_context_placeholder() {
        let doc = HtmlDocument::parse(
            "<html><body><form></form></body></html>",
            Url::parse("https://example.com/").unwrap(),
        );
        assert_eq!(extract_page_context(&doc), NO_CONTEXT);
    }
}
