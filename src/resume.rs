use crate::dom::{AttachedFile, Dom, DomError, ElementId, EventKind};
use crate::field_classifier::resolve_label;
use crate::profile::Profile;
use crate::utils::contains_any;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const RESUME_KEYWORDS: [&str; 8] = [
    "resume", "cv", "curriculum", "vitae", "upload", "document", "attachment", "file",
];

/// Upload fields for a cover letter are never treated as the resume target.
const COVER_LETTER_MARKERS: [&str; 3] = ["cover letter", "cover_letter", "coverletter"];

const FILE_INPUT_SELECTOR: &str = r#"input[type="file"]"#;

#[derive(Error, Debug)]
pub enum ResumeError {
    #[error("Resume data is not a data URL")]
    NotADataUrl,
    #[error("Resume data URL is not base64 encoded")]
    NotBase64,
    #[error("Resume payload could not be decoded: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("DOM error: {0}")]
    Dom(#[from] DomError),
}

/// Decoded `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

pub fn decode_data_url(data: &str) -> Result<DataUrl, ResumeError> {
    let rest = data
        .trim()
        .strip_prefix("data:")
        .ok_or(ResumeError::NotADataUrl)?;
    let (meta, payload) = rest.split_once(',').ok_or(ResumeError::NotADataUrl)?;

    let mut params = meta.split(';');
    let mime_type = params
        .next()
        .map(str::trim)
        .filter(|mime| !mime.is_empty())
        .unwrap_or("application/octet-stream")
        .to_lowercase();
    if !params.any(|param| param.trim().eq_ignore_ascii_case("base64")) {
        return Err(ResumeError::NotBase64);
    }

    let bytes = STANDARD.decode(payload.trim())?;
    Ok(DataUrl { mime_type, bytes })
}

pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "application/pdf" => Some(".pdf"),
        "application/msword" => Some(".doc"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some(".docx"),
        "application/vnd.oasis.opendocument.text" => Some(".odt"),
        "application/rtf" | "text/rtf" => Some(".rtf"),
        "text/plain" => Some(".txt"),
        _ => None,
    }
}

/// Whether a file input's `accept` attribute admits the stored file. An empty
/// or missing attribute admits anything.
pub fn accepts(accept: &str, mime_type: &str, file_name: &str) -> bool {
    let mime_type = mime_type.to_lowercase();
    let file_name = file_name.to_lowercase();
    let tokens: Vec<String> = accept
        .split(',')
        .map(|token| token.trim().to_lowercase())
        .filter(|token| !token.is_empty())
        .collect();
    if tokens.is_empty() {
        return true;
    }

    tokens.iter().any(|token| {
        if token.starts_with('.') {
            file_name.ends_with(token.as_str()) || extension_for_mime(&mime_type) == Some(token.as_str())
        } else if token == "*/*" {
            true
        } else if let Some(major) = token.strip_suffix("/*") {
            mime_type.starts_with(&format!("{major}/"))
        } else {
            *token == mime_type
        }
    })
}

/// The stored resume as a file ready for injection, or `None` when the profile
/// holds no resume.
pub fn resume_file(profile: &Profile) -> Result<Option<AttachedFile>, ResumeError> {
    let Some(data) = profile.resume_data.as_deref().filter(|_| profile.has_resume()) else {
        return Ok(None);
    };
    let decoded = decode_data_url(data)?;

    let mime_type = profile
        .resume_file_type
        .as_deref()
        .map(str::trim)
        .filter(|mime| !mime.is_empty())
        .map(str::to_lowercase)
        .unwrap_or(decoded.mime_type);
    let name = profile
        .resume_file_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("resume{}", extension_for_mime(&mime_type).unwrap_or("")));

    Ok(Some(AttachedFile {
        name,
        mime_type,
        bytes: decoded.bytes,
    }))
}

fn upload_text<D: Dom + ?Sized>(dom: &D, input: ElementId) -> Result<String, DomError> {
    let attr = |name: &str| dom.attr(input, name).unwrap_or_default();
    Ok(format!(
        "{} {} {} {}",
        attr("name"),
        attr("id"),
        resolve_label(dom, input)?,
        attr("aria-label")
    )
    .to_lowercase())
}

/// File inputs in `scope` that should receive the resume. When no input looks
/// like a resume upload but the scope has exactly one file input, that input is
/// used unless it is marked as a cover letter upload.
pub fn find_resume_inputs<D: Dom + ?Sized>(
    dom: &D,
    scope: Option<ElementId>,
    file: &AttachedFile,
) -> Result<Vec<ElementId>, DomError> {
    let inputs = dom.query_selector_all(scope, FILE_INPUT_SELECTOR)?;

    let mut targets = Vec::new();
    for input in &inputs {
        let text = upload_text(dom, *input)?;
        if !contains_any(&text, &RESUME_KEYWORDS) || contains_any(&text, &COVER_LETTER_MARKERS) {
            continue;
        }
        let accept = dom.attr(*input, "accept").unwrap_or_default();
        if accepts(&accept, &file.mime_type, &file.name) {
            targets.push(*input);
        } else {
            debug!("Resume input rejects {} ({})", file.mime_type, accept);
        }
    }

    if let [only] = inputs.as_slice() {
        if targets.is_empty() && !contains_any(&upload_text(dom, *only)?, &COVER_LETTER_MARKERS) {
            debug!("Using the only file input as resume target");
            targets.push(*only);
        }
    }
    Ok(targets)
}

/// Attaches the stored resume to every resume upload in `scope` and returns how
/// many inputs received it. A failure on one input does not stop the others.
/// Upload buttons next to the inputs are never clicked.
pub fn autofill_resume_fields<D: Dom + ?Sized>(
    dom: &mut D,
    scope: Option<ElementId>,
    profile: &Profile,
) -> Result<usize, ResumeError> {
    let Some(file) = resume_file(profile)? else {
        return Ok(0);
    };

    let mut attached = 0;
    for input in find_resume_inputs(dom, scope, &file)? {
        if dom.has_files(input) {
            continue;
        }
        match dom.set_files(input, vec![file.clone()]) {
            Ok(()) => {
                dom.dispatch_event(input, EventKind::Change);
                attached += 1;
            }
            Err(e) => warn!("Failed to attach resume: {}", e),
        }
    }

    if attached > 0 {
        info!("Attached resume '{}' to {} input(s)", file.name, attached);
    }
    Ok(attached)
}

/// Whether `form` has a file input that looks like a resume upload.
pub fn has_resume_field<D: Dom + ?Sized>(dom: &D, form: ElementId) -> Result<bool, DomError> {
    for input in dom.query_selector_all(Some(form), FILE_INPUT_SELECTOR)? {
        let name = dom.attr(input, "name").unwrap_or_default().to_lowercase();
        let id = dom.attr(input, "id").unwrap_or_default().to_lowercase();
        let accept = dom.attr(input, "accept").unwrap_or_default().to_lowercase();
        let label = match dom.closest(input, "label")? {
            Some(label) => dom.visible_text(label).to_lowercase(),
            None => String::new(),
        };

        if contains_any(&name, &["resume", "cv"])
            || contains_any(&id, &["resume", "cv"])
            || contains_any(&accept, &["pdf", "doc"])
            || label.contains("resume")
        {
            return Ok(true);
        }
    }
    Ok(false)
}
