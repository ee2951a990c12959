use crate::dom::{option_value, Dom, DomError, ElementId, EventKind};
use crate::profile::{AttributeKey, Profile};
use crate::utils::contains_any;
use tracing::debug;

/// Ties one profile attribute to the field texts that indicate it.
///
/// A field matches when any synonym occurs inside any of its text sources.
/// `words` only match as whole words of a source ("name" in "contact_name",
/// never in "username") and are weaker than every synonym of every rule.
#[derive(Debug, Clone, Copy)]
pub struct FieldMatchRule {
    pub key: AttributeKey,
    pub synonyms: &'static [&'static str],
    pub words: &'static [&'static str],
}

impl FieldMatchRule {
    pub fn matches_synonym(&self, text: &FieldText) -> bool {
        text.sources()
            .iter()
            .any(|source| contains_any(source, self.synonyms))
    }

    pub fn matches_word(&self, text: &FieldText) -> bool {
        text.sources()
            .iter()
            .any(|source| words(source).any(|word| self.words.contains(&word)))
    }
}

fn words(source: &str) -> impl Iterator<Item = &str> {
    source
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
}

/// Lowercases an attribute value, splitting camelCase humps into words first.
fn attribute_text(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len() + 4);
    let mut previous: Option<char> = None;
    for c in raw.chars() {
        if c.is_uppercase() && previous.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
            text.push(' ');
        }
        text.extend(c.to_lowercase());
        previous = Some(c);
    }
    text
}

/// Evaluated in order; the first matching rule decides the attribute.
pub static FIELD_MATCH_RULES: &[FieldMatchRule] = &[
    FieldMatchRule {
        key: AttributeKey::Name,
        synonyms: &[
            "full name", "full_name", "fullname", "first name", "first_name", "firstname",
            "last name", "last_name", "lastname", "your name", "legal name", "candidate name",
            "applicant name", "given name", "family name", "surname",
        ],
        words: &["name"],
    },
    FieldMatchRule {
        key: AttributeKey::Email,
        synonyms: &["email", "e-mail"],
        words: &[],
    },
    FieldMatchRule {
        key: AttributeKey::Phone,
        synonyms: &["phone", "mobile", "telephone", "cell number"],
        words: &["tel", "cell"],
    },
    FieldMatchRule {
        key: AttributeKey::Address,
        synonyms: &["address", "street"],
        words: &[],
    },
    FieldMatchRule {
        key: AttributeKey::City,
        synonyms: &["city", "town"],
        words: &[],
    },
    FieldMatchRule {
        key: AttributeKey::State,
        synonyms: &["province", "state/", "state_code", "statecode"],
        words: &["state", "region"],
    },
    FieldMatchRule {
        key: AttributeKey::ZipCode,
        synonyms: &["zip", "postal", "postcode"],
        words: &[],
    },
    FieldMatchRule {
        key: AttributeKey::Linkedin,
        synonyms: &["linkedin"],
        words: &[],
    },
    FieldMatchRule {
        key: AttributeKey::Github,
        synonyms: &["github"],
        words: &[],
    },
    FieldMatchRule {
        key: AttributeKey::Portfolio,
        synonyms: &["portfolio", "website", "personal site", "personal url", "homepage"],
        words: &[],
    },
    FieldMatchRule {
        key: AttributeKey::YearsOfExperience,
        synonyms: &[
            "years of experience", "years_of_experience", "yearsofexperience",
            "experience years", "years experience", "total experience",
        ],
        words: &[],
    },
    FieldMatchRule {
        key: AttributeKey::Degree,
        synonyms: &["degree", "qualification"],
        words: &[],
    },
    FieldMatchRule {
        key: AttributeKey::Discipline,
        synonyms: &["discipline", "major", "field of study", "field_of_study", "area of study"],
        words: &[],
    },
    FieldMatchRule {
        key: AttributeKey::School,
        synonyms: &["school", "university", "college", "institution"],
        words: &[],
    },
    FieldMatchRule {
        key: AttributeKey::EducationStartMonth,
        synonyms: &["start month", "start_month", "startmonth"],
        words: &[],
    },
    FieldMatchRule {
        key: AttributeKey::EducationStartYear,
        synonyms: &["start year", "start_year", "startyear"],
        words: &[],
    },
    FieldMatchRule {
        key: AttributeKey::EducationEndMonth,
        synonyms: &["end month", "end_month", "endmonth", "graduation month"],
        words: &[],
    },
    FieldMatchRule {
        key: AttributeKey::EducationEndYear,
        synonyms: &["end year", "end_year", "endyear", "graduation year", "grad year"],
        words: &[],
    },
    FieldMatchRule {
        key: AttributeKey::Education,
        synonyms: &["education", "highest level"],
        words: &[],
    },
    FieldMatchRule {
        key: AttributeKey::Skills,
        synonyms: &["skills", "skill set", "skillset"],
        words: &[],
    },
    FieldMatchRule {
        key: AttributeKey::Gender,
        synonyms: &["gender"],
        words: &["sex"],
    },
    FieldMatchRule {
        key: AttributeKey::HispanicLatino,
        synonyms: &["hispanic", "latino", "latinx"],
        words: &[],
    },
    FieldMatchRule {
        key: AttributeKey::VeteranStatus,
        synonyms: &["veteran"],
        words: &[],
    },
    FieldMatchRule {
        key: AttributeKey::DisabilityStatus,
        synonyms: &["disability", "disabled"],
        words: &[],
    },
];

/// The five lowercased texts a field is matched on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldText {
    pub name: String,
    pub id: String,
    pub placeholder: String,
    pub label: String,
    pub aria_label: String,
}

impl FieldText {
    pub fn resolve<D: Dom + ?Sized>(dom: &D, field: ElementId) -> Result<Self, DomError> {
        let attr = |name: &str| dom.attr(field, name).unwrap_or_default().to_lowercase();
        let identifier = |name: &str| attribute_text(&dom.attr(field, name).unwrap_or_default());
        Ok(FieldText {
            name: identifier("name"),
            id: identifier("id"),
            placeholder: attr("placeholder"),
            label: resolve_label(dom, field)?.to_lowercase(),
            aria_label: attr("aria-label"),
        })
    }

    pub fn sources(&self) -> [&str; 5] {
        [
            self.name.as_str(),
            self.id.as_str(),
            self.placeholder.as_str(),
            self.label.as_str(),
            self.aria_label.as_str(),
        ]
    }

    fn mentions(&self, needles: &[&str]) -> bool {
        self.sources()
            .iter()
            .any(|source| contains_any(source, needles))
    }
}

/// Text of the label describing `field`: an explicit `label[for]`, else an
/// enclosing label, else the only free label inside the nearest ancestor that
/// has any, the form element included. A free label has no `for` target and
/// wraps no control. Empty when none applies.
pub fn resolve_label<D: Dom + ?Sized>(dom: &D, field: ElementId) -> Result<String, DomError> {
    if let Some(id) = dom.attr(field, "id").filter(|id| !id.is_empty()) {
        for label in dom.query_selector_all(None, "label")? {
            if dom.attr(label, "for").as_deref() == Some(id.as_str()) {
                return Ok(dom.visible_text(label));
            }
        }
    }

    if let Some(label) = dom.closest(field, "label")? {
        return Ok(dom.visible_text(label));
    }

    let mut current = dom.parent(field);
    while let Some(container) = current {
        if matches!(dom.tag_name(container).as_str(), "body" | "html") {
            break;
        }
        let mut labels = Vec::new();
        for label in dom.query_selector_all(Some(container), "label")? {
            if is_free_label(dom, label)? {
                labels.push(label);
            }
        }
        match labels.as_slice() {
            [] => current = dom.parent(container),
            [only] => return Ok(dom.visible_text(*only)),
            _ => break,
        }
    }

    Ok(String::new())
}

fn is_free_label<D: Dom + ?Sized>(dom: &D, label: ElementId) -> Result<bool, DomError> {
    if dom.attr(label, "for").is_some_and(|target| !target.is_empty()) {
        return Ok(false);
    }
    Ok(dom
        .query_selector_all(Some(label), "input, select, textarea")?
        .is_empty())
}

/// Synonym matches are tried over the whole table before any whole-word match.
pub fn classify_text(text: &FieldText) -> Option<AttributeKey> {
    FIELD_MATCH_RULES
        .iter()
        .find(|rule| rule.matches_synonym(text))
        .or_else(|| FIELD_MATCH_RULES.iter().find(|rule| rule.matches_word(text)))
        .map(|rule| rule.key)
}

/// Profile attribute `field` asks for, if any.
pub fn classify<D: Dom + ?Sized>(dom: &D, field: ElementId) -> Result<Option<AttributeKey>, DomError> {
    Ok(classify_text(&FieldText::resolve(dom, field)?))
}

/// Value to write for `key`. Name fields that ask only for a first or a last
/// name receive that part.
pub fn value_for<'p>(key: AttributeKey, text: &FieldText, profile: &'p Profile) -> Option<&'p str> {
    if key != AttributeKey::Name {
        return profile.value(key);
    }
    let wants_first = text.mentions(&["first", "given"]);
    let wants_last = text.mentions(&["last", "surname", "family"]);
    match (wants_first, wants_last) {
        (true, false) => profile.first_name(),
        (false, true) => profile.last_name(),
        _ => profile.value(key),
    }
}

/// Writes `value` and fires the notifications page scripts listen for.
pub fn write_value<D: Dom + ?Sized>(dom: &mut D, field: ElementId, value: &str) {
    dom.set_value(field, value);
    dom.dispatch_event(field, EventKind::Input);
    dom.dispatch_event(field, EventKind::Change);
}

/// Picks the first option whose text or value contains `value`, ignoring
/// placeholder options without a value.
pub fn select_option<D: Dom + ?Sized>(
    dom: &mut D,
    select: ElementId,
    value: &str,
) -> Result<bool, DomError> {
    let needle = value.to_lowercase();
    for option in dom.query_selector_all(Some(select), "option")? {
        let submitted = option_value(dom, option);
        if submitted.is_empty() {
            continue;
        }
        let label = dom.text_content(option).to_lowercase();
        if label.contains(&needle) || submitted.to_lowercase().contains(&needle) {
            write_value(dom, select, &submitted);
            return Ok(true);
        }
    }
    debug!("No option of select matches '{}'", value);
    Ok(false)
}

/// Fills `field` from the profile. Returns whether anything was written; a
/// field with no matching attribute, no stored value or existing content is
/// left untouched.
pub fn match_and_fill<D: Dom + ?Sized>(
    dom: &mut D,
    field: ElementId,
    profile: &Profile,
) -> Result<bool, DomError> {
    let text = FieldText::resolve(dom, field)?;
    let Some(key) = classify_text(&text) else {
        return Ok(false);
    };
    let Some(value) = value_for(key, &text, profile) else {
        debug!("Field matched '{}' but the profile has no value", key);
        return Ok(false);
    };
    if !dom.value(field).trim().is_empty() {
        debug!("Field matched '{}' but already has content", key);
        return Ok(false);
    }

    if dom.tag_name(field) == "select" {
        return select_option(dom, field, value);
    }

    write_value(dom, field, value);
    debug!("Filled '{}' field", key);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::HtmlDocument;
    use url::Url;

    fn document(body: &str) -> HtmlDocument {
        HtmlDocument::parse(
            &format!("<html><body>{body}</body></html>"),
            Url::parse("https://example.com/apply").unwrap(),
        )
    }

    fn field(doc: &HtmlDocument, css: &str) -> ElementId {
        doc.query_selector(None, css).unwrap().unwrap()
    }

    fn profile() -> Profile {
        Profile {
            name: "Jane Doe".to_string(),
            email: "jane@x.com".to_string(),
            state: "California".to_string(),
            ..Profile::default()
        }
    }

    #[test]
    fn test_rules_follow_schema_order() {
        let keys: Vec<AttributeKey> = FIELD_MATCH_RULES.iter().map(|rule| rule.key).collect();
        assert_eq!(keys, AttributeKey::ALL.to_vec());
    }

    #[test]
    fn test_first_match_wins() {
        let doc = document(r#"<input name="first_name" placeholder="As on your university diploma">"#);
        let input = field(&doc, "input");
        assert_eq!(classify(&doc, input).unwrap(), Some(AttributeKey::Name));
    }

    #[test]
    fn test_name_word_does_not_swallow_school_name() {
        let doc = document(
            r#"<input id="n" name="name"><input id="s" name="school_name"><input id="e" aria-label="Email address">"#,
        );
        assert_eq!(classify(&doc, field(&doc, "#n")).unwrap(), Some(AttributeKey::Name));
        assert_eq!(classify(&doc, field(&doc, "#s")).unwrap(), Some(AttributeKey::School));
        assert_eq!(classify(&doc, field(&doc, "#e")).unwrap(), Some(AttributeKey::Email));
    }

    #[test]
    fn test_name_as_a_word_of_the_field_name() {
        let doc = document(
            r#"<input id="c" name="contact_name">
               <input id="a" name="applicantName">
               <input id="k" name="candidate-name">
               <input id="y" placeholder="Your full legal name please">
               <input id="u" name="username">
               <input id="n" name="nickname">"#,
        );
        for id in ["#c", "#a", "#k", "#y"] {
            assert_eq!(classify(&doc, field(&doc, id)).unwrap(), Some(AttributeKey::Name), "{id}");
        }
        assert_eq!(classify(&doc, field(&doc, "#u")).unwrap(), None);
        assert_eq!(classify(&doc, field(&doc, "#n")).unwrap(), None);
    }

    #[test]
    fn test_word_matches_yield_to_later_synonyms() {
        let doc = document(r#"<input id="s" name="schoolName"><input id="t" name="home_tel">"#);
        assert_eq!(classify(&doc, field(&doc, "#s")).unwrap(), Some(AttributeKey::School));
        assert_eq!(classify(&doc, field(&doc, "#t")).unwrap(), Some(AttributeKey::Phone));
    }

    #[test]
    fn test_single_free_label_in_form() {
        let doc = document(
            r#"<form><label>Email</label><input id="x"></form>
               <form><label for="other">Phone</label><label>City <input id="w"></label><input id="z"></form>"#,
        );
        assert_eq!(resolve_label(&doc, field(&doc, "#x")).unwrap(), "Email");
        assert_eq!(classify(&doc, field(&doc, "#x")).unwrap(), Some(AttributeKey::Email));
        assert_eq!(resolve_label(&doc, field(&doc, "#z")).unwrap(), "");
    }

    #[test]
    fn test_label_resolution_order() {
        let doc = document(
            r#"<label for="a">Phone number</label><input id="a">
               <label>City <input id="b"></label>
               <div class="row"><div><label>Postal code</label></div><div><input id="c"></div></div>
               <div class="row"><label>One</label><label>Two</label><div><input id="d"></div></div>"#,
        );
        assert_eq!(resolve_label(&doc, field(&doc, "#a")).unwrap(), "Phone number");
        assert_eq!(resolve_label(&doc, field(&doc, "#b")).unwrap(), "City");
        assert_eq!(resolve_label(&doc, field(&doc, "#c")).unwrap(), "Postal code");
        assert_eq!(resolve_label(&doc, field(&doc, "#d")).unwrap(), "");
        assert_eq!(classify(&doc, field(&doc, "#c")).unwrap(), Some(AttributeKey::ZipCode));
    }

    #[test]
    fn test_unmatched_field() {
        let doc = document(r#"<input name="referral_code">"#);
        assert_eq!(classify(&doc, field(&doc, "input")).unwrap(), None);
    }

    #[test]
    fn test_fill_fires_input_and_change() {
        let mut doc = document(r#"<input name="email">"#);
        let input = field(&doc, "input");
        assert!(match_and_fill(&mut doc, input, &profile()).unwrap());
        assert_eq!(doc.value(input), "jane@x.com");
        assert_eq!(doc.events_for(input), vec![EventKind::Input, EventKind::Change]);
    }

    #[test]
    fn test_fill_is_idempotent() {
        let mut doc = document(r#"<input name="email">"#);
        let input = field(&doc, "input");
        assert!(match_and_fill(&mut doc, input, &profile()).unwrap());
        assert!(!match_and_fill(&mut doc, input, &profile()).unwrap());
        assert_eq!(doc.events_for(input).len(), 2);
    }

    #[test]
    fn test_never_overwrites_or_writes_empty() {
        let mut doc = document(r#"<input id="e" name="email" value="old@x.com"><input id="p" name="phone">"#);
        let email = field(&doc, "#e");
        let phone = field(&doc, "#p");
        assert!(!match_and_fill(&mut doc, email, &profile()).unwrap());
        assert!(!match_and_fill(&mut doc, phone, &profile()).unwrap());
        assert_eq!(doc.value(email), "old@x.com");
        assert_eq!(doc.value(phone), "");
        assert!(doc.events().is_empty());
    }

    #[test]
    fn test_split_name_fields() {
        let mut doc = document(
            r#"<input id="f" name="firstName"><input id="l" placeholder="Last name"><input id="full" aria-label="Full name">"#,
        );
        let (first, last, full) = (field(&doc, "#f"), field(&doc, "#l"), field(&doc, "#full"));
        for input in [first, last, full] {
            assert!(match_and_fill(&mut doc, input, &profile()).unwrap());
        }
        assert_eq!(doc.value(first), "Jane");
        assert_eq!(doc.value(last), "Doe");
        assert_eq!(doc.value(full), "Jane Doe");
    }

    #[test]
    fn test_select_picks_first_containing_option() {
        let mut doc = document(
            r#"<label for="st">State</label>
               <select id="st">
                 <option value="">Choose a location</option>
                 <option value="AZ">Arizona</option>
                 <option value="CA">California</option>
                 <option value="CA-N">Northern California</option>
               </select>"#,
        );
        let select = field(&doc, "#st");
        assert!(match_and_fill(&mut doc, select, &profile()).unwrap());
        assert_eq!(doc.value(select), "CA");
        assert_eq!(doc.events_for(select), vec![EventKind::Input, EventKind::Change]);
    }

    #[test]
    fn test_select_without_matching_option_is_left_unset() {
        let mut doc = document(
            r#"<select name="state"><option value="">Select</option><option value="TX">Texas</option></select>"#,
        );
        let select = field(&doc, "select");
        assert!(!match_and_fill(&mut doc, select, &profile()).unwrap());
        assert_eq!(doc.value(select), "");
        assert!(doc.events().is_empty());
    }
}
