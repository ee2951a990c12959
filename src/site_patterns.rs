/// Hand-verified selectors for one job board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SitePattern {
    /// Host fragment the pattern applies to, e.g. `indeed.com`.
    pub host: &'static str,
    pub form_selector: &'static str,
    pub name_fields: &'static [&'static str],
    pub email_fields: &'static [&'static str],
}

/// Known job boards. Lookup returns the first entry whose host occurs in the
/// page hostname, so table order is the tie-break.
pub static SITE_PATTERNS: &[SitePattern] = &[
    SitePattern {
        host: "linkedin.com",
        form_selector: ".jobs-easy-apply-content",
        name_fields: &[r#"input[name*="firstName"]"#, r#"input[name*="lastName"]"#],
        email_fields: &[r#"input[name*="email"]"#],
    },
    SitePattern {
        host: "indeed.com",
        form_selector: "#ia-container form, .ia-JobApplication",
        name_fields: &[r#"input[name*="name"]"#, r#"input[id*="name"]"#],
        email_fields: &[r#"input[name*="email"]"#, r#"input[type="email"]"#],
    },
    SitePattern {
        host: "glassdoor.com",
        form_selector: ".application-form",
        name_fields: &[r#"input[name*="first"]"#, r#"input[name*="last"]"#],
        email_fields: &[r#"input[name*="email"]"#],
    },
    SitePattern {
        host: "monster.com",
        form_selector: ".job-apply-form",
        name_fields: &[r#"input[name*="name"]"#],
        email_fields: &[r#"input[name*="email"]"#],
    },
    SitePattern {
        host: "ziprecruiter.com",
        form_selector: "#job_application_form",
        name_fields: &[r#"input[name*="name"]"#],
        email_fields: &[r#"input[name*="email"]"#],
    },
];

pub fn lookup(hostname: &str) -> Option<&'static SitePattern> {
    let hostname = hostname.to_ascii_lowercase();
    SITE_PATTERNS
        .iter()
        .find(|pattern| hostname.contains(pattern.host))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    #[test]
    fn test_lookup_known_hosts() {
        for pattern in SITE_PATTERNS {
            let found = lookup(&format!("www.{}", pattern.host)).unwrap();
            assert_eq!(found, pattern);
        }
        assert_eq!(lookup("uk.indeed.com").unwrap().host, "indeed.com");
        assert_eq!(lookup("WWW.LinkedIn.com").unwrap().host, "linkedin.com");
    }

    #[test]
    fn test_lookup_unknown_host() {
        assert!(lookup("example.com").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn test_all_selectors_parse() {
        for pattern in SITE_PATTERNS {
            assert!(Selector::parse(pattern.form_selector).is_ok(), "{}", pattern.host);
            for selector in pattern.name_fields.iter().chain(pattern.email_fields) {
                assert!(Selector::parse(selector).is_ok(), "{selector}");
            }
        }
    }
}
