use async_trait::async_trait;
use job_autofill::dom::EventKind;
use job_autofill::llm::canned_response;
use job_autofill::{
    AutofillConfig, Autofiller, ContentAgent, Dom, GenerationError, HtmlDocument, JsonFileStore,
    MemoryStore, Message, Profile, ProfileStore, Provenance, TextGenerator,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

const APPLICATION_PAGE: &str = r#"<html>
<head><title>Backend Engineer - Example Corp</title></head>
<body>
  <h1>Backend Engineer</h1>
  <div class="company-name">Example Corp</div>
  <div class="job-description">Work on payment services in Rust.</div>
  <form id="application">
    <label for="name">Name</label><input type="text" id="name" name="name">
    <label for="email">Email</label><input type="email" id="email" name="email">
    <label for="essay">Why do you want to work here?</label>
    <textarea id="essay" name="essay" rows="5"></textarea>
    <button type="submit">Submit</button>
  </form>
</body>
</html>"#;

/// Returns a fixed answer and remembers what it was asked.
struct StubGenerator {
    answer: &'static str,
    questions: Mutex<Vec<String>>,
}

impl StubGenerator {
    fn new(answer: &'static str) -> Self {
        Self {
            answer,
            questions: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn complete(&self, _system_prompt: &str, question: &str) -> Result<String, GenerationError> {
        self.questions.lock().unwrap().push(question.to_string());
        Ok(self.answer.to_string())
    }
}

/// Never answers within any reasonable timeout.
struct SlowGenerator;

#[async_trait]
impl TextGenerator for SlowGenerator {
    async fn complete(&self, _system_prompt: &str, _question: &str) -> Result<String, GenerationError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok("Too late.".to_string())
    }
}

fn page(url: &str, html: &str) -> HtmlDocument {
    HtmlDocument::parse(html, Url::parse(url).unwrap())
}

fn jane() -> Profile {
    Profile {
        name: "Jane Doe".to_string(),
        email: "jane@x.com".to_string(),
        ..Profile::default()
    }
}

fn value_of(doc: &HtmlDocument, css: &str) -> String {
    doc.value(doc.query_selector(None, css).unwrap().unwrap())
}

#[tokio::test]
async fn test_fills_profile_fields_and_essay() {
    let mut doc = page("https://careers.example.com/apply", APPLICATION_PAGE);
    let generator = Arc::new(StubGenerator::new("Stub answer."));
    let autofiller = Autofiller::new(generator.clone(), AutofillConfig::default());

    let outcome = autofiller.autofill_page(&mut doc, &jane()).await.unwrap();

    assert_eq!(outcome.result.fields_filled, 2);
    assert_eq!(outcome.result.essays_filled, 1);
    assert_eq!(value_of(&doc, "#name"), "Jane Doe");
    assert_eq!(value_of(&doc, "#email"), "jane@x.com");
    assert_eq!(value_of(&doc, "#essay"), "Stub answer.");
    assert_eq!(
        *generator.questions.lock().unwrap(),
        vec!["Why do you want to work here?".to_string()]
    );

    let email = doc.query_selector(None, "#email").unwrap().unwrap();
    assert_eq!(doc.events_for(email), vec![EventKind::Input, EventKind::Change]);

    let answer = &outcome.answers[0];
    assert!(!answer.fallback);
    assert_eq!(answer.question_id, "q_why_do_you_want_to_work_here");
    assert!(answer.context.contains("Job title: Backend Engineer"));
    assert!(answer.context.contains("Company: Example Corp"));
}

#[tokio::test(start_paused = true)]
async fn test_generation_timeout_uses_fallback() {
    let mut doc = page("https://careers.example.com/apply", APPLICATION_PAGE);
    let autofiller = Autofiller::new(
        Arc::new(SlowGenerator),
        AutofillConfig {
            generation_timeout: Duration::from_secs(10),
        },
    );

    let started = tokio::time::Instant::now();
    let outcome = autofiller.autofill_page(&mut doc, &jane()).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outcome.result.essays_filled, 1);
    assert_eq!(
        value_of(&doc, "#essay"),
        canned_response("Why do you want to work here?")
    );
    assert!(outcome.answers[0].fallback);
    assert!(elapsed >= Duration::from_secs(10));
    assert!(elapsed < Duration::from_secs(60));
}

#[tokio::test]
async fn test_empty_profile_values_are_never_written() {
    let mut doc = page("https://careers.example.com/apply", APPLICATION_PAGE);
    let autofiller = Autofiller::new(Arc::new(StubGenerator::new("Stub answer.")), AutofillConfig::default());

    let outcome = autofiller.autofill_page(&mut doc, &Profile::default()).await.unwrap();

    assert_eq!(outcome.result.fields_filled, 0);
    assert_eq!(value_of(&doc, "#name"), "");
    assert_eq!(value_of(&doc, "#email"), "");
    let name = doc.query_selector(None, "#name").unwrap().unwrap();
    assert!(doc.events_for(name).is_empty());
}

#[tokio::test]
async fn test_essays_answered_in_document_order() {
    let html = r#"<html><body><form>
        <input type="file" name="resume">
        <textarea placeholder="Describe a hard bug you fixed"></textarea>
        <textarea placeholder="Short note"></textarea>
        <textarea placeholder="What are your career goals?"></textarea>
    </form></body></html>"#;
    let mut doc = page("https://example.com/jobs/3", html);
    let generator = Arc::new(StubGenerator::new("Answer."));
    let autofiller = Autofiller::new(generator.clone(), AutofillConfig::default());

    let outcome = autofiller.autofill_page(&mut doc, &jane()).await.unwrap();

    assert_eq!(outcome.result.essays_filled, 2);
    assert_eq!(
        *generator.questions.lock().unwrap(),
        vec![
            "Describe a hard bug you fixed".to_string(),
            "What are your career goals?".to_string()
        ]
    );
    assert_eq!(value_of(&doc, r#"textarea[placeholder="Short note"]"#), "");
}

#[tokio::test]
async fn test_agent_finds_and_fills_with_stored_profile() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path().join("store.json")));
    store.save_profile(&jane()).await.unwrap();

    let doc = page("https://careers.example.com/apply", APPLICATION_PAGE);
    let autofiller = Autofiller::new(Arc::new(StubGenerator::new("Stub answer.")), AutofillConfig::default());
    let mut agent = ContentAgent::new(doc, store.clone(), autofiller);

    let found = agent.handle(Message::FindJobForm).await;
    assert!(found.success);
    assert_eq!(found.form_found, Some(true));
    assert_eq!(found.has_resume_field, Some(false));
    assert_eq!(found.provenance, Some(Provenance::GenericHeuristic));
    assert!(store
        .job_form("https://careers.example.com/apply")
        .await
        .unwrap()
        .unwrap()
        .form_found);

    let filled = agent.handle(Message::AutofillWithStoredProfile).await;
    assert_eq!(
        serde_json::to_value(&filled).unwrap(),
        serde_json::json!({"success": true, "formFound": true, "fieldsFilled": 2, "essaysFilled": 1})
    );

    let saved = store.load().await.unwrap();
    assert_eq!(saved.ai_responses["q_why_do_you_want_to_work_here"].response, "Stub answer.");
}

#[tokio::test]
async fn test_agent_attaches_resume_on_known_board() {
    let html = r#"<html><body>
        <form id="job_application_form">
            <input name="full_name">
            <label>Upload your CV <input type="file" name="document" accept="application/pdf"></label>
        </form>
    </body></html>"#;
    let mut profile = jane();
    profile.resume_data = Some("data:application/pdf;base64,JVBERi0xLjQ=".to_string());
    profile.resume_file_name = Some("jane-doe.pdf".to_string());
    let store = Arc::new(MemoryStore::default());
    store.save_profile(&profile).await.unwrap();

    let doc = page("https://www.ziprecruiter.com/job/123", html);
    let autofiller = Autofiller::new(Arc::new(StubGenerator::new("unused")), AutofillConfig::default());
    let mut agent = ContentAgent::new(doc, store, autofiller);

    let found = agent.handle(Message::AnalyzeNow).await;
    assert_eq!(found.provenance, Some(Provenance::SiteSpecific));
    assert_eq!(found.has_resume_field, Some(true));

    let filled = agent.handle(Message::AutofillWithStoredProfile).await;
    assert_eq!(filled.fields_filled, Some(2));

    let doc = agent.into_dom();
    let upload = doc.query_selector(None, r#"input[type="file"]"#).unwrap().unwrap();
    assert_eq!(doc.files(upload)[0].name, "jane-doe.pdf");
    assert_eq!(doc.files(upload)[0].bytes, b"%PDF-1.4".to_vec());
    assert_eq!(value_of(&doc, r#"input[name="full_name"]"#), "Jane Doe");
}

#[tokio::test]
async fn test_agent_reports_missing_form() {
    let doc = page("https://example.com/about", "<html><body><p>About us</p></body></html>");
    let autofiller = Autofiller::new(Arc::new(StubGenerator::new("unused")), AutofillConfig::default());
    let mut agent = ContentAgent::new(doc, Arc::new(MemoryStore::default()), autofiller);

    let response = agent.handle(Message::AutofillWithStoredProfile).await;
    assert!(!response.success);
    assert_eq!(response.form_found, Some(false));
    assert_eq!(response.error.as_deref(), Some("No job application form detected"));
}
