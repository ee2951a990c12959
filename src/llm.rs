use crate::profile::Profile;
use crate::utils::collapse_whitespace;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("Empty response from {0}")]
    EmptyResponse(String),
    #[error("No API key configured")]
    MissingApiKey,
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),
}

/// Drafts answers to application questions.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Sends one system prompt plus user question to the backing model.
    /// This method MUST be implemented by concrete types.
    async fn complete(&self, system_prompt: &str, question: &str) -> Result<String, GenerationError>;

    /// Answers `question` for the applicant described by `profile`, using the
    /// scraped job `context`.
    async fn generate(
        &self,
        question: &str,
        context: &str,
        profile: &Profile,
    ) -> Result<String, GenerationError> {
        let system_prompt = build_system_prompt(context, profile);
        tracing::debug!("Generating answer for question: {}", question);
        self.complete(&system_prompt, question).await
    }
}

pub fn build_system_prompt(context: &str, profile: &Profile) -> String {
    format!(
        r#"You are an assistant helping a job applicant answer application questions.
Based on the applicant's profile and the job context, generate a professional,
concise, and personalized response that highlights relevant skills and experience.
Keep responses truthful and authentic to the applicant's background.

Job context: {}

Applicant profile:
- Name: {}
- Experience: {}
- Education: {} in {} from {}
- Skills: {}"#,
        context,
        profile.name,
        profile.years_of_experience,
        profile.degree,
        profile.discipline,
        profile.school,
        profile.skills
    )
}

/// Deterministic local answer, used when no service is configured and whenever
/// the service fails or times out.
pub fn canned_response(question: &str) -> String {
    let question = question.to_lowercase();

    if question.contains("why are you a good fit") {
        return "I believe I am a strong fit for this position because my background combines relevant technical skills with practical experience in the field. My education has given me a solid foundation in the key technologies mentioned in the job description, and my previous roles have allowed me to apply these skills in real-world scenarios. I'm particularly drawn to this opportunity because it aligns with my career goals of working in a collaborative environment where I can contribute to innovative projects while continuing to grow professionally.".to_string();
    }

    if question.contains("experience") {
        return "Throughout my career, I've had the opportunity to work on a variety of projects that have strengthened my technical abilities and problem-solving skills. In my most recent role, I was responsible for developing and maintaining applications that served thousands of users daily. This experience taught me how to write efficient, scalable code and how to collaborate effectively with cross-functional teams. I've consistently received positive feedback for my ability to communicate complex technical concepts clearly and to meet deadlines even under pressure.".to_string();
    }

    "Based on my background and the requirements for this position, I believe I can make valuable contributions to your team. My combination of technical skills, education, and practical experience has prepared me well for this role. I'm excited about the opportunity to bring my expertise to your organization and to continue developing my professional capabilities in this dynamic field.".to_string()
}

/// Generator that never leaves the machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedResponder;

#[async_trait]
impl TextGenerator for CannedResponder {
    async fn complete(&self, _system_prompt: &str, question: &str) -> Result<String, GenerationError> {
        Ok(canned_response(question))
    }
}

/// Storage key for an answered question: `q_` followed by at most 30
/// characters of the simplified question.
pub fn question_id(question: &str) -> String {
    let lowered = question.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ')
        .collect();
    let joined = collapse_whitespace(stripped.trim(), "_");
    format!("q_{}", joined.chars().take(30).collect::<String>())
}
