use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Canonical profile attributes, in schema declaration order.
///
/// The order matters: field matching walks this list front to back and stops at
/// the first attribute that matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKey {
    Name,
    Email,
    Phone,
    Address,
    City,
    State,
    ZipCode,
    Linkedin,
    Github,
    Portfolio,
    YearsOfExperience,
    Degree,
    Discipline,
    School,
    EducationStartMonth,
    EducationStartYear,
    EducationEndMonth,
    EducationEndYear,
    Education,
    Skills,
    Gender,
    HispanicLatino,
    VeteranStatus,
    DisabilityStatus,
}

impl AttributeKey {
    pub const ALL: [AttributeKey; 24] = [
        AttributeKey::Name,
        AttributeKey::Email,
        AttributeKey::Phone,
        AttributeKey::Address,
        AttributeKey::City,
        AttributeKey::State,
        AttributeKey::ZipCode,
        AttributeKey::Linkedin,
        AttributeKey::Github,
        AttributeKey::Portfolio,
        AttributeKey::YearsOfExperience,
        AttributeKey::Degree,
        AttributeKey::Discipline,
        AttributeKey::School,
        AttributeKey::EducationStartMonth,
        AttributeKey::EducationStartYear,
        AttributeKey::EducationEndMonth,
        AttributeKey::EducationEndYear,
        AttributeKey::Education,
        AttributeKey::Skills,
        AttributeKey::Gender,
        AttributeKey::HispanicLatino,
        AttributeKey::VeteranStatus,
        AttributeKey::DisabilityStatus,
    ];

    /// Key as stored in the profile JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeKey::Name => "name",
            AttributeKey::Email => "email",
            AttributeKey::Phone => "phone",
            AttributeKey::Address => "address",
            AttributeKey::City => "city",
            AttributeKey::State => "state",
            AttributeKey::ZipCode => "zipCode",
            AttributeKey::Linkedin => "linkedin",
            AttributeKey::Github => "github",
            AttributeKey::Portfolio => "portfolio",
            AttributeKey::YearsOfExperience => "yearsOfExperience",
            AttributeKey::Degree => "degree",
            AttributeKey::Discipline => "discipline",
            AttributeKey::School => "school",
            AttributeKey::EducationStartMonth => "educationStartMonth",
            AttributeKey::EducationStartYear => "educationStartYear",
            AttributeKey::EducationEndMonth => "educationEndMonth",
            AttributeKey::EducationEndYear => "educationEndYear",
            AttributeKey::Education => "education",
            AttributeKey::Skills => "skills",
            AttributeKey::Gender => "gender",
            AttributeKey::HispanicLatino => "hispanicLatino",
            AttributeKey::VeteranStatus => "veteranStatus",
            AttributeKey::DisabilityStatus => "disabilityStatus",
        }
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The applicant's stored data. Text attributes default to the empty string,
/// which means "no value"; resume fields are absent until a file is uploaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub linkedin: String,
    pub github: String,
    pub portfolio: String,
    pub years_of_experience: String,
    pub education: String,
    pub skills: String,
    pub degree: String,
    pub discipline: String,
    pub school: String,
    pub education_start_year: String,
    pub education_start_month: String,
    pub education_end_year: String,
    pub education_end_month: String,
    pub gender: String,
    pub hispanic_latino: String,
    pub veteran_status: String,
    pub disability_status: String,
    /// Data URL (`data:<mime>;base64,<payload>`) of the uploaded resume.
    pub resume_data: Option<String>,
    pub resume_file_name: Option<String>,
    pub resume_file_type: Option<String>,
}

impl Profile {
    /// Raw stored text for `key`, possibly empty.
    pub fn get(&self, key: AttributeKey) -> &str {
        match key {
            AttributeKey::Name => &self.name,
            AttributeKey::Email => &self.email,
            AttributeKey::Phone => &self.phone,
            AttributeKey::Address => &self.address,
            AttributeKey::City => &self.city,
            AttributeKey::State => &self.state,
            AttributeKey::ZipCode => &self.zip_code,
            AttributeKey::Linkedin => &self.linkedin,
            AttributeKey::Github => &self.github,
            AttributeKey::Portfolio => &self.portfolio,
            AttributeKey::YearsOfExperience => &self.years_of_experience,
            AttributeKey::Degree => &self.degree,
            AttributeKey::Discipline => &self.discipline,
            AttributeKey::School => &self.school,
            AttributeKey::EducationStartMonth => &self.education_start_month,
            AttributeKey::EducationStartYear => &self.education_start_year,
            AttributeKey::EducationEndMonth => &self.education_end_month,
            AttributeKey::EducationEndYear => &self.education_end_year,
            AttributeKey::Education => &self.education,
            AttributeKey::Skills => &self.skills,
            AttributeKey::Gender => &self.gender,
            AttributeKey::HispanicLatino => &self.hispanic_latino,
            AttributeKey::VeteranStatus => &self.veteran_status,
            AttributeKey::DisabilityStatus => &self.disability_status,
        }
    }

    /// Stored value for `key`, or `None` when the attribute is unset.
    pub fn value(&self, key: AttributeKey) -> Option<&str> {
        let value = self.get(key).trim();
        (!value.is_empty()).then_some(value)
    }

    pub fn first_name(&self) -> Option<&str> {
        self.value(AttributeKey::Name)?.split_whitespace().next()
    }

    /// Everything after the first word of the name.
    pub fn last_name(&self) -> Option<&str> {
        let name = self.value(AttributeKey::Name)?;
        let first = name.split_whitespace().next()?;
        let rest = name[name.find(first)? + first.len()..].trim();
        (!rest.is_empty()).then_some(rest)
    }

    pub fn has_resume(&self) -> bool {
        self.resume_data
            .as_deref()
            .is_some_and(|data| !data.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum AiService {
    #[default]
    OpenAi,
    DeepSeek,
}

impl fmt::Display for AiService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiService::OpenAi => f.write_str("openai"),
            AiService::DeepSeek => f.write_str("deepseek"),
        }
    }
}

/// User-facing extension options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct Options {
    pub enabled: bool,
    pub theme: String,
    pub api_key: Option<String>,
    pub service: Option<AiService>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            enabled: true,
            theme: "light".to_string(),
            api_key: None,
            service: None,
        }
    }
}
