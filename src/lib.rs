pub mod autofill;
pub mod bindings;
pub mod chat;
pub mod cli;
pub mod config;
pub mod dom;
pub mod essay;
pub mod field_classifier;
pub mod form_locator;
pub mod llm;
pub mod messaging;
pub mod profile;
pub mod resume;
pub mod site_patterns;
pub mod storage;
pub mod utils;

pub use autofill::{AutofillConfig, AutofillOutcome, Autofiller, FillResult};
pub use config::AssistantConfig;
pub use dom::{Dom, DomError, ElementId, HtmlDocument};
pub use form_locator::{detect, DetectedForm, Provenance};
pub use llm::{CannedResponder, GenerationError, TextGenerator};
pub use messaging::{ContentAgent, Message, ResponseMessage};
pub use profile::{AiService, AttributeKey, Options, Profile};
pub use storage::{JsonFileStore, MemoryStore, ProfileStore, StorageError};
