//! Document engine store
//!
//! Keeps the schemas that describe each document kind and the generation
//! jobs requested against them.

use serde::{Deserialize, Serialize};

use super::DocumentKind;
use crate::core::{
    codec, Collection, Holds, Patch, PersistentStore, Record, StoreError, StoreState,
};

/// A section of a document schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSection {
    pub name: String,
    #[serde(default)]
    pub required: bool,
}

impl SchemaSection {
    fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: true,
        }
    }

    fn optional(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: false,
        }
    }
}

/// Describes the sections a document of some kind is made of
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSchema {
    pub id: String,
    pub kind: DocumentKind,
    pub title: String,
    #[serde(default)]
    pub sections: Vec<SchemaSection>,
    /// Registered by [`builtin_schemas`] rather than by a user
    #[serde(default)]
    pub builtin: bool,
}

impl DocumentSchema {
    /// Names of the sections a document must provide
    pub fn required_sections(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .filter(|section| section.required)
            .map(|section| section.name.as_str())
    }
}

impl Record for DocumentSchema {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Partial update for a [`DocumentSchema`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaPatch {
    pub title: Option<String>,
    pub sections: Option<Vec<SchemaSection>>,
}

impl Patch<DocumentSchema> for SchemaPatch {
    fn apply(self, record: &mut DocumentSchema) -> Result<(), StoreError> {
        if let Some(title) = self.title {
            record.title = title;
        }
        if let Some(sections) = self.sections {
            record.sections = sections;
        }
        Ok(())
    }
}

/// The schemas every workspace starts with, one per document kind
pub fn builtin_schemas() -> Vec<DocumentSchema> {
    DocumentKind::ALL
        .into_iter()
        .map(|kind| {
            let (title, sections) = match kind {
                DocumentKind::UseCase => (
                    "Use-case specification",
                    vec![
                        SchemaSection::required("actors"),
                        SchemaSection::required("use_cases"),
                        SchemaSection::optional("preconditions"),
                    ],
                ),
                DocumentKind::DomainModel => (
                    "Domain model",
                    vec![
                        SchemaSection::required("entities"),
                        SchemaSection::optional("relations"),
                    ],
                ),
                DocumentKind::ApiSpec => (
                    "API specification",
                    vec![
                        SchemaSection::required("base_path"),
                        SchemaSection::required("endpoints"),
                        SchemaSection::optional("authentication"),
                    ],
                ),
                DocumentKind::Deployment => (
                    "Deployment configuration",
                    vec![
                        SchemaSection::required("environment"),
                        SchemaSection::required("services"),
                    ],
                ),
                DocumentKind::TestPlatform => (
                    "Test platform configuration",
                    vec![
                        SchemaSection::required("framework"),
                        SchemaSection::optional("suites"),
                        SchemaSection::optional("coverage_target"),
                    ],
                ),
            };
            DocumentSchema {
                id: kind.as_str().to_string(),
                kind,
                title: title.to_string(),
                sections,
                builtin: true,
            }
        })
        .collect()
}

/// Lifecycle of a generation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Running => "running",
            GenerationStatus::Completed => "completed",
            GenerationStatus::Failed => "failed",
        }
    }

    /// Whether the job has stopped, successfully or not
    pub fn is_finished(&self) -> bool {
        matches!(self, GenerationStatus::Completed | GenerationStatus::Failed)
    }
}

/// A request to generate a document of some kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub id: String,
    pub document_kind: DocumentKind,
    pub prompt: String,
    #[serde(default)]
    pub status: GenerationStatus,
    /// Document produced by a completed job
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Generation {
    /// A new job waiting to run
    pub fn pending(
        id: impl Into<String>,
        document_kind: DocumentKind,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            document_kind,
            prompt: prompt.into(),
            status: GenerationStatus::Pending,
            document_id: None,
            error: None,
        }
    }
}

impl Record for Generation {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Partial update for a [`Generation`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationPatch {
    pub status: Option<GenerationStatus>,
    pub document_id: Option<Option<String>>,
    pub error: Option<Option<String>>,
}

impl GenerationPatch {
    /// Mark a job completed with the document it produced
    pub fn completed(document_id: impl Into<String>) -> Self {
        Self {
            status: Some(GenerationStatus::Completed),
            document_id: Some(Some(document_id.into())),
            error: Some(None),
        }
    }

    /// Mark a job failed
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(GenerationStatus::Failed),
            document_id: None,
            error: Some(Some(error.into())),
        }
    }
}

impl Patch<Generation> for GenerationPatch {
    fn apply(self, record: &mut Generation) -> Result<(), StoreError> {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(document_id) = self.document_id {
            record.document_id = document_id;
        }
        if let Some(error) = self.error {
            record.error = error;
        }
        Ok(())
    }
}

/// State of the document engine store
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentEngineState {
    #[serde(with = "codec::pairs")]
    pub schemas: Collection<DocumentSchema>,
    #[serde(with = "codec::pairs")]
    pub generations: Collection<Generation>,
    pub current_schema: Option<String>,
}

impl StoreState for DocumentEngineState {}

impl Holds<DocumentSchema> for DocumentEngineState {
    fn collection(&self) -> &Collection<DocumentSchema> {
        &self.schemas
    }

    fn collection_mut(&mut self) -> &mut Collection<DocumentSchema> {
        &mut self.schemas
    }

    fn selected(&self) -> Option<&str> {
        self.current_schema.as_deref()
    }

    fn select(&mut self, key: Option<String>) -> bool {
        self.current_schema = key;
        true
    }
}

impl Holds<Generation> for DocumentEngineState {
    fn collection(&self) -> &Collection<Generation> {
        &self.generations
    }

    fn collection_mut(&mut self) -> &mut Collection<Generation> {
        &mut self.generations
    }
}

/// Store of document schemas and generation jobs
pub type DocumentEngineStore = PersistentStore<DocumentEngineState>;

impl PersistentStore<DocumentEngineState> {
    /// Register (or re-register) a document schema
    pub fn register_schema(&mut self, schema: DocumentSchema) {
        self.add(schema);
    }

    /// The schema registered for a document kind
    pub fn schema_for(&self, kind: DocumentKind) -> Option<&DocumentSchema> {
        self.collection::<DocumentSchema>()
            .values()
            .find(|schema| schema.kind == kind)
    }

    /// Generation jobs that have not finished yet
    pub fn unfinished_generations(&self) -> Vec<&Generation> {
        self.collection::<Generation>()
            .values()
            .filter(|generation| !generation.status.is_finished())
            .collect()
    }
}
