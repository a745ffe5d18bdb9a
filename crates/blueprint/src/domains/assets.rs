//! Core assets store
//!
//! Holds the generated artifacts themselves: documents (use-case specs,
//! domain models, API specs, deployment and test-platform configuration) and
//! the diagram models derived from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{
    codec, Collection, Holds, Patch, PersistentStore, Record, StoreError, StoreState,
};

/// Kind of a generated document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    UseCase,
    DomainModel,
    ApiSpec,
    Deployment,
    TestPlatform,
}

impl DocumentKind {
    /// All document kinds, in display order
    pub const ALL: [DocumentKind; 5] = [
        DocumentKind::UseCase,
        DocumentKind::DomainModel,
        DocumentKind::ApiSpec,
        DocumentKind::Deployment,
        DocumentKind::TestPlatform,
    ];

    /// Stable identifier used in snapshots and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::UseCase => "use_case",
            DocumentKind::DomainModel => "domain_model",
            DocumentKind::ApiSpec => "api_spec",
            DocumentKind::Deployment => "deployment",
            DocumentKind::TestPlatform => "test_platform",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_lowercase().replace('-', "_");
        DocumentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("Unknown document kind: {}", s))
    }
}

/// A single use case in a use-case document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UseCase {
    pub name: String,
    pub actor: String,
    #[serde(default)]
    pub steps: Vec<String>,
}

/// An attribute of a domain entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// A domain entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// A relation between two domain entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub cardinality: String,
}

/// HTTP method of an API endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// An endpoint of an API specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub path: String,
    #[serde(default)]
    pub summary: String,
}

/// A deployable service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: String,
    pub image: String,
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    #[serde(default)]
    pub port: Option<u16>,
}

fn default_replicas() -> u32 {
    1
}

/// Typed body of a document, one variant per document kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentContent {
    UseCase {
        #[serde(default)]
        actors: Vec<String>,
        #[serde(default)]
        use_cases: Vec<UseCase>,
    },
    DomainModel {
        #[serde(default)]
        entities: Vec<Entity>,
        #[serde(default)]
        relations: Vec<Relation>,
    },
    ApiSpec {
        #[serde(default)]
        base_path: String,
        #[serde(default)]
        endpoints: Vec<Endpoint>,
    },
    Deployment {
        environment: String,
        #[serde(default)]
        services: Vec<ServiceSpec>,
    },
    TestPlatform {
        framework: String,
        #[serde(default)]
        suites: Vec<String>,
        #[serde(default)]
        coverage_target: Option<u8>,
    },
}

impl DocumentContent {
    /// The document kind this content belongs to
    pub fn kind(&self) -> DocumentKind {
        match self {
            DocumentContent::UseCase { .. } => DocumentKind::UseCase,
            DocumentContent::DomainModel { .. } => DocumentKind::DomainModel,
            DocumentContent::ApiSpec { .. } => DocumentKind::ApiSpec,
            DocumentContent::Deployment { .. } => DocumentKind::Deployment,
            DocumentContent::TestPlatform { .. } => DocumentKind::TestPlatform,
        }
    }

    /// Number of top-level items (use cases, entities, endpoints, ...)
    pub fn item_count(&self) -> usize {
        match self {
            DocumentContent::UseCase { use_cases, .. } => use_cases.len(),
            DocumentContent::DomainModel { entities, .. } => entities.len(),
            DocumentContent::ApiSpec { endpoints, .. } => endpoints.len(),
            DocumentContent::Deployment { services, .. } => services.len(),
            DocumentContent::TestPlatform { suites, .. } => suites.len(),
        }
    }
}

/// A generated artifact document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub content: DocumentContent,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Document {
    /// Create a document with no description or tags
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: DocumentContent) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            content,
            tags: Vec::new(),
        }
    }

    /// The kind of this document
    pub fn kind(&self) -> DocumentKind {
        self.content.kind()
    }
}

impl Record for Document {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Partial update for a [`Document`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<DocumentContent>,
    pub tags: Option<Vec<String>>,
}

impl Patch<Document> for DocumentPatch {
    fn apply(self, record: &mut Document) -> Result<(), StoreError> {
        if let Some(title) = self.title {
            record.title = title;
        }
        if let Some(description) = self.description {
            record.description = description;
        }
        if let Some(content) = self.content {
            record.content = content;
        }
        if let Some(tags) = self.tags {
            record.tags = tags;
        }
        Ok(())
    }
}

/// Kind of a diagram model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    UseCase,
    Domain,
    Process,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::UseCase => "use_case",
            ModelKind::Domain => "domain",
            ModelKind::Process => "process",
        }
    }
}

/// A node of a diagram model with its outgoing links
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelElement {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub links: Vec<String>,
}

/// A diagram model (use-case, domain or process model)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub name: String,
    pub kind: ModelKind,
    #[serde(default)]
    pub elements: Vec<ModelElement>,
    /// Document this model was derived from
    #[serde(default)]
    pub document_id: Option<String>,
}

impl Model {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ModelKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            elements: Vec::new(),
            document_id: None,
        }
    }
}

impl Record for Model {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Partial update for a [`Model`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelPatch {
    pub name: Option<String>,
    pub kind: Option<ModelKind>,
    pub elements: Option<Vec<ModelElement>>,
    pub document_id: Option<Option<String>>,
}

impl Patch<Model> for ModelPatch {
    fn apply(self, record: &mut Model) -> Result<(), StoreError> {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(kind) = self.kind {
            record.kind = kind;
        }
        if let Some(elements) = self.elements {
            record.elements = elements;
        }
        if let Some(document_id) = self.document_id {
            record.document_id = document_id;
        }
        Ok(())
    }
}

/// State of the core assets store
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsState {
    #[serde(with = "codec::pairs")]
    pub documents: Collection<Document>,
    #[serde(with = "codec::pairs")]
    pub models: Collection<Model>,
    pub current_document: Option<String>,
    pub current_model: Option<String>,
}

impl StoreState for AssetsState {}

impl Holds<Document> for AssetsState {
    fn collection(&self) -> &Collection<Document> {
        &self.documents
    }

    fn collection_mut(&mut self) -> &mut Collection<Document> {
        &mut self.documents
    }

    fn selected(&self) -> Option<&str> {
        self.current_document.as_deref()
    }

    fn select(&mut self, key: Option<String>) -> bool {
        self.current_document = key;
        true
    }
}

impl Holds<Model> for AssetsState {
    fn collection(&self) -> &Collection<Model> {
        &self.models
    }

    fn collection_mut(&mut self) -> &mut Collection<Model> {
        &mut self.models
    }

    fn selected(&self) -> Option<&str> {
        self.current_model.as_deref()
    }

    fn select(&mut self, key: Option<String>) -> bool {
        self.current_model = key;
        true
    }
}

/// Store of generated documents and diagram models
pub type AssetsStore = PersistentStore<AssetsState>;

impl PersistentStore<AssetsState> {
    /// Documents of the given kind
    pub fn documents_of_kind(&self, kind: DocumentKind) -> Vec<&Document> {
        self.collection::<Document>()
            .values()
            .filter(|document| document.kind() == kind)
            .collect()
    }

    /// Models derived from the given document
    pub fn models_for_document(&self, document_id: &str) -> Vec<&Model> {
        self.collection::<Model>()
            .values()
            .filter(|model| model.document_id.as_deref() == Some(document_id))
            .collect()
    }
}
