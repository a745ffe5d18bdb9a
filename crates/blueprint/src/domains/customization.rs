//! User customization store
//!
//! Scalar preferences (theme, sidebar, locale) plus user-defined document
//! templates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::DocumentKind;
use crate::core::{
    codec, Collection, Holds, Patch, PersistentStore, Record, StoreError, StoreState,
};

/// Color theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        })
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" => Ok(Theme::System),
            _ => Err(format!("Unknown theme: {}", s)),
        }
    }
}

/// A user-defined starting point for documents of one kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub document_kind: DocumentKind,
    #[serde(default)]
    pub body: String,
}

impl Record for Template {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Partial update for a [`Template`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplatePatch {
    pub name: Option<String>,
    pub document_kind: Option<DocumentKind>,
    pub body: Option<String>,
}

impl Patch<Template> for TemplatePatch {
    fn apply(self, record: &mut Template) -> Result<(), StoreError> {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(document_kind) = self.document_kind {
            record.document_kind = document_kind;
        }
        if let Some(body) = self.body {
            record.body = body;
        }
        Ok(())
    }
}

/// State of the user customization store
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomizationState {
    #[serde(with = "codec::pairs")]
    pub templates: Collection<Template>,
    pub theme: Theme,
    pub sidebar_collapsed: bool,
    pub locale: String,
}

impl Default for CustomizationState {
    fn default() -> Self {
        Self {
            templates: Collection::new(),
            theme: Theme::default(),
            sidebar_collapsed: false,
            locale: "en".to_string(),
        }
    }
}

impl StoreState for CustomizationState {}

impl Holds<Template> for CustomizationState {
    fn collection(&self) -> &Collection<Template> {
        &self.templates
    }

    fn collection_mut(&mut self) -> &mut Collection<Template> {
        &mut self.templates
    }
}

/// Store of user preferences and templates
pub type CustomizationStore = PersistentStore<CustomizationState>;

impl PersistentStore<CustomizationState> {
    pub fn set_theme(&mut self, theme: Theme) {
        self.apply(|state| state.theme = theme);
    }

    pub fn set_sidebar_collapsed(&mut self, collapsed: bool) {
        self.apply(|state| state.sidebar_collapsed = collapsed);
    }

    /// Flip the sidebar state, returning the new value
    pub fn toggle_sidebar(&mut self) -> bool {
        self.apply(|state| state.sidebar_collapsed = !state.sidebar_collapsed);
        self.state().sidebar_collapsed
    }

    pub fn set_locale(&mut self, locale: impl Into<String>) {
        let locale = locale.into();
        self.apply(|state| state.locale = locale);
    }

    /// Templates for documents of the given kind
    pub fn templates_for(&self, kind: DocumentKind) -> Vec<&Template> {
        self.collection::<Template>()
            .values()
            .filter(|template| template.document_kind == kind)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MemoryStorage, StorageBackend};
    use std::sync::Arc;

    #[test]
    fn test_defaults() {
        let store = CustomizationStore::open("prefs", Arc::new(MemoryStorage::new()));
        assert_eq!(store.state().theme, Theme::System);
        assert_eq!(store.state().locale, "en");
        assert!(!store.state().sidebar_collapsed);
    }

    #[test]
    fn test_scalar_changes_are_persisted() {
        let storage = MemoryStorage::new();
        {
            let mut store = CustomizationStore::open("prefs", Arc::new(storage.clone()));
            store.set_theme(Theme::Dark);
            assert!(store.toggle_sidebar());
            store.set_locale("de");
        }
        let store = CustomizationStore::open("prefs", Arc::new(storage.clone()));
        assert_eq!(store.state().theme, Theme::Dark);
        assert!(store.state().sidebar_collapsed);
        assert_eq!(store.state().locale, "de");

        let raw = storage.get_item("prefs").unwrap().unwrap();
        assert!(raw.contains("\"theme\":\"dark\""));
    }

    #[test]
    fn test_missing_scalars_use_defaults() {
        let storage = MemoryStorage::new();
        storage
            .set_item("prefs", r#"{"state": {"theme": "light"}, "version": 0}"#)
            .unwrap();
        let store = CustomizationStore::open("prefs", Arc::new(storage));
        assert_eq!(store.state().theme, Theme::Light);
        assert_eq!(store.state().locale, "en");
    }

    #[test]
    fn test_theme_parsing() {
        assert_eq!("Dark".parse::<Theme>(), Ok(Theme::Dark));
        assert!("sepia".parse::<Theme>().is_err());
        assert_eq!(Theme::System.to_string(), "system");
    }
}
