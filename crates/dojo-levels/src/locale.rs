//! Localized level text.
//!
//! Level text is looked up in a translation catalog under
//! `level.<id>.<kind>`. The active locale is always passed in explicitly; when
//! it is the default locale, or the catalog has no entry, the text embedded in
//! the descriptor is used as is.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use serde_json::Value;

use crate::error::{DojoError, Result};

/// The locale level descriptors are written in.
pub const DEFAULT_LOCALE: &str = "en";

/// A locale tag such as `en` or `de`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locale(String);

impl Locale {
    /// Creates a locale from a tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns `true` if this is the locale descriptors are written in.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_LOCALE
    }

    /// Returns the tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::new(DEFAULT_LOCALE)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which piece of level text is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    /// The level description (a single string).
    Description,
    /// The level's request prompts (a list indexed by call order).
    Requests,
}

impl TextKind {
    /// Returns the catalog key for this kind of text on a level.
    #[must_use]
    pub fn key(self, level_id: &str) -> String {
        let suffix = match self {
            Self::Description => "description",
            Self::Requests => "requests",
        };
        format!("level.{level_id}.{suffix}")
    }
}

/// A translated catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogValue {
    /// A single string.
    Text(String),
    /// An ordered list of strings.
    List(Vec<String>),
}

/// A source of translated strings.
pub trait Catalog {
    /// Returns `true` if `key` has a translation in `locale`.
    fn exists(&self, locale: &Locale, key: &str) -> bool;

    /// Fetches the translation of `key` in `locale`.
    fn fetch(&self, locale: &Locale, key: &str) -> Option<CatalogValue>;
}

/// In-memory catalog, mostly useful for tests and embedded content.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    entries: HashMap<(Locale, String), CatalogValue>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a single-string translation.
    #[must_use]
    pub fn with_text(mut self, locale: &str, key: &str, text: &str) -> Self {
        self.entries.insert(
            (Locale::new(locale), key.to_string()),
            CatalogValue::Text(text.to_string()),
        );
        self
    }

    /// Adds a list translation.
    #[must_use]
    pub fn with_list(mut self, locale: &str, key: &str, items: &[&str]) -> Self {
        self.entries.insert(
            (Locale::new(locale), key.to_string()),
            CatalogValue::List(items.iter().map(ToString::to_string).collect()),
        );
        self
    }
}

impl Catalog for MemoryCatalog {
    fn exists(&self, locale: &Locale, key: &str) -> bool {
        self.entries.contains_key(&(locale.clone(), key.to_string()))
    }

    fn fetch(&self, locale: &Locale, key: &str) -> Option<CatalogValue> {
        self.entries.get(&(locale.clone(), key.to_string())).cloned()
    }
}

/// Catalog backed by one `<locale>.json` file per locale.
///
/// Files hold nested objects, so `level.init.description` is found at
/// `{"level": {"init": {"description": "..."}}}`.
#[derive(Debug, Clone, Default)]
pub struct JsonCatalog {
    locales: HashMap<Locale, Value>,
}

impl JsonCatalog {
    /// Loads every `*.json` file in `dir`.
    ///
    /// A missing directory yields an empty catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if a catalog file cannot be read or is not valid JSON.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut locales = HashMap::new();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(dir = %dir.display(), "No locale directory, using embedded text");
                return Ok(Self { locales });
            }
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(tag) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let contents = std::fs::read_to_string(&path)?;
            let value: Value = serde_json::from_str(&contents)?;
            tracing::debug!(locale = tag, path = %path.display(), "Loaded translation catalog");
            locales.insert(Locale::new(tag), value);
        }

        Ok(Self { locales })
    }

    /// Returns the locales this catalog has translations for.
    pub fn locales(&self) -> impl Iterator<Item = &Locale> {
        self.locales.keys()
    }

    fn lookup(&self, locale: &Locale, key: &str) -> Option<&Value> {
        key.split('.')
            .try_fold(self.locales.get(locale)?, |node, segment| node.get(segment))
    }
}

impl Catalog for JsonCatalog {
    fn exists(&self, locale: &Locale, key: &str) -> bool {
        self.lookup(locale, key).is_some_and(|v| !v.is_null())
    }

    fn fetch(&self, locale: &Locale, key: &str) -> Option<CatalogValue> {
        match self.lookup(locale, key)? {
            Value::String(text) => Some(CatalogValue::Text(text.clone())),
            Value::Array(items) => Some(CatalogValue::List(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            )),
            _ => None,
        }
    }
}

/// Resolves level text for one locale against one catalog.
#[derive(Clone)]
pub struct LocalizationResolver {
    catalog: Rc<dyn Catalog>,
    locale: Locale,
}

impl fmt::Debug for LocalizationResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalizationResolver")
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}

impl Default for LocalizationResolver {
    fn default() -> Self {
        Self::new(Rc::new(MemoryCatalog::new()), Locale::default())
    }
}

impl LocalizationResolver {
    /// Creates a resolver for `locale`.
    #[must_use]
    pub fn new(catalog: Rc<dyn Catalog>, locale: Locale) -> Self {
        Self { catalog, locale }
    }

    /// Returns the active locale.
    #[must_use]
    pub const fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Resolves `kind` text of `level_id`.
    ///
    /// `index` selects into list entries (`requests`). Falls back to
    /// `default` when the locale is the default one or no translation exists;
    /// the catalog is only fetched from after a successful existence check.
    ///
    /// # Errors
    ///
    /// Returns `DojoError::TranslationMismatch` when a translation exists but
    /// has no entry at `index`, or its shape does not match the request.
    pub fn resolve(
        &self,
        kind: TextKind,
        level_id: &str,
        index: Option<usize>,
        default: &str,
    ) -> Result<String> {
        if self.locale.is_default() {
            return Ok(default.to_string());
        }

        let key = kind.key(level_id);
        if !self.catalog.exists(&self.locale, &key) {
            tracing::trace!(key = %key, locale = %self.locale, "No translation, using embedded text");
            return Ok(default.to_string());
        }

        let mismatch = |message: String| {
            DojoError::translation_mismatch(key.as_str(), self.locale.as_str(), message)
        };

        match (self.catalog.fetch(&self.locale, &key), index) {
            (Some(CatalogValue::Text(text)), None) => Ok(text),
            (Some(CatalogValue::List(items)), Some(i)) => {
                let len = items.len();
                items
                    .into_iter()
                    .nth(i)
                    .ok_or_else(|| mismatch(format!("no entry at index {i} (have {len})")))
            }
            (Some(CatalogValue::Text(_)), Some(i)) => {
                Err(mismatch(format!("expected a list to index {i}, found a string")))
            }
            (Some(CatalogValue::List(_)), None) => {
                Err(mismatch("expected a string, found a list".to_string()))
            }
            (None, _) => Err(mismatch("entry exists but could not be read".to_string())),
        }
    }
}
