//! Translation catalogues and lookup.
//!
//! One JSON file per locale (`<dir>/<locale>.json`) with nested objects;
//! keys are addressed by dotted path (`notifications.tag_scanned.title`).

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum I18nError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Default locale '{0}' has no catalogue")]
    MissingDefault(String),
}

#[derive(Debug, Clone)]
pub struct I18nOptions {
    pub default_locale: String,
    /// Missing keys render as their last dotted segment instead of the full key
    pub production: bool,
    /// Record missing keys for inspection
    pub debug: bool,
}

/// A key that was requested but not found
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MissingKey {
    pub locale: String,
    pub key: String,
}

#[derive(Debug)]
pub struct Translator {
    catalogs: HashMap<String, BTreeMap<String, String>>,
    options: I18nOptions,
    missing: Mutex<BTreeSet<MissingKey>>,
}

impl Translator {
    /// Load every `*.json` file of a directory as a locale catalogue
    pub fn load_dir(dir: impl AsRef<Path>, options: I18nOptions) -> Result<Self, I18nError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|source| I18nError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut catalogs = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| I18nError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(locale) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let locale = locale.to_string();

            let raw = std::fs::read_to_string(&path).map_err(|source| I18nError::Io {
                path: path.clone(),
                source,
            })?;
            let value: Value = serde_json::from_str(&raw).map_err(|source| I18nError::Parse {
                path: path.clone(),
                source,
            })?;

            tracing::debug!("Loaded locale catalogue {:?}", path);
            catalogs.push((locale, value));
        }

        Self::from_catalogs(catalogs, options)
    }

    /// Build from already-parsed catalogues
    pub fn from_catalogs(
        catalogs: impl IntoIterator<Item = (String, Value)>,
        options: I18nOptions,
    ) -> Result<Self, I18nError> {
        let catalogs: HashMap<String, BTreeMap<String, String>> = catalogs
            .into_iter()
            .map(|(locale, value)| {
                let mut flat = BTreeMap::new();
                flatten("", &value, &mut flat);
                (locale, flat)
            })
            .collect();

        if !catalogs.contains_key(&options.default_locale) {
            return Err(I18nError::MissingDefault(options.default_locale));
        }

        Ok(Self {
            catalogs,
            options,
            missing: Mutex::new(BTreeSet::new()),
        })
    }

    pub fn default_locale(&self) -> &str {
        &self.options.default_locale
    }

    /// Loaded locales, sorted
    pub fn locales(&self) -> Vec<&str> {
        let mut locales: Vec<&str> = self.catalogs.keys().map(String::as_str).collect();
        locales.sort_unstable();
        locales
    }

    /// The requested locale if loaded, otherwise the default
    pub fn resolve_locale<'a>(&'a self, requested: &'a str) -> &'a str {
        if self.catalogs.contains_key(requested) {
            requested
        } else {
            &self.options.default_locale
        }
    }

    /// Flattened catalogue of a loaded locale
    pub fn catalog(&self, locale: &str) -> Option<&BTreeMap<String, String>> {
        self.catalogs.get(locale)
    }

    /// Look up `key` in `locale` and interpolate `{{name}}` placeholders
    ///
    /// Never fails: an absent key renders as the key itself, or as its last
    /// dotted segment in production.
    pub fn translate(&self, locale: &str, key: &str, args: &[(&str, &str)]) -> String {
        let locale = self.resolve_locale(locale);
        match self.catalogs.get(locale).and_then(|c| c.get(key)) {
            Some(template) => interpolate(template, args),
            None => {
                self.record_missing(locale, key);
                if self.options.production {
                    key.rsplit('.').next().unwrap_or(key).to_string()
                } else {
                    key.to_string()
                }
            }
        }
    }

    fn record_missing(&self, locale: &str, key: &str) {
        if !self.options.debug {
            return;
        }
        let newly_missing = self
            .missing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(MissingKey {
                locale: locale.to_string(),
                key: key.to_string(),
            });
        if newly_missing {
            tracing::warn!("Missing translation key '{}' for locale '{}'", key, locale);
        }
    }

    /// Keys requested but not found since startup (debug mode only)
    pub fn missing_keys(&self) -> Vec<MissingKey> {
        self.missing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Keys present in `reference` but absent from `locale`
    pub fn untranslated_keys(&self, reference: &str, locale: &str) -> Vec<String> {
        let (Some(reference), Some(target)) = (self.catalogs.get(reference), self.catalogs.get(locale))
        else {
            return Vec::new();
        };
        reference
            .keys()
            .filter(|key| !target.contains_key(*key))
            .cloned()
            .collect()
    }

    /// Log a warning for every locale missing keys of the default locale
    pub fn audit(&self) {
        for locale in self.locales() {
            if locale == self.default_locale() {
                continue;
            }
            let untranslated = self.untranslated_keys(self.default_locale(), locale);
            if !untranslated.is_empty() {
                tracing::warn!(
                    "Locale '{}' is missing {} keys: {}",
                    locale,
                    untranslated.len(),
                    untranslated.join(", ")
                );
            }
        }
    }
}

/// Flatten nested objects into dotted keys; non-string leaves are stringified
fn flatten(prefix: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&path, child, out);
            }
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Null => {}
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

/// Replace `{{name}}` placeholders; unknown placeholders are left verbatim
fn interpolate(template: &str, args: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = after_open[..end].trim();
        match args.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after_open[end + 2..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn translator(production: bool, debug: bool) -> Translator {
        Translator::from_catalogs(
            [
                (
                    "en".to_string(),
                    json!({
                        "app": { "name": "PetTouch" },
                        "pets": {
                            "greeting": "Hello {{ name }}, you have {{count}} pets",
                            "count": 3
                        }
                    }),
                ),
                (
                    "es".to_string(),
                    json!({ "app": { "name": "PetTouch" } }),
                ),
            ],
            I18nOptions {
                default_locale: "en".to_string(),
                production,
                debug,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_and_interpolation() {
        let t = translator(false, false);
        assert_eq!(t.translate("en", "app.name", &[]), "PetTouch");
        assert_eq!(
            t.translate("en", "pets.greeting", &[("name", "Ana"), ("count", "2")]),
            "Hello Ana, you have 2 pets"
        );
        assert_eq!(t.translate("en", "pets.count", &[]), "3");
    }

    #[test]
    fn test_unknown_locale_uses_default() {
        let t = translator(false, false);
        assert_eq!(t.resolve_locale("fr"), "en");
        assert_eq!(t.translate("fr", "app.name", &[]), "PetTouch");
    }

    #[test]
    fn test_missing_key_returns_key() {
        let t = translator(false, false);
        assert_eq!(
            t.translate("es", "pets.greeting", &[]),
            "pets.greeting"
        );
        // Not recorded without debug
        assert!(t.missing_keys().is_empty());
    }

    #[test]
    fn test_missing_key_in_production_returns_last_segment() {
        let t = translator(true, false);
        assert_eq!(t.translate("en", "pets.form.submit", &[]), "submit");
        assert_eq!(t.translate("en", "plain", &[]), "plain");
    }

    #[test]
    fn test_missing_keys_recorded_in_debug() {
        let t = translator(false, true);
        t.translate("es", "pets.greeting", &[]);
        t.translate("es", "pets.greeting", &[]);
        t.translate("en", "nope", &[]);

        assert_eq!(
            t.missing_keys(),
            vec![
                MissingKey {
                    locale: "en".into(),
                    key: "nope".into()
                },
                MissingKey {
                    locale: "es".into(),
                    key: "pets.greeting".into()
                },
            ]
        );
    }

    #[test]
    fn test_untranslated_keys() {
        let t = translator(false, false);
        assert_eq!(
            t.untranslated_keys("en", "es"),
            vec!["pets.count".to_string(), "pets.greeting".to_string()]
        );
        assert!(t.untranslated_keys("en", "xx").is_empty());
    }

    #[test]
    fn test_interpolate_edge_cases() {
        assert_eq!(interpolate("{{a}}{{b}}", &[("a", "1")]), "1{{b}}");
        assert_eq!(interpolate("open {{a", &[("a", "1")]), "open {{a");
        assert_eq!(interpolate("no placeholders", &[]), "no placeholders");
    }

    #[test]
    fn test_missing_default_locale_is_an_error() {
        let result = Translator::from_catalogs(
            [("es".to_string(), json!({}))],
            I18nOptions {
                default_locale: "en".to_string(),
                production: false,
                debug: false,
            },
        );
        assert!(matches!(result, Err(I18nError::MissingDefault(_))));
    }

    #[test]
    fn test_shipped_catalogues_are_complete() {
        let t = Translator::load_dir(
            concat!(env!("CARGO_MANIFEST_DIR"), "/locales"),
            I18nOptions {
                default_locale: "en".to_string(),
                production: false,
                debug: false,
            },
        )
        .unwrap();
        for locale in t.locales() {
            assert!(
                t.untranslated_keys("en", locale).is_empty(),
                "locale {} is incomplete",
                locale
            );
        }
    }
}
