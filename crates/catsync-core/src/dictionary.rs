//! Locale dictionaries used for static storefront copy.
//!
//! The sync engine only needs one entry today (the description placeholder),
//! but the lookup is modelled as `dictionary(locale) -> key/value map` so the
//! storefront's own translation files can be plugged in unchanged.

use std::collections::HashMap;
use std::path::Path;

use crate::{ConfigError, Locale};

/// Dictionary key for the text stored when no product description exists.
pub const PLACEHOLDER_KEY: &str = "product.description.placeholder";

/// Lookup of translated strings by locale.
pub trait Dictionary: Send + Sync {
    /// All entries for `locale`, if the locale is known.
    fn entries(&self, locale: Locale) -> Option<&HashMap<String, String>>;

    /// A single translated string.
    fn lookup(&self, locale: Locale, key: &str) -> Option<&str> {
        self.entries(locale)
            .and_then(|map| map.get(key))
            .map(String::as_str)
    }
}

/// In-memory dictionary, seeded with built-in defaults and optionally
/// overridden from a YAML file.
#[derive(Debug, Clone, Default)]
pub struct StaticDictionary {
    by_locale: HashMap<Locale, HashMap<String, String>>,
}

impl StaticDictionary {
    /// Dictionary containing the built-in placeholder for every locale.
    #[must_use]
    pub fn builtin() -> Self {
        let defaults = [
            (Locale::Cs, "Popis produktu brzy doplníme."),
            (Locale::Sk, "Popis produktu čoskoro doplníme."),
            (Locale::En, "Product description coming soon."),
            (Locale::De, "Produktbeschreibung folgt in Kürze."),
        ];

        let by_locale = defaults
            .into_iter()
            .map(|(locale, text)| {
                let mut map = HashMap::new();
                map.insert(PLACEHOLDER_KEY.to_string(), text.to_string());
                (locale, map)
            })
            .collect();

        Self { by_locale }
    }

    /// Built-in defaults overlaid with entries parsed from a YAML file.
    ///
    /// The file maps locale codes to flat key/value maps:
    ///
    /// ```yaml
    /// en:
    ///   product.description.placeholder: "More details soon."
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::DictionaryFileIo {
                path: path.display().to_string(),
                source: e,
            })?;
        Self::from_yaml(&content)
    }

    /// Built-in defaults overlaid with entries parsed from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DictionaryFileParse`] on malformed YAML or an
    /// unknown locale key.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let parsed: HashMap<Locale, HashMap<String, String>> = serde_yaml::from_str(content)?;
        let mut dictionary = Self::builtin();
        for (locale, entries) in parsed {
            dictionary.by_locale.entry(locale).or_default().extend(entries);
        }
        Ok(dictionary)
    }
}

impl Dictionary for StaticDictionary {
    fn entries(&self, locale: Locale) -> Option<&HashMap<String, String>> {
        self.by_locale.get(&locale)
    }
}
