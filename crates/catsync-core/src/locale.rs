use serde::{Deserialize, Serialize};

/// Storefront locales that carry their own description field on products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Cs,
    Sk,
    En,
    De,
}

impl Locale {
    pub const ALL: [Locale; 4] = [Locale::Cs, Locale::Sk, Locale::En, Locale::De];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Locale::Cs => "cs",
            Locale::Sk => "sk",
            Locale::En => "en",
            Locale::De => "de",
        }
    }

    /// Language tag sent to the catalog API (`X-PF-Language`).
    #[must_use]
    pub fn language_tag(self) -> &'static str {
        match self {
            Locale::Cs => "cs_CZ",
            Locale::Sk => "sk_SK",
            Locale::En => "en_US",
            Locale::De => "de_DE",
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cs" => Ok(Locale::Cs),
            "sk" => Ok(Locale::Sk),
            "en" => Ok(Locale::En),
            "de" => Ok(Locale::De),
            other => Err(format!("unsupported locale \"{other}\"")),
        }
    }
}
