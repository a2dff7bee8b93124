use std::path::Path;

use crate::error::AppError;

const FLOOD_KEYWORDS: &[&str] = &[
    "bão",
    "lũ",
    "lụt",
    "ngập",
    "mưa lớn",
    "thiên tai",
    "bão lũ",
    "lũ lụt",
    "ngập lụt",
    "mưa bão",
    "bão tố",
    "lũ quét",
    "sạt lở",
    "lũ ống",
    "bão số",
    "áp thấp",
    "bão nhiệt đới",
    "siêu bão",
    "bão mạnh",
];

/// A named keyword set defining topical relevance.
///
/// Keywords are stored lowercased so matching only has to fold the record
/// text.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Taxonomy {
    name: String,
    keywords: Vec<String>,
}

#[derive(serde::Deserialize)]
struct TaxonomyFile {
    name: String,
    keywords: Vec<String>,
}

impl Taxonomy {
    pub fn new<I, S>(name: impl Into<String>, keywords: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut folded: Vec<String> = Vec::new();
        for keyword in keywords {
            let k = keyword.as_ref().trim().to_lowercase();
            if !k.is_empty() && !folded.contains(&k) {
                folded.push(k);
            }
        }
        if folded.is_empty() {
            return Err(AppError::ConfigError(
                "taxonomy must contain at least one non-empty keyword".into(),
            ));
        }
        Ok(Self {
            name: name.into(),
            keywords: folded,
        })
    }

    /// The built-in storm and flood vocabulary.
    pub fn flood() -> Self {
        Self {
            name: "flood".to_string(),
            keywords: FLOOD_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Load `{"name": ..., "keywords": [...]}` from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!(
                "Failed to read taxonomy file {}: {e}",
                path.display()
            ))
        })?;
        let file: TaxonomyFile = serde_json::from_str(&raw)?;
        let taxonomy = Self::new(file.name, file.keywords)?;
        tracing::debug!(
            name = %taxonomy.name,
            keywords = taxonomy.keywords.len(),
            "Loaded taxonomy"
        );
        Ok(taxonomy)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// True if any keyword is a substring of already-lowercased `text`.
    pub fn matches_folded(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::flood()
    }
}
