use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BUILTIN_TABLE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub name: String,
    pub regex: String,
}

/// Versioned, ordered list of marker patterns. Order only affects which
/// pattern is reported as the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternTable {
    pub version: u32,
    pub patterns: Vec<PatternEntry>,
}

impl PatternTable {
    pub fn builtin() -> Self {
        let entry = |name: &str, regex: &str| PatternEntry {
            name: name.to_string(),
            regex: regex.to_string(),
        };

        Self {
            version: BUILTIN_TABLE_VERSION,
            patterns: vec![
                entry("literal_unaccented", "LIQUIDACION PROVISIONAL"),
                entry("literal_accented", "LIQUIDACIÓN PROVISIONAL"),
                // Ó read as O, 0, Q, Ò or a vertical stroke (I, l, 1, |)
                entry("accent_confusion", r"LIQUIDACI[OÓÒ0QIL1|]N\s*PROVISIONAL"),
                // I read as 1, l or | anywhere in the phrase, plus the accent confusions
                entry(
                    "stroke_confusion",
                    r"L[I1L|]QU[I1L|]DAC[I1L|Í][OÓÒ0QIL1|]N\s*PROV[I1L|]S[I1L|][OÓ0]NAL",
                ),
            ],
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path)
            .with_context(|| format!("failed to read pattern table {}", path.display()))?;
        let table: Self = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse pattern table {}", path.display()))?;
        Ok(table)
    }
}

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("pattern table version {version} has no patterns")]
    Empty { version: u32 },

    #[error("pattern '{name}' failed to compile: {source}")]
    Invalid {
        name: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone)]
pub struct PatternSet {
    version: u32,
    compiled: Vec<(PatternEntry, Regex)>,
}

impl PatternSet {
    pub fn compile(table: &PatternTable) -> Result<Self, PatternError> {
        if table.patterns.is_empty() {
            return Err(PatternError::Empty {
                version: table.version,
            });
        }

        let compiled = table
            .patterns
            .iter()
            .map(|entry| {
                RegexBuilder::new(&entry.regex)
                    .case_insensitive(true)
                    .build()
                    .map(|regex| (entry.clone(), regex))
                    .map_err(|source| PatternError::Invalid {
                        name: entry.name.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            version: table.version,
            compiled,
        })
    }

    pub fn builtin() -> Result<Self, PatternError> {
        Self::compile(&PatternTable::builtin())
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// First pattern, in table order, found anywhere in `text`.
    pub fn first_match(&self, text: &str) -> Option<&PatternEntry> {
        self.compiled
            .iter()
            .find(|(_, regex)| regex.is_match(text))
            .map(|(entry, _)| entry)
    }

    pub fn matches(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }

    /// Regex sources in table order, as reported in diagnostics.
    pub fn sources(&self) -> Vec<String> {
        self.compiled
            .iter()
            .map(|(entry, _)| entry.regex.clone())
            .collect()
    }
}
