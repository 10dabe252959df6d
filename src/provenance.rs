//! Where each option value came from

use std::collections::HashMap;
use std::fmt;

/// How a value was supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueSource {
    CommandLine,
    Environment,
    Config,
    Default,
    Implied,
}

impl ValueSource {
    /// Sources that count as the user actually choosing a value
    pub fn is_explicit(self) -> bool {
        matches!(
            self,
            ValueSource::CommandLine | ValueSource::Environment | ValueSource::Config
        )
    }
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueSource::CommandLine => "cli",
            ValueSource::Environment => "env",
            ValueSource::Config => "config",
            ValueSource::Default => "default",
            ValueSource::Implied => "implied",
        };
        f.write_str(name)
    }
}

/// Raw captured text and its source for one attribute key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// Text as captured, before coercion; absent for defaults and config values
    pub raw: Option<String>,
    pub source: ValueSource,
}

/// Per-command record of the latest capture for each attribute key
#[derive(Debug, Clone, Default)]
pub struct ProvenanceMap {
    entries: HashMap<String, Provenance>,
}

impl ProvenanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or overwrite the raw value and source for `key`
    pub fn record(&mut self, key: impl Into<String>, raw: Option<String>, source: ValueSource) {
        self.entries.insert(key.into(), Provenance { raw, source });
    }

    pub fn lookup(&self, key: &str) -> Option<&Provenance> {
        self.entries.get(key)
    }

    pub fn source(&self, key: &str) -> Option<ValueSource> {
        self.lookup(key).map(|p| p.source)
    }

    pub fn remove(&mut self, key: &str) -> Option<Provenance> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
