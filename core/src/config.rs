//! Grammar configuration.
//!
//! Settings are read through [`ConfigReader`], a path-addressed key/value
//! interface (`grammar/language`, `grammar/rear_penalty`). [`TomlConfig`]
//! provides it over a TOML document:
//!
//! ```toml
//! [grammar]
//! language = "zh-hant"
//! collocation_max_length = 5
//! rear_penalty = -20
//! ```
use anyhow::Context;
use std::path::Path;

/// Path-addressed configuration lookups. Segments are separated by `/` or `.`.
pub trait ConfigReader {
    fn get_string(&self, path: &str) -> Option<String>;
    fn get_int(&self, path: &str) -> Option<i64>;
    fn get_double(&self, path: &str) -> Option<f64>;
}

/// [`ConfigReader`] over a parsed TOML document.
#[derive(Debug, Clone)]
pub struct TomlConfig {
    root: toml::Value,
}

impl TomlConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        Ok(Self {
            root: toml::from_str(content)?,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    fn get(&self, path: &str) -> Option<&toml::Value> {
        path.split(['/', '.'])
            .filter(|s| !s.is_empty())
            .try_fold(&self.root, |node, key| node.get(key))
    }
}

impl ConfigReader for TomlConfig {
    fn get_string(&self, path: &str) -> Option<String> {
        self.get(path)?.as_str().map(str::to_string)
    }

    fn get_int(&self, path: &str) -> Option<i64> {
        self.get(path)?.as_integer()
    }

    fn get_double(&self, path: &str) -> Option<f64> {
        match self.get(path)? {
            toml::Value::Float(f) => Some(*f),
            toml::Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

/// Scoring tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarConfig {
    pub collocation_max_length: i64,
    pub collocation_min_length: i64,
    pub collocation_penalty: f64,
    pub non_collocation_penalty: f64,
    pub weak_collocation_penalty: f64,
    pub rear_penalty: f64,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            collocation_max_length: 4,
            collocation_min_length: 3,
            collocation_penalty: -12.0,
            non_collocation_penalty: -12.0,
            weak_collocation_penalty: -24.0,
            rear_penalty: -18.0,
        }
    }
}

impl GrammarConfig {
    /// Overlay the `grammar/*` tunables present in `config`.
    pub fn update_from(&mut self, config: &dyn ConfigReader) {
        if let Some(v) = config.get_int("grammar/collocation_max_length") {
            self.collocation_max_length = v;
        }
        if let Some(v) = config.get_int("grammar/collocation_min_length") {
            self.collocation_min_length = v;
        }
        if let Some(v) = config.get_double("grammar/collocation_penalty") {
            self.collocation_penalty = v;
        }
        if let Some(v) = config.get_double("grammar/non_collocation_penalty") {
            self.non_collocation_penalty = v;
        }
        if let Some(v) = config.get_double("grammar/weak_collocation_penalty") {
            self.weak_collocation_penalty = v;
        }
        if let Some(v) = config.get_double("grammar/rear_penalty") {
            self.rear_penalty = v;
        }
    }
}
