//! Process-wide cache of loaded grammar databases, keyed by language.
use crate::gram_db::GramDb;
use crate::resource::{ResourceResolver, DirResourceResolver, GRAM_DB_TYPE};
use ahash::AHashMap;
use std::sync::{Arc, RwLock};
use tracing::{error, info};

/// Loads each language's [`GramDb`] on first use and shares it afterwards.
///
/// Lookups of an already loaded language take only a read lock; the write
/// lock covers the check-and-insert of a first load, so concurrent first
/// requests for one language load it once.
pub struct GramDbRegistry {
    resolver: Box<dyn ResourceResolver>,
    dbs: RwLock<AHashMap<String, Arc<GramDb>>>,
}

impl GramDbRegistry {
    pub fn new(resolver: Box<dyn ResourceResolver>) -> Self {
        Self {
            resolver,
            dbs: RwLock::new(AHashMap::new()),
        }
    }

    /// Registry resolving `<dir>/<language>.gram`.
    pub fn with_data_dir(dir: impl Into<std::path::PathBuf>) -> Self {
        Self::new(Box::new(DirResourceResolver::new(GRAM_DB_TYPE, dir)))
    }

    /// The database for `language`, loading it if needed.
    ///
    /// Returns `None` when it cannot be loaded; the next call retries.
    pub fn get_db(&self, language: &str) -> Option<Arc<GramDb>> {
        if let Ok(dbs) = self.dbs.read() {
            if let Some(db) = dbs.get(language) {
                return Some(Arc::clone(db));
            }
        }

        let mut dbs = self.dbs.write().ok()?;
        if let Some(db) = dbs.get(language) {
            return Some(Arc::clone(db));
        }
        let path = self.resolver.resolve_path(language);
        let mut db = GramDb::new(path);
        if let Err(e) = db.load() {
            error!("failed to load grammar database: {}: {}", language, e);
            return None;
        }
        info!("loaded grammar database: {}", language);
        let db = Arc::new(db);
        dbs.insert(language.to_string(), Arc::clone(&db));
        Some(db)
    }

    /// Number of languages currently loaded.
    pub fn len(&self) -> usize {
        self.dbs.read().map(|dbs| dbs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
