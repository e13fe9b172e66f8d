//! octagram-core
//!
//! Collocation scoring for input-method candidate ranking, backed by a
//! precomputed n-gram frequency table stored as a memory-mapped double-array
//! trie.
//!
//! Public API:
//! - `encoding` - Compact, NUL-free byte encoding of text used for trie keys
//! - `GramDb` - Build, save, load and query the grammar database file
//! - `Octagram` - Sliding-window collocation scorer (`Grammar` implementation)
//! - `OctagramComponent` - Factory creating scorers that share loaded databases
//! - `GramDbRegistry` - Per-language cache of loaded databases
//! - `GrammarConfig` / `ConfigReader` - Scoring tunables and their source
//!
//! # Example
//! ```
//! use octagram_core::{encoding, GramDb, GrammarConfig, Octagram};
//! use std::sync::Arc;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mut db = GramDb::new(dir.path().join("zh-hant.gram"));
//! db.build(&[(encoding::encode("好的"), 1_000_000.0)]).unwrap();
//! db.save().unwrap();
//!
//! let mut db = GramDb::new(dir.path().join("zh-hant.gram"));
//! db.load().unwrap();
//! let octagram = Octagram::with_db(Some(Arc::new(db)), GrammarConfig::default());
//! assert!(octagram.query("好", "的", false) > -12.0);
//! ```

pub mod encoding;

pub mod errors;
pub use errors::{GramDbError, Result};

pub mod double_array;
pub use double_array::{DoubleArray, DoubleArrayBuilder, Match};

pub mod mapped_file;
pub use mapped_file::MappedFile;

pub mod gram_db;
pub use gram_db::GramDb;

pub mod config;
pub use config::{ConfigReader, GrammarConfig, TomlConfig};

pub mod resource;
pub use resource::{
    DirResourceResolver, FallbackResourceResolver, ResourceResolver, ResourceType, GRAM_DB_TYPE,
};

pub mod registry;
pub use registry::GramDbRegistry;

pub mod octagram;
pub use octagram::{
    Grammar, GrammarComponent, Octagram, OctagramComponent, COMPONENT_NAME,
    GRAMMAR_DEFAULT_LANGUAGE,
};
