use thiserror::Error;

#[derive(Debug, Error)]
pub enum GramDbError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("Persist: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Metadata: {0}")]
    Metadata(#[from] bincode::Error),

    #[error("no entries to build")]
    EmptyInput,

    #[error("key at index {index} is out of order")]
    UnsortedKeys { index: usize },

    #[error("key at index {index} is a duplicate")]
    DuplicateKey { index: usize },

    #[error("key at index {index} is empty or contains NUL")]
    InvalidKey { index: usize },

    #[error("error building double-array trie: {0}")]
    TrieConstruction(String),

    #[error("the trie has not been constructed")]
    NotBuilt,

    #[error("file is not open")]
    NotOpen,

    #[error("file region out of range")]
    OutOfSpace,

    #[error("metadata not found")]
    MissingMetadata,

    #[error("invalid metadata format: {0:?}")]
    InvalidFormat(String),

    #[error("double array image not found")]
    MissingArray,
}

pub type Result<T> = std::result::Result<T, GramDbError>;
