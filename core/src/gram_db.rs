//! Grammar database: a persisted double-array trie from encoded n-gram keys
//! to log-scaled frequencies.
//!
//! File layout:
//!
//! ```text
//! [metadata: 44 bytes]
//!   format[32]          "Rime::Grammar/1.0", NUL padded
//!   db_checksum: u32    reserved, written as 0
//!   double_array_size   u32, bytes
//!   double_array_offset u32, from the start of the file
//! [double array image]
//! ```
//!
//! The file is built offline ([`GramDb::build`] then [`GramDb::save`]) and
//! mapped read-only at runtime ([`GramDb::load`]). Lookups read the image in
//! place.
use crate::double_array::{DoubleArray, DoubleArrayBuilder, Match};
use crate::errors::{GramDbError, Result};
use crate::mapped_file::MappedFile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

pub const GRAMMAR_FORMAT: &str = "Rime::Grammar/1.0";
pub const GRAMMAR_FORMAT_PREFIX: &str = "Rime::Grammar/";

/// Upper bound on matches returned by a single lookup.
pub const MAX_RESULTS: usize = 8;
/// Stored values are `ln(frequency) * VALUE_SCALE`.
pub const VALUE_SCALE: f64 = 10000.0;

const FORMAT_MAX_LENGTH: usize = 32;
const METADATA_SIZE: usize = FORMAT_MAX_LENGTH + 4 * 3;
const RESERVED_SIZE: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Metadata {
    format: [u8; FORMAT_MAX_LENGTH],
    db_checksum: u32,
    double_array_size: u32,
    double_array_offset: u32,
}

impl Metadata {
    fn new(array_offset: usize, array_size: usize) -> Result<Self> {
        let mut format = [0u8; FORMAT_MAX_LENGTH];
        format[..GRAMMAR_FORMAT.len()].copy_from_slice(GRAMMAR_FORMAT.as_bytes());
        let too_large = |_| GramDbError::TrieConstruction("double array too large".into());
        Ok(Self {
            format,
            db_checksum: 0,
            double_array_size: u32::try_from(array_size).map_err(too_large)?,
            double_array_offset: u32::try_from(array_offset).map_err(too_large)?,
        })
    }

    fn format(&self) -> String {
        let end = self
            .format
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(FORMAT_MAX_LENGTH);
        String::from_utf8_lossy(&self.format[..end]).into_owned()
    }
}

/// Quantize a frequency into a stored value: `max(0, round(ln(f) * 10000))`.
pub fn quantize(frequency: f64) -> i32 {
    let scaled = (frequency.ln() * VALUE_SCALE).round();
    if scaled.is_nan() {
        return 0;
    }
    (scaled as i32).max(0)
}

/// Inverse of [`quantize`] for a found value.
pub fn scale_value(value: i32) -> f64 {
    f64::from(value) / VALUE_SCALE
}

pub struct GramDb {
    file: MappedFile,
    array: Option<(usize, usize)>,
    built: bool,
}

impl GramDb {
    pub fn new(file_name: impl Into<PathBuf>) -> Self {
        Self {
            file: MappedFile::new(file_name),
            array: None,
            built: false,
        }
    }

    pub fn file_name(&self) -> &Path {
        self.file.file_name()
    }

    /// Whether a trie image is available for lookups.
    pub fn is_loaded(&self) -> bool {
        self.trie().is_some()
    }

    /// Size in bytes of the double array image, 0 when none is available.
    pub fn array_size(&self) -> usize {
        self.array.map_or(0, |(_, len)| len)
    }

    /// Map an existing database read-only and validate its header.
    pub fn load(&mut self) -> Result<()> {
        info!("loading gram db: {}", self.file_name().display());
        self.close();

        if let Err(e) = self.file.open_read_only() {
            error!("error opening gram db '{}': {}", self.file_name().display(), e);
            return Err(e);
        }
        match self.read_metadata() {
            Ok((offset, len)) => {
                info!("found double array image of size {}.", len);
                self.array = Some((offset, len));
                Ok(())
            }
            Err(e) => {
                error!("{}", e);
                self.close();
                Err(e)
            }
        }
    }

    fn read_metadata(&self) -> Result<(usize, usize)> {
        let header = self
            .file
            .find(0, METADATA_SIZE)
            .ok_or(GramDbError::MissingMetadata)?;
        let metadata: Metadata = bincode::deserialize(header)?;
        let format = metadata.format();
        if !format.starts_with(GRAMMAR_FORMAT_PREFIX) {
            return Err(GramDbError::InvalidFormat(format));
        }

        let offset = metadata.double_array_offset as usize;
        let len = metadata.double_array_size as usize;
        if offset < METADATA_SIZE || len == 0 {
            return Err(GramDbError::MissingArray);
        }
        let image = self.file.find(offset, len).ok_or(GramDbError::MissingArray)?;
        if DoubleArray::from_bytes(image).is_none() {
            return Err(GramDbError::MissingArray);
        }
        Ok((offset, len))
    }

    /// Build a new database from `(encoded key, frequency)` pairs sorted
    /// ascending by key bytes.
    ///
    /// The file only becomes visible at its path after [`GramDb::save`].
    pub fn build<K: AsRef<[u8]>>(&mut self, data: &[(K, f64)]) -> Result<()> {
        self.close();

        let keys: Vec<&[u8]> = data.iter().map(|(k, _)| k.as_ref()).collect();
        let values: Vec<i32> = data.iter().map(|&(_, f)| quantize(f)).collect();
        let image = DoubleArrayBuilder::build(&keys, &values).map_err(|e| {
            error!("error building double-array trie: {}", e);
            e
        })?;
        debug!("built double array of {} bytes for {} keys", image.len(), keys.len());

        if let Err(e) = self.write_image(&image) {
            error!("error creating gram db file '{}': {}", self.file_name().display(), e);
            self.close();
            return Err(e);
        }
        self.built = true;
        Ok(())
    }

    fn write_image(&mut self, image: &[u8]) -> Result<()> {
        self.file.create(METADATA_SIZE + image.len() + RESERVED_SIZE)?;
        let metadata_offset = self.file.allocate(METADATA_SIZE)?;
        let array_offset = self.file.allocate(image.len())?;
        self.file
            .region_mut(array_offset, image.len())
            .ok_or(GramDbError::OutOfSpace)?
            .copy_from_slice(image);

        // metadata last: the format tag marks a complete image
        let metadata = bincode::serialize(&Metadata::new(array_offset, image.len())?)?;
        self.file
            .region_mut(metadata_offset, METADATA_SIZE)
            .ok_or(GramDbError::OutOfSpace)?
            .copy_from_slice(&metadata);
        self.array = Some((array_offset, image.len()));
        Ok(())
    }

    /// Finish a database started with [`GramDb::build`].
    pub fn save(&mut self) -> Result<()> {
        info!("saving gram db: {}", self.file_name().display());
        if !self.built {
            error!("the trie has not been constructed!");
            return Err(GramDbError::NotBuilt);
        }
        self.file.shrink_to_fit()?;
        self.built = false;
        Ok(())
    }

    pub fn close(&mut self) {
        self.file.close();
        self.array = None;
        self.built = false;
    }

    fn trie(&self) -> Option<DoubleArray<'_>> {
        let (offset, len) = self.array?;
        DoubleArray::from_bytes(self.file.find(offset, len)?)
    }

    /// Find stored keys that extend `context` with a prefix of `word`.
    ///
    /// `context` must match a trie path in full; each result gives the
    /// matched length in bytes of `word` and the stored value. At most
    /// [`MAX_RESULTS`] results, shortest first.
    pub fn lookup(&self, context: &[u8], word: &[u8]) -> Vec<Match> {
        let Some(trie) = self.trie() else {
            return Vec::new();
        };
        let (node_pos, key_pos) = trie.traverse(context, 0);
        if key_pos != context.len() {
            return Vec::new();
        }
        trie.common_prefix_search(word, node_pos, MAX_RESULTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_metadata_is_fixed_size() {
        let metadata = Metadata::new(METADATA_SIZE, 16).unwrap();
        let bytes = bincode::serialize(&metadata).unwrap();
        assert_eq!(bytes.len(), METADATA_SIZE);
        assert!(bytes.starts_with(GRAMMAR_FORMAT.as_bytes()));
        assert_eq!(metadata.format(), GRAMMAR_FORMAT);
    }

    #[test]
    fn test_quantize() {
        assert_eq!(quantize(2.0), 6931);
        assert_eq!(quantize(100.0), 46052);
        assert_eq!(quantize(1.0), 0);
        assert_eq!(quantize(0.5), 0);
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(-3.0), 0);
        assert!((scale_value(46052) - 4.6052).abs() < 1e-9);
    }

    #[test]
    fn test_lookup_before_build_is_empty() {
        let db = GramDb::new("nowhere.gram");
        assert!(!db.is_loaded());
        assert!(db.lookup(b"a", b"b").is_empty());
    }

    #[test]
    fn test_lookup_right_after_build() {
        let dir = tempdir().unwrap();
        let mut db = GramDb::new(dir.path().join("fresh.gram"));
        db.build(&[(b"ab".to_vec(), 2.0)]).unwrap();
        assert!(db.is_loaded());
        assert_eq!(db.lookup(b"a", b"b"), vec![Match { length: 1, value: 6931 }]);
    }

    #[test]
    fn test_save_without_build() {
        let dir = tempdir().unwrap();
        let mut db = GramDb::new(dir.path().join("empty.gram"));
        assert!(matches!(db.save(), Err(GramDbError::NotBuilt)));
        assert!(!dir.path().join("empty.gram").exists());
    }
}
