//! Memory-mapped file container.
//!
//! A `MappedFile` is either mapped read-only from its final path, or mapped
//! writable over a temporary file in the same directory while it is being
//! filled. Regions are handed out bump-style from the start of the file and
//! addressed by `(offset, len)` pairs, so nothing in the file depends on where
//! it happens to be mapped. [`MappedFile::shrink_to_fit`] truncates the
//! temporary file to the bytes actually allocated and atomically moves it to
//! the final path; a file that is never finished never appears there.
use crate::errors::{GramDbError, Result};
use memmap2::{Mmap, MmapMut};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

enum Mapping {
    ReadOnly(Mmap),
    Writable { file: NamedTempFile, map: MmapMut },
}

pub struct MappedFile {
    file_name: PathBuf,
    mapping: Option<Mapping>,
    used: usize,
}

impl MappedFile {
    pub fn new(file_name: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            mapping: None,
            used: 0,
        }
    }

    pub fn file_name(&self) -> &Path {
        &self.file_name
    }

    pub fn is_open(&self) -> bool {
        self.mapping.is_some()
    }

    /// Map the existing file read-only.
    pub fn open_read_only(&mut self) -> Result<()> {
        self.close();
        let file = File::open(&self.file_name)?;
        // Safety: mapped read-only; finished files are replaced atomically,
        // never rewritten in place.
        let map = unsafe { Mmap::map(&file)? };
        self.used = map.len();
        self.mapping = Some(Mapping::ReadOnly(map));
        Ok(())
    }

    /// Start a new writable file with room for `capacity` bytes.
    pub fn create(&mut self, capacity: usize) -> Result<()> {
        self.close();
        let dir = self
            .file_name
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let file = tempfile::Builder::new().prefix(".gram_").tempfile_in(dir)?;
        file.as_file().set_len(capacity as u64)?;
        // Safety: the temporary file is private to this process until persisted.
        let map = unsafe { MmapMut::map_mut(file.as_file())? };
        self.used = 0;
        self.mapping = Some(Mapping::Writable { file, map });
        Ok(())
    }

    /// Reserve `len` bytes and return their offset.
    pub fn allocate(&mut self, len: usize) -> Result<usize> {
        let capacity = match &self.mapping {
            Some(Mapping::Writable { map, .. }) => map.len(),
            _ => return Err(GramDbError::NotOpen),
        };
        let offset = self.used;
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= capacity)
            .ok_or(GramDbError::OutOfSpace)?;
        self.used = end;
        Ok(offset)
    }

    /// Mutable view of an allocated region.
    pub fn region_mut(&mut self, offset: usize, len: usize) -> Option<&mut [u8]> {
        let end = offset.checked_add(len).filter(|&end| end <= self.used)?;
        match &mut self.mapping {
            Some(Mapping::Writable { map, .. }) => map.get_mut(offset..end),
            _ => None,
        }
    }

    /// Borrowed view of a region, `None` when it falls outside the file.
    pub fn find(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let end = offset.checked_add(len).filter(|&end| end <= self.used)?;
        let bytes: &[u8] = match self.mapping.as_ref()? {
            Mapping::ReadOnly(map) => &map[..],
            Mapping::Writable { map, .. } => &map[..],
        };
        bytes.get(offset..end)
    }

    /// Truncate to the allocated bytes, publish to the final path and reopen
    /// read-only.
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        let (file, map) = match self.mapping.take() {
            Some(Mapping::Writable { file, map }) => (file, map),
            other => {
                self.mapping = other;
                return Err(GramDbError::NotOpen);
            }
        };
        map.flush()?;
        drop(map);
        file.as_file().set_len(self.used as u64)?;
        file.as_file().sync_all()?;
        file.persist(&self.file_name)?;
        self.open_read_only()
    }

    pub fn close(&mut self) {
        self.mapping = None;
        self.used = 0;
    }
}
