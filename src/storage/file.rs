//! File-backed key-value store
//!
//! Each key maps to `<dir>/<key>.kv` holding one framed record:
//! - magic: b"JDKV" (4 bytes)
//! - length: u32 (4 bytes)
//! - data: [u8; length] (UTF-8 value)
//! - crc: u32 (4 bytes, CRC32 of length + data)
//!
//! Writes go to a temp file that is fsynced and renamed over the target, so a
//! crash leaves either the old or the new value. A record that fails its
//! checksum reads as absent.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::kv::KeyValueStore;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 4] = b"JDKV";
const HEADER_LEN: usize = 8;
const MAX_VALUE_LEN: usize = 16 * 1024 * 1024;

/// Durable store rooted at a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store directory
    pub fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.kv", key)))
    }

    fn encode(value: &str) -> Vec<u8> {
        let data = value.as_bytes();
        let len = (data.len() as u32).to_le_bytes();

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&len);
        hasher.update(data);
        let crc = hasher.finalize();

        let mut buf = Vec::with_capacity(HEADER_LEN + data.len() + 4);
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&len);
        buf.extend_from_slice(data);
        buf.extend_from_slice(&crc.to_le_bytes());
        buf
    }

    fn decode(bytes: &[u8]) -> StorageResult<String> {
        if bytes.len() < HEADER_LEN + 4 || &bytes[..4] != MAGIC {
            return Err(StorageError::Corruption("invalid record header".to_string()));
        }

        let mut len_buf = [0u8; 4];
        len_buf.copy_from_slice(&bytes[4..8]);
        let len = u32::from_le_bytes(len_buf) as usize;

        if len > MAX_VALUE_LEN || bytes.len() != HEADER_LEN + len + 4 {
            return Err(StorageError::Corruption(format!(
                "record length {} does not match file size {}",
                len,
                bytes.len()
            )));
        }

        let data = &bytes[HEADER_LEN..HEADER_LEN + len];
        let mut crc_buf = [0u8; 4];
        crc_buf.copy_from_slice(&bytes[HEADER_LEN + len..]);
        let stored_crc = u32::from_le_bytes(crc_buf);

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&len_buf);
        hasher.update(data);
        let computed_crc = hasher.finalize();

        if stored_crc != computed_crc {
            return Err(StorageError::Corruption(format!(
                "CRC mismatch: stored={}, computed={}",
                stored_crc, computed_crc
            )));
        }

        String::from_utf8(data.to_vec()).map_err(|e| StorageError::Corruption(e.to_string()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match Self::decode(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding unreadable stored value");
                Ok(None)
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("kv.tmp");

        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp)?;
            file.write_all(&Self::encode(value))?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        // Make the rename itself durable where the platform allows it
        if let Ok(dir) = File::open(&self.dir) {
            let _ = dir.sync_all();
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
