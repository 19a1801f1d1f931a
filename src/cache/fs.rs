//! Filesystem-backed blob store.
//!
//! One file per key under the root directory:
//! ```text
//! <stem>.blob   one line of BlobMeta JSON, then the raw body bytes
//! ```
//! The stem is the percent-encoded key, or a BLAKE3 digest of the key when
//! the encoded form would overflow a file name. Each put writes a temporary
//! file and renames it into place. That rename is the only commit point, so
//! a reader sees either the previous blob or the new one, never a mix.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};
use url::form_urlencoded;
use uuid::Uuid;

use crate::cache::blob::{Blob, BlobMeta, BlobStore, StoreError, StoreResult};

const URL_SCHEME: &str = "file://";
const BLOB_EXT: &str = "blob";
/// Longest stem written verbatim; leaves room for the extension under the
/// usual 255-byte file name limit.
const MAX_STEM_LEN: usize = 200;

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        fs::create_dir_all(root.as_ref()).await?;
        let root = fs::canonicalize(root.as_ref()).await?;
        tracing::info!(root = %root.display(), "Filesystem blob store ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_stem(key: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(key.as_bytes()).collect();
        if encoded.len() <= MAX_STEM_LEN {
            return encoded;
        }
        let hashed = format!("long_key_{}", blake3::hash(key.as_bytes()).to_hex());
        tracing::debug!(key_len = key.len(), stem = %hashed, "Hashed long cache key");
        hashed
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{BLOB_EXT}", Self::file_stem(key)))
    }

    async fn write_atomic(&self, target: &Path, contents: &[u8]) -> StoreResult<()> {
        let tmp = self.root.join(format!(".tmp-{}", Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp, contents).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Read only the metadata line of a blob file.
    async fn read_meta(path: &Path) -> StoreResult<Option<BlobMeta>> {
        let file = match fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut line = Vec::new();
        BufReader::new(file).read_until(b'\n', &mut line).await?;
        Ok(Some(serde_json::from_slice(trim_newline(&line))?))
    }
}

fn trim_newline(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\n").unwrap_or(line)
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StoreResult<BlobMeta> {
        let path = self.blob_path(key);
        let meta = BlobMeta {
            pathname: key.to_string(),
            url: format!("{URL_SCHEME}{}", path.display()),
            content_type: content_type.to_string(),
            size: body.len() as u64,
            uploaded_at: Utc::now(),
        };

        // Compact JSON escapes newlines, so the first one ends the header.
        let mut contents = serde_json::to_vec(&meta)?;
        contents.push(b'\n');
        contents.extend_from_slice(&body);
        self.write_atomic(&path, &contents).await?;

        tracing::trace!(key = %key, bytes = meta.size, "Blob written");
        Ok(meta)
    }

    async fn head(&self, key: &str) -> StoreResult<Option<BlobMeta>> {
        Self::read_meta(&self.blob_path(key)).await
    }

    async fn fetch(&self, url: &str) -> StoreResult<Blob> {
        let path = url
            .strip_prefix(URL_SCHEME)
            .map(PathBuf::from)
            .filter(|p| p.parent() == Some(self.root.as_path()))
            .ok_or_else(|| StoreError::NotFound(url.to_string()))?;

        let raw = match fs::read(&path).await {
            Ok(raw) => Bytes::from(raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(url.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let split = raw
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| StoreError::Unavailable(format!("truncated blob file {url}")))?;
        let meta: BlobMeta = serde_json::from_slice(&raw[..split])?;

        Ok(Blob {
            body: raw.slice(split + 1..),
            content_type: meta.content_type,
        })
    }
}
