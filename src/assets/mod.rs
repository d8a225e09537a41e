pub mod fit;
pub mod loader;
pub mod worker;

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Model container formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFormat {
    Glb,
    Gltf,
    Obj,
}

impl ModelFormat {
    pub const EXTENSIONS: [&'static str; 3] = ["glb", "gltf", "obj"];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "glb" => Some(ModelFormat::Glb),
            "gltf" => Some(ModelFormat::Gltf),
            "obj" => Some(ModelFormat::Obj),
            _ => None,
        }
    }

    /// Classify a file name by the text after its last `.`.
    pub fn detect(file_name: &str) -> Result<Self, FormatError> {
        let (_, ext) = file_name
            .rsplit_once('.')
            .filter(|(_, ext)| !ext.is_empty())
            .ok_or_else(|| FormatError::MissingExtension(file_name.to_string()))?;
        Self::from_extension(ext).ok_or_else(|| FormatError::Unsupported {
            name: file_name.to_string(),
            extension: ext.to_string(),
        })
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ModelFormat::Glb => "model/gltf-binary",
            ModelFormat::Gltf => "model/gltf+json",
            ModelFormat::Obj => "model/obj",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModelFormat::Glb => "GLB",
            ModelFormat::Gltf => "glTF",
            ModelFormat::Obj => "OBJ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("cannot determine model format of '{0}': no file extension")]
    MissingExtension(String),
    #[error("unsupported model format '.{extension}' for '{name}' (expected .glb, .gltf or .obj)")]
    Unsupported { name: String, extension: String },
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Opaque `blob:` handle naming bytes held by a [`BlobStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bytes behind an object handle, plus the file they came from (used to
/// resolve sidecar files such as `.bin` buffers and `.mtl` libraries).
#[derive(Debug, Clone)]
pub struct Blob {
    pub bytes: Arc<[u8]>,
    pub source: Option<PathBuf>,
}

impl Blob {
    pub fn base_dir(&self) -> Option<&Path> {
        self.source.as_deref().and_then(Path::parent)
    }
}

/// Issues and tracks object handles. Every handle stays resolvable until it
/// is revoked or the store is dropped.
#[derive(Debug, Default)]
pub struct BlobStore {
    live: HashMap<ObjectUrl, Blob>,
    next: u64,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_object_url(&mut self, bytes: Arc<[u8]>, source: Option<PathBuf>) -> ObjectUrl {
        self.next += 1;
        let url = ObjectUrl(format!("blob:modelview/{}", self.next));
        log::debug!("Created {} ({} bytes)", url, bytes.len());
        self.live.insert(url.clone(), Blob { bytes, source });
        url
    }

    pub fn resolve(&self, url: &ObjectUrl) -> Option<Blob> {
        self.live.get(url).cloned()
    }

    pub fn revoke_object_url(&mut self, url: &ObjectUrl) -> bool {
        let revoked = self.live.remove(url).is_some();
        if revoked {
            log::debug!("Revoked {}", url);
        } else {
            log::warn!("Revoke requested for unknown handle {}", url);
        }
        revoked
    }

    pub fn revoke_all<'a, I>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = &'a ObjectUrl>,
    {
        urls.into_iter()
            .filter(|url| self.revoke_object_url(url))
            .count()
    }

    pub fn is_live(&self, url: &ObjectUrl) -> bool {
        self.live.contains_key(url)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl Drop for BlobStore {
    fn drop(&mut self) {
        if !self.live.is_empty() {
            log::info!("Releasing {} object handle(s) at shutdown", self.live.len());
            let mut urls: Vec<_> = self.live.keys().collect();
            urls.sort();
            for url in urls {
                log::debug!("  {}", url);
            }
        }
        self.live.clear();
    }
}

/// Metadata for an accepted model file.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub url: ObjectUrl,
    pub name: String,
    pub format: ModelFormat,
    pub mime_type: String,
    pub size: u64,
    pub last_modified: Option<SystemTime>,
    /// First 16 hex digits of the SHA-256 of the file contents.
    pub digest: String,
}

impl Upload {
    pub fn from_bytes(
        blobs: &mut BlobStore,
        name: &str,
        format: ModelFormat,
        bytes: Vec<u8>,
        last_modified: Option<SystemTime>,
        source: Option<PathBuf>,
    ) -> Self {
        let digest = content_digest(&bytes);
        let size = bytes.len() as u64;
        let url = blobs.create_object_url(bytes.into(), source);
        Self {
            url,
            name: name.to_string(),
            format,
            mime_type: format.mime_type().to_string(),
            size,
            last_modified,
            digest,
        }
    }
}

/// Validate and read a model file from disk, registering its bytes.
pub fn read_upload(path: &Path, blobs: &mut BlobStore) -> Result<Upload, UploadError> {
    let name = path
        .file_name()
        .map(|value| value.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let format = ModelFormat::detect(&name)?;
    let read_error = |source| UploadError::Read {
        path: path.display().to_string(),
        source,
    };
    let bytes = std::fs::read(path).map_err(read_error)?;
    let last_modified = std::fs::metadata(path).and_then(|meta| meta.modified()).ok();
    let upload = Upload::from_bytes(blobs, &name, format, bytes, last_modified, Some(path.to_path_buf()));
    log::info!(
        "Accepted {} ({}, {} bytes, sha256 {})",
        upload.name,
        upload.mime_type,
        upload.size,
        upload.digest
    );
    Ok(upload)
}

pub fn content_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .take(8)
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

/// Native file picker restricted to supported model formats.
pub fn pick_model_file() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Open 3D model")
        .add_filter("3D models", &ModelFormat::EXTENSIONS)
        .add_filter("glTF", &["gltf", "glb"])
        .add_filter("Wavefront OBJ", &["obj"])
        .pick_file()
}

/// Files dropped onto the window during one event batch. Only the first one
/// is processed.
#[derive(Debug, Default)]
pub struct DropBatch {
    paths: Vec<PathBuf>,
}

impl DropBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn take_first(&mut self) -> Option<PathBuf> {
        let mut paths = std::mem::take(&mut self.paths).into_iter();
        let first = paths.next()?;
        for ignored in paths {
            log::warn!(
                "Only one file per drop is supported; ignoring {}",
                ignored.display()
            );
        }
        Some(first)
    }
}
