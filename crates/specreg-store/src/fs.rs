use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use specreg_types::{CustomerId, SpecId, SpecVersion};

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobKey, BlobStore};

const DOCUMENT_EXT: &str = ".json";
/// Leading character of in-flight temp files. Version ids never contain it.
const TEMP_PREFIX: char = '~';

/// Filesystem blob store.
///
/// Layout:
/// ```text
/// <root>/<hex(customer)...>/<spec_id>/<version>.json
/// ```
///
/// Spec ids and versions are path-safe by construction. The customer id is
/// hex encoded and split over as many directory levels as its length needs
/// (see [`CustomerId::to_path_components`]). Writes go to a `~`-prefixed
/// sibling file that is renamed into place, so readers never observe a
/// partially written document.
pub struct FsBlobStore {
    root: PathBuf,
    temp_counter: AtomicU64,
}

impl FsBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            temp_counter: AtomicU64::new(0),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn customer_dir(&self, sub: &CustomerId) -> PathBuf {
        let mut dir = self.root.clone();
        dir.extend(sub.to_path_components());
        dir
    }

    fn spec_dir(&self, sub: &CustomerId, spec_id: &SpecId) -> PathBuf {
        self.customer_dir(sub).join(spec_id.as_str())
    }

    fn document_path(&self, sub: &CustomerId, spec_id: &SpecId, version: &SpecVersion) -> PathBuf {
        self.spec_dir(sub, spec_id)
            .join(format!("{}{DOCUMENT_EXT}", version.as_str()))
    }
}

/// Remove a directory tree, treating "already gone" as success.
fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

impl BlobStore for FsBlobStore {
    fn get(&self, sub: &CustomerId, spec_id: &SpecId, version: &SpecVersion) -> StoreResult<String> {
        let path = self.document_path(sub, spec_id, version);
        match fs::read_to_string(&path) {
            Ok(body) => Ok(body),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(BlobKey::new(sub, spec_id, version).not_found())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn put(
        &self,
        sub: &CustomerId,
        spec_id: &SpecId,
        version: &SpecVersion,
        body: &str,
    ) -> StoreResult<()> {
        let dir = self.spec_dir(sub, spec_id);
        fs::create_dir_all(&dir)?;

        let target = self.document_path(sub, spec_id, version);
        let seq = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        let temp = dir.join(format!(
            "{TEMP_PREFIX}{}{DOCUMENT_EXT}.{}-{seq}",
            version.as_str(),
            std::process::id()
        ));

        let mut file = fs::File::create(&temp)?;
        let written = file
            .write_all(body.as_bytes())
            .and_then(|()| file.sync_all())
            .and_then(|()| fs::rename(&temp, &target));
        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        debug!(path = %target.display(), bytes = body.len(), "blob stored");
        Ok(())
    }

    fn list_versions(&self, sub: &CustomerId, spec_id: &SpecId) -> StoreResult<Vec<SpecVersion>> {
        let dir = self.spec_dir(sub, spec_id);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(TEMP_PREFIX) {
                continue;
            }
            let Some(raw) = name.strip_suffix(DOCUMENT_EXT) else {
                continue;
            };
            let version = SpecVersion::new(raw).map_err(|e| StoreError::CorruptEntry {
                path: entry.path().display().to_string(),
                reason: e.to_string(),
            })?;
            versions.push(version);
        }
        versions.sort();
        Ok(versions)
    }

    fn delete_spec(&self, sub: &CustomerId, spec_id: &SpecId) -> StoreResult<()> {
        remove_dir_if_exists(&self.spec_dir(sub, spec_id))?;
        debug!(%spec_id, "blobs deleted for spec");
        Ok(())
    }

    fn delete_all(&self, sub: &CustomerId) -> StoreResult<()> {
        remove_dir_if_exists(&self.customer_dir(sub))?;
        debug!("blobs deleted for customer");
        Ok(())
    }
}

impl std::fmt::Debug for FsBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsBlobStore")
            .field("root", &self.root)
            .finish()
    }
}
