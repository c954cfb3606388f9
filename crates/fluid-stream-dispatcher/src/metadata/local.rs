//!
//! # Local manifests
//!
//! Seeds a metadata store from a directory laid out as `<dir>/<Kind>/*.yaml`,
//! one object per file.
//!
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use fluid_controlplane_metadata::core::{Spec, MetadataObject};

use crate::StoreError;
use super::MetadataClient;

#[derive(Debug, Clone)]
pub struct LocalManifests {
    path: PathBuf,
}

impl LocalManifests {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn kind_dir<S: Spec>(&self) -> PathBuf {
        self.path.join(S::LABEL)
    }

    /// read every manifest of kind `S`, files which fail to parse are skipped
    pub fn read<S: Spec>(&self) -> Result<Vec<MetadataObject<S>>, StoreError> {
        let dir = self.kind_dir::<S>();
        if !dir.is_dir() {
            debug!(kind = S::LABEL, dir = %dir.display(), "no manifests");
            return Ok(vec![]);
        }

        let mut paths = vec![];
        for entry in std::fs::read_dir(&dir)? {
            let Ok(entry) = entry else {
                continue;
            };
            let path = entry.path();
            if path.extension() == Some(OsStr::new("yaml")) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut items = vec![];
        for path in paths {
            match load_file::<S>(&path) {
                Ok(item) => {
                    debug!(kind = S::LABEL, key = %item.key(), "loaded");
                    items.push(item);
                }
                Err(err) => {
                    warn!("skipped manifest {}: {err}", path.display());
                }
            }
        }
        Ok(items)
    }

    /// create every manifest of kind `S` in the store, returns number of objects created
    pub async fn seed<S, C>(&self, client: &C) -> Result<usize, StoreError>
    where
        S: Spec,
        C: MetadataClient,
    {
        let mut created = 0;
        for item in self.read::<S>()? {
            let key = item.key();
            match client.create_item(item).await {
                Ok(_) => created += 1,
                Err(StoreError::AlreadyExists { .. }) => {
                    warn!(kind = S::LABEL, %key, "duplicate manifest, skipping");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(created)
    }
}

fn load_file<S: Spec>(path: &Path) -> Result<MetadataObject<S>, StoreError> {
    let content = std::fs::read_to_string(path)?;
    let mut item: MetadataObject<S> = serde_yaml::from_str(&content)?;
    if item.metadata.name.is_empty() {
        if let Some(stem) = path.file_stem().and_then(OsStr::to_str) {
            item.metadata.name = stem.to_owned();
        }
    }
    if item.metadata.namespace.is_empty() {
        item.metadata.namespace = "default".to_owned();
    }
    Ok(item)
}
