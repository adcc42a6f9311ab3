//! JSON persistence for scouting artifacts.
//!
//! Every artifact of a run (queries, scouting result, evaluations) is a
//! JSON file inside one output directory. [`OutputDir`] names those files
//! and reads the optional inputs a user may drop next to them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::OrganizationContext;

pub const SCOUTING_RESULTS_FILE: &str = "scouting_results.json";
pub const SEARCH_QUERIES_FILE: &str = "search_queries.json";
pub const EXISTING_TECHNOLOGIES_FILE: &str = "existing_technologies.json";
pub const ORGANIZATION_CONTEXT_FILE: &str = "organization_context.json";
pub const BATCH_EVALUATION_FILE: &str = "batch_evaluation_results.json";

/// Write `data` as pretty JSON to `path`, creating the output directory on
/// first use. Readers never see a half-written result file: the bytes land in
/// `<file>.tmp` first and replace `path` with a single rename.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, data: &T) -> io::Result<()> {
    let mut bytes = serde_json::to_vec_pretty(data).map_err(io::Error::other)?;
    bytes.push(b'\n');

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);
    fs::write(&staging, &bytes)?;
    fs::rename(&staging, path)
}

/// Read a result file. A missing file is `Ok(None)`; a file that is not
/// valid JSON for `T` is an `InvalidData` error.
pub fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> io::Result<Option<T>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// A run's output directory.
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    /// `evaluation_<name>.json` for a single-technology evaluation.
    pub fn evaluation_path(&self, technology_name: &str) -> PathBuf {
        let safe: String = technology_name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.root.join(format!("evaluation_{}.json", safe))
    }

    pub fn save<T: serde::Serialize>(&self, file: &str, data: &T) -> io::Result<PathBuf> {
        let path = self.path(file);
        atomic_write_json(&path, data)?;
        Ok(path)
    }

    pub fn load<T: serde::de::DeserializeOwned>(&self, file: &str) -> io::Result<Option<T>> {
        load_json(&self.path(file))
    }

    /// Technology names listed in `existing_technologies.json`.
    ///
    /// Accepts a list of strings or a list of objects with a `name` field.
    pub fn load_existing_technologies(&self) -> io::Result<Vec<String>> {
        let Some(value) = self.load::<serde_json::Value>(EXISTING_TECHNOLOGIES_FILE)? else {
            return Ok(Vec::new());
        };
        let items = value.as_array().cloned().unwrap_or_default();
        Ok(items
            .iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Object(obj) => obj
                    .get("name")
                    .and_then(|n| n.as_str())
                    .map(str::to_string),
                _ => None,
            })
            .collect())
    }

    pub fn load_organization_context(&self) -> io::Result<Option<OrganizationContext>> {
        self.load(ORGANIZATION_CONTEXT_FILE)
    }
}
