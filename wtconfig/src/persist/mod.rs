//! Committing configuration sets and rules text to disk.
//!
//! Files are written atomically (temp file in the same directory, then
//! rename) and re-validated on every load; a file on disk is never trusted
//! just because this process wrote it.

use crate::error::{PipelineError, PipelineResult};
use crate::generator::sha256_hex;
use crate::schema::{ConfigurationSet, EntityKind};
use crate::validation::{ValidationReport, Validator, Verdict, Violation, ViolationKind};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Location of a committed configuration and the digest it was written with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigHandle {
    pub path: PathBuf,
    /// SHA-256 of the committed bytes; `None` for files this process did not write.
    pub sha256: Option<String>,
}

impl ConfigHandle {
    pub fn unverified(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sha256: None,
        }
    }
}

pub trait Persister: Send + Sync {
    fn save(&self, set: &ConfigurationSet) -> PipelineResult<ConfigHandle>;

    fn load(&self, handle: &ConfigHandle) -> PipelineResult<ConfigurationSet>;
}

/// Writes one configuration document per path.
#[derive(Debug, Clone)]
pub struct FilePersister {
    path: PathBuf,
    validator: Validator,
}

impl FilePersister {
    pub fn new(path: impl Into<PathBuf>, validator: Validator) -> Self {
        Self {
            path: path.into(),
            validator,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Canonical bytes: lists in scope only, 4-space pretty JSON.
    pub fn encode(&self, set: &ConfigurationSet) -> PipelineResult<Vec<u8>> {
        let document = set.to_document(self.validator.scope())?;
        let mut bytes = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut bytes, PrettyFormatter::with_indent(b"    "));
        document.serialize(&mut serializer)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Load and validate any configuration file.
    pub fn load_path(&self, path: &Path) -> PipelineResult<ConfigurationSet> {
        self.load(&ConfigHandle::unverified(path))
    }
}

impl Persister for FilePersister {
    fn save(&self, set: &ConfigurationSet) -> PipelineResult<ConfigHandle> {
        let scope = self.validator.scope();
        let dropped: Vec<EntityKind> = set.out_of_scope(scope);
        if !dropped.is_empty() {
            warn!(
                "dropping out-of-scope list(s) on save: {}",
                dropped.iter().map(|k| k.list_key()).collect::<Vec<_>>().join(", ")
            );
        }
        let committed = set.restricted_to(scope);
        let report = self.validator.validate(&committed)?;
        if !report.is_valid() {
            return Err(PipelineError::Validation(report));
        }
        let bytes = self.encode(&committed)?;
        write_atomic(&self.path, &bytes)?;
        let sha256 = sha256_hex(&bytes);
        info!("committed configuration to {} (sha256 {})", self.path.display(), sha256);
        Ok(ConfigHandle {
            path: self.path.clone(),
            sha256: Some(sha256),
        })
    }

    fn load(&self, handle: &ConfigHandle) -> PipelineResult<ConfigurationSet> {
        let bytes = fs::read(&handle.path).map_err(|e| PipelineError::persistence(&handle.path, e))?;
        if let Some(expected) = &handle.sha256 {
            let actual = sha256_hex(&bytes);
            if &actual != expected {
                warn!(
                    "{} changed since it was committed (sha256 {} != {}); re-validating",
                    handle.path.display(),
                    actual,
                    expected
                );
            }
        }

        let value: serde_json::Value = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => {
                let mut report = ValidationReport::valid();
                report.push(Violation::new(
                    EntityKind::Aggregate,
                    None,
                    "",
                    ViolationKind::Malformed,
                    format!("{}: {}", handle.path.display(), e),
                ));
                return Err(PipelineError::Validation(report));
            }
        };
        match self.validator.validate_json(&value)? {
            Verdict::Valid(set) => {
                debug!("loaded valid configuration from {}", handle.path.display());
                Ok(set)
            }
            Verdict::ShapeInvalid(report) => Err(PipelineError::Validation(report.into())),
            Verdict::Invalid(report) => Err(PipelineError::Validation(report)),
        }
    }
}

/// Write `data` to `path` through a temp file in the same directory.
pub fn write_atomic(path: &Path, data: &[u8]) -> PipelineResult<()> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| PipelineError::persistence(&dir, e))?;
    let tmp = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
    let written = (|| -> std::io::Result<()> {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(data)?;
        f.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(PipelineError::persistence(path, e));
    }
    Ok(())
}

pub fn save_rules(path: &Path, rules: &str) -> PipelineResult<()> {
    let mut text = rules.trim_end().to_string();
    text.push('\n');
    write_atomic(path, text.as_bytes())?;
    debug!("wrote {} bytes of rules to {}", text.len(), path.display());
    Ok(())
}

pub fn load_rules(path: &Path) -> PipelineResult<String> {
    fs::read_to_string(path).map_err(|e| PipelineError::persistence(path, e))
}
