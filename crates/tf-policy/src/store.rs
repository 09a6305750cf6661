// store.rs — Loads the policy document once per run.
//
// Three outcomes:
// - file missing or unreadable → empty policy, warning logged, run goes on
//   allowing everything (the one fail-open path)
// - file present but not a valid policy → PolicyLoadError, fatal
// - file present and valid → populated policy
//
// The policy location is a compiled-in constant, never read from the
// environment or from orchestration config. Tests pass an explicit path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::document::{DocumentError, PolicyDocument};
use crate::error::PolicyLoadError;

/// Where the firewall policy lives unless a caller passes another path.
pub const DEFAULT_POLICY_PATH: &str = "/etc/task-firewall/policy.yml";

/// Where the loaded document came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySource {
    /// Parsed from this file.
    File(PathBuf),
    /// The file could not be read; the empty policy is in effect.
    Absent(PathBuf),
    /// Built in memory by the caller.
    Inline,
}

impl PolicySource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            PolicySource::File(p) | PolicySource::Absent(p) => Some(p),
            PolicySource::Inline => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, PolicySource::Absent(_))
    }
}

/// Owns the policy document for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct PolicyStore {
    document: PolicyDocument,
    source: PolicySource,
}

impl PolicyStore {
    /// Load from [`DEFAULT_POLICY_PATH`].
    pub fn load_default() -> Result<Self, PolicyLoadError> {
        Self::load(DEFAULT_POLICY_PATH)
    }

    /// Load the policy at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PolicyLoadError> {
        let path = path.as_ref().to_path_buf();

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(
                    "{} {}, no firewall policy will be applied",
                    path.display(),
                    describe_io(&e)
                );
                return Ok(Self {
                    document: PolicyDocument::empty(),
                    source: PolicySource::Absent(path),
                });
            }
        };

        let document = match PolicyDocument::from_yaml_str(&content) {
            Ok(document) => document,
            Err(DocumentError::Syntax(source)) => {
                tracing::warn!("{} badly formatted", path.display());
                return Err(PolicyLoadError::Syntax { path, source });
            }
            Err(DocumentError::Schema(schema)) => {
                tracing::warn!("{} badly formatted", path.display());
                return Err(PolicyLoadError::Malformed {
                    path,
                    reason: schema.to_string(),
                });
            }
        };

        if document.is_empty() {
            tracing::warn!(
                "{} contains no rules, every action will be allowed",
                path.display()
            );
        } else {
            tracing::debug!(
                operations = document.len(),
                matchers = document.matcher_count(),
                "firewall policy loaded: {}",
                path.display()
            );
        }

        Ok(Self {
            document,
            source: PolicySource::File(path),
        })
    }

    /// Wrap an already-built document (no file involved).
    pub fn from_document(document: PolicyDocument) -> Self {
        Self {
            document,
            source: PolicySource::Inline,
        }
    }

    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }

    pub fn source(&self) -> &PolicySource {
        &self.source
    }
}

fn describe_io(e: &io::Error) -> &'static str {
    match e.kind() {
        io::ErrorKind::NotFound => "missing",
        io::ErrorKind::PermissionDenied => "not readable",
        _ => "unavailable",
    }
}
