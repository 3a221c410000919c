//! Workspace and approach directory management (`§6` on-disk layout).
//!
//! A workspace is `<workspace_root>/approaches/<approach_folder>/`, holding
//! `hypergraph.json`, an append-only `history/`, a `simulations/` directory
//! the agent writes and cites, a `references/` directory for literature
//! artifacts, and a `conversations/<session>.json` per chat session.

use crate::error::{OrchestratorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Per-approach metadata that lives outside `hypergraph.json` itself:
/// display name and the immutable original-hypothesis text (`§6`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproachDescriptor {
    pub folder: String,
    pub display_name: String,
    pub original_hypothesis: String,
}

/// Resolved on-disk paths for one approach, rooted at `<workspace>/approaches/<folder>/`.
#[derive(Debug, Clone)]
pub struct ApproachPaths {
    root: PathBuf,
}

impl ApproachPaths {
    fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn hypergraph_json(&self) -> PathBuf {
        self.root.join("hypergraph.json")
    }

    pub fn history_dir(&self) -> PathBuf {
        self.root.join("history")
    }

    pub fn simulations_dir(&self) -> PathBuf {
        self.root.join("simulations")
    }

    pub fn references_dir(&self) -> PathBuf {
        self.root.join("references")
    }

    pub fn conversations_dir(&self) -> PathBuf {
        self.root.join("conversations")
    }

    pub fn conversation_log(&self, session_id: &str) -> PathBuf {
        self.conversations_dir().join(format!("{session_id}.json"))
    }

    pub fn descriptor_json(&self) -> PathBuf {
        self.root.join("approach.json")
    }
}

/// Owns the workspace root and resolves/creates approach directories under it.
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn approaches_dir(&self) -> PathBuf {
        self.root.join("approaches")
    }

    /// Reject folder names that could escape the workspace root or collide
    /// with the id grammar's reserved characters; approach folders are a
    /// filesystem-facing identifier, not free text.
    fn validate_folder_name(folder: &str) -> Result<()> {
        let valid = !folder.is_empty()
            && folder
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            && folder != "."
            && folder != "..";
        if valid {
            Ok(())
        } else {
            Err(OrchestratorError::UnknownApproach(folder.to_string()))
        }
    }

    /// Resolve the paths for an existing approach without touching disk
    /// beyond the validation above.
    pub fn paths(&self, folder: &str) -> Result<ApproachPaths> {
        Self::validate_folder_name(folder)?;
        Ok(ApproachPaths::new(self.approaches_dir().join(folder)))
    }

    /// List approach folder names currently present on disk.
    pub fn list_approaches(&self) -> Result<Vec<String>> {
        let dir = self.approaches_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Create a new approach directory tree and persist its descriptor.
    /// Idempotent on the directory structure, but fails if a descriptor
    /// already exists, so callers cannot silently overwrite another
    /// approach's immutable hypothesis text.
    pub fn create_approach(&self, descriptor: ApproachDescriptor) -> Result<ApproachPaths> {
        Self::validate_folder_name(&descriptor.folder)?;
        let paths = ApproachPaths::new(self.approaches_dir().join(&descriptor.folder));
        if paths.descriptor_json().exists() {
            return Err(OrchestratorError::Config(format!(
                "approach '{}' already exists",
                descriptor.folder
            )));
        }
        std::fs::create_dir_all(paths.root())?;
        std::fs::create_dir_all(paths.history_dir())?;
        std::fs::create_dir_all(paths.simulations_dir())?;
        std::fs::create_dir_all(paths.references_dir())?;
        std::fs::create_dir_all(paths.conversations_dir())?;
        let json = serde_json::to_vec_pretty(&descriptor)?;
        std::fs::write(paths.descriptor_json(), json)?;
        tracing::info!(folder = %descriptor.folder, "created approach");
        Ok(paths)
    }

    pub fn load_descriptor(&self, folder: &str) -> Result<ApproachDescriptor> {
        let paths = self.paths(folder)?;
        let path = paths.descriptor_json();
        if !path.exists() {
            return Err(OrchestratorError::UnknownApproach(folder.to_string()));
        }
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
