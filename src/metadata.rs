//! Flattens state outputs into files pipeline steps can read.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ResourceError;
use crate::request::{MetadataField, OutputLayout};
use crate::terraform::{STATE_FILE_NAME, TerraformState};

/// Name of the combined metadata document.
pub const METADATA_FILE_NAME: &str = "metadata";

const SENSITIVE_PLACEHOLDER: &str = "<sensitive>";

/// Names already taken in the destination directory.
const RESERVED_NAMES: &[&str] = &[METADATA_FILE_NAME, STATE_FILE_NAME];

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataEntry {
    pub name: String,
    pub value: String,
    pub sensitive: bool,
}

/// One entry per top-level output, sorted by name.
pub fn extract(state: &TerraformState) -> Vec<MetadataEntry> {
    state
        .outputs
        .iter()
        .map(|(name, output)| MetadataEntry {
            name: name.clone(),
            value: output.value.render(),
            sensitive: output.sensitive,
        })
        .collect()
}

pub fn validate_output_name(name: &str) -> Result<(), ResourceError> {
    let unsafe_name = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
        || RESERVED_NAMES.contains(&name);
    if unsafe_name {
        return Err(ResourceError::UnsafeOutputName(name.to_string()));
    }
    Ok(())
}

/// Writes `entries` into `dir` and returns the paths written.
pub async fn write(
    dir: &Path,
    entries: &[MetadataEntry],
    layout: OutputLayout,
) -> Result<Vec<PathBuf>, ResourceError> {
    match layout {
        OutputLayout::Combined => {
            let document: BTreeMap<&str, &str> = entries
                .iter()
                .map(|e| (e.name.as_str(), e.value.as_str()))
                .collect();
            let bytes = serde_json::to_vec_pretty(&document)?;
            let path = dir.join(METADATA_FILE_NAME);
            tokio::fs::write(&path, bytes).await?;
            Ok(vec![path])
        }
        OutputLayout::PerKey => {
            for entry in entries {
                validate_output_name(&entry.name)?;
            }
            let mut written = Vec::with_capacity(entries.len());
            for entry in entries {
                let path = dir.join(&entry.name);
                tokio::fs::write(&path, entry.value.as_bytes()).await?;
                written.push(path);
            }
            Ok(written)
        }
    }
}

/// Fields shown in the pipeline UI; sensitive values are masked.
pub fn response_fields(entries: &[MetadataEntry]) -> Vec<MetadataField> {
    entries
        .iter()
        .map(|e| MetadataField {
            name: e.name.clone(),
            value: if e.sensitive {
                SENSITIVE_PLACEHOLDER.to_string()
            } else {
                e.value.clone()
            },
        })
        .collect()
}
