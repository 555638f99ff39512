use anyhow::{Context, Result};
use sow_core::document::SourceDocument;
use std::path::Path;

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Plain text, or an extraction record (JSON object) when `extracted` is set.
pub fn load_document(path: &Path, extracted: bool) -> Result<SourceDocument> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    if !extracted {
        return Ok(SourceDocument::from_text(display_name(path), raw));
    }
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("parse extraction {}", path.display()))?;
    anyhow::ensure!(
        value.is_object(),
        "extraction {} is not a JSON object",
        path.display()
    );
    let name = value
        .pointer("/metadata/filename")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| display_name(path));
    Ok(SourceDocument::from_extraction(name, value))
}

pub fn load_documents(paths: &[impl AsRef<Path>], extracted: bool) -> Result<Vec<SourceDocument>> {
    paths
        .iter()
        .map(|p| load_document(p.as_ref(), extracted))
        .collect()
}
