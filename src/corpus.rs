//! Seed file loading
//!
//! A seed file is either a JSON array of documents or JSON Lines with one
//! document per line. Each document is an object with `url`, `title` and
//! `content` strings.

use crate::error::{QuarryError, Result};
use crate::segment::Document;
use std::path::Path;

/// Read every document of a seed file
pub fn read_documents(path: &Path) -> Result<Vec<Document>> {
    let content = std::fs::read_to_string(path).map_err(|e| QuarryError::Io {
        source: e,
        context: format!("Failed to read seed file: {:?}", path),
    })?;

    parse_documents(&content)
}

/// Parse seed file content, detecting the format from the first
/// non-whitespace character
pub fn parse_documents(content: &str) -> Result<Vec<Document>> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|e| QuarryError::Json {
            source: e,
            context: "Failed to parse seed file as a JSON array".to_string(),
        });
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| QuarryError::Json {
                source: e,
                context: format!("Failed to parse seed file line {}", i + 1),
            })
        })
        .collect()
}
