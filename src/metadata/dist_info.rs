//! Core metadata file parser (`METADATA` / `PKG-INFO`)
//!
//! The files use RFC 822 style headers:
//!
//! ```text
//! Metadata-Version: 2.1
//! Name: pandas
//! Version: 2.1.0
//! Requires-Dist: numpy>=1.22.4
//! Provides-Extra: test
//! Requires-Dist: pytest>=7.3.2 ; extra == "test"
//!
//! Long description body...
//! ```
//!
//! Headers end at the first blank line. Lines starting with whitespace
//! continue the previous header.

use super::DistributionMetadata;
use crate::error::MetadataError;
use std::path::Path;

/// Read and parse a metadata file
pub fn read_metadata(path: &Path) -> Result<DistributionMetadata, MetadataError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| MetadataError::read_error(path, e))?;
    parse_metadata(path, &content)
}

/// Parse metadata file content; `path` is only used in error messages
pub fn parse_metadata(path: &Path, content: &str) -> Result<DistributionMetadata, MetadataError> {
    let mut name = None;
    let mut version = None;
    let mut requires_dist = Vec::new();
    let mut provides_extra = Vec::new();

    for (key, value) in headers(content) {
        match key.to_ascii_lowercase().as_str() {
            "name" => name = Some(value),
            "version" => version = Some(value),
            "requires-dist" => requires_dist.push(value),
            "provides-extra" => provides_extra.push(value),
            _ => {}
        }
    }

    let missing = |header: &str| MetadataError::MissingHeader {
        path: path.to_path_buf(),
        header: header.to_string(),
    };
    Ok(DistributionMetadata {
        name: name.ok_or_else(|| missing("Name"))?,
        version: version.ok_or_else(|| missing("Version"))?,
        requires_dist,
        provides_extra,
    })
}

fn headers(content: &str) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            break;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.push((key.trim().to_string(), value.trim().to_string()));
        }
    }
    headers
}
