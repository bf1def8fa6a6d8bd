//! Candidate object type lists.
//!
//! Two plain-text files name the interactable and receptacle object types,
//! one per line. They are read once when the controller is built.

use std::path::Path;

use crate::error::{EpisodeError, EpisodeResult};

/// Read one type name per line, trimming whitespace and skipping blank lines.
pub fn load_object_types(path: &Path) -> EpisodeResult<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|source| EpisodeError::Dataset {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Interactable types followed by receptacle types. Either list may be absent.
pub fn load_catalog(
    interactable: Option<&Path>,
    receptacle: Option<&Path>,
) -> EpisodeResult<Vec<String>> {
    let mut objects = Vec::new();
    for path in [interactable, receptacle].into_iter().flatten() {
        let types = load_object_types(path)?;
        tracing::debug!(path = %path.display(), count = types.len(), "loaded object types");
        objects.extend(types);
    }
    Ok(objects)
}
