//! Filesystem document loader.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::document::Document;
use crate::error::{RagError, Result};

/// Load every UTF-8 file below `root` as a [`Document`], recursively.
///
/// Files are visited in sorted path order so repeated loads produce the same
/// sequence. The document ID is the path relative to `root` with `/`
/// separators; metadata carries `file_name` and `absolute_directory_path`.
/// Files that are not valid UTF-8 or hold only whitespace are skipped with a
/// warning.
///
/// # Errors
///
/// Returns [`RagError::DocumentLoad`] if `root` is not a readable directory
/// or a directory below it cannot be listed.
pub async fn load_documents(root: &Path) -> Result<Vec<Document>> {
    let meta = tokio::fs::metadata(root).await.map_err(|e| load_error(root, e))?;
    if !meta.is_dir() {
        return Err(RagError::DocumentLoad {
            path: root.display().to_string(),
            message: "not a directory".to_string(),
        });
    }

    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| load_error(&dir, e))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| load_error(&dir, e))? {
            let file_type = entry.file_type().await.map_err(|e| load_error(&entry.path(), e))?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
    }
    files.sort();

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };
        let Ok(text) = String::from_utf8(bytes) else {
            warn!(path = %path.display(), "skipping non UTF-8 file");
            continue;
        };
        if text.trim().is_empty() {
            warn!(path = %path.display(), "skipping blank file");
            continue;
        }
        documents.push(to_document(root, &path, text));
    }

    debug!(root = %root.display(), count = documents.len(), "loaded documents");
    Ok(documents)
}

fn to_document(root: &Path, path: &Path, text: String) -> Document {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let id = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    let mut metadata = HashMap::new();
    if let Some(name) = path.file_name() {
        metadata.insert("file_name".to_string(), name.to_string_lossy().into_owned());
    }
    let directory = path
        .parent()
        .map(|p| std::path::absolute(p).unwrap_or_else(|_| PathBuf::from(p)))
        .unwrap_or_default();
    metadata.insert("absolute_directory_path".to_string(), directory.display().to_string());

    Document { id, text, metadata, source_uri: Some(path.display().to_string()) }
}

fn load_error(path: &Path, e: std::io::Error) -> RagError {
    RagError::DocumentLoad { path: path.display().to_string(), message: e.to_string() }
}
