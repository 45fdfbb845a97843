use anyhow::{Context, Result};
use log::{debug, warn};
use lore_vector_store::{Document, DocumentMetadata};
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// File extensions loaded as documents
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["md", "txt"];

/// Load every supported file under `root`, one document per file.
///
/// Hidden files and directories are skipped, as are files that are empty
/// or not valid UTF-8. Documents come back in path order.
pub fn load_documents(root: &Path) -> Result<Vec<Document>> {
    let mut documents = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        let path = entry.path();

        if !entry.file_type().is_file() || !is_supported_file(path) {
            continue;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!("Skipping {}: {err}", path.display());
                continue;
            }
        };
        if content.trim().is_empty() {
            debug!("Skipping empty file {}", path.display());
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let metadata = DocumentMetadata {
            source: Some(path.display().to_string()),
            relative_path: Some(relative.display().to_string()),
            file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            file_type: path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase())),
            folder: path
                .parent()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned()),
            ..Default::default()
        };

        documents.push(Document::with_metadata(content, metadata));
    }

    Ok(documents)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn is_supported_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}
