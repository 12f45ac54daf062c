//! Markdown ingestion: directory walking and filename cleanup

use crate::error::IngestError;
use crate::types::{Document, DocumentMetadata};
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};
use walkdir::WalkDir;

const MARKDOWN_EXT: &str = "md";

/// Keep only ASCII letters, digits and `-_.() `
pub fn clean_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '(' | ')' | ' '))
        .collect()
}

fn is_markdown(path: &Path) -> bool {
    path.extension().map(|ext| ext == MARKDOWN_EXT).unwrap_or(false)
}

/// Rename directories and markdown files whose names contain unsafe
/// characters. Returns the number of renames.
///
/// Walks deepest entries first so a renamed directory never invalidates
/// paths still waiting to be visited.
pub fn sanitize_directory(root: &Path) -> Result<usize, IngestError> {
    if !root.is_dir() {
        return Err(IngestError::MissingRoot(root.to_path_buf()));
    }

    let mut renamed = 0;
    for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
        let entry = entry?;
        let path = entry.path();
        let is_dir = entry.file_type().is_dir();
        if !is_dir && !is_markdown(path) {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        let cleaned = clean_filename(&name);
        if cleaned == name || cleaned.is_empty() {
            continue;
        }

        let target = path.with_file_name(&cleaned);
        fs::rename(path, &target).map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Renamed {} -> {}", path.display(), target.display());
        renamed += 1;
    }

    info!("Sanitized {} names under {}", renamed, root.display());
    Ok(renamed)
}

/// Read every markdown file under `root` into a document.
///
/// Unreadable files are logged and skipped. Documents are sorted by
/// relative source path.
pub fn read_markdown_files(root: &Path) -> Result<Vec<Document>, IngestError> {
    if !root.is_dir() {
        return Err(IngestError::MissingRoot(root.to_path_buf()));
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_markdown(entry.path()) {
            continue;
        }

        let path = entry.path();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                error!("Error reading file {}: {}", path.display(), e);
                continue;
            }
        };

        let source = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        let folder = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        documents.push(Document {
            text,
            metadata: DocumentMetadata {
                source,
                filename: entry.file_name().to_string_lossy().to_string(),
                folder,
            },
        });
    }

    documents.sort_by(|a, b| a.metadata.source.cmp(&b.metadata.source));
    info!("Loaded {} markdown documents from {}", documents.len(), root.display());

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_clean_filename() {
        assert_eq!(clean_filename("notes (v2).md"), "notes (v2).md");
        assert_eq!(clean_filename("réunion#1?.md"), "runion1.md");
        assert_eq!(clean_filename("a/b\\c.md"), "abc.md");
    }

    #[test]
    fn test_read_markdown_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("guides")).unwrap();
        fs::write(root.join("b.md"), "Grass is green").unwrap();
        fs::write(root.join("guides/a.md"), "The sky is blue").unwrap();
        fs::write(root.join("skip.txt"), "not markdown").unwrap();

        let docs = read_markdown_files(root).unwrap();
        assert_eq!(docs.len(), 2);

        assert_eq!(docs[0].metadata.source, PathBuf::from("b.md"));
        assert_eq!(docs[1].metadata.source, PathBuf::from("guides/a.md"));
        assert_eq!(docs[1].metadata.filename, "a.md");
        assert_eq!(docs[1].metadata.folder, "guides");
        assert_eq!(docs[1].text, "The sky is blue");
    }

    #[test]
    fn test_missing_root() {
        let err = read_markdown_files(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, IngestError::MissingRoot(_)));
    }

    #[test]
    fn test_sanitize_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("my#notes")).unwrap();
        fs::write(root.join("my#notes/to?do.md"), "x").unwrap();
        fs::write(root.join("keep?.txt"), "y").unwrap();

        let renamed = sanitize_directory(root).unwrap();
        assert_eq!(renamed, 2);
        assert!(root.join("mynotes/todo.md").exists());
        assert!(root.join("keep?.txt").exists());
    }
}
