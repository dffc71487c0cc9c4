//! Input document discovery

use crate::error::InputError;
use std::path::{Path, PathBuf};

/// PDF files directly inside `folder`, sorted by file name
///
/// The extension match is case-insensitive; sub-directories are not walked.
///
/// # Errors
/// - [`InputError::EmptyPath`] for a blank path
/// - [`InputError::FolderNotFound`] / [`InputError::NotADirectory`]
/// - [`InputError::NoDocuments`] if no PDF is present
pub fn discover_documents(folder: &str) -> Result<Vec<PathBuf>, InputError> {
    if folder.trim().is_empty() {
        return Err(InputError::EmptyPath);
    }
    let dir = Path::new(folder.trim());
    if !dir.exists() {
        return Err(InputError::FolderNotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(InputError::NotADirectory(dir.to_path_buf()));
    }

    let unreadable = |source| InputError::Unreadable {
        path: dir.to_path_buf(),
        source,
    };
    let mut documents = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        if path.is_file() && is_pdf(&path) {
            documents.push(path);
        }
    }

    if documents.is_empty() {
        return Err(InputError::NoDocuments(dir.to_path_buf()));
    }
    documents.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(documents)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// File name of `path` as text, for logs and error messages
#[must_use]
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_pdfs_case_insensitively_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PDF", "a.pdf", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let found = discover_documents(dir.path().to_str().unwrap()).unwrap();
        let names: Vec<String> = found.iter().map(|p| display_name(p)).collect();
        assert_eq!(names, vec!["a.pdf", "b.PDF"]);
    }

    #[test]
    fn input_errors() {
        assert!(matches!(discover_documents("  "), Err(InputError::EmptyPath)));
        assert!(matches!(
            discover_documents("/definitely/not/here"),
            Err(InputError::FolderNotFound(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.md"), b"x").unwrap();
        assert!(matches!(
            discover_documents(dir.path().to_str().unwrap()),
            Err(InputError::NoDocuments(_))
        ));

        let file = dir.path().join("readme.md");
        assert!(matches!(
            discover_documents(file.to_str().unwrap()),
            Err(InputError::NotADirectory(_))
        ));
    }
}
