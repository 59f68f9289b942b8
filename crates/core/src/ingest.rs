use crate::error::{IngestError, Result};
use crate::models::SourceDocument;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Recursively lists `.pdf` files (any case) under `folder`.
///
/// Unreadable entries are skipped, so a broken subdirectory contributes no
/// files instead of failing the walk.
pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder).into_iter() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!(folder = %folder.display(), %error, "skipping unreadable entry");
                continue;
            }
        };

        if entry.file_type().is_file() && is_pdf(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Infers curriculum metadata from where `file` sits under `root`.
///
/// The first segment is the niveau, the second (when the file is not directly
/// inside the niveau folder) the matiere, and the file stem the cours.
pub fn parse_metadata(root: &Path, file: &Path) -> Result<SourceDocument> {
    let relative = file.strip_prefix(root).map_err(|_| {
        IngestError::InvalidArgument(format!(
            "{} is not under {}",
            file.display(),
            root.display()
        ))
    })?;

    let segments = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>();

    let cours = file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .ok_or_else(|| IngestError::MissingFileName(file.display().to_string()))?;

    let (niveau, matiere) = match segments.as_slice() {
        [niveau, matiere, _, ..] => (niveau.clone(), matiere.clone()),
        [niveau, _] => (niveau.clone(), niveau.clone()),
        _ => {
            return Err(IngestError::InvalidArgument(format!(
                "{} must sit inside a niveau folder",
                relative.display()
            )))
        }
    };

    Ok(SourceDocument {
        absolute_path: file.to_path_buf(),
        relative_path: segments.join("/"),
        niveau,
        matiere,
        cours,
    })
}

fn list_dir(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => {
            let mut paths = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .collect::<Vec<_>>();
            paths.sort_unstable();
            paths
        }
        Err(error) => {
            warn!(dir = %dir.display(), %error, "cannot list directory, treating as empty");
            Vec::new()
        }
    }
}

/// Enumerates `root/<niveau>/*.pdf` and `root/<niveau>/<matiere>/**/*.pdf`.
///
/// Loose files at the root are ignored, as are niveau folders holding neither
/// PDFs nor subfolders.
pub fn discover_documents(root: &Path) -> Result<Vec<SourceDocument>> {
    if !root.is_dir() {
        return Err(IngestError::RootNotFound(root.to_path_buf()));
    }

    let mut documents = Vec::new();

    for niveau_dir in list_dir(root).into_iter().filter(|path| path.is_dir()) {
        let entries = list_dir(&niveau_dir);
        let direct_pdfs = entries
            .iter()
            .filter(|path| path.is_file() && is_pdf(path))
            .collect::<Vec<_>>();
        let matiere_dirs = entries
            .iter()
            .filter(|path| path.is_dir())
            .collect::<Vec<_>>();

        if direct_pdfs.is_empty() && matiere_dirs.is_empty() {
            info!(niveau = %niveau_dir.display(), "no pdfs or subject folders, skipping");
            continue;
        }

        for pdf in direct_pdfs {
            documents.push(parse_metadata(root, pdf)?);
        }

        for matiere_dir in matiere_dirs {
            for pdf in discover_pdf_files(matiere_dir) {
                documents.push(parse_metadata(root, &pdf)?);
            }
        }
    }

    Ok(documents)
}
