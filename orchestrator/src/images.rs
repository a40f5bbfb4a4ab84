use std::path::{Path, PathBuf};
use path_clean::PathClean;
use walkdir::WalkDir;
use crate::error::{OrchestratorError, Result};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Images directly inside `dir`, sorted by path. Subdirectories are skipped;
/// the tool writes its own output images into them.
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let root = dir.clean();
    if !root.is_dir() {
        return Err(OrchestratorError::NotADirectory(root));
    }

    let mut images = vec![];
    for entry in WalkDir::new(&root).min_depth(1).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file() && is_image(entry.path()) {
            images.push(entry.into_path());
        }
    }
    images.sort();
    Ok(images)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
