use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ScannerConfig;
use crate::models::MediaType;

/// Find image and video files under `directory`, classified by extension.
pub fn discover_media(directory: &Path, config: &ScannerConfig) -> Result<Vec<(PathBuf, MediaType)>> {
    let mut media = Vec::new();

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(media_type) = classify(path, config) {
            media.push((path.to_path_buf(), media_type));
        }
    }

    // Sort by path for consistent ordering
    media.sort();

    Ok(media)
}

fn classify(path: &Path, config: &ScannerConfig) -> Option<MediaType> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    let matches = |list: &[String]| list.iter().any(|e| e.to_lowercase() == ext);

    if matches(&config.image_extensions) {
        Some(MediaType::Image)
    } else if matches(&config.video_extensions) {
        Some(MediaType::Video)
    } else {
        None
    }
}
