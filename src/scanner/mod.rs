//! Directory import into the local media index.

pub mod discovery;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::Path;
use std::sync::mpsc;

use crate::config::ScannerConfig;
use crate::index::{NewMedia, SqliteMediaIndex};
use crate::models::MediaType;

pub use discovery::discover_media;

#[derive(Debug, Clone)]
pub enum ScanProgress {
    Started { total_files: usize },
    Scanning { current: usize, total: usize, path: String },
    Completed { scanned: usize, new: usize, updated: usize, removed: usize },
    Error { message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub total_found: usize,
    pub scanned: usize,
    pub new: usize,
    pub updated: usize,
    /// Indexed files under the directory that no longer exist on disk.
    pub removed: usize,
}

pub struct Scanner {
    config: ScannerConfig,
}

impl Scanner {
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Index every image and video under `directory`.
    ///
    /// Files already indexed keep their id and `date_added`; their other
    /// metadata is refreshed. Rows under `directory` whose file is gone are
    /// removed from the index.
    pub fn scan_directory(
        &self,
        directory: &Path,
        index: &SqliteMediaIndex,
        progress_tx: Option<mpsc::Sender<ScanProgress>>,
    ) -> Result<ScanResult> {
        let files = discover_media(directory, &self.config)
            .with_context(|| format!("Failed to walk {}", directory.display()))?;

        let total = files.len();
        tracing::info!(directory = %directory.display(), total, "Scanning directory");
        if let Some(ref tx) = progress_tx {
            let _ = tx.send(ScanProgress::Started { total_files: total });
        }

        let mut result = ScanResult {
            total_found: total,
            ..ScanResult::default()
        };

        for (position, (path, media_type)) in files.iter().enumerate() {
            if let Some(ref tx) = progress_tx {
                let _ = tx.send(ScanProgress::Scanning {
                    current: position + 1,
                    total,
                    path: path.to_string_lossy().to_string(),
                });
            }

            let scanned = describe(path, *media_type).and_then(|media| {
                let exists = index.contains_path(&media.path)?;
                index.insert(&media)?;
                Ok(exists)
            });

            match scanned {
                Ok(exists) => {
                    if exists {
                        result.updated += 1;
                    } else {
                        result.new += 1;
                    }
                    result.scanned += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to index file");
                    if let Some(ref tx) = progress_tx {
                        let _ = tx.send(ScanProgress::Error {
                            message: format!("Error scanning {}: {}", path.display(), e),
                        });
                    }
                }
            }
        }

        let present: HashSet<String> = files
            .iter()
            .map(|(path, _)| path.to_string_lossy().to_string())
            .collect();
        result.removed = index
            .remove_missing(directory, &present)
            .with_context(|| format!("Failed to prune {}", directory.display()))?;

        if let Some(ref tx) = progress_tx {
            let _ = tx.send(ScanProgress::Completed {
                scanned: result.scanned,
                new: result.new,
                updated: result.updated,
                removed: result.removed,
            });
        }
        tracing::info!(
            scanned = result.scanned,
            new = result.new,
            updated = result.updated,
            removed = result.removed,
            "Scan complete"
        );

        Ok(result)
    }
}

fn describe(path: &Path, media_type: MediaType) -> Result<NewMedia> {
    let metadata = std::fs::metadata(path)?;
    let modified: DateTime<Utc> = metadata.modified()?.into();

    let mime_type = mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| match media_type {
            MediaType::Image => "image/*".to_string(),
            MediaType::Video => "video/*".to_string(),
        });
    let bucket_display_name = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string());

    Ok(NewMedia {
        path: path.to_string_lossy().to_string(),
        bucket_display_name,
        media_type,
        mime_type,
        date_added: Utc::now().timestamp(),
        date_modified: modified.timestamp(),
        orientation: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{MediaIndex, QueryArgs};
    use crate::models::ContentUri;
    use crate::query::columns;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn test_scan_directory_indexes_and_rescans() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("Camera")).unwrap();
        File::create(dir.path().join("Camera/a.jpg")).unwrap();
        File::create(dir.path().join("Camera/b.mp4")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();

        let index = SqliteMediaIndex::open_in_memory(true).unwrap();
        let scanner = Scanner::new(ScannerConfig::default());
        let (tx, rx) = mpsc::channel();

        let first = scanner.scan_directory(dir.path(), &index, Some(tx)).unwrap();
        assert_eq!(
            first,
            ScanResult {
                total_found: 2,
                scanned: 2,
                new: 2,
                updated: 0,
                removed: 0
            }
        );
        let events: Vec<_> = rx.try_iter().collect();
        assert!(matches!(events.first(), Some(ScanProgress::Started { total_files: 2 })));
        assert!(matches!(events.last(), Some(ScanProgress::Completed { new: 2, .. })));

        let second = scanner.scan_directory(dir.path(), &index, None).unwrap();
        assert_eq!(second.updated, 2);
        assert_eq!(index.count().unwrap(), 2);

        let args = QueryArgs {
            projection: columns::ALBUMS_PROJECTION,
            ..QueryArgs::default()
        };
        let rows = index.query(&ContentUri::FILES, &args).unwrap().unwrap();
        let name = rows.column_index(columns::BUCKET_DISPLAY_NAME).unwrap();
        let mime = rows.column_index(columns::MIME_TYPE).unwrap();
        for row in rows.rows() {
            assert_eq!(row[name].as_str(), Some("Camera"));
        }
        let mimes: Vec<_> = rows.rows().filter_map(|r| r[mime].as_str()).collect();
        assert!(mimes.contains(&"image/jpeg"));
        assert!(mimes.contains(&"video/mp4"));
    }

    #[test]
    fn test_rescan_drops_files_deleted_on_disk() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("a.jpg")).unwrap();
        File::create(dir.path().join("b.jpg")).unwrap();

        let index = SqliteMediaIndex::open_in_memory(true).unwrap();
        let scanner = Scanner::new(ScannerConfig::default());
        assert_eq!(scanner.scan_directory(dir.path(), &index, None).unwrap().new, 2);

        fs::remove_file(dir.path().join("b.jpg")).unwrap();
        let rescan = scanner.scan_directory(dir.path(), &index, None).unwrap();
        assert_eq!(rescan.removed, 1);
        assert_eq!(rescan.updated, 1);
        assert_eq!(index.count().unwrap(), 1);
        let kept = dir.path().join("a.jpg");
        assert!(index.contains_path(&kept.to_string_lossy()).unwrap());
    }
}
