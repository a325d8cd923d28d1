use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::warn;

use crate::chunk::Document;

/// Document source boundary: plain text plus originating path. Parsing of
/// richer formats happens upstream of this crate.
pub struct FileReader;

impl FileReader {
    pub async fn read_file(path: &Path) -> Result<Document> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "txt" | "md" => {
                let content = fs::read_to_string(path)
                    .await
                    .context(format!("Failed to read file: {:?}", path))?;
                Ok(Document::new(content, path.to_string_lossy().to_string()))
            }
            _ => anyhow::bail!("Unsupported file format: {}", extension),
        }
    }

    /// Read a list of files. A file that cannot be read is reported and
    /// skipped; it never fails the batch.
    pub async fn read_paths(paths: &[std::path::PathBuf]) -> Vec<Document> {
        let mut documents = Vec::new();

        for path in paths {
            match Self::read_file(path).await {
                Ok(doc) => documents.push(doc),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable document");
                }
            }
        }

        documents
    }

    pub async fn read_directory(dir: &Path) -> Result<Vec<Document>> {
        let mut paths = Vec::new();

        let mut entries = fs::read_dir(dir)
            .await
            .context(format!("Failed to read directory: {:?}", dir))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext == "txt" || ext == "md" {
                        paths.push(path);
                    }
                }
            }
        }

        paths.sort();
        Ok(Self::read_paths(&paths).await)
    }
}
