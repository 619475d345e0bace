use crate::domain::model::UploadedDataset;
use crate::utils::error::{Result, TopsisError};
use std::path::Path;

/// Reads only the header record of a decision matrix; data rows stay opaque.
#[derive(Debug, Clone, Copy)]
pub struct HeaderReader {
    delimiter: u8,
}

impl Default for HeaderReader {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl HeaderReader {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Loads `path` and derives its header.
    pub async fn load(&self, path: &Path) -> Result<UploadedDataset> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("dataset.csv")
            .to_string();

        tracing::debug!("Reading dataset header from {}", path.display());
        let bytes = tokio::fs::read(path).await?;
        self.from_bytes(name, bytes)
    }

    pub fn from_bytes(&self, name: String, bytes: Vec<u8>) -> Result<UploadedDataset> {
        let header = self.read_header(&name, &bytes)?;
        if header.len() < 2 {
            return Err(TopsisError::NoCriteria {
                name,
                columns: header.len(),
            });
        }

        let dataset = UploadedDataset {
            name,
            bytes,
            header,
        };
        tracing::info!(
            "Detected {} criteria in '{}'",
            dataset.criterion_count(),
            dataset.name
        );
        Ok(dataset)
    }

    fn read_header(&self, name: &str, bytes: &[u8]) -> Result<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .delimiter(self.delimiter)
            .from_reader(bytes);

        match reader.records().next() {
            Some(record) => Ok(record?.iter().map(str::to_string).collect()),
            None => Err(TopsisError::EmptyDataset {
                name: name.to_string(),
            }),
        }
    }
}
