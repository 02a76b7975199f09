//! Fetches the plantation export from a published spreadsheet.
//!
//! Wraps the sheet's CSV export endpoint using [`reqwest`], parses the body
//! into a [`RecordTable`] and snapshots the raw export to disk so the
//! validator can be rerun offline.

use std::path::Path;
use std::time::Duration;

use f4f_core::error::CoreError;
use f4f_core::persist;
use f4f_core::schema::Schema;
use f4f_core::table::RecordTable;

/// Public spreadsheet host prefix.
pub const DEFAULT_BASE_URL: &str = "https://docs.google.com/spreadsheets/d/";

/// The programme's published field sheet.
pub const DEFAULT_SHEET_ID: &str = "1P2M9_wVO5rcy4Hp8CNyKwJXs4Dwi-roea8TbmnCcU1A";

/// Path suffix selecting the CSV export of the first worksheet.
pub const CSV_EXPORT_SUFFIX: &str = "/gviz/tq?tqx=out:csv";

/// Errors from the ingestion step. The validator is never invoked after one.
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The export endpoint returned a non-2xx status code.
    #[error("Sheet export error ({status}): {body}")]
    Status { status: u16, body: String },

    /// The body was not a readable table.
    #[error("Sheet export is not a valid table: {0}")]
    Parse(#[source] CoreError),

    /// The raw export could not be saved.
    #[error("Failed to snapshot sheet export: {0}")]
    Snapshot(#[source] CoreError),
}

/// Location of a published spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSource {
    pub base_url: String,
    pub sheet_id: String,
}

impl Default for SheetSource {
    fn default() -> Self {
        Self::new(DEFAULT_SHEET_ID)
    }
}

impl SheetSource {
    pub fn new(sheet_id: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            sheet_id: sheet_id.into(),
        }
    }

    /// Full URL of the CSV export.
    pub fn export_url(&self) -> String {
        format!("{}{}{}", self.base_url, self.sheet_id, CSV_EXPORT_SUFFIX)
    }
}

/// Parse an export body and save it verbatim to `snapshot`.
pub fn ingest_body(body: &str, schema: &Schema, snapshot: &Path) -> Result<RecordTable, IngestionError> {
    let table = RecordTable::from_reader(body.as_bytes(), schema).map_err(IngestionError::Parse)?;
    persist::write_atomic(snapshot, body.as_bytes()).map_err(IngestionError::Snapshot)?;
    Ok(table)
}

/// HTTP client for one spreadsheet export.
pub struct SheetClient {
    client: reqwest::Client,
    source: SheetSource,
}

impl SheetClient {
    pub fn new(source: SheetSource, timeout: Duration) -> Result<Self, IngestionError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, source })
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, source: SheetSource) -> Self {
        Self { client, source }
    }

    pub fn source(&self) -> &SheetSource {
        &self.source
    }

    /// Download the raw CSV export.
    pub async fn fetch_csv(&self) -> Result<String, IngestionError> {
        let url = self.source.export_url();
        tracing::info!(url = %url, "Fetching data from sheet export");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestionError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.text().await?)
    }

    /// Download, parse and snapshot the export.
    pub async fn fetch_table(&self, schema: &Schema, snapshot: &Path) -> Result<RecordTable, IngestionError> {
        let body = self.fetch_csv().await?;
        let table = ingest_body(&body, schema, snapshot)?;
        tracing::info!(
            rows = table.len(),
            snapshot = %snapshot.display(),
            "Data fetched successfully",
        );
        Ok(table)
    }
}
