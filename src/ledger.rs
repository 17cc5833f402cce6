//! Job ledger: one row per resolution, persisted in SQLite.
//!
//! A single ISBN lookup writes one `isbn` job. An ISBN list file writes an
//! `isbn_list` parent job followed by one `list_isbn` child per line, linked
//! through `parentid`.

use std::fmt;
use std::io;

use serde::Serialize;
use sqlx::FromRow;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::fields::{Classifier, Resolution};
use crate::identifier::IdentifierKind;

/// Supplementary key carrying the file or directory a job came from.
pub const FILE_OR_DIR_KEY: &str = "file_or_dir";

const SELECT_JOBS: &str = "SELECT id, timestamp, jobtype, parentid, file_or_dir, catalog, isbn, \
                           lcc, ddc, lcsh, record, recordtype FROM jobs";

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors from reading or writing the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A query failed.
    #[error("ledger query failed: {0}")]
    Database(#[from] sqlx::Error),

    /// No job with the given id.
    #[error("job not found: id {0}\n  Suggestion: Run `libcat db --all` to list recorded jobs")]
    JobNotFound(i64),

    /// CSV serialization failed.
    #[error("failed to write CSV export: {0}")]
    Csv(#[from] csv::Error),

    /// Flushing the export writer failed.
    #[error("failed to write CSV export: {0}")]
    Io(#[from] io::Error),
}

/// What produced a job row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    /// A single ISBN given on the command line.
    Isbn,
    /// One ISBN read from a list file.
    ListIsbn,
    /// The list file itself; parent of its `ListIsbn` rows.
    IsbnList,
}

impl JobType {
    /// Returns the stored label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Isbn => "isbn",
            Self::ListIsbn => "list_isbn",
            Self::IsbnList => "isbn_list",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "isbn" => Ok(Self::Isbn),
            "list_isbn" => Ok(Self::ListIsbn),
            "isbn_list" => Ok(Self::IsbnList),
            _ => Err(format!("invalid job type: {s}")),
        }
    }
}

/// One stored job.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct JobRow {
    /// Row id.
    pub id: i64,
    /// UTC creation time, ISO 8601.
    pub timestamp: String,
    /// Stored job type label, parsed via [`JobRow::job_type`].
    pub jobtype: String,
    /// Parent job for list children.
    pub parentid: Option<i64>,
    /// Source file or directory.
    pub file_or_dir: Option<String>,
    /// Catalog that last contributed a value.
    pub catalog: Option<String>,
    /// ISBN the job was about.
    pub isbn: Option<String>,
    /// Library of Congress Classification.
    pub lcc: Option<String>,
    /// Dewey Decimal Classification.
    pub ddc: Option<String>,
    /// Subject headings.
    pub lcsh: Option<String>,
    /// Full record document.
    pub record: Option<String>,
    /// Schema of `record`.
    pub recordtype: Option<String>,
}

impl JobRow {
    /// Parsed job type, or `None` for an unknown label.
    #[must_use]
    pub fn job_type(&self) -> Option<JobType> {
        self.jobtype.parse().ok()
    }

    /// Column names in display order, `record` excluded.
    pub const COLUMNS: [&'static str; 11] = [
        "id",
        "timestamp",
        "jobtype",
        "parentid",
        "file_or_dir",
        "catalog",
        "isbn",
        "lcc",
        "ddc",
        "lcsh",
        "recordtype",
    ];

    /// Cell values matching [`JobRow::COLUMNS`]; unset cells are empty.
    #[must_use]
    pub fn cells(&self) -> Vec<String> {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        vec![
            self.id.to_string(),
            self.timestamp.clone(),
            self.jobtype.clone(),
            self.parentid.map(|id| id.to_string()).unwrap_or_default(),
            text(&self.file_or_dir),
            text(&self.catalog),
            text(&self.isbn),
            text(&self.lcc),
            text(&self.ddc),
            text(&self.lcsh),
            text(&self.recordtype),
        ]
    }
}

/// CSV shape of a job; the record document is left out.
#[derive(Serialize)]
struct ExportRow<'a> {
    id: i64,
    timestamp: &'a str,
    jobtype: &'a str,
    parentid: Option<i64>,
    file_or_dir: Option<&'a str>,
    catalog: Option<&'a str>,
    isbn: Option<&'a str>,
    lcc: Option<&'a str>,
    ddc: Option<&'a str>,
    lcsh: Option<&'a str>,
    recordtype: Option<&'a str>,
}

impl<'a> From<&'a JobRow> for ExportRow<'a> {
    fn from(row: &'a JobRow) -> Self {
        Self {
            id: row.id,
            timestamp: &row.timestamp,
            jobtype: &row.jobtype,
            parentid: row.parentid,
            file_or_dir: row.file_or_dir.as_deref(),
            catalog: row.catalog.as_deref(),
            isbn: row.isbn.as_deref(),
            lcc: row.lcc.as_deref(),
            ddc: row.ddc.as_deref(),
            lcsh: row.lcsh.as_deref(),
            recordtype: row.recordtype.as_deref(),
        }
    }
}

/// Reads and writes job rows.
#[derive(Debug, Clone)]
pub struct Ledger {
    db: Database,
}

impl Ledger {
    /// Creates a ledger over an open database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Stores one resolution and returns the new job id.
    ///
    /// The `isbn` column prefers a resolved `isbn` classifier and falls back
    /// to the identifier that produced the values.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the insert fails.
    #[instrument(skip(self, resolution, jobtype), fields(jobtype = %jobtype))]
    pub async fn record_resolution(
        &self,
        resolution: &Resolution,
        jobtype: JobType,
        parent_id: Option<i64>,
    ) -> Result<i64> {
        let fields = &resolution.fields;
        let isbn = fields
            .get(Classifier::Isbn)
            .or_else(|| resolution.identifier_of(IdentifierKind::Isbn));
        let recordtype = fields
            .get(Classifier::Record)
            .and(resolution.supplementary.record_type)
            .map(|schema| schema.as_str());

        let result = sqlx::query(
            r"INSERT INTO jobs (jobtype, parentid, file_or_dir, catalog, isbn, lcc, ddc, lcsh, record, recordtype)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(jobtype.as_str())
        .bind(parent_id)
        .bind(resolution.supplementary.extra.get(FILE_OR_DIR_KEY).map(String::as_str))
        .bind(resolution.supplementary.catalog.as_deref())
        .bind(isbn)
        .bind(fields.get(Classifier::Lcc))
        .bind(fields.get(Classifier::Ddc))
        .bind(fields.get(Classifier::Lcsh))
        .bind(fields.get(Classifier::Record))
        .bind(recordtype)
        .execute(self.db.pool())
        .await?;

        let id = result.last_insert_rowid();
        debug!(id, "job recorded");
        Ok(id)
    }

    /// Stores the parent row of an ISBN list file and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the insert fails.
    #[instrument(skip(self))]
    pub async fn begin_isbn_list(&self, path: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO jobs (jobtype, file_or_dir) VALUES (?, ?)")
            .bind(JobType::IsbnList.as_str())
            .bind(path)
            .execute(self.db.pool())
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Returns up to `limit` jobs, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the query fails.
    pub async fn recent(&self, limit: u32) -> Result<Vec<JobRow>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!("{SELECT_JOBS} ORDER BY id DESC LIMIT ?"))
            .bind(i64::from(limit))
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows)
    }

    /// Returns every job, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the query fails.
    pub async fn all(&self) -> Result<Vec<JobRow>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!("{SELECT_JOBS} ORDER BY id ASC"))
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows)
    }

    /// Returns the newest top-level job, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the query fails.
    pub async fn latest(&self) -> Result<Option<JobRow>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "{SELECT_JOBS} WHERE parentid IS NULL ORDER BY id DESC LIMIT 1"
        ))
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row)
    }

    /// Returns the children of a list job in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the query fails.
    pub async fn children(&self, parent_id: i64) -> Result<Vec<JobRow>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "{SELECT_JOBS} WHERE parentid = ? ORDER BY id ASC"
        ))
        .bind(parent_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    /// Returns one job by id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::JobNotFound`] if no such job exists, or
    /// [`LedgerError::Database`] if the query fails.
    pub async fn get(&self, id: i64) -> Result<JobRow> {
        sqlx::query_as::<_, JobRow>(&format!("{SELECT_JOBS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(LedgerError::JobNotFound(id))
    }

    /// Writes every job as CSV with a header row and returns the row count.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the query or any write fails.
    #[instrument(skip(self, writer))]
    pub async fn export_csv<W: io::Write>(&self, writer: W) -> Result<usize> {
        let rows = self.all().await?;
        let mut csv = csv::Writer::from_writer(writer);
        if rows.is_empty() {
            csv.write_record(JobRow::COLUMNS)?;
        }
        for row in &rows {
            csv.serialize(ExportRow::from(row))?;
        }
        csv.flush()?;
        Ok(rows.len())
    }
}
