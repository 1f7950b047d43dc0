//! Streaming bulk ingestion.
//!
//! The input is parsed statement by statement and written in batches. Each batch is copied into
//! a session-local staging table with `COPY` and then merged into the statement tables with
//! `INSERT ... ON CONFLICT DO NOTHING`, all inside one transaction. Loading the same input twice
//! therefore stores every statement once.

use crate::writer::{RoutedRows, TableRows};
use crate::{commit, ConnectionPool};
use kgsql_common::{StorageError, StorageResult};
use kgsql_encoding::{SchemaHandle, TableKind, TermCodec};
use kgsql_model::Triple;
use oxrdfio::{RdfFormat, RdfParseError, RdfParser};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::{Debug, Display, Formatter};
use std::future::Future;
use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// The serializations accepted by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadFormat {
    #[default]
    NTriples,
    /// The graph component of each line is ignored. Statements go to the target graph.
    NQuads,
}

impl LoadFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "nt" => Some(Self::NTriples),
            "nq" => Some(Self::NQuads),
            _ => None,
        }
    }

    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match RdfFormat::from_media_type(media_type)? {
            RdfFormat::NTriples => Some(Self::NTriples),
            RdfFormat::NQuads => Some(Self::NQuads),
            _ => None,
        }
    }

    fn rdf_format(self) -> RdfFormat {
        match self {
            Self::NTriples => RdfFormat::NTriples,
            Self::NQuads => RdfFormat::NQuads,
        }
    }
}

impl Display for LoadFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.rdf_format().name())
    }
}

/// Reported after every committed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub batches: u64,
    pub statements_parsed: u64,
    pub rows_loaded: u64,
}

pub type ProgressFn = Arc<dyn Fn(LoadProgress) + Send + Sync>;

#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadOptions {
    /// Statements per transaction.
    pub batch_size: usize,
    /// Drop the secondary indexes during the load and rebuild them at the end.
    pub suspend_indexes: bool,
    /// Abort on the first malformed line instead of collecting it.
    pub strict: bool,
    pub format: LoadFormat,
    #[serde(skip)]
    pub progress: Option<ProgressFn>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: 10_000,
            suspend_indexes: false,
            strict: false,
            format: LoadFormat::default(),
            progress: None,
        }
    }
}

impl Debug for LoadOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOptions")
            .field("batch_size", &self.batch_size)
            .field("suspend_indexes", &self.suspend_indexes)
            .field("strict", &self.strict)
            .field("format", &self.format)
            .field("progress", &self.progress.as_ref().map(|_| "..."))
            .finish()
    }
}

impl LoadOptions {
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn with_suspend_indexes(mut self, suspend_indexes: bool) -> Self {
        self.suspend_indexes = suspend_indexes;
        self
    }

    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LoadFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: impl Fn(LoadProgress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }
}

/// A malformed statement in the input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {message}", line.map_or_else(|| "unknown line".to_owned(), |l| format!("line {l}")))]
pub struct ParseFailure {
    /// One-based line number, if the parser reported a position.
    pub line: Option<u64>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Rows that were not stored before.
    pub rows_loaded: u64,
    pub rows_per_table: BTreeMap<TableKind, u64>,
    pub statements_parsed: u64,
    pub parse_failures: Vec<ParseFailure>,
    pub elapsed: Duration,
    /// Time spent dropping the secondary indexes, if they were suspended.
    pub index_suspend: Option<Duration>,
    /// Time spent recreating the secondary indexes, if they were suspended and rebuilt.
    pub index_rebuild: Option<Duration>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A malformed statement in strict mode.
    #[error("malformed input at {0}")]
    Parse(ParseFailure),
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The load was cancelled between two batches. Committed batches stay loaded.
    #[error("load cancelled after {} rows", .0.rows_loaded)]
    Cancelled(Box<LoadReport>),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Parsed batches waiting to be written.
const PARSED_BATCH_BUFFER: usize = 2;

/// Loads the statements of `reader` into the graph of `schema`, which must exist.
///
/// Parsing runs on the blocking thread pool and hands batches over to the writer.
#[tracing::instrument(skip_all, fields(graph = %schema.scope(), format = %options.format))]
pub async fn load(
    pool: &ConnectionPool,
    schema: &SchemaHandle,
    codec: &dyn TermCodec,
    reader: impl Read + Send + 'static,
    options: &LoadOptions,
    cancel: &CancellationToken,
) -> Result<LoadReport, LoadError> {
    let start = Instant::now();
    let mut report = LoadReport::default();
    if options.suspend_indexes {
        tracing::info!("Suspending secondary indexes");
        let suspend_start = Instant::now();
        run_in_transaction(pool, &schema.drop_secondary_index_statements(), "suspending indexes")
            .await?;
        report.index_suspend = Some(suspend_start.elapsed());
    }

    let result = load_batches(codec, reader, options, cancel, &mut report, |rows| {
        write_batch(pool, schema, rows)
    })
    .await;

    let rebuild = if options.suspend_indexes {
        tracing::info!("Rebuilding secondary indexes");
        let rebuild_start = Instant::now();
        let rebuilt =
            run_in_transaction(pool, &schema.create_secondary_index_statements(), "rebuilding indexes")
                .await;
        if rebuilt.is_ok() {
            report.index_rebuild = Some(rebuild_start.elapsed());
        }
        rebuilt
    } else {
        Ok(())
    };
    report.elapsed = start.elapsed();

    for failure in &report.parse_failures {
        tracing::warn!(line = failure.line, message = %failure.message, "Skipped malformed statement");
    }
    finish(result, rebuild, report)
}

/// Combines the outcome of the batches with the outcome of the index rebuild.
///
/// A failed rebuild is only returned when the batches succeeded. Otherwise it is logged and the
/// load error is returned, with the report attached when the load was cancelled.
fn finish(
    result: Result<(), LoadError>,
    rebuild: StorageResult<()>,
    report: LoadReport,
) -> Result<LoadReport, LoadError> {
    match (result, rebuild) {
        (Ok(()), Ok(())) => {
            tracing::info!(
                rows_loaded = report.rows_loaded,
                statements_parsed = report.statements_parsed,
                parse_failures = report.parse_failures.len(),
                elapsed = ?report.elapsed,
                "Load finished"
            );
            Ok(report)
        }
        (Ok(()), Err(error)) => {
            tracing::error!(%error, rows_loaded = report.rows_loaded, "Index rebuild failed");
            Err(error.into())
        }
        (Err(error), rebuild) => {
            if let Err(rebuild_error) = rebuild {
                tracing::error!(error = %rebuild_error, "Index rebuild failed after an aborted load");
            }
            match error {
                LoadError::Cancelled(_) => {
                    tracing::info!(rows_loaded = report.rows_loaded, "Load cancelled");
                    Err(LoadError::Cancelled(Box::new(report)))
                }
                error => Err(error),
            }
        }
    }
}

/// Parses `reader` on the blocking thread pool and passes every batch to `write`.
///
/// `write` returns the number of new rows per table. Cancellation is checked before each batch.
async fn load_batches<W, F>(
    codec: &dyn TermCodec,
    reader: impl Read + Send + 'static,
    options: &LoadOptions,
    cancel: &CancellationToken,
    report: &mut LoadReport,
    mut write: W,
) -> Result<(), LoadError>
where
    W: FnMut(RoutedRows) -> F,
    F: Future<Output = StorageResult<Vec<(TableKind, u64)>>>,
{
    let (sender, mut receiver) = mpsc::channel(PARSED_BATCH_BUFFER);
    let format = options.format;
    let batch_size = options.batch_size.max(1);
    let strict = options.strict;
    let parser = tokio::task::spawn_blocking(move || {
        parse_batches(reader, format, batch_size, strict, |batch| {
            sender.blocking_send(batch).is_ok()
        })
    });

    let mut batches = 0;
    while let Some(batch) = receiver.recv().await {
        report.statements_parsed += batch.statements.len() as u64;
        report.parse_failures.extend(batch.failures);
        if batch.statements.is_empty() {
            continue;
        }
        if cancel.is_cancelled() {
            // Dropping the receiver stops the parser at its next batch.
            return Err(LoadError::Cancelled(Box::default()));
        }
        for (kind, inserted) in write(RoutedRows::route(&batch.statements, codec)).await? {
            report.rows_loaded += inserted;
            *report.rows_per_table.entry(kind).or_default() += inserted;
        }
        batches += 1;
        notify(options, batches, report);
    }
    parser.await.map_err(std::io::Error::other)?
}

/// The statements and malformed lines read since the previous batch.
#[derive(Debug, Default)]
struct ParsedBatch {
    statements: Vec<Triple>,
    failures: Vec<ParseFailure>,
}

/// Parses `reader` and hands a batch to `emit` every `batch_size` statements, plus a last one
/// for the remainder. Stops early when `emit` returns `false`.
fn parse_batches(
    reader: impl Read,
    format: LoadFormat,
    batch_size: usize,
    strict: bool,
    mut emit: impl FnMut(ParsedBatch) -> bool,
) -> Result<(), LoadError> {
    let mut batch = ParsedBatch::default();
    for result in RdfParser::from_format(format.rdf_format()).for_reader(reader) {
        match result {
            Ok(quad) => batch.statements.push(Triple::from(quad)),
            Err(RdfParseError::Io(error)) => return Err(error.into()),
            Err(RdfParseError::Syntax(error)) => {
                let failure = ParseFailure {
                    line: error.location().map(|l| l.start.line + 1),
                    message: error.to_string(),
                };
                if strict {
                    return Err(LoadError::Parse(failure));
                }
                batch.failures.push(failure);
            }
        }
        if batch.statements.len() >= batch_size && !emit(std::mem::take(&mut batch)) {
            return Ok(());
        }
    }
    if !batch.statements.is_empty() || !batch.failures.is_empty() {
        emit(batch);
    }
    Ok(())
}

fn notify(options: &LoadOptions, batches: u64, report: &LoadReport) {
    tracing::debug!(batches, rows_loaded = report.rows_loaded, "Committed batch");
    if let Some(progress) = &options.progress {
        progress(LoadProgress {
            batches,
            statements_parsed: report.statements_parsed,
            rows_loaded: report.rows_loaded,
        });
    }
}

/// Copies one batch into the staging tables and merges it into the graph in one transaction.
async fn write_batch(
    pool: &ConnectionPool,
    schema: &SchemaHandle,
    batch: RoutedRows,
) -> StorageResult<Vec<(TableKind, u64)>> {
    let mut tx = pool.begin().await?;
    let mut loaded = Vec::new();
    for (kind, rows) in batch.into_tables() {
        if rows.is_empty() {
            continue;
        }
        let target = schema.table_name(kind);
        let staging = staging_table(kind);
        let columns = SchemaHandle::columns(kind).join(", ");

        sqlx::query(&format!(
            "CREATE TEMP TABLE IF NOT EXISTS {staging} (LIKE {target} INCLUDING DEFAULTS) \
             ON COMMIT DELETE ROWS"
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::database(format!("creating staging table for {target}"), e))?;

        let mut copy = tx
            .copy_in_raw(&format!("COPY {staging} ({columns}) FROM STDIN"))
            .await
            .map_err(|e| StorageError::database(format!("starting COPY into {staging}"), e))?;
        copy.send(copy_text(kind, &rows, schema.graph_id()).into_bytes())
            .await
            .map_err(|e| StorageError::database(format!("copying into {staging}"), e))?;
        copy.finish()
            .await
            .map_err(|e| StorageError::database(format!("finishing COPY into {staging}"), e))?;

        let inserted = sqlx::query(&format!(
            "INSERT INTO {target} ({columns}) SELECT {columns} FROM {staging} \
             ON CONFLICT DO NOTHING"
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::database(format!("merging staged rows into {target}"), e))?
        .rows_affected();
        loaded.push((kind, inserted));
    }
    commit(tx, "a load batch").await?;
    Ok(loaded)
}

async fn run_in_transaction(
    pool: &ConnectionPool,
    statements: &[String],
    context: &str,
) -> StorageResult<()> {
    let mut tx = pool.begin().await?;
    for statement in statements {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::database(context, e))?;
    }
    commit(tx, context).await
}

fn staging_table(kind: TableKind) -> String {
    format!("kgsql_stage_{}", kind.suffix())
}

/// Rows in the `COPY` text format, with columns in storage order.
fn copy_text(kind: TableKind, rows: &TableRows, context: &str) -> String {
    let mut text = String::new();
    for i in 0..rows.len() {
        let mut fields = vec![rows.subjects[i].as_str()];
        if kind.has_predicate_column() {
            fields.push(rows.predicates[i].as_str());
        }
        fields.push(rows.objects[i].as_str());
        if kind.has_literal_columns() {
            fields.push(rows.datatypes[i].as_str());
            fields.push(rows.languages[i].as_str());
        }
        fields.push(context);
        for (j, field) in fields.iter().enumerate() {
            if j > 0 {
                text.push('\t');
            }
            escape_copy_field(field, &mut text);
        }
        text.push('\n');
    }
    text
}

fn escape_copy_field(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
}
