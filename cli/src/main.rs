#![allow(clippy::print_stderr, clippy::print_stdout)]
use crate::cli::{Args, Command};
use anyhow::{bail, Context};
use clap::Parser;
use kgsql::io::{QueryResultsFormat, RdfFormat};
use kgsql::model::GraphScope;
use kgsql::sparql::{Query, QueryOptions, QueryResults, Update};
use kgsql::storage::{LoadError, LoadFormat, LoadOptions, StoreConfig};
use kgsql::store::Store;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, stdin, stdout, Read, Write};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Load {
            file,
            format,
            graph,
            batch_size,
            suspend_indexes,
            strict,
        } => {
            let format = if let Some(format) = format {
                load_format_from_name(&format)?
            } else if let Some(file) = &file {
                load_format_from_path(file)?
            } else {
                bail!("The --format option must be set when reading from stdin")
            };
            let graph = graph_scope(graph.as_deref())?;
            let reader: Box<dyn Read + Send> = match &file {
                Some(file) => Box::new(
                    File::open(file)
                        .with_context(|| format!("Failed to open {}", file.display()))?,
                ),
                None => Box::new(stdin()),
            };
            let options = LoadOptions::default()
                .with_format(format)
                .with_batch_size(batch_size)
                .with_suspend_indexes(suspend_indexes)
                .with_strict(strict)
                .with_progress(|progress| {
                    tracing::info!(
                        batches = progress.batches,
                        rows = progress.rows_loaded,
                        "Committed batch"
                    );
                });
            let store = connect(args.database_url, args.max_connections).await?;
            load(&store, &graph, reader, &options).await
        }
        Command::Query {
            query,
            query_file,
            graph,
            results_format,
            timeout,
            explain,
        } => {
            let text = read_text(query, query_file.as_deref(), "query")?;
            let query = Query::parse(&text, None).context("Invalid SPARQL query")?;
            let graph = graph_scope(graph.as_deref())?;
            let mut options = QueryOptions::default();
            if let Some(timeout) = timeout {
                options = options.with_timeout(Duration::from_secs(timeout));
            }
            let store = connect(args.database_url, args.max_connections).await?;
            if explain {
                let explanation = store.explain(&graph, query.clone()).await?;
                eprintln!("{explanation}");
            }
            let results = store.query_opt(&graph, query, options).await?;
            write_results(results, &results_format).await
        }
        Command::Update {
            update,
            update_file,
            graph,
        } => {
            let text = read_text(update, update_file.as_deref(), "update")?;
            let update = Update::parse(&text, None).context("Invalid SPARQL update")?;
            let graph = graph_scope(graph.as_deref())?;
            let store = connect(args.database_url, args.max_connections).await?;
            store.update(&graph, update).await?;
            Ok(())
        }
        Command::DropGraph { graph } => {
            let scope = graph_scope(Some(&graph))?;
            let store = connect(args.database_url, args.max_connections).await?;
            if !store.drop_graph(&scope).await? {
                bail!("The graph {graph} does not exist")
            }
            Ok(())
        }
        Command::Graphs => {
            let store = connect(args.database_url, args.max_connections).await?;
            let mut stdout = stdout().lock();
            for graph in store.named_graphs().await? {
                writeln!(stdout, "{}", graph.as_str())?;
            }
            stdout.flush()?;
            Ok(())
        }
    }
}

async fn connect(database_url: Option<String>, max_connections: u32) -> anyhow::Result<Store> {
    let database_url = database_url
        .context("No database given, set --database-url or the KGSQL_DATABASE_URL variable")?;
    let config = StoreConfig::new(database_url).with_max_connections(max_connections);
    Store::connect(config)
        .await
        .context("Failed to connect to the database")
}

async fn load(
    store: &Store,
    graph: &GraphScope,
    reader: Box<dyn Read + Send>,
    options: &LoadOptions,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let report = match store.load(graph, reader, options, &cancel).await {
        Ok(report) => report,
        Err(LoadError::Cancelled(report)) => {
            bail!(
                "The load was interrupted, {} rows were loaded before",
                report.rows_loaded
            )
        }
        Err(error) => return Err(error).context("Failed to load the data"),
    };
    for failure in &report.parse_failures {
        eprintln!("Skipped malformed statement at {failure}");
    }
    eprintln!(
        "{} statements parsed, {} rows loaded in {:.2}s",
        report.statements_parsed,
        report.rows_loaded,
        report.elapsed.as_secs_f64()
    );
    if let (Some(suspend), Some(rebuild)) = (report.index_suspend, report.index_rebuild) {
        eprintln!(
            "Indexes dropped in {:.2}s and rebuilt in {:.2}s",
            suspend.as_secs_f64(),
            rebuild.as_secs_f64()
        );
    }
    Ok(())
}

async fn write_results(results: QueryResults, format: &str) -> anyhow::Result<()> {
    let graph_format = match results {
        QueryResults::Graph(_) => rdf_format_from_name(format),
        QueryResults::Solutions(_) | QueryResults::Boolean(_) => None,
    };
    let stdout = stdout().lock();
    let mut stdout = if let Some(graph_format) = graph_format {
        results.write_graph(stdout, graph_format).await?
    } else {
        results
            .write(stdout, query_results_format_from_name(format)?)
            .await?
    };
    stdout.flush()?;
    Ok(())
}

fn read_text(text: Option<String>, file: Option<&Path>, kind: &str) -> anyhow::Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(file) = file {
        return fs::read_to_string(file)
            .with_context(|| format!("Failed to read the {kind} from {}", file.display()));
    }
    let mut text = String::new();
    stdin()
        .read_to_string(&mut text)
        .with_context(|| format!("Failed to read the {kind} from stdin"))?;
    Ok(text)
}

fn graph_scope(name: Option<&str>) -> anyhow::Result<GraphScope> {
    match name {
        None => Ok(GraphScope::Default),
        Some(name) => {
            GraphScope::named(name).with_context(|| format!("The graph name {name} is invalid"))
        }
    }
}

fn load_format_from_path(path: &Path) -> anyhow::Result<LoadFormat> {
    let extension = path
        .extension()
        .and_then(OsStr::to_str)
        .with_context(|| format!("The path {} has no extension", path.display()))?;
    LoadFormat::from_extension(extension)
        .with_context(|| format!("The file extension '{extension}' is not supported"))
}

fn load_format_from_name(name: &str) -> anyhow::Result<LoadFormat> {
    if let Some(format) = LoadFormat::from_extension(name) {
        return Ok(format);
    }
    if let Some(format) = LoadFormat::from_media_type(name) {
        return Ok(format);
    }
    bail!("The file format '{name}' is not supported")
}

fn rdf_format_from_name(name: &str) -> Option<RdfFormat> {
    RdfFormat::from_extension(name).or_else(|| RdfFormat::from_media_type(name))
}

fn query_results_format_from_name(name: &str) -> anyhow::Result<QueryResultsFormat> {
    if let Some(format) = QueryResultsFormat::from_extension(name) {
        return Ok(format);
    }
    if let Some(format) = QueryResultsFormat::from_media_type(name) {
        return Ok(format);
    }
    bail!("The query results format '{name}' is unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use predicates::prelude::*;
    use std::path::PathBuf;

    fn cli_command() -> Command {
        let mut command = Command::cargo_bin("kgsql").unwrap();
        command.env_remove("KGSQL_DATABASE_URL");
        command
    }

    #[test]
    fn cli_help() {
        cli_command()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("drop-graph"));
    }

    #[test]
    fn cli_without_command() {
        cli_command()
            .assert()
            .failure()
            .stderr(predicate::str::contains("Usage"));
    }

    #[test]
    fn cli_invalid_query() {
        cli_command()
            .arg("query")
            .arg("--query")
            .arg("SELECT ?s WHERE {")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid SPARQL query"));
    }

    #[test]
    fn cli_invalid_graph_name() {
        cli_command()
            .arg("update")
            .arg("--update")
            .arg("CLEAR DEFAULT")
            .arg("--graph")
            .arg("not an iri")
            .assert()
            .failure()
            .stderr(predicate::str::contains("The graph name not an iri is invalid"));
    }

    #[test]
    fn cli_unsupported_load_format() {
        cli_command()
            .arg("load")
            .arg("--format")
            .arg("ttl")
            .assert()
            .failure()
            .stderr(predicate::str::contains("The file format 'ttl' is not supported"));
    }

    #[test]
    fn cli_missing_database() {
        cli_command()
            .arg("graphs")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No database given"));
    }

    #[test]
    fn formats_are_resolved_from_names_and_paths() {
        assert_eq!(
            load_format_from_path(&PathBuf::from("data/dump.nq")).unwrap(),
            LoadFormat::NQuads
        );
        assert_eq!(
            load_format_from_name("application/n-triples").unwrap(),
            LoadFormat::NTriples
        );
        assert!(load_format_from_path(&PathBuf::from("data/dump")).is_err());
        assert_eq!(
            query_results_format_from_name("tsv").unwrap(),
            QueryResultsFormat::Tsv
        );
        assert_eq!(rdf_format_from_name("nt"), Some(RdfFormat::NTriples));
        assert_eq!(rdf_format_from_name("csv"), None);
    }
}
