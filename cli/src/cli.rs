use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, version, name = "kgsql")]
/// kgsql command line tool for RDF graphs stored in PostgreSQL
pub struct Args {
    /// PostgreSQL connection string
    #[arg(long, env = "KGSQL_DATABASE_URL", global = true, value_hint = ValueHint::Url)]
    pub database_url: Option<String>,
    /// Maximum number of pooled connections
    #[arg(long, default_value_t = 10, global = true)]
    pub max_connections: u32,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Bulk load N-Triples or N-Quads into a graph
    Load {
        /// File to load
        ///
        /// If no file is given, stdin is read.
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
        /// The format of the file to load
        ///
        /// It can be an extension like "nt" or a MIME type like "application/n-triples".
        ///
        /// By default the format is guessed from the file extension.
        #[arg(long, required_unless_present = "file")]
        format: Option<String>,
        /// Name of the graph to load into
        ///
        /// By default the default graph is used. The graph of N-Quads lines is ignored.
        #[arg(long, value_hint = ValueHint::Url)]
        graph: Option<String>,
        /// Number of statements written per transaction
        #[arg(long, default_value_t = 10_000)]
        batch_size: usize,
        /// Drops the secondary indexes during the load and rebuilds them afterwards
        #[arg(long)]
        suspend_indexes: bool,
        /// Fails on the first malformed line instead of skipping it
        #[arg(long)]
        strict: bool,
    },
    /// Executes a SPARQL query against a graph
    Query {
        /// The SPARQL query to execute
        ///
        /// If no query or query file is given, stdin is read.
        #[arg(short, long, conflicts_with = "query_file")]
        query: Option<String>,
        /// File in which the query is stored
        #[arg(long, conflicts_with = "query", value_hint = ValueHint::FilePath)]
        query_file: Option<PathBuf>,
        /// Name of the graph to query
        ///
        /// By default the default graph is used.
        #[arg(long, value_hint = ValueHint::Url)]
        graph: Option<String>,
        /// The format of the results
        ///
        /// It can be an extension like "json" or a MIME type like "application/sparql-results+json".
        /// CONSTRUCT results accept RDF formats like "nt".
        #[arg(long, default_value = "json")]
        results_format: String,
        /// Cancels the query after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Prints the generated SQL to stderr
        #[arg(long)]
        explain: bool,
    },
    /// Executes a SPARQL update against a graph
    Update {
        /// The SPARQL update to execute
        ///
        /// If no update or update file is given, stdin is read.
        #[arg(short, long, conflicts_with = "update_file")]
        update: Option<String>,
        /// File in which the update is stored
        #[arg(long, conflicts_with = "update", value_hint = ValueHint::FilePath)]
        update_file: Option<PathBuf>,
        /// Name of the graph statements outside of GRAPH blocks are written to
        ///
        /// By default the default graph is used.
        #[arg(long, value_hint = ValueHint::Url)]
        graph: Option<String>,
    },
    /// Drops the tables of a graph
    DropGraph {
        /// Name of the graph to drop
        #[arg(long, value_hint = ValueHint::Url)]
        graph: String,
    },
    /// Lists the named graphs
    Graphs,
}
