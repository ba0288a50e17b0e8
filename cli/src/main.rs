use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use env_logger::Env;
use log::{error, info};
use serde::Serialize;

use db::loader::{DEFAULT_VERSE_BATCH, DEFAULT_WORD_BATCH};
use db::{establish_connection, prefetch_lexicon, replace_lexicon, run_migrations, DbConnection, SqliteStore};
use ingest::reconcile::DEFAULT_RECONCILE_LIMIT;
use ingest::{
    lexicon_file, reconcile, CorpusVariant, IngestConfig, IngestError, IngestionContext,
    IngestionPipeline,
};

#[derive(Parser)]
#[command(name = "corpus", version, author, about = "Loads tagged Bible corpora into SQLite")]
struct Cli {
    /// SQLite database file
    #[arg(
        long,
        global = true,
        env = "DATABASE_URL",
        default_value = "/tmp/tagged-corpus.db"
    )]
    database_url: String,

    /// Print the run summary as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a tagged Hebrew Old Testament
    Hebrew(LoadArgs),
    /// Load a tagged Greek New Testament
    Greek(LoadArgs),
    /// Load a tagged Arabic translation
    Arabic(LoadArgs),
    /// Replace the lexicon with a tab-separated export
    Lexicon {
        #[arg(long)]
        input: PathBuf,
    },
    /// Correct Strong's ids of words already loaded
    Reconcile {
        #[arg(long)]
        source: String,

        /// Most words changed in this run
        #[arg(long, env = "RECONCILE_LIMIT", default_value_t = DEFAULT_RECONCILE_LIMIT)]
        limit: usize,

        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Args)]
struct LoadArgs {
    /// Corpus files, plain or zipped
    #[arg(long, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Translation source tag; defaults to the corpus' usual tag
    #[arg(long)]
    source: Option<String>,

    #[arg(long, env = "INGEST_VERSE_BATCH", default_value_t = DEFAULT_VERSE_BATCH)]
    verse_batch: usize,

    #[arg(long, env = "INGEST_WORD_BATCH", default_value_t = DEFAULT_WORD_BATCH)]
    word_batch: usize,

    /// Keep what is already stored for the source and skip duplicates
    #[arg(long)]
    append: bool,
}

fn main() -> ExitCode {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Runs the chosen command; `Ok(false)` means it finished with errors.
fn run(cli: &Cli) -> Result<bool, IngestError> {
    let mut conn = connect(&cli.database_url)?;

    match &cli.command {
        Command::Hebrew(args) => ingest(conn, CorpusVariant::Hebrew, args, cli.json),
        Command::Greek(args) => ingest(conn, CorpusVariant::Greek, args, cli.json),
        Command::Arabic(args) => ingest(conn, CorpusVariant::Arabic, args, cli.json),
        Command::Lexicon { input } => {
            let file = lexicon_file::read(input)?;
            let stored = replace_lexicon(&mut conn, &file.entries)?;
            info!("Lexicon now holds {} entries", stored);
            Ok(true)
        }
        Command::Reconcile {
            source,
            limit,
            dry_run,
        } => {
            let lexicon = prefetch_lexicon(&mut conn)?;
            let config = IngestConfig {
                reconcile_limit: *limit,
                ..IngestConfig::default()
            };
            let mut store = SqliteStore::new(conn);
            let report = reconcile(
                &mut store,
                &lexicon,
                source,
                &config.reconcile_options(*dry_run),
            )?;
            print(&report, cli.json);
            Ok(report.write_errors == 0)
        }
    }
}

fn connect(url: &str) -> Result<DbConnection, IngestError> {
    let mut conn = establish_connection(url)?;
    run_migrations(&mut conn)?;
    Ok(conn)
}

fn ingest(
    mut conn: DbConnection,
    variant: CorpusVariant,
    args: &LoadArgs,
    json: bool,
) -> Result<bool, IngestError> {
    let source = args
        .source
        .clone()
        .unwrap_or_else(|| variant.default_source().to_string());
    info!("Loading {} corpus as '{}'", variant, source);

    let lexicon = prefetch_lexicon(&mut conn)?;
    let config = IngestConfig {
        verse_batch: args.verse_batch,
        word_batch: args.word_batch,
        append: args.append,
        ..IngestConfig::default()
    };
    let mut ctx = IngestionContext::new(SqliteStore::new(conn), lexicon, config);

    let summary = IngestionPipeline::new(&mut ctx).run(&source, args.input.as_slice());
    print(&summary, json);
    Ok(summary.is_success())
}

fn print<T: Serialize + std::fmt::Debug>(summary: &T, json: bool) {
    if !json {
        println!("{:#?}", summary);
        return;
    }
    match serde_json::to_string_pretty(summary) {
        Ok(text) => println!("{}", text),
        Err(e) => error!("Could not serialize the summary: {}", e),
    }
}
