use anyhow::Result;
use boolex_core::corpus::{self, LoadedCorpus};
use boolex_core::{EnglishNormalizer, QueryKind, QueryProcessor};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "boolex")]
#[command(about = "Boolean and proximity search over a directory of numbered text files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CorpusArgs {
    /// Directory containing `<id>.txt` documents
    #[arg(long)]
    docs: PathBuf,
    /// Stop-word file (one word per line) replacing the built-in list
    #[arg(long)]
    stopwords: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one or more queries and print matching documents
    Query {
        #[command(flatten)]
        corpus: CorpusArgs,
        /// Queries, e.g. "information AND retrieval" or "information retrieval / 3"
        #[arg(required = true)]
        queries: Vec<String>,
    },
    /// Read queries from stdin, one per line
    Repl {
        #[command(flatten)]
        corpus: CorpusArgs,
    },
    /// Print corpus statistics
    Stats {
        #[command(flatten)]
        corpus: CorpusArgs,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Query { corpus, queries } => {
            let (normalizer, loaded) = load(&corpus)?;
            let mut out = io::stdout().lock();
            for q in &queries {
                run_query(&mut out, &loaded, &normalizer, q)?;
            }
            Ok(())
        }
        Commands::Repl { corpus } => {
            let (normalizer, loaded) = load(&corpus)?;
            let mut out = io::stdout().lock();
            for line in io::stdin().lock().lines() {
                let line = line?;
                if line.trim().is_empty() { continue; }
                run_query(&mut out, &loaded, &normalizer, &line)?;
            }
            Ok(())
        }
        Commands::Stats { corpus } => {
            let (_, loaded) = load(&corpus)?;
            println!("documents: {}", loaded.index.num_documents());
            println!("terms:     {}", loaded.index.num_terms());
            Ok(())
        }
    }
}

fn load(args: &CorpusArgs) -> Result<(EnglishNormalizer, LoadedCorpus)> {
    let normalizer = match &args.stopwords {
        Some(path) => EnglishNormalizer::from_stopword_file(path)?,
        None => EnglishNormalizer::new(),
    };
    let loaded = corpus::load(&args.docs, &normalizer)?;
    Ok((normalizer, loaded))
}

fn run_query<W: Write>(out: &mut W, loaded: &LoadedCorpus, normalizer: &EnglishNormalizer, query: &str) -> Result<()> {
    let qp = QueryProcessor::new(&loaded.index, normalizer);
    writeln!(out, "> {query}")?;
    let (kind, result) = qp.evaluate_with_kind(query);
    match result {
        Ok(docs) => {
            let kind = match kind {
                QueryKind::Proximity => "proximity",
                _ => "boolean",
            };
            writeln!(out, "{} matching documents ({kind})", docs.len())?;
            for doc_id in docs {
                writeln!(out, "  {}", loaded.catalog.name(doc_id))?;
            }
        }
        Err(e) => writeln!(out, "{e}")?,
    }
    Ok(())
}
