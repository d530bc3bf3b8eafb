use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use siteqa_core::config::{Config, Settings};
use siteqa_hybrid::evaluate::{evaluate_answers, evaluate_retrieval, load_test_set};
use siteqa_hybrid::{index_directory, open_answer_service, open_retriever, Models};

const RETRIEVAL_REPORT: &str = "retriever_report.txt";
const ANSWER_REPORT: &str = "answers_report.txt";

#[derive(Parser)]
#[command(name = "siteqa", about = "Hybrid retrieval and grounded answers over a crawled website")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk the crawled pages and publish a new index snapshot
    Index {
        /// Overrides paths.data_dir
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Only chunk the first N files
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print ranked passages; without a query, evaluate over the QA test set
    Retrieve {
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Print a generated answer; without a query, evaluate over the QA test set
    Answer {
        #[arg(short, long)]
        query: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = Config::load().and_then(|c| c.settings()).context("Error loading config")?;

    match cli.command {
        Command::Index { data_dir, limit } => {
            let data_dir = data_dir.unwrap_or_else(|| settings.paths.data_dir.clone());
            let report = index_directory(&settings, &data_dir, limit).await?;
            println!("Indexed {} chunks into snapshot {} ({})", report.chunk_count, report.version, report.dir.display());
        }
        Command::Retrieve { query } => {
            let models = Models::from_settings(&settings)?;
            let retriever = open_retriever(&settings, &models).await?;
            match query {
                Some(q) => {
                    let passages = retriever.retrieve(&q).await?;
                    if passages.is_empty() { println!("No relevant passages found."); }
                    for (i, p) in passages.iter().enumerate() {
                        println!("--- #{} score={:.4} source={} section={}\n{}\n", i + 1, p.score, p.source, p.section_path, p.text);
                    }
                }
                None => {
                    let items = load_test_set(&settings.paths.qa_test_set)?;
                    let (path, mut sink) = report_sink(&settings, RETRIEVAL_REPORT)?;
                    let summary = evaluate_retrieval(&retriever, &items, &mut sink).await?;
                    println!("Evaluated {} questions ({} without passages); report: {}", summary.questions, summary.empty, path.display());
                }
            }
        }
        Command::Answer { query } => {
            let models = Models::from_settings(&settings)?;
            let service = open_answer_service(&settings, &models).await?;
            match query {
                Some(q) => println!("{}", service.answer(&q).await?.text),
                None => {
                    let items = load_test_set(&settings.paths.qa_test_set)?;
                    let (path, mut sink) = report_sink(&settings, ANSWER_REPORT)?;
                    let summary = evaluate_answers(&service, &items, &mut sink).await?;
                    println!("Answered {} questions ({} without passages); report: {}", summary.questions, summary.empty, path.display());
                }
            }
        }
    }
    Ok(())
}

fn report_sink(settings: &Settings, name: &str) -> anyhow::Result<(PathBuf, Box<dyn Write>)> {
    fs::create_dir_all(&settings.paths.report_dir).with_context(|| format!("Failed to create {}", settings.paths.report_dir.display()))?;
    let path = settings.paths.report_dir.join(name);
    let file = fs::File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok((path, Box::new(BufWriter::new(file))))
}
