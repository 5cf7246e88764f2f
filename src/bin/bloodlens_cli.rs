use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use bloodlens::{
    agents::{Crew, GeminiModel},
    analysis::DEFAULT_QUERY,
    config::Config,
    embedding::build_embedding_client,
    pdf::{PdfExtractText, PdfTextExtractor, PlainTextExtractor},
    report::{self, compose_analysis},
    store::{AnalysisStore, QdrantAnalysisStore},
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bloodlens-cli",
    about = "Analyse blood-test reports from the command line"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyse a local report without storing the result.
    Analyze {
        path: PathBuf,
        #[arg(long, default_value = DEFAULT_QUERY)]
        query: String,
        /// Read the file as plain text instead of PDF.
        #[arg(long)]
        text: bool,
    },
    /// Run the agent crew over a query and an optional report.
    Consult {
        #[arg(long, default_value = DEFAULT_QUERY)]
        query: String,
        #[arg(long)]
        report: Option<PathBuf>,
        #[arg(long)]
        text: bool,
        /// Print task outputs as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Similarity search over stored analyses.
    Search {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Analyze { path, query, text } => analyze(&path, &query, text),
        Command::Consult {
            query,
            report,
            text,
            json,
        } => {
            let config = load_config()?;
            runtime()?.block_on(consult(&config, &query, report.as_deref(), text, json))
        }
        Command::Search { query, top_k } => {
            let config = load_config()?;
            runtime()?.block_on(search(&config, &query, top_k))
        }
    }
}

fn load_config() -> Result<Config> {
    Config::load().context("Failed to load configuration")
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to start runtime")
}

fn read_report(path: &Path, text: bool) -> Result<String> {
    let extracted = if text {
        PlainTextExtractor.extract_text(path)
    } else {
        PdfExtractText.extract_text(path)
    }
    .with_context(|| format!("Failed to read {}", path.display()))?;
    if report::is_unreadable(&extracted) {
        bail!("Could not extract text from {}", path.display());
    }
    Ok(extracted)
}

fn analyze(path: &Path, query: &str, text: bool) -> Result<()> {
    let report_text = read_report(path, text)?;
    let composed = compose_analysis(query, &path.display().to_string(), &report_text);
    println!("{}", composed.analysis);
    Ok(())
}

async fn consult(
    config: &Config,
    query: &str,
    report: Option<&Path>,
    text: bool,
    json: bool,
) -> Result<()> {
    let report_text = report.map(|path| read_report(path, text)).transpose()?;
    let model = GeminiModel::from_config(config).context("Failed to configure Gemini")?;
    let crew = Crew::standard(model);
    let outputs = crew
        .kickoff(query, report_text.as_deref())
        .await
        .context("Agent crew failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outputs)?);
    } else {
        for output in outputs {
            println!("## {}\n\n{}\n", output.agent_role, output.raw);
        }
    }
    Ok(())
}

async fn search(config: &Config, query: &str, top_k: Option<usize>) -> Result<()> {
    let embedding_client =
        build_embedding_client(config).context("Failed to build embedding client")?;
    let store = QdrantAnalysisStore::connect(config, embedding_client)
        .await
        .context("Failed to connect to Qdrant")?;
    let top_k = top_k
        .unwrap_or(config.search_default_top_k)
        .clamp(1, config.search_max_top_k);
    let results = store.query(query, top_k).await.context("Search failed")?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
