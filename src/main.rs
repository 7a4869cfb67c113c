use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use docqa_core::{DocqaConfig, Embedder, TextGenerationClient};
use docqa_ollama::OllamaClient;
use docqa_rag::{AnswerGenerator, HybridRetrievalPipeline, InMemoryPassageStore, Passage};
use docqa_watsonx::WatsonxClient;

mod corpus;

type Generator = AnswerGenerator<InMemoryPassageStore, dyn TextGenerationClient>;

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Ask questions about a directory of technical documentation", long_about = None)]
struct Cli {
    /// Directory of markdown or text files to index
    #[arg(long, global = true, env = "DOCQA_CORPUS", default_value = "docs")]
    corpus: PathBuf,

    /// Generation backend
    #[arg(
        long,
        global = true,
        value_enum,
        env = "DOCQA_BACKEND",
        default_value_t = Backend::Ollama
    )]
    backend: Backend,

    /// Score passages by term overlap instead of embeddings
    #[arg(long, global = true)]
    lexical: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    Watsonx,
    Ollama,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the ranked passages retrieved for a query
    Search { query: String },
    /// Answer one question from the corpus
    Ask {
        question: String,
        /// Technical domain named in the system prompt
        #[arg(long)]
        domain: Option<String>,
        /// Conversation id passed through to the backend
        #[arg(long)]
        conversation: Option<String>,
        /// Also print the passages the answer was grounded on
        #[arg(long)]
        sources: bool,
    },
    /// Interactive question loop
    Chat {
        #[arg(long)]
        domain: Option<String>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docqa=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let cli = Cli::parse();

    let config = DocqaConfig::from_env()?;
    let (generator, embedder) = connect_backend(cli.backend, cli.lexical).await?;

    let store = match embedder {
        Some(embedder) => InMemoryPassageStore::with_embedder(embedder),
        None => InMemoryPassageStore::new(),
    };
    let indexed = corpus::index_directory(&store, &cli.corpus).await?;
    if indexed == 0 {
        println!(
            "{} No documentation found under {}",
            "⚠️".yellow(),
            cli.corpus.display()
        );
    }

    let pipeline =
        HybridRetrievalPipeline::new(Arc::new(store), generator.clone(), config.retrieval)?;

    match cli.command {
        Commands::Search { query } => {
            let report = pipeline.search_with_report(&query).await?;
            if report.degraded() {
                println!(
                    "{} Some retrieval stages fell back; results may be less precise",
                    "⚠️".yellow()
                );
            }
            print_passages(&report.passages);
        }
        Commands::Ask {
            question,
            domain,
            conversation,
            sources,
        } => {
            let generator = AnswerGenerator::new(pipeline, generator, config.answer);
            let answer = generator
                .answer_in_conversation(
                    conversation.as_deref(),
                    &question,
                    domain.as_deref().unwrap_or(""),
                )
                .await?;
            println!("{}", answer.text);
            if sources {
                println!();
                println!("{}", "Sources:".bold());
                print_passages(&answer.passages);
            }
        }
        Commands::Chat { domain } => {
            let generator = AnswerGenerator::new(pipeline, generator, config.answer);
            chat(&generator, domain.as_deref().unwrap_or("")).await?;
        }
    }

    Ok(())
}

async fn connect_backend(
    backend: Backend,
    lexical: bool,
) -> Result<(Arc<dyn TextGenerationClient>, Option<Arc<dyn Embedder>>)> {
    match backend {
        Backend::Watsonx => {
            let mut client = WatsonxClient::from_env()?;
            client
                .connect()
                .await
                .context("Failed to authenticate with watsonx.ai")?;
            let generator: Arc<dyn TextGenerationClient> = Arc::new(client);
            Ok((generator, None))
        }
        Backend::Ollama => {
            let client = Arc::new(OllamaClient::from_env()?);
            let generator: Arc<dyn TextGenerationClient> = client.clone();
            let embedder: Option<Arc<dyn Embedder>> = if lexical { None } else { Some(client) };
            Ok((generator, embedder))
        }
    }
}

fn print_passages(passages: &[Passage]) {
    if passages.is_empty() {
        println!("{}", "No passages found".dimmed());
        return;
    }

    for (i, passage) in passages.iter().enumerate() {
        let source = passage
            .metadata
            .get("source")
            .and_then(|s| s.as_str())
            .unwrap_or("unknown");
        let score = passage
            .similarity_score
            .map(|s| format!("{:.3}", s))
            .unwrap_or_else(|| "-".to_string());

        println!("{} {} {}", format!("[{}]", i + 1).cyan(), source.green(), score.dimmed());
        let snippet: String = passage.content.chars().take(240).collect();
        println!("    {}", snippet.split_whitespace().collect::<Vec<_>>().join(" "));
    }
}

async fn chat(generator: &Generator, domain: &str) -> Result<()> {
    let conversation_id = Uuid::new_v4().to_string();
    println!("{}", "DocQA chat. Type 'exit' to quit.".bold());

    loop {
        print!("{} ", "?".cyan());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            println!("{}", "👋 Goodbye!".green());
            break;
        }

        match generator
            .answer_in_conversation(Some(&conversation_id), input, domain)
            .await
        {
            Ok(answer) => println!("{}\n", answer.text),
            Err(e) => println!("{} {}", "❌".red(), e),
        }
    }

    Ok(())
}
