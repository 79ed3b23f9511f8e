use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use wq_inference::{synthesizer::DEFAULT_MAX_ATTEMPTS, QuizSynthesizer};
use wq_scraper::extractor::DEFAULT_FETCH_RETRIES;
use wq_scraper::{ExtractorConfig, QuizPipeline, WikipediaExtractor};
use wq_web::AppState;

mod logging;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate quizzes from Wikipedia articles", long_about = None)]
pub struct Cli {
    /// Storage backend: sqlite or memory
    #[arg(long, env = "WQ_STORAGE", default_value = "sqlite")]
    storage: String,
    /// SQLite database file
    #[arg(long, env = "DATABASE_URL", default_value = wq_storage::DEFAULT_DATABASE_PATH)]
    database_url: String,
    #[arg(
        long,
        env = "WQ_MODEL",
        default_value = "gemini",
        help = "Model backend to use for quiz generation. Available: gemini (default), openai, deepseek, dummy"
    )]
    model: String,
    /// Model name override, e.g. gemini-2.5-flash
    #[arg(long, env = "WQ_MODEL_NAME")]
    model_name: Option<String>,
    /// Base URL of the model API
    #[arg(long, env = "WQ_MODEL_URL")]
    model_url: Option<String>,
    #[arg(long, env = "WQ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, default_value_t = 10)]
    fetch_timeout_secs: u64,
    #[arg(long, default_value_t = 120)]
    model_timeout_secs: u64,
    /// Extra fetch attempts after a timeout, connection error or 5xx
    #[arg(long, env = "WQ_FETCH_RETRIES", default_value_t = DEFAULT_FETCH_RETRIES)]
    fetch_retries: u32,
    /// Model calls per article before giving up, including the first
    #[arg(long, env = "WQ_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
    /// Generate a quiz for one article and store it
    Generate { url: String },
    /// List stored quizzes
    History,
    /// Print a stored quiz
    Show { id: i64 },
}

fn extractor_config(cli: &Cli) -> ExtractorConfig {
    ExtractorConfig {
        timeout: Duration::from_secs(cli.fetch_timeout_secs),
        retries: cli.fetch_retries,
        ..ExtractorConfig::default()
    }
}

fn build_synthesizer(cli: &Cli) -> anyhow::Result<QuizSynthesizer> {
    let config = wq_inference::Config {
        backend: cli.model.clone(),
        // GEMINI_API_KEY is what Google's own tooling reads
        api_key: cli
            .api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok()),
        model_name: cli.model_name.clone(),
        model_url: cli.model_url.clone(),
        timeout: Duration::from_secs(cli.model_timeout_secs),
    };
    let model = wq_inference::create_model(&config)?;
    let synthesizer = QuizSynthesizer::new(model).with_max_attempts(cli.max_attempts);
    info!(
        max_attempts = synthesizer.max_attempts(),
        "🧠 Inference model initialized successfully (using {})",
        synthesizer.generator_name()
    );
    Ok(synthesizer)
}

fn build_pipeline(cli: &Cli) -> anyhow::Result<QuizPipeline> {
    let extractor = WikipediaExtractor::new(extractor_config(cli))?;
    Ok(QuizPipeline::new(extractor, build_synthesizer(cli)?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init_logging();
    let cli = Cli::parse();

    let storage = wq_storage::create_storage(&cli.storage, Some(&cli.database_url)).await?;
    info!("✨ Storage initialized successfully (using {})", cli.storage);

    match &cli.command {
        Commands::Serve { host, port } => {
            let addr: SocketAddr = format!("{}:{}", host, port)
                .parse()
                .with_context(|| format!("Invalid listen address {}:{}", host, port))?;
            let state = AppState {
                pipeline: Arc::new(build_pipeline(&cli)?),
                storage,
            };
            wq_web::serve(state, addr).await?;
        }
        Commands::Generate { url } => {
            let pipeline = build_pipeline(&cli)?;
            let stored = pipeline.build_and_save(url, storage.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&stored)?);
        }
        Commands::History => {
            for quiz in storage.list().await? {
                println!(
                    "{:>4}  {}  {}  {}",
                    quiz.id,
                    quiz.created_at.format("%Y-%m-%d %H:%M"),
                    quiz.title,
                    quiz.url
                );
            }
        }
        Commands::Show { id } => match storage.get(*id).await? {
            Some(quiz) => println!("{}", serde_json::to_string_pretty(&quiz)?),
            None => anyhow::bail!("Quiz {} not found", id),
        },
    }

    Ok(())
}
