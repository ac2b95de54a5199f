//! spam-rs: SMS spam classification server
//!
//! Serves predictions over HTTP, trains artifacts from a labeled corpus, or
//! classifies a single message from the command line.

use anyhow::Context;
use clap::{Parser, Subcommand};
use spam_rs::model::artifacts::{save_classifier, save_vectorizer};
use spam_rs::model::training::{load_corpus, train};
use spam_rs::model::TrainingParams;
use spam_rs::text::StopwordFilter;
use spam_rs::{ApiServer, ArtifactState, ClassifierConfig, InferenceService, Normalizer};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "spam-rs", version, about = "SMS spam classification service")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,

    /// Fit and persist artifacts from a `label<TAB>text` corpus
    Train {
        /// Corpus file
        #[arg(short, long)]
        data: PathBuf,

        /// Vocabulary size cap
        #[arg(long, default_value_t = 3000)]
        max_features: usize,

        /// Naive Bayes smoothing
        #[arg(long, default_value_t = 1.0)]
        alpha: f64,
    },

    /// Classify one message and print the JSON response
    Classify {
        /// Message text
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ClassifierConfig::load(cli.config.as_deref())?;
    init_tracing(&config);

    info!("Starting spam-rs v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &cli.config {
        info!("Loaded configuration from {}", path.display());
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Train {
            data,
            max_features,
            alpha,
        } => train_artifacts(&config, &data, max_features, alpha),
        Command::Classify { text } => classify(&config, &text),
    }
}

fn init_tracing(config: &ClassifierConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());
    let registry = tracing_subscriber::registry().with(filter);

    match config.logging.format.as_str() {
        "json" => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve(config: ClassifierConfig) -> anyhow::Result<()> {
    let state = ArtifactState::load(&config.artifacts);
    let service = InferenceService::new(state);

    let server = ApiServer::new(service, config.server);
    server.run().await?;

    Ok(())
}

fn train_artifacts(
    config: &ClassifierConfig,
    data: &Path,
    max_features: usize,
    alpha: f64,
) -> anyhow::Result<()> {
    let corpus = load_corpus(data)
        .with_context(|| format!("Failed to read corpus {}", data.display()))?;

    let filter = match &config.artifacts.stopwords_path {
        Some(path) => StopwordFilter::from_file(Path::new(path))?,
        None => StopwordFilter::english(),
    };
    let normalizer = Normalizer::new(filter);

    let mut params = TrainingParams::default();
    params.vectorizer.max_features = Some(max_features);
    params.alpha = alpha;

    let model = train(&corpus, &normalizer, params)?;

    let vectorizer_path = Path::new(&config.artifacts.vectorizer_path);
    let model_path = Path::new(&config.artifacts.model_path);
    save_vectorizer(vectorizer_path, &model.vectorizer)?;
    save_classifier(model_path, &model.classifier)?;

    info!(
        "Wrote {} and {} ({} samples, training accuracy {:.2}%)",
        vectorizer_path.display(),
        model_path.display(),
        model.samples,
        model.accuracy * 100.0
    );

    Ok(())
}

fn classify(config: &ClassifierConfig, text: &str) -> anyhow::Result<()> {
    let service = InferenceService::new(ArtifactState::load(&config.artifacts));

    let body = serde_json::to_vec(&serde_json::json!({ "message": text }))?;
    let (status, response) = service.respond(&body);
    println!("{}", serde_json::to_string_pretty(&response)?);

    if !status.is_success() {
        anyhow::bail!("classification failed with status {}", status);
    }
    Ok(())
}
