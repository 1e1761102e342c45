//! Pet clinic chat assistant server.
//!
//! Seeds the clinic store, indexes the vets for semantic search (or loads
//! the saved index), and serves `POST /chat`.
//!
//! # Usage
//!
//! ```bash
//! OPENROUTER_KEY=sk-... OPENAI_API_KEY=sk-... cargo run -p petclinic-web
//! OPENROUTER_KEY=sk-... cargo run -p petclinic-web -- --embedding-provider hashing
//! OPENROUTER_KEY=sk-... cargo run -p petclinic-web -- --port 9000 --static-dir ./static
//! ```
//!
//! Then:
//!
//! ```bash
//! curl -X POST localhost:8080/chat -d 'Which vets do dentistry?'
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use petclinic_genai::bootstrap::DEFAULT_SNAPSHOT_PATH;
use petclinic_genai::config::{DEFAULT_MAX_ROUNDS, DEFAULT_MEMORY_WINDOW};
use petclinic_genai::prelude::*;
use petclinic_genai::vector::embedding::{DEFAULT_EMBEDDING_MODEL, OPENAI_BASE_URL};
use petclinic_genai::{DEFAULT_MODEL, OPENROUTER_BASE_URL};
use petclinic_web::{WebConfig, spawn_web};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EmbeddingProvider {
    /// OpenAI-compatible `/embeddings` endpoint.
    Openai,
    /// Local feature hashing. No network, lower recall.
    Hashing,
}

/// Pet clinic chat assistant.
#[derive(Parser)]
#[command(about = "Chat assistant for a veterinary clinic, served over HTTP")]
struct Args {
    /// Address to bind.
    #[arg(long, env = "PETCLINIC_BIND", default_value = "127.0.0.1")]
    bind: IpAddr,

    /// Port for the chat endpoint.
    #[arg(long, env = "PETCLINIC_PORT", default_value_t = 8080)]
    port: u16,

    /// Chat model.
    #[arg(long, env = "PETCLINIC_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Base URL of the OpenAI-compatible chat API.
    #[arg(long, env = "PETCLINIC_CHAT_BASE_URL", default_value = OPENROUTER_BASE_URL)]
    base_url: String,

    /// API key for the chat API.
    #[arg(long, env = "OPENROUTER_KEY", hide_env_values = true)]
    openrouter_key: String,

    /// How vet documents are embedded.
    #[arg(long, env = "PETCLINIC_EMBEDDING_PROVIDER", value_enum, default_value_t = EmbeddingProvider::Openai)]
    embedding_provider: EmbeddingProvider,

    /// Embedding model (openai provider only).
    #[arg(long, env = "PETCLINIC_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Base URL of the embeddings API (openai provider only).
    #[arg(long, env = "PETCLINIC_EMBEDDING_BASE_URL", default_value = OPENAI_BASE_URL)]
    embedding_base_url: String,

    /// API key for the embeddings API (openai provider only).
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Where the vet index snapshot is loaded from and saved to.
    #[arg(long, env = "PETCLINIC_SNAPSHOT", default_value = DEFAULT_SNAPSHOT_PATH)]
    snapshot: PathBuf,

    /// File overriding the built-in system prompt.
    #[arg(long, env = "PETCLINIC_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Directory of static files to serve next to the API.
    #[arg(long, env = "PETCLINIC_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Maximum model calls per exchange.
    #[arg(long, default_value_t = DEFAULT_MAX_ROUNDS)]
    max_rounds: u32,

    /// Messages of history replayed per conversation.
    #[arg(long, default_value_t = DEFAULT_MEMORY_WINDOW)]
    memory_window: usize,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let system_prompt = load_system_prompt(args.system_prompt.as_deref())?;

    // 1. Clinic records and the vet index.
    let store: Arc<dyn ClinicStore> = Arc::new(InMemoryClinicStore::seeded());
    let embedder: Arc<dyn Embedder> = match args.embedding_provider {
        EmbeddingProvider::Openai => {
            let key = args
                .openai_api_key
                .ok_or("Set OPENAI_API_KEY or pass --embedding-provider hashing")?;
            Arc::new(
                OpenAiEmbedder::new(key, args.embedding_model)?
                    .with_base_url(args.embedding_base_url),
            )
        }
        EmbeddingProvider::Hashing => Arc::new(HashingEmbedder::default()),
    };
    let vectors = Arc::new(SimpleVectorStore::new(embedder));

    // 2. Index the vets in the background; the endpoint is up meanwhile.
    let bootstrap = VectorStoreBootstrap::new(store.clone(), vectors.clone(), args.snapshot);
    tokio::spawn(async move {
        match bootstrap.run().await {
            Ok(outcome) => info!("Vet index ready: {outcome:?}"),
            Err(e) => {
                error!(
                    "Vet index bootstrap failed ({}): {e}",
                    bootstrap.snapshot_path().display()
                );
                std::process::exit(1);
            }
        }
    });

    // 3. Tools, engine and the front door.
    let provider = Arc::new(AiDataProvider::new(store, vectors));
    let tools = Arc::new(clinic_tools(provider));
    let engine = OpenRouterClient::new(args.openrouter_key)?.with_base_url(args.base_url);
    let config = ChatConfig::default()
        .with_model(args.model)
        .with_system_prompt(system_prompt)
        .with_max_rounds(args.max_rounds)
        .with_memory_window(args.memory_window);
    let chat = Arc::new(PetclinicChatClient::new(Arc::new(engine), tools, config));

    // 4. Serve until interrupted.
    let web_config = WebConfig {
        bind_addr: SocketAddr::new(args.bind, args.port),
        static_dir: args.static_dir,
    };
    let addr = spawn_web(chat, web_config).await?;
    info!("Chat endpoint: http://{addr}/chat");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to listen for ctrl-c: {e}"))?;
    info!("Shutting down");
    Ok(())
}
