use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pdfseed::Result;
use pdfseed::config::Config;
use pdfseed::embeddings::EmbeddingClient;
use pdfseed::pipeline::Seeder;
use pdfseed::store::VectorStore;

#[derive(Parser)]
#[command(name = "pdfseed")]
#[command(about = "Seeds PDF documents into a vector index as embedded text chunks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, chunk, embed, and upsert a PDF document
    Seed {
        /// Path to the PDF document
        document: PathBuf,
        /// Maximum number of words per chunk
        #[arg(long)]
        max_words: Option<usize>,
        /// Number of words shared between consecutive chunks
        #[arg(long)]
        overlap: Option<usize>,
        /// Maximum number of records per upsert call
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Show whether the target index exists and how many records it holds
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Seed {
            document,
            max_words,
            overlap,
            batch_size,
        } => {
            let mut config = Config::from_env()?;
            if let Some(max_words) = max_words {
                config.chunking.max_words = max_words;
            }
            if let Some(overlap) = overlap {
                config.chunking.overlap = overlap;
            }
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size;
            }
            config.validate()?;

            let embedder = EmbeddingClient::new(&config.embedding)?;
            let store = VectorStore::connect(&config.store).await?;
            let index_name = config.store.index_name.clone();

            let mut seeder = Seeder::new(config, embedder, store);
            let stats = seeder.run(&document).await?;

            println!(
                "Seeded {} into '{}': {} pages, {} chunks, {} batches",
                document.display(),
                index_name,
                stats.pages,
                stats.chunks,
                stats.batches
            );
        }
        Commands::Status => {
            let config = Config::from_env()?;
            let store = VectorStore::connect(&config.store).await?;

            if store.index_exists().await? {
                let count = store.count_records().await?;
                println!(
                    "Index '{}' holds {} records",
                    config.store.index_name, count
                );
            } else {
                println!("Index '{}' has not been created yet", config.store.index_name);
            }
        }
    }

    Ok(())
}
