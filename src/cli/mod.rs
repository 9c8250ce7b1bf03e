// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use crate::agent::AgentController;
use crate::api;
use crate::config::NodeConfig;
use crate::data::IngestionPipeline;
use crate::embeddings::HttpEmbeddingClient;
use crate::vector::VectorStore;

/// Fabstir QA Node CLI
#[derive(Parser, Debug)]
#[command(name = "fabstir-qa-node")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Retrieval-augmented QA node: corpus ingestion and chat API", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a line-delimited corpus into the vector store
    Ingest {
        /// Path to the corpus file (corpus.jsonl)
        #[arg(long)]
        corpus: PathBuf,

        /// Vector store snapshot path (overrides STORE_PATH)
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Serve the chat API
    Serve {
        /// Port to listen on (overrides API_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Execute CLI command
pub async fn execute(cli: Cli, mut config: NodeConfig) -> Result<()> {
    match cli.command {
        Commands::Ingest { corpus, store } => {
            if store.is_some() {
                config.store.path = store;
            }
            run_ingest(&config, &corpus).await
        }
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.api.port);
            run_serve(&config, port).await
        }
    }
}

async fn run_ingest(config: &NodeConfig, corpus: &PathBuf) -> Result<()> {
    let store = Arc::new(VectorStore::open(
        config.embedding.dimension,
        config.store.path.clone(),
    )?);
    let embedder = Arc::new(HttpEmbeddingClient::new(config.embedding.clone()));

    let pipeline = IngestionPipeline::new(config, embedder, store.clone());
    let stats = pipeline.run(corpus).await?;

    println!(
        "Ingestion finished: {} records processed, {} skipped, {} chunks persisted, {} failed batches",
        stats.records_processed,
        stats.records_skipped,
        stats.chunks_persisted,
        stats.failed_batches
    );

    if stats.failed_batches > 0 {
        error!("Some embedding batches failed; re-run ingestion to resume");
        std::process::exit(2);
    }

    Ok(())
}

async fn run_serve(config: &NodeConfig, port: u16) -> Result<()> {
    let store = Arc::new(VectorStore::open(
        config.embedding.dimension,
        config.store.path.clone(),
    )?);
    store.ensure_index().await?;

    let agent = Arc::new(AgentController::new(config, store));
    api::run_server(port, agent).await
}
