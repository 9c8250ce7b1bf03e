// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use fabstir_qa_node::cli::{self, Cli};
use fabstir_qa_node::config::NodeConfig;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so configuration sees it
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting Fabstir QA Node...\n");
    println!("📦 BUILD VERSION: {}", fabstir_qa_node::version::VERSION);
    println!("📅 Build Date: {}", fabstir_qa_node::version::BUILD_DATE);
    println!();

    let config = NodeConfig::from_env();
    if let Err(e) = config.validate() {
        anyhow::bail!("Invalid configuration: {}", e);
    }

    let cli = Cli::parse();
    cli::execute(cli, config).await
}
