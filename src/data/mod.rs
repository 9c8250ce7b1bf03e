// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Corpus ingestion: loading, cleaning, chunking, and the pipeline that
//! feeds the vector store.

pub mod chunking;
pub mod cleaning;
pub mod loader;
pub mod pipeline;
pub mod types;

pub use chunking::Chunker;
pub use cleaning::{clean_text, validate_record, ValidationError};
pub use loader::CorpusReader;
pub use pipeline::{IngestStats, IngestionPipeline, PipelineError};
pub use types::{Chunk, RawRecord};
