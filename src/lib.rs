//! Down-arrow Ramsey sets of small host graphs.
//!
//! For a host graph the pipeline enumerates its edge-induced subgraphs up to
//! isomorphism, orders them by subgraph embedding, takes for every red/blue
//! coloring of the host the subgraphs that embed in one of the two halves,
//! intersects those sets over all colorings and finally reports the maximal
//! members of the intersection.
//!
//! ```no_run
//! use std::sync::Arc;
//! use down_arrow::{FsCache, Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(FsCache::new("cache")))?;
//! let outcome = pipeline.run("K_4")?;
//! for ideal in &outcome.ideals {
//!     println!("{}", ideal.signature);
//! }
//! # Ok::<(), down_arrow::Error>(())
//! ```

pub mod aggregate;
pub mod cache;
pub mod canonical;
pub mod coloring;
pub mod config;
pub mod enumerate;
pub mod error;
pub mod graph;
pub mod graph6;
pub mod hosts;
pub mod ideals;
pub mod monomorphism;
pub mod partition;
pub mod pipeline;
pub mod poset;
pub mod progress;
pub mod report;

pub use cache::{ArtifactKey, FsCache, GraphRecord, MemoryCache, Phase, PhaseCache};
pub use canonical::{CanonicalGraph, Signature, canonicalize};
pub use coloring::{Coloring, ColoringStrategy};
pub use config::PipelineConfig;
pub use enumerate::{Population, enumerate_distinct_edge_subgraphs};
pub use error::{Error, Result};
pub use graph::SimpleGraph;
pub use hosts::host_from_name;
pub use pipeline::{Pipeline, RunOutcome};
pub use poset::{PosetRelation, build_poset};
