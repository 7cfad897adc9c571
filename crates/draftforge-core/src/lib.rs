//! # DraftForge Core
//!
//! Shared, runtime-agnostic logic for DraftForge: data models, the error
//! taxonomy, vector utilities, retrieval scoring algorithms, and the
//! store abstraction with an in-memory implementation.
//!
//! This crate contains no tokio, sqlx, network, or filesystem
//! dependencies. Everything here is pure computation plus async trait
//! definitions that concrete backends implement in the `draftforge`
//! application crate.

pub mod embedding;
pub mod error;
pub mod models;
pub mod scoring;
pub mod store;
