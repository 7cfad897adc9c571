//! # DraftForge
//!
//! A multi-agent RAG content generation engine.
//!
//! DraftForge indexes marketing content for semantic retrieval, pulls
//! ranked and explained context for a generation request, and sequences
//! specialized agents — strategy planning, drafting, brand-voice
//! scoring, distribution planning — into one pipeline that streams
//! progress events to the caller.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌───────────┐   ┌──────────────────────────────┐
//! │  Embedding  │──▶│ Retriever │──▶│       AgentCoordinator       │
//! │  Index      │   │           │   │ strategy → draft → brand →   │
//! │ (SQLite/mem)│   │           │   │ distribution → response      │
//! └────────────┘   └───────────┘   └──────┬───────────────────────┘
//!                                         │ AgentActivityEvent
//!                         ┌───────────────┤
//!                         ▼               ▼
//!                    ┌──────────┐   ┌──────────┐
//!                    │   CLI    │   │   HTTP   │
//!                    │ (forge)  │   │ (axum/WS)│
//!                    └──────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! forge init                          # create database + collections
//! forge seed                          # load the demo corpus
//! forge search "solar ROI" --top 5
//! forge generate "solar ROI for manufacturers" --content-type blog_post
//! forge serve                         # HTTP + WebSocket streaming
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | SQLite connection pool |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite-backed index store |
//! | [`embedding`] | Embedding provider implementations |
//! | [`index`] | Collection management, upsert, and query |
//! | [`retriever`] | Context, brand-voice, recommendation, hybrid retrieval |
//! | [`engine`] | Generation capability boundary + template backend |
//! | [`agents`] | Strategy, brand-consistency, and distribution agents |
//! | [`platforms`] | Publishing client trait and registry |
//! | [`coordinator`] | Pipeline state machine and event streaming |
//! | [`server`] | HTTP + WebSocket surface |
//! | [`seed`] | Demo corpus |

pub mod agents;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod embedding;
pub mod engine;
pub mod index;
pub mod migrate;
pub mod platforms;
pub mod retriever;
pub mod seed;
pub mod server;
pub mod sqlite_store;
