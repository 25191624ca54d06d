//! # regtrace
//!
//! Command-line front end of the regtrace-core reduction engine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                apps/regtrace (THE BINARY)            │
//! │                                                      │
//! │  ┌───────────┐    ┌────────────┐    ┌────────────┐   │
//! │  │   CLI     │    │   Config   │    │    Run     │   │
//! │  │  (clap)   │    │   (toml)   │    │ discovery  │   │
//! │  └─────┬─────┘    └─────┬──────┘    └─────┬──────┘   │
//! │        └────────────────┼─────────────────┘          │
//! │                         ▼                            │
//! │                 ┌───────────────┐                    │
//! │                 │ regtrace-core │                    │
//! │                 │  (THE LOGIC)  │                    │
//! │                 └───────────────┘                    │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Reduce every run and write the organism summary
//! regtrace aggregate --data ./data --dump ./out --update 10000
//!
//! # Build regulation graphs from the event tables
//! regtrace graphs --data ./out --dump ./graphs --tables
//! ```

pub mod cli;
pub mod config;
pub mod runs;
