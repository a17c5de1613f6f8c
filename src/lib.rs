//! # preflight
//!
//! The bootstrap layer of an infrastructure command-line tool. Before any
//! deployment action runs, raw command-line tokens are turned into a command
//! name plus typed options (`core::input_resolver`), and the service
//! configuration has its variable expressions resolved in ordered phases
//! (`core::orchestrator`).

include!(concat!(env!("OUT_DIR"), "/translations.rs"));

pub mod cli;
pub mod constants;
pub mod core;
pub mod dev_utils;
pub mod models;
