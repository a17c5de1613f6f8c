// src/core/mod.rs

pub mod arg_parser;
pub mod bootstrap;
pub mod command_registry;
pub mod config_loader;
pub mod deprecation;
pub mod input_resolver;
pub mod option_schema;
pub mod orchestrator;
pub mod paths;
pub mod property_path;
pub mod resolution;
pub mod sources;
pub mod variables;
