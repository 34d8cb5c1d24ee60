//! stackc-lib: Core types and logic for stackc
//!
//! This crate compiles a declarative stack configuration into a deployable
//! resource document:
//! - `config`: the stack configuration model and its validation passes
//! - `naming`: deterministic physical names, ARNs and tags
//! - `graph`: the staged resource graph and its builder
//! - `synth`: the flattened output document and outputs manifest
//! - `parity`: structural comparison of two documents
//! - `baseline`: accepted documents persisted per environment

pub mod baseline;
pub mod compile;
pub mod config;
pub mod consts;
pub mod graph;
pub mod naming;
pub mod parity;
pub mod placeholder;
pub mod platform;
pub mod synth;
pub mod util;

pub use compile::{CompileError, CompileOptions, Compiled, compile};
