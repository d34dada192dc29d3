//! # telemorph
//!
//! The Telemorph application: HTTP API, CLI and configuration around the
//! `telemorph-core` translation engine.

pub mod api;
pub mod cli;
pub mod config;
