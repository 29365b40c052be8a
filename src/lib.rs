//! Pickles 2 MCP Server Library
//!
//! This module exports the core components for testing and integration.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod px2agent;
pub mod tools;
