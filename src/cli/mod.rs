//! CLI definition for pickles2-mcp.
//!
//! The server always runs over stdio, so there are no subcommands.

use clap::Parser;
use std::path::PathBuf;

/// Where diagnostic tracing output goes.
///
/// stdout carries the MCP protocol and is never a valid target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceTarget {
    Off,
    Stderr,
    File(PathBuf),
}

/// Parse `0`/`off`, `2`/`stderr`, or a filename.
pub fn parse_trace_target(value: &str) -> Result<TraceTarget, String> {
    match value {
        "0" | "off" => Ok(TraceTarget::Off),
        "2" | "stderr" => Ok(TraceTarget::Stderr),
        "1" | "stdout" => Err("stdout is reserved for the MCP transport".to_string()),
        "" => Err("trace target must not be empty".to_string()),
        filename => Ok(TraceTarget::File(PathBuf::from(filename))),
    }
}

/// A MCP server for Pickles 2
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// [Required] Entry script for the Pickles 2.
    #[arg(long, value_name = "PATH")]
    pub entry_script: PathBuf,

    /// Output extra debugging
    #[arg(short, long)]
    pub debug: bool,

    /// Log output path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// PHP binary (overrides config)
    #[arg(long, value_name = "PATH")]
    pub php: Option<PathBuf>,

    /// Diagnostic output: 0/off, 2/stderr (default), or filename
    #[arg(long, default_value = "2", value_parser = parse_trace_target)]
    pub trace: TraceTarget,
}
