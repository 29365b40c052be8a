//! Pickles 2 MCP Server
//!
//! Exposes the operations of a Pickles 2 project as MCP tools over stdio.

use anyhow::Result;
use clap::Parser;
use pickles2_mcp::cli::{Cli, TraceTarget};
use pickles2_mcp::config::{ConfigLoader, ToolsConfig};
use pickles2_mcp::logging::{FileLogger, LoggerOptions};
use pickles2_mcp::px2agent::{PhpProject, Px2Project};
use pickles2_mcp::tools::ToolHandler;
use rmcp::{
    ErrorData, RoleServer, ServerHandler, ServiceExt,
    model::{
        CallToolRequestParams, CallToolResult, InitializeResult, ListToolsResult,
        PaginatedRequestParams, ServerCapabilities,
    },
    service::RequestContext,
    transport::io::stdio,
};
use serde_json::{Value, json};
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::FmtSubscriber;

const INSTRUCTIONS: &str = "\
Tools for a Pickles 2 project. Start with pickles2-get-version or pickles2-get-sitemap; \
page tools take a sitemap path such as \"/about/index.html\".";

/// MCP server handler.
#[derive(Clone)]
struct Pickles2Server {
    tool_handler: Arc<ToolHandler>,
}

impl Pickles2Server {
    fn new(project: Arc<dyn Px2Project>, logger: Arc<FileLogger>, tools: ToolsConfig) -> Self {
        Self {
            tool_handler: Arc::new(ToolHandler::new(project, logger, tools)),
        }
    }
}

impl ServerHandler for Pickles2Server {
    fn get_info(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: Default::default(),
            server_info: rmcp::model::Implementation {
                name: "Pickles 2 MCP".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            capabilities: ServerCapabilities {
                tools: Some(rmcp::model::ToolsCapability::default()),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            tools: self.tool_handler.get_tools(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        let tool_name = request.name.to_string();
        let start = std::time::Instant::now();

        let args = Value::Object(request.arguments.unwrap_or_default());
        let result = self.tool_handler.call_tool_result(&tool_name, args).await;

        let elapsed = start.elapsed();
        debug!(tool = %tool_name, duration_ms = elapsed.as_millis() as u64, "Tool call finished");
        result
    }
}

fn init_tracing(target: &TraceTarget, verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    match target {
        TraceTarget::Off => {}
        TraceTarget::Stderr => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        TraceTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.trace, cli.debug)?;

    let mut loader = ConfigLoader::load(cli.config.as_deref())?;
    if let Some(php) = &cli.php {
        loader.config_mut().php.bin = php.clone();
    }
    let config_path = loader.config_path().map(|p| p.display().to_string());
    let config = loader.into_config();

    let logger = Arc::new(FileLogger::new(LoggerOptions {
        log_path: cli.log_path.clone(),
        debug_mode: cli.debug,
    }));
    let log_path = cli
        .log_path
        .as_ref()
        .map(|p| p.display().to_string());

    logger.info("===== Pickles 2 MCP server started =====");
    logger.info(&format!("Entry script: {}", cli.entry_script.display()));
    logger.info(&format!("Debug mode: {}", cli.debug));
    logger.info(&format!("Log path: {}", log_path.as_deref().unwrap_or("none")));
    logger.info(&json!({
        "entryScript": cli.entry_script.display().to_string(),
        "debug": cli.debug,
        "logPath": log_path,
        "config": config_path,
        "php": config.php.bin.display().to_string(),
    }));

    info!(
        "Starting Pickles 2 MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!("Entry script: {:?}", cli.entry_script);
    info!("PHP binary: {:?}", config.php.bin);
    if let Some(path) = &config_path {
        info!("Config: {}", path);
    }
    if !cli.entry_script.exists() {
        warn!("Entry script {:?} does not exist", cli.entry_script);
        logger.warn(&format!(
            "Entry script does not exist: {}",
            cli.entry_script.display()
        ));
    }

    let project: Arc<dyn Px2Project> =
        Arc::new(PhpProject::new(cli.entry_script.clone(), config.php.clone()));
    let server = Pickles2Server::new(project, Arc::clone(&logger), config.tools);

    info!("Server ready, listening on stdio");
    if let Err(e) = serve(server).await {
        logger.exception(&e);
        return Err(e);
    }
    Ok(())
}

async fn serve(server: Pickles2Server) -> Result<()> {
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
