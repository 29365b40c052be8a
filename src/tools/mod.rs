//! MCP tool implementations.

pub mod clearcache;
pub mod registry;

use crate::config::ToolsConfig;
use crate::error::{ToolError, ToolResult};
use crate::logging::FileLogger;
use crate::px2agent::{PublishOptions, Px2Project, QueryOptions};
use clearcache::ClearCache;
use registry::{Operation, ResultFormat, TOOLS, ToolSpec};
use rmcp::ErrorData;
use rmcp::model::{CallToolResult, Content, Tool};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Prefix of the clear-cache response, followed by the Pickles 2 output.
pub const CLEARCACHE_BANNER: &str = "Cache cleared.\n\n";

/// Shape of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    /// Object whose values are all strings.
    StringMap,
    /// Free-form object passed through to Pickles 2.
    Object,
    PublishOptions,
    QueryOptions,
}

impl ParamKind {
    /// JSON schema fragment for a parameter of this kind.
    pub fn schema(self, description: &str) -> Value {
        match self {
            ParamKind::String => json!({ "type": "string", "description": description }),
            ParamKind::StringMap => json!({
                "type": "object",
                "additionalProperties": { "type": "string" },
                "description": description
            }),
            ParamKind::Object => json!({
                "type": "object",
                "additionalProperties": true,
                "description": description
            }),
            ParamKind::PublishOptions => registry::publish_options_schema(description),
            ParamKind::QueryOptions => registry::query_options_schema(description),
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::StringMap => value
                .as_object()
                .is_some_and(|m| m.values().all(Value::is_string)),
            ParamKind::Object => value.is_object(),
            ParamKind::PublishOptions => {
                value.is_object() && PublishOptions::deserialize(value).is_ok()
            }
            ParamKind::QueryOptions => {
                value.is_object() && QueryOptions::deserialize(value).is_ok()
            }
        }
    }

    fn expected(self) -> &'static str {
        match self {
            ParamKind::String => "expected a string",
            ParamKind::StringMap => "expected an object of strings",
            ParamKind::Object => "expected an object",
            ParamKind::PublishOptions => {
                "expected {path_region?: string, paths_region?: string[], paths_ignore?: string[], keep_cache?: boolean}"
            }
            ParamKind::QueryOptions => {
                "expected {method?: string, body?: string, bodyFile?: string}"
            }
        }
    }
}

/// Check arguments against a tool's declared parameters.
///
/// Optional parameters may be omitted but are never `null`. Undeclared keys
/// are ignored.
pub fn validate(spec: &ToolSpec, args: &Value) -> ToolResult<()> {
    for param in spec.params {
        match args.get(param.name) {
            None if param.required => return Err(ToolError::missing_field(param.name)),
            None => {}
            Some(value) if !param.kind.accepts(value) => {
                return Err(ToolError::invalid_value(param.name, param.kind.expected()));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Turn a delegate result into response text.
pub fn format_result(format: ResultFormat, value: Value) -> ToolResult<String> {
    match (format, value) {
        (ResultFormat::Text, Value::String(s)) => Ok(s),
        (ResultFormat::Text, other) => Ok(other.to_string()),
        (ResultFormat::Json, value) => serde_json::to_string(&value).map_err(ToolError::internal),
    }
}

/// Tool handler that processes MCP tool calls.
pub struct ToolHandler {
    project: Arc<dyn Px2Project>,
    logger: Arc<FileLogger>,
    tools_config: ToolsConfig,
}

impl ToolHandler {
    pub fn new(
        project: Arc<dyn Px2Project>,
        logger: Arc<FileLogger>,
        tools_config: ToolsConfig,
    ) -> Self {
        Self {
            project,
            logger,
            tools_config,
        }
    }

    /// Get all available tools.
    pub fn get_tools(&self) -> Vec<Tool> {
        TOOLS
            .iter()
            .map(|spec| spec.to_tool(self.tools_config.get_description(spec.name)))
            .collect()
    }

    /// Call a tool by name.
    ///
    /// Validation failures are returned before anything is logged.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> ToolResult<String> {
        let spec = registry::find(name).ok_or_else(|| ToolError::unknown_tool(name))?;
        validate(spec, &arguments)?;
        self.invoke(spec, &arguments).await
    }

    /// Call a tool and wrap the outcome as an MCP response.
    ///
    /// Validation failures become protocol errors. Project failures become an
    /// `is_error` result and are written to the log file.
    pub async fn call_tool_result(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<CallToolResult, ErrorData> {
        match self.call_tool(name, arguments).await {
            Ok(text) => Ok(CallToolResult {
                content: vec![Content::text(text)],
                is_error: None,
                meta: None,
                structured_content: None,
            }),
            Err(err) if err.code.is_validation() => {
                warn!(
                    tool = %name,
                    error_code = ?err.code,
                    error_message = %err.message,
                    "Tool call rejected"
                );
                Err(err.into())
            }
            Err(err) => {
                warn!(
                    tool = %name,
                    error_code = ?err.code,
                    error_message = %err.message,
                    "Tool call failed"
                );
                self.logger.error(&err);
                Ok(CallToolResult {
                    content: vec![Content::text(err.to_json_string())],
                    is_error: Some(true),
                    meta: None,
                    structured_content: None,
                })
            }
        }
    }

    async fn invoke(&self, spec: &ToolSpec, args: &Value) -> ToolResult<String> {
        self.logger.info(&format!("Run command: {}", spec.name));
        self.logger.debug(args);

        let value = self.call_project(spec.operation, args).await?;
        let text = format_result(spec.format, value)?;

        self.logger.debug(&text);
        self.logger.info(&format!("Run command: {}; done", spec.name));
        Ok(text)
    }

    async fn call_project(&self, operation: Operation, args: &Value) -> ToolResult<Value> {
        let p = self.project.as_ref();
        let options = get_object(args, "options");
        let resource = args.get("resource").and_then(Value::as_str);

        let value = match operation {
            Operation::GetVersion => Value::from(p.get_version().await?),
            Operation::GetConfig => p.get_config().await?,
            Operation::GetSitemap => p.get_sitemap().await?,
            Operation::GetPageInfo => p.get_page_info(page(args)?).await?,
            Operation::GetParent => p.get_parent(page(args)?).await?,
            Operation::GetChildren => p.get_children(page(args)?, options).await?,
            Operation::GetBros => p.get_bros(page(args)?, options).await?,
            Operation::GetBrosNext => p.get_bros_next(page(args)?, options).await?,
            Operation::GetBrosPrev => p.get_bros_prev(page(args)?, options).await?,
            Operation::GetNext => p.get_next(page(args)?, options).await?,
            Operation::GetPrev => p.get_prev(page(args)?, options).await?,
            Operation::GetBreadcrumbArray => p.get_breadcrumb_array(page(args)?).await?,
            Operation::GetDynamicPathInfo => p.get_dynamic_path_info(page(args)?).await?,
            Operation::BindDynamicPathParam => {
                let params = get_string_map(args, "params")
                    .ok_or_else(|| ToolError::missing_field("params"))?;
                Value::from(p.bind_dynamic_path_param(page(args)?, &params).await?)
            }
            Operation::GetRole => Value::from(p.get_role(page(args)?).await?),
            Operation::GetActors => p.get_actors(page(args)?).await?,
            Operation::GetRealpathHomedir => Value::from(p.get_realpath_homedir().await?),
            Operation::GetPathControot => Value::from(p.get_path_controot().await?),
            Operation::GetRealpathDocroot => Value::from(p.get_realpath_docroot().await?),
            Operation::GetPathContent => Value::from(p.get_path_content(page(args)?).await?),
            Operation::PathFiles => Value::from(p.path_files(page(args)?, resource).await?),
            Operation::RealpathFiles => {
                let path = page(args)?;
                Value::from(p.realpath_files(path, resource).await?)
            }
            Operation::PathFilesCache => {
                let path = page(args)?;
                Value::from(p.path_files_cache(path, resource).await?)
            }
            Operation::RealpathFilesCache => {
                let path = page(args)?;
                Value::from(p.realpath_files_cache(path, resource).await?)
            }
            Operation::RealpathFilesPrivateCache => {
                let path = page(args)?;
                Value::from(p.realpath_files_private_cache(path, resource).await?)
            }
            Operation::GetDomain => Value::from(p.get_domain().await?),
            Operation::GetDirectoryIndex => p.get_directory_index().await?,
            Operation::GetDirectoryIndexPrimary => {
                Value::from(p.get_directory_index_primary().await?)
            }
            Operation::GetPathProcType => Value::from(p.get_path_proc_type(page(args)?).await?),
            Operation::Href => Value::from(p.href(page(args)?).await?),
            Operation::IsMatchDynamicPath => {
                Value::from(p.is_match_dynamic_path(page(args)?).await?)
            }
            Operation::IsPageInBreadcrumb => {
                let path_in = get_string(args, "path_in")
                    .ok_or_else(|| ToolError::missing_field("path_in"))?;
                Value::from(p.is_page_in_breadcrumb(page(args)?, &path_in).await?)
            }
            Operation::IsIgnorePath => Value::from(p.is_ignore_path(page(args)?).await?),
            Operation::Publish => {
                let options: Option<PublishOptions> = get_typed(args, "options")?;
                Value::from(p.publish(options.as_ref()).await?)
            }
            Operation::ClearCache => Value::from(self.clearcache().await?),
            Operation::Query => {
                let options: Option<QueryOptions> = get_typed(args, "options")?;
                Value::from(p.query(page(args)?, options.as_ref()).await?)
            }
            Operation::PxCommand => {
                let command = get_string(args, "command")
                    .ok_or_else(|| ToolError::missing_field("command"))?;
                let path = args.get("path").and_then(Value::as_str);
                let params = get_string_map(args, "params");
                p.px_command(&command, path, params.as_ref()).await?
            }
        };
        Ok(value)
    }

    /// Clear caches and prefix the output with [`CLEARCACHE_BANNER`].
    async fn clearcache(&self) -> ToolResult<String> {
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn(async move {
            while let Some(chunk) = progress_rx.recv().await {
                debug!(output = %chunk.trim_end(), "clearcache progress");
            }
        });

        let stdout = ClearCache::new(self.project.as_ref())
            .with_progress(progress_tx)
            .run()
            .await?;
        Ok(format!("{}{}", CLEARCACHE_BANNER, stdout))
    }
}

/// Helper to create a tool definition.
pub fn make_tool(name: &str, description: &str, properties: Value, required: Vec<&str>) -> Tool {
    let input_schema = rmcp::model::JsonObject::from_iter([
        ("type".to_string(), json!("object")),
        ("properties".to_string(), properties),
        ("required".to_string(), json!(required)),
    ]);

    Tool::new(name.to_string(), description.to_string(), input_schema)
}

/// The sitemap path every page tool takes.
fn page(args: &Value) -> ToolResult<&str> {
    args.get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::missing_field("path"))
}

/// Helper to get a string from arguments.
pub fn get_string(args: &Value, key: &str) -> Option<String> {
    args.get(key).and_then(|v| v.as_str().map(String::from))
}

/// Helper to get an object from arguments.
pub fn get_object<'a>(args: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    args.get(key).and_then(Value::as_object)
}

/// Helper to get an object of strings from arguments. Non-string values are skipped.
pub fn get_string_map(args: &Value, key: &str) -> Option<BTreeMap<String, String>> {
    get_object(args, key).map(|m| {
        m.iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect()
    })
}

/// Helper to deserialize an optional structured argument.
pub fn get_typed<T: DeserializeOwned>(args: &Value, key: &str) -> ToolResult<Option<T>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => T::deserialize(value)
            .map(Some)
            .map_err(|e| ToolError::invalid_value(key, &e.to_string())),
    }
}
