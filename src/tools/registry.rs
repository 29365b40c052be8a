//! Declarative table of the Pickles 2 tools.
//!
//! Each row names the tool, its parameters, the project operation it calls
//! and how the result becomes text.

use super::{ParamKind, make_tool};
use rmcp::model::Tool;
use serde_json::{Map, Value, json};

/// How a delegate result becomes the response text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    /// Strings pass through unchanged; booleans become `true`/`false`.
    Text,
    /// Serialized as compact JSON.
    Json,
}

/// Project operation behind a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetVersion,
    GetConfig,
    GetSitemap,
    GetPageInfo,
    GetParent,
    GetChildren,
    GetBros,
    GetBrosNext,
    GetBrosPrev,
    GetNext,
    GetPrev,
    GetBreadcrumbArray,
    GetDynamicPathInfo,
    BindDynamicPathParam,
    GetRole,
    GetActors,
    GetRealpathHomedir,
    GetPathControot,
    GetRealpathDocroot,
    GetPathContent,
    PathFiles,
    RealpathFiles,
    PathFilesCache,
    RealpathFilesCache,
    RealpathFilesPrivateCache,
    GetDomain,
    GetDirectoryIndex,
    GetDirectoryIndexPrimary,
    GetPathProcType,
    Href,
    IsMatchDynamicPath,
    IsPageInBreadcrumb,
    IsIgnorePath,
    Publish,
    ClearCache,
    Query,
    PxCommand,
}

/// One declared tool parameter.
#[derive(Debug, Clone, Copy)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
}

const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Param {
    Param {
        name,
        kind,
        description,
        required: true,
    }
}

const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Param {
    Param {
        name,
        kind,
        description,
        required: false,
    }
}

/// One registry row.
#[derive(Debug)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [Param],
    pub operation: Operation,
    pub format: ResultFormat,
}

impl ToolSpec {
    /// MCP tool definition, with an optional description override.
    pub fn to_tool(&self, description: Option<&str>) -> Tool {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.to_string(), p.kind.schema(p.description)))
            .collect();
        let required = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();
        make_tool(
            self.name,
            description.unwrap_or(self.description),
            Value::Object(properties),
            required,
        )
    }
}

/// Look up a tool by name.
pub fn find(name: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|t| t.name == name)
}

const PATH: Param = required("path", ParamKind::String, "Page path");
const RESOURCE: Param = optional("resource", ParamKind::String, "Resource path");

use Operation as Op;
use ParamKind as K;
use ResultFormat::{Json, Text};

pub static TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "pickles2-get-version",
        description: "Get Pickles 2 version.",
        params: &[],
        operation: Op::GetVersion,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-get-config",
        description: "Get Pickles 2 config.",
        params: &[],
        operation: Op::GetConfig,
        format: Json,
    },
    ToolSpec {
        name: "pickles2-get-sitemap",
        description: "Get Pickles 2 sitemap.",
        params: &[],
        operation: Op::GetSitemap,
        format: Json,
    },
    ToolSpec {
        name: "pickles2-get-page-info",
        description: "Get page information.",
        params: &[PATH],
        operation: Op::GetPageInfo,
        format: Json,
    },
    ToolSpec {
        name: "pickles2-get-parent",
        description: "Get parent page.",
        params: &[PATH],
        operation: Op::GetParent,
        format: Json,
    },
    ToolSpec {
        name: "pickles2-get-children",
        description: "Get child pages.",
        params: &[
            PATH,
            optional("options", K::Object, "Options for getting children"),
        ],
        operation: Op::GetChildren,
        format: Json,
    },
    ToolSpec {
        name: "pickles2-get-bros",
        description: "Get sibling pages.",
        params: &[
            PATH,
            optional("options", K::Object, "Options for getting brothers"),
        ],
        operation: Op::GetBros,
        format: Json,
    },
    ToolSpec {
        name: "pickles2-get-bros-next",
        description: "Get next sibling page.",
        params: &[
            PATH,
            optional("options", K::Object, "Options for getting next brother"),
        ],
        operation: Op::GetBrosNext,
        format: Json,
    },
    ToolSpec {
        name: "pickles2-get-bros-prev",
        description: "Get previous sibling page.",
        params: &[
            PATH,
            optional("options", K::Object, "Options for getting previous brother"),
        ],
        operation: Op::GetBrosPrev,
        format: Json,
    },
    ToolSpec {
        name: "pickles2-get-next",
        description: "Get next page.",
        params: &[
            PATH,
            optional("options", K::Object, "Options for getting next page"),
        ],
        operation: Op::GetNext,
        format: Json,
    },
    ToolSpec {
        name: "pickles2-get-prev",
        description: "Get previous page.",
        params: &[
            PATH,
            optional("options", K::Object, "Options for getting previous page"),
        ],
        operation: Op::GetPrev,
        format: Json,
    },
    ToolSpec {
        name: "pickles2-get-breadcrumb-array",
        description: "Get breadcrumb array.",
        params: &[PATH],
        operation: Op::GetBreadcrumbArray,
        format: Json,
    },
    ToolSpec {
        name: "pickles2-get-dynamic-path-info",
        description: "Get dynamic path information.",
        params: &[PATH],
        operation: Op::GetDynamicPathInfo,
        format: Json,
    },
    ToolSpec {
        name: "pickles2-bind-dynamic-path-param",
        description: "Bind dynamic path parameters.",
        params: &[
            PATH,
            required(
                "params",
                K::StringMap,
                "Parameters to bind to the dynamic path",
            ),
        ],
        operation: Op::BindDynamicPathParam,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-get-role",
        description: "Get role.",
        params: &[PATH],
        operation: Op::GetRole,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-get-actors",
        description: "Get actors.",
        params: &[PATH],
        operation: Op::GetActors,
        format: Json,
    },
    ToolSpec {
        name: "pickles2-get-realpath-homedir",
        description: "Get home directory path.",
        params: &[],
        operation: Op::GetRealpathHomedir,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-get-path-controot",
        description: "Get content root directory path.",
        params: &[],
        operation: Op::GetPathControot,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-get-realpath-docroot",
        description: "Get DOCUMENT_ROOT path.",
        params: &[],
        operation: Op::GetRealpathDocroot,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-get-path-content",
        description: "Get content path.",
        params: &[PATH],
        operation: Op::GetPathContent,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-path-files",
        description: "Get local resource directory path.",
        params: &[PATH, RESOURCE],
        operation: Op::PathFiles,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-realpath-files",
        description: "Get local resource directory server path.",
        params: &[PATH, RESOURCE],
        operation: Op::RealpathFiles,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-path-files-cache",
        description: "Get local resource cache directory path.",
        params: &[PATH, RESOURCE],
        operation: Op::PathFilesCache,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-realpath-files-cache",
        description: "Get local resource cache directory server path.",
        params: &[PATH, RESOURCE],
        operation: Op::RealpathFilesCache,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-realpath-files-private-cache",
        description: "Get content-specific private cache directory server path.",
        params: &[PATH, RESOURCE],
        operation: Op::RealpathFilesPrivateCache,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-get-domain",
        description: "Get domain.",
        params: &[],
        operation: Op::GetDomain,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-get-directory-index",
        description: "Get directory index list.",
        params: &[],
        operation: Op::GetDirectoryIndex,
        format: Json,
    },
    ToolSpec {
        name: "pickles2-get-directory-index-primary",
        description: "Get primary directory index.",
        params: &[],
        operation: Op::GetDirectoryIndexPrimary,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-get-path-proc-type",
        description: "Get path processing type.",
        params: &[required("path", K::String, "File path")],
        operation: Op::GetPathProcType,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-href",
        description: "Generate link path.",
        params: &[required("path", K::String, "Link to path")],
        operation: Op::Href,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-is-match-dynamic-path",
        description: "Check if path matches dynamic path.",
        params: &[required("path", K::String, "Path to check")],
        operation: Op::IsMatchDynamicPath,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-is-page-in-breadcrumb",
        description: "Check if page exists in breadcrumb.",
        params: &[
            PATH,
            required("path_in", K::String, "Path to check in breadcrumb"),
        ],
        operation: Op::IsPageInBreadcrumb,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-is-ignore-path",
        description: "Check if path is ignore path.",
        params: &[required("path", K::String, "Path to check")],
        operation: Op::IsIgnorePath,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-publish",
        description: "Publish Pickles 2 project.",
        params: &[optional("options", K::PublishOptions, "Publish options")],
        operation: Op::Publish,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-clearcache",
        description: "Clear the Pickles 2 cache.",
        params: &[],
        operation: Op::ClearCache,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-query",
        description: "Execute a custom query to Pickles 2.",
        params: &[
            required("path", K::String, "Query path"),
            optional("options", K::QueryOptions, "Query options"),
        ],
        operation: Op::Query,
        format: Text,
    },
    ToolSpec {
        name: "pickles2-px-command",
        description: "Execute a PX command.",
        params: &[
            required("command", K::String, "PX command"),
            optional("path", K::String, "Path"),
            optional("params", K::StringMap, "Command parameters"),
        ],
        operation: Op::PxCommand,
        format: Json,
    },
];

/// Schema fragment for the publish options object.
pub(super) fn publish_options_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "description": description,
        "properties": {
            "path_region": { "type": "string", "description": "Path region to publish" },
            "paths_region": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Path regions to publish"
            },
            "paths_ignore": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Paths to ignore"
            },
            "keep_cache": { "type": "boolean", "description": "Keep cache" }
        }
    })
}

/// Schema fragment for the query options object.
pub(super) fn query_options_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "description": description,
        "properties": {
            "method": { "type": "string", "description": "HTTP method" },
            "body": { "type": "string", "description": "Request body" },
            "bodyFile": { "type": "string", "description": "Path to request body file" }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tool_names_are_unique() {
        let names: HashSet<&str> = TOOLS.iter().map(|t| t.name).collect();
        assert_eq!(names.len(), TOOLS.len());
        assert_eq!(TOOLS.len(), 37);
    }

    #[test]
    fn test_every_name_is_prefixed() {
        for tool in TOOLS {
            assert!(tool.name.starts_with("pickles2-"), "{}", tool.name);
        }
    }

    #[test]
    fn test_find() {
        let spec = find("pickles2-get-children").unwrap();
        assert_eq!(spec.operation, Operation::GetChildren);
        assert_eq!(spec.format, ResultFormat::Json);
        assert!(find("pickles2-unknown").is_none());
    }

    #[test]
    fn test_tool_schema_lists_required_params() {
        let tool = find("pickles2-is-page-in-breadcrumb").unwrap().to_tool(None);
        let schema = &tool.input_schema;
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["path", "path_in"]));
        assert_eq!(schema["properties"]["path_in"]["type"], "string");
    }

    #[test]
    fn test_tool_schema_without_params() {
        let tool = find("pickles2-get-version").unwrap().to_tool(None);
        assert_eq!(tool.input_schema["properties"], json!({}));
        assert_eq!(tool.input_schema["required"], json!([]));
        assert_eq!(tool.description.as_deref(), Some("Get Pickles 2 version."));
    }

    #[test]
    fn test_description_override() {
        let tool = find("pickles2-href")
            .unwrap()
            .to_tool(Some("Resolve a link."));
        assert_eq!(tool.description.as_deref(), Some("Resolve a link."));
    }

    #[test]
    fn test_nested_option_schemas() {
        let publish = find("pickles2-publish").unwrap().to_tool(None);
        let options = &publish.input_schema["properties"]["options"];
        assert_eq!(options["properties"]["paths_region"]["type"], "array");
        assert_eq!(options["properties"]["keep_cache"]["type"], "boolean");

        let query = find("pickles2-query").unwrap().to_tool(None);
        assert_eq!(
            query.input_schema["properties"]["options"]["properties"]["bodyFile"]["type"],
            "string"
        );
    }
}
