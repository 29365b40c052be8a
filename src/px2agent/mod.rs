//! Pickles 2 project handle.
//!
//! [`Px2Project`] lists exactly the project operations the MCP tools call.
//! [`PhpProject`] implements it by running the project's entry script
//! through the PHP command line.

mod php;

pub use php::{PhpProject, flatten_options, request_path};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Errors raised while talking to a Pickles 2 project.
#[derive(Debug, Error)]
pub enum Px2Error {
    #[error("failed to start {bin}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: io::Error,
    },

    #[error("Pickles 2 exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("unexpected output for {command}: {reason}")]
    Decode { command: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("clear cache finished without reporting completion")]
    Cancelled,
}

pub type Px2Result<T> = std::result::Result<T, Px2Error>;

/// Options accepted by `publish`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths_region: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths_ignore: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_cache: Option<bool>,
}

/// Options accepted by `query`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, rename = "bodyFile", skip_serializing_if = "Option::is_none")]
    pub body_file: Option<String>,
}

/// Notifications for the callback-style clear-cache operation.
///
/// `complete` fires exactly once with the full output. `success` receives
/// output chunks as they arrive, when present.
pub struct ClearCacheCallbacks {
    pub success: Option<mpsc::UnboundedSender<String>>,
    pub complete: oneshot::Sender<Px2Result<String>>,
}

/// The operations of a Pickles 2 project used by the MCP tools.
///
/// Page-relative operations take a sitemap path such as `/foo/bar.html`.
/// `options` objects are passed through to Pickles 2 untouched.
#[async_trait]
pub trait Px2Project: Send + Sync {
    async fn get_version(&self) -> Px2Result<String>;
    async fn get_config(&self) -> Px2Result<Value>;
    async fn get_sitemap(&self) -> Px2Result<Value>;

    async fn get_page_info(&self, path: &str) -> Px2Result<Value>;
    async fn get_parent(&self, path: &str) -> Px2Result<Value>;
    async fn get_children(&self, path: &str, options: Option<&Map<String, Value>>)
    -> Px2Result<Value>;
    async fn get_bros(&self, path: &str, options: Option<&Map<String, Value>>) -> Px2Result<Value>;
    async fn get_bros_next(
        &self,
        path: &str,
        options: Option<&Map<String, Value>>,
    ) -> Px2Result<Value>;
    async fn get_bros_prev(
        &self,
        path: &str,
        options: Option<&Map<String, Value>>,
    ) -> Px2Result<Value>;
    async fn get_next(&self, path: &str, options: Option<&Map<String, Value>>) -> Px2Result<Value>;
    async fn get_prev(&self, path: &str, options: Option<&Map<String, Value>>) -> Px2Result<Value>;
    async fn get_breadcrumb_array(&self, path: &str) -> Px2Result<Value>;

    async fn get_dynamic_path_info(&self, path: &str) -> Px2Result<Value>;
    async fn bind_dynamic_path_param(
        &self,
        path: &str,
        params: &BTreeMap<String, String>,
    ) -> Px2Result<String>;

    async fn get_role(&self, path: &str) -> Px2Result<String>;
    async fn get_actors(&self, path: &str) -> Px2Result<Value>;

    async fn get_realpath_homedir(&self) -> Px2Result<String>;
    async fn get_path_controot(&self) -> Px2Result<String>;
    async fn get_realpath_docroot(&self) -> Px2Result<String>;
    async fn get_path_content(&self, path: &str) -> Px2Result<String>;
    async fn path_files(&self, path: &str, resource: Option<&str>) -> Px2Result<String>;
    async fn realpath_files(&self, path: &str, resource: Option<&str>) -> Px2Result<String>;
    async fn path_files_cache(&self, path: &str, resource: Option<&str>) -> Px2Result<String>;
    async fn realpath_files_cache(&self, path: &str, resource: Option<&str>) -> Px2Result<String>;
    async fn realpath_files_private_cache(
        &self,
        path: &str,
        resource: Option<&str>,
    ) -> Px2Result<String>;

    async fn get_domain(&self) -> Px2Result<String>;
    async fn get_directory_index(&self) -> Px2Result<Value>;
    async fn get_directory_index_primary(&self) -> Px2Result<String>;
    async fn get_path_proc_type(&self, path: &str) -> Px2Result<String>;
    async fn href(&self, linkto: &str) -> Px2Result<String>;

    async fn is_match_dynamic_path(&self, path: &str) -> Px2Result<bool>;
    async fn is_page_in_breadcrumb(&self, path: &str, path_in: &str) -> Px2Result<bool>;
    async fn is_ignore_path(&self, path: &str) -> Px2Result<bool>;

    async fn publish(&self, options: Option<&PublishOptions>) -> Px2Result<String>;

    /// Start clearing caches. Completion is reported through `callbacks`.
    fn clearcache(&self, callbacks: ClearCacheCallbacks);

    async fn query(&self, path: &str, options: Option<&QueryOptions>) -> Px2Result<String>;
    async fn px_command(
        &self,
        command: &str,
        path: Option<&str>,
        params: Option<&BTreeMap<String, String>>,
    ) -> Px2Result<Value>;
}
