//! In-memory Pickles 2 project used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use pickles2_mcp::logging::{FileLogger, LoggerOptions};
use pickles2_mcp::px2agent::{
    ClearCacheCallbacks, PublishOptions, Px2Error, Px2Project, Px2Result, QueryOptions,
};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const VERSION: &str = "2.1.5";
pub const CLEARCACHE_OUTPUT: &str = "cleared: caches/p/\ncleared: caches/c/\n";

/// How the fake finishes a clear-cache request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearCacheMode {
    Complete,
    DropCallback,
}

/// Fake project answering from fixed data and recording every call.
pub struct FakeProject {
    calls: Mutex<Vec<String>>,
    failure: Option<String>,
    clearcache_mode: ClearCacheMode,
}

impl FakeProject {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: None,
            clearcache_mode: ClearCacheMode::Complete,
        }
    }

    /// Every operation fails with this stderr.
    pub fn failing(stderr: &str) -> Self {
        Self {
            failure: Some(stderr.to_string()),
            ..Self::new()
        }
    }

    pub fn with_clearcache_mode(mut self, mode: ClearCacheMode) -> Self {
        self.clearcache_mode = mode;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Px2Result<()> {
        self.calls.lock().unwrap().push(call);
        match &self.failure {
            Some(stderr) => Err(Px2Error::Failed {
                status: "exit status: 1".to_string(),
                stderr: stderr.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn sitemap() -> Value {
        json!({
            "/index.html": {"path": "/index.html", "title": "Home", "id": ""},
            "/foo/": {"path": "/foo/", "title": "Foo", "id": "foo"},
            "/foo/bar/": {"path": "/foo/bar/", "title": "Bar", "id": "bar"},
            "/foo/baz/": {"path": "/foo/baz/", "title": "Baz", "id": "baz"}
        })
    }
}

/// JSON returned by the fake for a project operation on `path`.
pub fn json_fixture(operation: &str, path: &str) -> Value {
    match operation {
        "get_config" => json!({
            "name": "Example Site",
            "domain": "example.com",
            "path_controot": "/",
            "directory_index": ["index.html"]
        }),
        "get_sitemap" => FakeProject::sitemap(),
        "get_page_info" => FakeProject::sitemap()
            .get(path)
            .cloned()
            .unwrap_or(Value::Null),
        "get_parent" => match path {
            "/foo/bar/" | "/foo/baz/" => json!("/foo/"),
            "/foo/" => json!(""),
            _ => json!(false),
        },
        "get_children" => match path {
            "/foo/" => json!(["/foo/bar/", "/foo/baz/"]),
            _ => json!([]),
        },
        "get_bros" => json!(["/foo/bar/", "/foo/baz/"]),
        "get_bros_next" | "get_next" => json!("/foo/baz/"),
        "get_bros_prev" => json!(false),
        "get_prev" => json!("/foo/"),
        "get_breadcrumb_array" => json!(["", "foo"]),
        "get_dynamic_path_info" => json!({
            "path": "/news/{$id}/",
            "path_original": "/news/{$id}/",
            "id": "news_detail",
            "params": [{"name": "id"}]
        }),
        "get_actors" => json!(["/foo/actor.html"]),
        "get_directory_index" => json!(["index.html", "index.htm"]),
        other => panic!("no JSON fixture for {}", other),
    }
}

/// JSON returned by the fake for `px_command`.
pub fn px_fixture(
    command: &str,
    path: Option<&str>,
    params: Option<&BTreeMap<String, String>>,
) -> Value {
    json!({"command": command, "path": path.unwrap_or("/"), "params": params})
}

/// The value the fake project hands back for a JSON tool called with `args`.
pub fn expected_json(tool: &str, args: &Value) -> Value {
    let operation = tool.trim_start_matches("pickles2-").replace('-', "_");
    let path = args.get("path").and_then(Value::as_str);
    if operation == "px_command" {
        let command = args["command"].as_str().unwrap_or_default();
        let params: Option<BTreeMap<String, String>> = args
            .get("params")
            .map(|p| serde_json::from_value(p.clone()).unwrap());
        return px_fixture(command, path, params.as_ref());
    }
    json_fixture(&operation, path.unwrap_or_default())
}

fn options_suffix(options: Option<&Map<String, Value>>) -> String {
    options
        .map(|o| Value::Object(o.clone()).to_string())
        .unwrap_or_default()
}

#[async_trait]
impl Px2Project for FakeProject {
    async fn get_version(&self) -> Px2Result<String> {
        self.record("get_version".into())?;
        Ok(VERSION.to_string())
    }

    async fn get_config(&self) -> Px2Result<Value> {
        self.record("get_config".into())?;
        Ok(json_fixture("get_config", ""))
    }

    async fn get_sitemap(&self) -> Px2Result<Value> {
        self.record("get_sitemap".into())?;
        Ok(json_fixture("get_sitemap", ""))
    }

    async fn get_page_info(&self, path: &str) -> Px2Result<Value> {
        self.record(format!("get_page_info {}", path))?;
        Ok(json_fixture("get_page_info", path))
    }

    async fn get_parent(&self, path: &str) -> Px2Result<Value> {
        self.record(format!("get_parent {}", path))?;
        Ok(json_fixture("get_parent", path))
    }

    async fn get_children(
        &self,
        path: &str,
        options: Option<&Map<String, Value>>,
    ) -> Px2Result<Value> {
        self.record(format!("get_children {} {}", path, options_suffix(options)))?;
        Ok(json_fixture("get_children", path))
    }

    async fn get_bros(&self, path: &str, options: Option<&Map<String, Value>>) -> Px2Result<Value> {
        self.record(format!("get_bros {} {}", path, options_suffix(options)))?;
        Ok(json_fixture("get_bros", path))
    }

    async fn get_bros_next(
        &self,
        path: &str,
        options: Option<&Map<String, Value>>,
    ) -> Px2Result<Value> {
        self.record(format!("get_bros_next {} {}", path, options_suffix(options)))?;
        Ok(json_fixture("get_bros_next", path))
    }

    async fn get_bros_prev(
        &self,
        path: &str,
        options: Option<&Map<String, Value>>,
    ) -> Px2Result<Value> {
        self.record(format!("get_bros_prev {} {}", path, options_suffix(options)))?;
        Ok(json_fixture("get_bros_prev", path))
    }

    async fn get_next(&self, path: &str, options: Option<&Map<String, Value>>) -> Px2Result<Value> {
        self.record(format!("get_next {} {}", path, options_suffix(options)))?;
        Ok(json_fixture("get_next", path))
    }

    async fn get_prev(&self, path: &str, options: Option<&Map<String, Value>>) -> Px2Result<Value> {
        self.record(format!("get_prev {} {}", path, options_suffix(options)))?;
        Ok(json_fixture("get_prev", path))
    }

    async fn get_breadcrumb_array(&self, path: &str) -> Px2Result<Value> {
        self.record(format!("get_breadcrumb_array {}", path))?;
        Ok(json_fixture("get_breadcrumb_array", path))
    }

    async fn get_dynamic_path_info(&self, path: &str) -> Px2Result<Value> {
        self.record(format!("get_dynamic_path_info {}", path))?;
        Ok(json_fixture("get_dynamic_path_info", path))
    }

    async fn bind_dynamic_path_param(
        &self,
        path: &str,
        params: &BTreeMap<String, String>,
    ) -> Px2Result<String> {
        self.record(format!("bind_dynamic_path_param {}", path))?;
        let mut bound = path.to_string();
        for (name, value) in params {
            bound = bound.replace(&format!("{{${}}}", name), value);
        }
        Ok(bound)
    }

    async fn get_role(&self, path: &str) -> Px2Result<String> {
        self.record(format!("get_role {}", path))?;
        Ok("/foo/".to_string())
    }

    async fn get_actors(&self, path: &str) -> Px2Result<Value> {
        self.record(format!("get_actors {}", path))?;
        Ok(json_fixture("get_actors", path))
    }

    async fn get_realpath_homedir(&self) -> Px2Result<String> {
        self.record("get_realpath_homedir".into())?;
        Ok("/var/www/px-files/".to_string())
    }

    async fn get_path_controot(&self) -> Px2Result<String> {
        self.record("get_path_controot".into())?;
        Ok("/".to_string())
    }

    async fn get_realpath_docroot(&self) -> Px2Result<String> {
        self.record("get_realpath_docroot".into())?;
        Ok("/var/www/".to_string())
    }

    async fn get_path_content(&self, path: &str) -> Px2Result<String> {
        self.record(format!("get_path_content {}", path))?;
        Ok(format!("{}index.html", path))
    }

    async fn path_files(&self, path: &str, resource: Option<&str>) -> Px2Result<String> {
        self.record(format!("path_files {} {:?}", path, resource))?;
        Ok(format!("{}index_files/{}", path, resource.unwrap_or("")))
    }

    async fn realpath_files(&self, path: &str, resource: Option<&str>) -> Px2Result<String> {
        self.record(format!("realpath_files {} {:?}", path, resource))?;
        Ok(format!("/var/www{}index_files/{}", path, resource.unwrap_or("")))
    }

    async fn path_files_cache(&self, path: &str, resource: Option<&str>) -> Px2Result<String> {
        self.record(format!("path_files_cache {} {:?}", path, resource))?;
        Ok(format!("/caches/c{}index_files/{}", path, resource.unwrap_or("")))
    }

    async fn realpath_files_cache(&self, path: &str, resource: Option<&str>) -> Px2Result<String> {
        self.record(format!("realpath_files_cache {} {:?}", path, resource))?;
        Ok(format!(
            "/var/www/caches/c{}index_files/{}",
            path,
            resource.unwrap_or("")
        ))
    }

    async fn realpath_files_private_cache(
        &self,
        path: &str,
        resource: Option<&str>,
    ) -> Px2Result<String> {
        self.record(format!("realpath_files_private_cache {} {:?}", path, resource))?;
        Ok(format!(
            "/var/www/px-files/_sys/ram/caches/c{}{}",
            path,
            resource.unwrap_or("")
        ))
    }

    async fn get_domain(&self) -> Px2Result<String> {
        self.record("get_domain".into())?;
        Ok("example.com".to_string())
    }

    async fn get_directory_index(&self) -> Px2Result<Value> {
        self.record("get_directory_index".into())?;
        Ok(json_fixture("get_directory_index", ""))
    }

    async fn get_directory_index_primary(&self) -> Px2Result<String> {
        self.record("get_directory_index_primary".into())?;
        Ok("index.html".to_string())
    }

    async fn get_path_proc_type(&self, path: &str) -> Px2Result<String> {
        self.record(format!("get_path_proc_type {}", path))?;
        Ok(if path.ends_with(".css") { "css" } else { "html" }.to_string())
    }

    async fn href(&self, linkto: &str) -> Px2Result<String> {
        self.record(format!("href {}", linkto))?;
        Ok(format!("/subdir{}", linkto))
    }

    async fn is_match_dynamic_path(&self, path: &str) -> Px2Result<bool> {
        self.record(format!("is_match_dynamic_path {}", path))?;
        Ok(path.starts_with("/news/"))
    }

    async fn is_page_in_breadcrumb(&self, path: &str, path_in: &str) -> Px2Result<bool> {
        self.record(format!("is_page_in_breadcrumb {} {}", path, path_in))?;
        Ok(path.starts_with(path_in))
    }

    async fn is_ignore_path(&self, path: &str) -> Px2Result<bool> {
        self.record(format!("is_ignore_path {}", path))?;
        Ok(path.starts_with("/px-files/"))
    }

    async fn publish(&self, options: Option<&PublishOptions>) -> Px2Result<String> {
        self.record(format!("publish {:?}", options))?;
        Ok("Publish completed.\n".to_string())
    }

    fn clearcache(&self, callbacks: ClearCacheCallbacks) {
        if let Err(e) = self.record("clearcache".into()) {
            let _ = callbacks.complete.send(Err(e));
            return;
        }
        match self.clearcache_mode {
            ClearCacheMode::Complete => {
                if let Some(progress) = &callbacks.success {
                    for line in CLEARCACHE_OUTPUT.lines() {
                        let _ = progress.send(format!("{}\n", line));
                    }
                }
                let _ = callbacks.complete.send(Ok(CLEARCACHE_OUTPUT.to_string()));
            }
            ClearCacheMode::DropCallback => drop(callbacks),
        }
    }

    async fn query(&self, path: &str, options: Option<&QueryOptions>) -> Px2Result<String> {
        self.record(format!("query {} {:?}", path, options))?;
        Ok(format!("<html><body>{}</body></html>", path))
    }

    async fn px_command(
        &self,
        command: &str,
        path: Option<&str>,
        params: Option<&BTreeMap<String, String>>,
    ) -> Px2Result<Value> {
        self.record(format!("px_command {} {:?} {:?}", command, path, params))?;
        Ok(px_fixture(command, path, params))
    }
}

/// A logger writing to `dir/out.log`.
pub fn file_logger(dir: &Path, debug_mode: bool) -> (Arc<FileLogger>, PathBuf) {
    let path = dir.join("out.log");
    let logger = Arc::new(FileLogger::new(LoggerOptions {
        log_path: Some(path.clone()),
        debug_mode,
    }));
    (logger, path)
}

/// Lines currently in the log file.
pub fn log_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(String::from)
        .collect()
}
