//! Runs Pickles 2 through the PHP command line.
//!
//! Every operation is one invocation of
//! `php [-c ini] [-d extension_dir=..] <entry script> [query flags] <request>`
//! where `<request>` is a path with a `PX=<command>` query.

use super::{ClearCacheCallbacks, PublishOptions, Px2Error, Px2Project, Px2Result, QueryOptions};
use crate::config::PhpConfig;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

/// A Pickles 2 project reached through its entry script (`.px_execute.php`).
#[derive(Debug, Clone)]
pub struct PhpProject {
    entry_script: PathBuf,
    php: PhpConfig,
}

impl PhpProject {
    pub fn new(entry_script: impl Into<PathBuf>, php: PhpConfig) -> Self {
        Self {
            entry_script: entry_script.into(),
            php,
        }
    }

    pub fn entry_script(&self) -> &Path {
        &self.entry_script
    }

    /// Arguments passed to the PHP binary for one request.
    pub fn command_args(&self, request: &str, options: Option<&QueryOptions>) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();

        if let Some(ini) = &self.php.ini {
            args.push("-c".into());
            args.push(ini.into());
        }
        if let Some(dir) = &self.php.extension_dir {
            let mut setting = OsString::from("extension_dir=");
            setting.push(dir);
            args.push("-d".into());
            args.push(setting);
        }

        args.push(self.entry_script.clone().into());

        if let Some(opts) = options {
            if let Some(method) = &opts.method {
                args.push("--method".into());
                args.push(method.into());
            }
            if let Some(body) = &opts.body {
                args.push("--body".into());
                args.push(body.into());
            }
            if let Some(body_file) = &opts.body_file {
                args.push("--body-file".into());
                args.push(body_file.into());
            }
        }

        args.push(request.into());
        args
    }

    fn command(&self, request: &str, options: Option<&QueryOptions>) -> Command {
        let mut cmd = Command::new(&self.php.bin);
        cmd.args(self.command_args(request, options))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> Px2Error {
        Px2Error::Spawn {
            bin: self.php.bin.display().to_string(),
            source,
        }
    }

    /// Run one request and return its stdout.
    async fn run(&self, request: &str, options: Option<&QueryOptions>) -> Px2Result<String> {
        debug!(request = %request, "Running Pickles 2 request");
        let output = self
            .command(request, options)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(Px2Error::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run one request, forwarding stdout chunks to `progress` as they arrive.
    async fn run_streaming(
        &self,
        request: &str,
        progress: Option<&mpsc::UnboundedSender<String>>,
    ) -> Px2Result<String> {
        debug!(request = %request, "Running Pickles 2 request (streaming)");
        let mut child = self
            .command(request, None)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let read_stdout = async {
            let mut collected = Vec::new();
            if let Some(mut stdout) = stdout {
                let mut buf = [0u8; 8192];
                loop {
                    let n = stdout.read(&mut buf).await?;
                    if n == 0 {
                        break;
                    }
                    collected.extend_from_slice(&buf[..n]);
                    if let Some(tx) = progress {
                        let _ = tx.send(String::from_utf8_lossy(&buf[..n]).into_owned());
                    }
                }
            }
            Ok::<_, std::io::Error>(collected)
        };
        let read_stderr = async {
            let mut collected = Vec::new();
            if let Some(mut stderr) = stderr {
                stderr.read_to_end(&mut collected).await?;
            }
            Ok::<_, std::io::Error>(collected)
        };

        let (collected, errors) = tokio::try_join!(read_stdout, read_stderr)?;
        let status = child.wait().await?;
        if !status.success() {
            return Err(Px2Error::Failed {
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&errors).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&collected).into_owned())
    }

    /// Run a PX command and decode its JSON output.
    async fn px_json(
        &self,
        command: &str,
        path: &str,
        params: &[(String, String)],
    ) -> Px2Result<Value> {
        let stdout = self.run(&request_path(path, command, params), None).await?;
        serde_json::from_str(stdout.trim()).map_err(|e| Px2Error::Decode {
            command: command.to_string(),
            reason: e.to_string(),
        })
    }

    /// `api.get.*` on a sitemap path, with extra query parameters.
    async fn page_api(
        &self,
        command: &str,
        path: &str,
        extra: Vec<(String, String)>,
    ) -> Px2Result<Value> {
        let mut params = vec![("path".to_string(), path.to_string())];
        params.extend(extra);
        self.px_json(command, "/", &params).await
    }

    async fn page_text(
        &self,
        command: &str,
        path: &str,
        extra: Vec<(String, String)>,
    ) -> Px2Result<String> {
        self.page_api(command, path, extra).await.map(into_text)
    }

    async fn page_bool(
        &self,
        command: &str,
        path: &str,
        extra: Vec<(String, String)>,
    ) -> Px2Result<bool> {
        let value = self.page_api(command, path, extra).await?;
        into_bool(command, value)
    }

    async fn global_text(&self, command: &str) -> Px2Result<String> {
        self.px_json(command, "/", &[]).await.map(into_text)
    }
}

/// Build `<path>?PX=<command>&k=v...` with URL-encoded keys and values.
pub fn request_path(path: &str, command: &str, params: &[(String, String)]) -> String {
    let mut query = format!("PX={}", urlencoding::encode(command));
    for (key, value) in params {
        query.push('&');
        query.push_str(&urlencoding::encode(key));
        query.push('=');
        query.push_str(&urlencoding::encode(value));
    }
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{}{}{}", path, separator, query)
}

/// Turn an options object into query parameters.
///
/// Strings are used verbatim, booleans and numbers in their JSON form, and
/// nested values as compact JSON. Nulls are dropped.
pub fn flatten_options(options: Option<&Map<String, Value>>) -> Vec<(String, String)> {
    options
        .into_iter()
        .flatten()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((key.clone(), value))
        })
        .collect()
}

fn resource_param(resource: Option<&str>) -> Vec<(String, String)> {
    resource
        .map(|r| vec![("resource".to_string(), r.to_string())])
        .unwrap_or_default()
}

fn publish_params(options: Option<&PublishOptions>) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let Some(opts) = options else {
        return params;
    };
    if let Some(region) = &opts.path_region {
        params.push(("path_region".to_string(), region.clone()));
    }
    for region in opts.paths_region.iter().flatten() {
        params.push(("paths_region[]".to_string(), region.clone()));
    }
    for ignore in opts.paths_ignore.iter().flatten() {
        params.push(("paths_ignore[]".to_string(), ignore.clone()));
    }
    if opts.keep_cache == Some(true) {
        params.push(("keep_cache".to_string(), "1".to_string()));
    }
    params
}

/// JSON strings become their contents; anything else (`false`, `null`) its JSON text.
fn into_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn into_bool(command: &str, value: Value) -> Px2Result<bool> {
    value.as_bool().ok_or_else(|| Px2Error::Decode {
        command: command.to_string(),
        reason: format!("expected a boolean, got {}", value),
    })
}

#[async_trait]
impl Px2Project for PhpProject {
    async fn get_version(&self) -> Px2Result<String> {
        self.global_text("api.get.version").await
    }

    async fn get_config(&self) -> Px2Result<Value> {
        self.px_json("api.get.config", "/", &[]).await
    }

    async fn get_sitemap(&self) -> Px2Result<Value> {
        self.px_json("api.get.sitemap", "/", &[]).await
    }

    async fn get_page_info(&self, path: &str) -> Px2Result<Value> {
        self.page_api("api.get.page_info", path, vec![]).await
    }

    async fn get_parent(&self, path: &str) -> Px2Result<Value> {
        self.page_api("api.get.parent", path, vec![]).await
    }

    async fn get_children(
        &self,
        path: &str,
        options: Option<&Map<String, Value>>,
    ) -> Px2Result<Value> {
        self.page_api("api.get.children", path, flatten_options(options)).await
    }

    async fn get_bros(&self, path: &str, options: Option<&Map<String, Value>>) -> Px2Result<Value> {
        self.page_api("api.get.bros", path, flatten_options(options)).await
    }

    async fn get_bros_next(
        &self,
        path: &str,
        options: Option<&Map<String, Value>>,
    ) -> Px2Result<Value> {
        self.page_api("api.get.bros_next", path, flatten_options(options)).await
    }

    async fn get_bros_prev(
        &self,
        path: &str,
        options: Option<&Map<String, Value>>,
    ) -> Px2Result<Value> {
        self.page_api("api.get.bros_prev", path, flatten_options(options)).await
    }

    async fn get_next(&self, path: &str, options: Option<&Map<String, Value>>) -> Px2Result<Value> {
        self.page_api("api.get.next", path, flatten_options(options)).await
    }

    async fn get_prev(&self, path: &str, options: Option<&Map<String, Value>>) -> Px2Result<Value> {
        self.page_api("api.get.prev", path, flatten_options(options)).await
    }

    async fn get_breadcrumb_array(&self, path: &str) -> Px2Result<Value> {
        self.page_api("api.get.breadcrumb_array", path, vec![]).await
    }

    async fn get_dynamic_path_info(&self, path: &str) -> Px2Result<Value> {
        self.page_api("api.get.dynamic_path_info", path, vec![]).await
    }

    async fn bind_dynamic_path_param(
        &self,
        path: &str,
        params: &BTreeMap<String, String>,
    ) -> Px2Result<String> {
        let encoded = serde_json::to_string(params).map_err(|e| Px2Error::Decode {
            command: "api.get.bind_dynamic_path_param".to_string(),
            reason: e.to_string(),
        })?;
        self.page_text(
            "api.get.bind_dynamic_path_param",
            path,
            vec![("param".to_string(), encoded)],
        )
        .await
    }

    async fn get_role(&self, path: &str) -> Px2Result<String> {
        self.page_text("api.get.role", path, vec![]).await
    }

    async fn get_actors(&self, path: &str) -> Px2Result<Value> {
        self.page_api("api.get.actors", path, vec![]).await
    }

    async fn get_realpath_homedir(&self) -> Px2Result<String> {
        self.global_text("api.get.realpath_homedir").await
    }

    async fn get_path_controot(&self) -> Px2Result<String> {
        self.global_text("api.get.path_controot").await
    }

    async fn get_realpath_docroot(&self) -> Px2Result<String> {
        self.global_text("api.get.realpath_docroot").await
    }

    async fn get_path_content(&self, path: &str) -> Px2Result<String> {
        self.page_text("api.get.path_content", path, vec![]).await
    }

    async fn path_files(&self, path: &str, resource: Option<&str>) -> Px2Result<String> {
        self.page_text("api.get.path_files", path, resource_param(resource)).await
    }

    async fn realpath_files(&self, path: &str, resource: Option<&str>) -> Px2Result<String> {
        self.page_text("api.get.realpath_files", path, resource_param(resource)).await
    }

    async fn path_files_cache(&self, path: &str, resource: Option<&str>) -> Px2Result<String> {
        self.page_text("api.get.path_files_cache", path, resource_param(resource)).await
    }

    async fn realpath_files_cache(&self, path: &str, resource: Option<&str>) -> Px2Result<String> {
        self.page_text(
            "api.get.realpath_files_cache",
            path,
            resource_param(resource),
        )
        .await
    }

    async fn realpath_files_private_cache(
        &self,
        path: &str,
        resource: Option<&str>,
    ) -> Px2Result<String> {
        self.page_text(
            "api.get.realpath_files_private_cache",
            path,
            resource_param(resource),
        )
        .await
    }

    async fn get_domain(&self) -> Px2Result<String> {
        self.global_text("api.get.domain").await
    }

    async fn get_directory_index(&self) -> Px2Result<Value> {
        self.px_json("api.get.directory_index", "/", &[]).await
    }

    async fn get_directory_index_primary(&self) -> Px2Result<String> {
        self.global_text("api.get.directory_index_primary").await
    }

    async fn get_path_proc_type(&self, path: &str) -> Px2Result<String> {
        self.page_text("api.get.path_proc_type", path, vec![]).await
    }

    async fn href(&self, linkto: &str) -> Px2Result<String> {
        let params = vec![("linkto".to_string(), linkto.to_string())];
        self.px_json("api.get.href", "/", &params)
            .await
            .map(into_text)
    }

    async fn is_match_dynamic_path(&self, path: &str) -> Px2Result<bool> {
        self.page_bool("api.is.match_dynamic_path", path, vec![]).await
    }

    async fn is_page_in_breadcrumb(&self, path: &str, path_in: &str) -> Px2Result<bool> {
        self.page_bool(
            "api.is.page_in_breadcrumb",
            path,
            vec![("path_in".to_string(), path_in.to_string())],
        )
        .await
    }

    async fn is_ignore_path(&self, path: &str) -> Px2Result<bool> {
        self.page_bool("api.is.ignore_path", path, vec![]).await
    }

    async fn publish(&self, options: Option<&PublishOptions>) -> Px2Result<String> {
        let request = request_path("/", "publish.run", &publish_params(options));
        self.run(&request, None).await
    }

    fn clearcache(&self, callbacks: ClearCacheCallbacks) {
        let project = self.clone();
        tokio::spawn(async move {
            let request = request_path("/", "clearcache", &[]);
            let result = project
                .run_streaming(&request, callbacks.success.as_ref()).await;
            let _ = callbacks.complete.send(result);
        });
    }

    async fn query(&self, path: &str, options: Option<&QueryOptions>) -> Px2Result<String> {
        self.run(path, options).await
    }

    async fn px_command(
        &self,
        command: &str,
        path: Option<&str>,
        params: Option<&BTreeMap<String, String>>,
    ) -> Px2Result<Value> {
        let params: Vec<(String, String)> = params
            .into_iter()
            .flatten()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.px_json(command, path.unwrap_or("/"), &params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_request_path_encodes_params() {
        let params = vec![
            ("path".to_string(), "/foo/bar.html".to_string()),
            ("paths_region[]".to_string(), "/a b/".to_string()),
        ];
        assert_eq!(
            request_path("/", "api.get.page_info", &params),
            "/?PX=api.get.page_info&path=%2Ffoo%2Fbar.html&paths_region%5B%5D=%2Fa%20b%2F"
        );
    }

    #[test]
    fn test_request_path_appends_to_existing_query() {
        assert_eq!(
            request_path("/search.html?q=1", "api.get.version", &[]),
            "/search.html?q=1&PX=api.get.version"
        );
    }

    #[test]
    fn test_flatten_options() {
        let options = json!({
            "filter": false,
            "depth": 1,
            "label": "top",
            "skip": null,
            "nested": {"a": 1}
        });
        let mut flat = flatten_options(options.as_object());
        flat.sort();
        assert_eq!(
            flat,
            vec![
                ("depth".to_string(), "1".to_string()),
                ("filter".to_string(), "false".to_string()),
                ("label".to_string(), "top".to_string()),
                ("nested".to_string(), r#"{"a":1}"#.to_string()),
            ]
        );
        assert!(flatten_options(None).is_empty());
    }

    #[test]
    fn test_publish_params() {
        let options = PublishOptions {
            path_region: Some("/".into()),
            paths_region: Some(vec!["/a/".into(), "/b/".into()]),
            paths_ignore: Some(vec!["/b/secret/".into()]),
            keep_cache: Some(true),
        };
        assert_eq!(
            publish_params(Some(&options)),
            vec![
                ("path_region".to_string(), "/".to_string()),
                ("paths_region[]".to_string(), "/a/".to_string()),
                ("paths_region[]".to_string(), "/b/".to_string()),
                ("paths_ignore[]".to_string(), "/b/secret/".to_string()),
                ("keep_cache".to_string(), "1".to_string()),
            ]
        );

        let keep = PublishOptions {
            keep_cache: Some(false),
            ..Default::default()
        };
        assert!(publish_params(Some(&keep)).is_empty());
        assert!(publish_params(None).is_empty());
    }

    #[test]
    fn test_command_args_minimal() {
        let project = PhpProject::new("./proj/.px_execute.php", PhpConfig::default());
        assert_eq!(
            strings(project.command_args("/?PX=api.get.version", None)),
            vec!["./proj/.px_execute.php", "/?PX=api.get.version"]
        );
    }

    #[test]
    fn test_command_args_with_php_settings_and_query_options() {
        let php = PhpConfig {
            bin: PathBuf::from("/usr/bin/php"),
            ini: Some(PathBuf::from("/etc/php.ini")),
            extension_dir: Some(PathBuf::from("/usr/lib/php/ext")),
        };
        let project = PhpProject::new(".px_execute.php", php);
        let options = QueryOptions {
            method: Some("POST".into()),
            body: Some("a=1".into()),
            body_file: Some("/tmp/body".into()),
        };
        assert_eq!(
            strings(project.command_args("/form.html", Some(&options))),
            vec![
                "-c",
                "/etc/php.ini",
                "-d",
                "extension_dir=/usr/lib/php/ext",
                ".px_execute.php",
                "--method",
                "POST",
                "--body",
                "a=1",
                "--body-file",
                "/tmp/body",
                "/form.html",
            ]
        );
    }

    #[test]
    fn test_into_text() {
        assert_eq!(into_text(json!("/foo/")), "/foo/");
        assert_eq!(into_text(json!(false)), "false");
        assert_eq!(into_text(json!(null)), "null");
    }

    #[test]
    fn test_into_bool_rejects_non_booleans() {
        assert!(into_bool("api.is.ignore_path", json!(true)).unwrap());
        assert!(matches!(
            into_bool("api.is.ignore_path", json!("yes")),
            Err(Px2Error::Decode { .. })
        ));
    }
}
