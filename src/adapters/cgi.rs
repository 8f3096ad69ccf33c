//! CGI/1.1 gateway for `git http-backend` and `cgit`.
//!
//! # Data Flow
//! ```text
//! Request → CGI environment (method, PATH_INFO below the endpoint, HTTP_* ...)
//!         → child process, request body piped to stdin
//!         → stdout: header block (Status, Location, ...) then body
//!         → Response with the remaining stdout streamed as body
//! ```
//!
//! # Design Decisions
//! - One child per request, no pooling
//! - The child is reaped on a background task; a client disconnect closes
//!   stdout and the child dies on its next write
//! - Spawn failures and malformed header blocks answer 500

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode};
use axum::response::Response;
use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio_util::io::ReaderStream;

use crate::adapters::{Adapter, HandlerFuture};
use crate::http::request::{host, peer_addr, request_uri, split_host_port, strip_endpoint};
use crate::http::response::status_page;

/// Upper bound on the CGI header block.
const MAX_HEADER_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct CgiAdapter {
    program: String,
    args: Vec<String>,
    root: PathBuf,
    endpoint: String,
    env: Vec<(String, String)>,
    inherit_env: bool,
}

impl CgiAdapter {
    /// Smart-HTTP git hosting for every repository below `root`.
    pub fn git_http_backend(root: PathBuf, endpoint: &str) -> Self {
        let env = vec![
            ("GIT_PROJECT_ROOT".to_string(), root.display().to_string()),
            ("GIT_HTTP_EXPORT_ALL".to_string(), "1".to_string()),
        ];
        Self {
            program: "git".to_string(),
            args: vec!["http-backend".to_string()],
            root,
            endpoint: endpoint.to_string(),
            env,
            inherit_env: false,
        }
    }

    /// cgit web frontend; configuration comes from the inherited environment
    /// (`CGIT_CONFIG`).
    pub fn cgit(root: PathBuf, endpoint: &str) -> Self {
        Self {
            program: "cgit".to_string(),
            args: Vec::new(),
            root,
            endpoint: endpoint.to_string(),
            env: Vec::new(),
            inherit_env: true,
        }
    }

    fn environment(&self, request: &Request<Body>) -> HashMap<String, String> {
        let mut env: HashMap<String, String> = HashMap::new();
        let host = host(request);
        let (server_name, server_port) = match split_host_port(&host) {
            (name, "") => (name.to_string(), "80".to_string()),
            (name, port) => (name.to_string(), port.to_string()),
        };
        let script_name = self.endpoint.trim_end_matches('/').to_string();
        let path_info = strip_endpoint(request.uri().path(), &self.endpoint).to_string();

        env.insert("GATEWAY_INTERFACE".into(), "CGI/1.1".into());
        env.insert("SERVER_SOFTWARE".into(), concat!("mapserve/", env!("CARGO_PKG_VERSION")).into());
        env.insert("SERVER_PROTOCOL".into(), format!("{:?}", request.version()));
        env.insert("SERVER_NAME".into(), server_name);
        env.insert("SERVER_PORT".into(), server_port);
        env.insert("REQUEST_METHOD".into(), request.method().to_string());
        env.insert("REQUEST_URI".into(), request_uri(request));
        env.insert("QUERY_STRING".into(), request.uri().query().unwrap_or("").to_string());
        env.insert("SCRIPT_NAME".into(), script_name);
        env.insert("PATH_INFO".into(), path_info);
        if let Some(peer) = peer_addr(request) {
            env.insert("REMOTE_ADDR".into(), peer.ip().to_string());
            env.insert("REMOTE_HOST".into(), peer.ip().to_string());
            env.insert("REMOTE_PORT".into(), peer.port().to_string());
        }

        for (name, value) in request.headers() {
            let Ok(value) = value.to_str() else { continue };
            if *name == header::CONTENT_TYPE {
                env.insert("CONTENT_TYPE".into(), value.to_string());
            } else if *name == header::CONTENT_LENGTH {
                env.insert("CONTENT_LENGTH".into(), value.to_string());
            } else if name.as_str() == "proxy" {
                // HTTP_PROXY would be taken as the child's outbound proxy (httpoxy).
                continue;
            } else {
                let key = format!("HTTP_{}", name.as_str().to_ascii_uppercase().replace('-', "_"));
                env.entry(key)
                    .and_modify(|v: &mut String| {
                        v.push_str(", ");
                        v.push_str(value);
                    })
                    .or_insert_with(|| value.to_string());
            }
        }

        for (k, v) in &self.env {
            env.insert(k.clone(), v.clone());
        }
        env
    }

    async fn run(self, request: Request<Body>) -> Response {
        let env = self.environment(&request);

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(&self.root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if !self.inherit_env {
            command.env_clear();
            if let Ok(path) = std::env::var("PATH") {
                command.env("PATH", path);
            }
        }
        command.envs(env);

        let mut child = match command.spawn() {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(program = %self.program, error = %e, "cannot start cgi program");
                return status_page(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            let mut body = request.into_body().into_data_stream();
            tokio::spawn(async move {
                while let Some(chunk) = body.next().await {
                    let written = match chunk {
                        Ok(bytes) => stdin.write_all(&bytes).await,
                        Err(e) => {
                            tracing::debug!(error = %e, "cgi request body aborted");
                            break;
                        }
                    };
                    if written.is_err() {
                        break;
                    }
                }
            });
        }

        let Some(stdout) = child.stdout.take() else {
            return status_page(StatusCode::INTERNAL_SERVER_ERROR);
        };
        let program = self.program.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if !status.success() => {
                    tracing::debug!(program = %program, %status, "cgi program exited");
                }
                Err(e) => tracing::warn!(program = %program, error = %e, "cannot reap cgi program"),
                _ => {}
            }
        });

        let mut reader = BufReader::new(stdout);
        let head = match read_head(&mut reader).await {
            Ok(head) => head,
            Err(e) => {
                tracing::error!(program = %self.program, error = %e, "bad cgi response");
                return status_page(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        let mut response = Response::new(Body::from_stream(ReaderStream::new(reader)));
        *response.status_mut() = head.status;
        *response.headers_mut() = head.headers;
        response
    }
}

impl Adapter for CgiAdapter {
    fn serve(&self, request: Request<Body>) -> HandlerFuture {
        Box::pin(self.clone().run(request))
    }
}

/// Status line and headers emitted by a CGI program.
#[derive(Debug)]
pub struct CgiHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

async fn read_head<R>(reader: &mut BufReader<R>) -> std::io::Result<CgiHead>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut lines = Vec::new();
    let mut total = 0;
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            break;
        }
        total += n;
        if total > MAX_HEADER_BYTES {
            return Err(invalid("header block too large"));
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        if line.is_empty() {
            break;
        }
        lines.push(line);
    }
    if lines.is_empty() {
        return Err(invalid("no headers"));
    }
    parse_head(&lines)
}

/// Interpret CGI header lines.
pub fn parse_head<S: AsRef<str>>(lines: &[S]) -> std::io::Result<CgiHead> {
    let mut status = None;
    let mut headers = HeaderMap::new();
    for line in lines {
        let Some((name, value)) = line.as_ref().split_once(':') else {
            return Err(invalid("malformed header line"));
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("status") {
            let code = value.split_whitespace().next().unwrap_or("");
            let parsed = code
                .parse::<u16>()
                .ok()
                .and_then(|c| StatusCode::from_u16(c).ok())
                .ok_or_else(|| invalid("bad status"))?;
            status = Some(parsed);
            continue;
        }
        let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| invalid("bad header name"))?;
        let value = HeaderValue::from_str(value).map_err(|_| invalid("bad header value"))?;
        headers.append(name, value);
    }
    let status = status.unwrap_or(if headers.contains_key(header::LOCATION) {
        StatusCode::FOUND
    } else {
        StatusCode::OK
    });
    Ok(CgiHead { status, headers })
}

fn invalid(msg: &'static str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg)
}
