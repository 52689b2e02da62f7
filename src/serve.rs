//! HTTP server for interactive mode
//!
//! `featurescope serve analysis.json` → builds the page, starts the server,
//! opens the browser. Audio is streamed from the configured audio directory
//! with byte-range support so the player can seek.

use crate::analysis::AnalysisDocument;
use crate::config::Config;
use crate::page::Page;
use crate::report::{self, json::JsonReport};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

#[derive(Serialize)]
struct ApiResponse<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self { ok: true, data: Some(data), error: None }
    }
}

impl ApiResponse<()> {
    fn failure(message: String) -> Self {
        Self { ok: false, data: None, error: Some(message) }
    }
}

#[derive(Deserialize, Debug)]
pub struct TrackParams {
    pub name: String,
}

/// Everything the request handler reads.
pub struct ServerState {
    pub html: String,
    pub page: Page,
    pub document: AnalysisDocument,
    pub document_json: String,
    pub audio_dir: PathBuf,
    /// URL prefix the page's audio sources use, without slashes.
    pub audio_prefix: String,
    pub player_dir: PathBuf,
}

impl ServerState {
    /// Parse `document_json` and build its page. The text is served back as-is.
    pub fn new(document_json: String, config: &Config) -> crate::Result<Self> {
        let document = AnalysisDocument::from_json_str(&document_json)?;
        let page = report::build_page(&document, config, |_| {});

        let mut html = Vec::new();
        report::html::write(&mut html, &page)?;
        let html = String::from_utf8_lossy(&html).into_owned();

        Ok(ServerState {
            html,
            page,
            document,
            document_json,
            audio_dir: config.audio_dir.clone(),
            audio_prefix: config.audio_prefix.trim_matches('/').to_string(),
            player_dir: config.player_dir.clone(),
        })
    }

    /// Encoded file name of an audio request, if `path` is under the audio prefix.
    pub fn audio_name<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix('/')?;
        if self.audio_prefix.is_empty() {
            return Some(rest);
        }
        rest.strip_prefix(self.audio_prefix.as_str())?.strip_prefix('/')
    }
}

/// Start server, open browser, serve page
pub fn start(port: u16, analysis_path: &Path, config: &Config) -> crate::Result<()> {
    let document_json = std::fs::read_to_string(analysis_path)?;
    let state = ServerState::new(document_json, config)?;

    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;
    let url = format!("http://localhost:{}", port);

    eprintln!("\n\x1b[1;32mfeaturescope\x1b[0m");
    eprintln!("   {}", url);
    eprintln!("   {} track(s), audio from {}\n", state.page.tracks.len(), state.audio_dir.display());

    // Open browser
    let _ = open::that(&url);

    // Handle requests
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &state) {
            log::error!("Request failed: {}", e);
        }
    }

    Ok(())
}

fn handle_request(request: Request, state: &ServerState) -> std::io::Result<()> {
    let url = request.url().to_string();
    let mut parts = url.splitn(2, '?');
    let path = parts.next().unwrap_or("/").to_string();
    let query = parts.next().unwrap_or("").to_string();
    let method = request.method().clone();

    log::debug!("{} {}", method, url);

    match (&method, path.as_str()) {
        (&Method::Get, "/") => {
            let response = content_type(
                Response::from_string(state.html.clone()),
                "text/html; charset=utf-8",
            );
            request.respond(response)
        }

        (&Method::Get, "/analysis.json") => {
            let response =
                content_type(Response::from_string(state.document_json.clone()), "application/json");
            request.respond(response)
        }

        // API: what was drawn
        (&Method::Get, "/api/tracks") => {
            let json = serde_json::to_string(&ApiResponse::success(JsonReport::from_page(&state.page)))?;
            let response = content_type(Response::from_string(json), "application/json");
            request.respond(response)
        }

        // API: one track's analysis
        (&Method::Get, "/api/track") => {
            let found = serde_urlencoded::from_str::<TrackParams>(&query)
                .ok()
                .and_then(|p| state.document.track(&p.name));

            let (status, json) = match found {
                Some(track) => (200, serde_json::to_string(&ApiResponse::success(track))?),
                None => (
                    404,
                    serde_json::to_string(&ApiResponse::failure("unknown track".to_string()))?,
                ),
            };
            let response = content_type(
                Response::from_string(json).with_status_code(status),
                "application/json",
            );
            request.respond(response)
        }

        (&Method::Get, p) if p.starts_with("/pkg/") => {
            let name = decode_path_segment(&p["/pkg/".len()..]);
            match safe_join(&state.player_dir, &name) {
                Some(file) => serve_file(request, &file),
                None => not_found(request),
            }
        }

        // Audio, under whatever prefix the page was built with
        (&Method::Get, p) if state.audio_name(p).is_some() => {
            let name = decode_path_segment(state.audio_name(p).unwrap_or_default());
            match safe_join(&state.audio_dir, &name) {
                Some(file) => serve_file(request, &file),
                None => not_found(request),
            }
        }

        // 404
        _ => not_found(request),
    }
}

fn not_found(request: Request) -> std::io::Result<()> {
    let response = Response::from_string("Not found").with_status_code(404);
    request.respond(response)
}

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

fn content_type<R: Read>(response: Response<R>, value: &str) -> Response<R> {
    match header("Content-Type", value) {
        Some(h) => response.with_header(h),
        None => response,
    }
}

/// Join a single file name onto `dir`, refusing anything that could escape it.
pub fn safe_join(dir: &Path, name: &str) -> Option<PathBuf> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return None;
    }
    Some(dir.join(name))
}

/// Undo percent-encoding in a URL path segment (track names often contain spaces).
pub fn decode_path_segment(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(v) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(v);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" | "wave" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" | "oga" => "audio/ogg",
        "opus" => "audio/opus",
        "m4a" | "aac" => "audio/mp4",
        "js" => "text/javascript",
        "wasm" => "application/wasm",
        "json" => "application/json",
        "html" => "text/html; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Parse a single `bytes=start-end` range against a body of `len` bytes.
///
/// Returns the inclusive byte range, or `None` when the header is absent,
/// malformed, multi-range or unsatisfiable.
pub fn parse_range(value: &str, len: u64) -> Option<(u64, u64)> {
    let spec = value.trim().strip_prefix("bytes=")?;
    if spec.contains(',') || len == 0 {
        return None;
    }
    let (start, end) = spec.split_once('-')?;
    let (start, end) = match (start.trim(), end.trim()) {
        ("", suffix) => {
            let n: u64 = suffix.parse().ok()?;
            if n == 0 {
                return None;
            }
            (len.saturating_sub(n), len - 1)
        }
        (s, "") => (s.parse().ok()?, len - 1),
        (s, e) => (s.parse().ok()?, e.parse::<u64>().ok()?.min(len - 1)),
    };
    (start <= end && start < len).then_some((start, end))
}

fn serve_file(request: Request, path: &Path) -> std::io::Result<()> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return not_found(request),
    };
    let len = file.metadata()?.len();
    let mime = mime_for(path);

    let range = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Range"))
        .and_then(|h| parse_range(h.value.as_str(), len));

    match range {
        Some((start, end)) => {
            file.seek(SeekFrom::Start(start))?;
            let body = file.take(end - start + 1);
            let mut response = content_type(
                Response::new(
                    StatusCode(206),
                    Vec::new(),
                    body,
                    Some((end - start + 1) as usize),
                    None,
                ),
                mime,
            );
            if let Some(h) = header("Content-Range", &format!("bytes {}-{}/{}", start, end, len)) {
                response.add_header(h);
            }
            if let Some(h) = header("Accept-Ranges", "bytes") {
                response.add_header(h);
            }
            request.respond(response)
        }
        None => {
            let mut response = content_type(Response::from_file(file), mime);
            if let Some(h) = header("Accept-Ranges", "bytes") {
                response.add_header(h);
            }
            request.respond(response)
        }
    }
}
