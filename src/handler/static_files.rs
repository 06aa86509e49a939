//! Static file stage
//!
//! Serves `GET`/`HEAD` requests under the configured prefix from the public
//! directory. A miss forwards the request unchanged.

use hyper::body::Bytes;
use hyper::Method;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::StaticFilesConfig;
use crate::http::{self, cache, mime};
use crate::logger;
use crate::pipeline::{Flow, RequestContext};

pub async fn serve(ctx: &RequestContext, cfg: &StaticFilesConfig) -> Flow {
    if ctx.method != Method::GET && ctx.method != Method::HEAD {
        return Flow::Forward;
    }
    let Some(relative) = relative_path(&ctx.path, &cfg.prefix).and_then(decode_relative) else {
        return Flow::Forward;
    };

    match load_from_directory(&cfg.dir, &relative, &cfg.index_files).await {
        Some((content, file_path)) => {
            let etag = cache::generate_etag(&content);
            if cache::check_etag_match(ctx.header(hyper::header::IF_NONE_MATCH), &etag) {
                return Flow::Finalized(http::build_304_response(&etag));
            }
            let content_type = mime::content_type_for(&file_path);
            Flow::Finalized(http::build_file_response(
                Bytes::from(content),
                content_type,
                &etag,
                ctx.is_head(),
            ))
        }
        None => Flow::Forward,
    }
}

/// Path below the mount prefix, or None when the request is outside it
fn relative_path<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix = prefix.trim_end_matches('/');
    let head = path.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let rest = &path[prefix.len()..];
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest.trim_start_matches('/'))
    } else {
        None
    }
}

/// Percent-decode each segment of a relative path
///
/// None when a segment is not valid UTF-8, decodes to a separator or NUL,
/// or is `..`.
fn decode_relative(relative: &str) -> Option<String> {
    let mut segments = Vec::new();
    for raw in relative.split('/') {
        let segment = urlencoding::decode(raw).ok()?;
        if segment == ".." || segment.contains(['/', '\\', '\0']) {
            logger::log_warning(&format!("Rejected static path segment: {raw}"));
            return None;
        }
        segments.push(segment.into_owned());
    }
    Some(segments.join("/"))
}

/// Load a file from the directory, trying index files for directories
///
/// Returns the content and the resolved path, or None on any miss.
pub async fn load_from_directory(
    static_dir: &str,
    relative_path: &str,
    index_files: &[String],
) -> Option<(Vec<u8>, PathBuf)> {
    let static_dir_canonical = match fs::canonicalize(static_dir).await {
        Ok(p) => p,
        Err(e) => {
            logger::log_debug(&format!(
                "Static directory not found or inaccessible '{static_dir}': {e}"
            ));
            return None;
        }
    };

    let mut file_path = Path::new(static_dir).join(relative_path);

    if fs::metadata(&file_path).await.is_ok_and(|m| m.is_dir()) {
        let mut found = None;
        for index_file in index_files {
            let candidate = file_path.join(index_file);
            if fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
                found = Some(candidate);
                break;
            }
        }
        file_path = found?;
    }

    // Missing files are the common case, not worth a warning
    let file_path_canonical = fs::canonicalize(&file_path).await.ok()?;
    if !file_path_canonical.starts_with(&static_dir_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {relative_path} -> {}",
            file_path_canonical.display()
        ));
        return None;
    }

    match fs::read(&file_path_canonical).await {
        Ok(content) => Some((content, file_path_canonical)),
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                file_path_canonical.display()
            ));
            None
        }
    }
}
