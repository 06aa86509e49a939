//! Upload sub-pipeline
//!
//! Decodes a `multipart/form-data` body with a single accepted file field,
//! streams the file to disk under a fresh unique name, and echoes its
//! descriptor. The body is read here, so no size limit applies.
//! Decode failures are answered here with a plain-text 400 and never reach
//! the global error stage.

use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::{Response, StatusCode};
use serde_json::{Map, Value};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::http::{self, body::insert_form_field, mime};
use crate::logger;
use crate::pipeline::{PipelineError, RequestContext, UploadedFile};

const MULTIPART_TYPE: &str = "multipart/form-data";

/// Decode, then run the handler or the route-local error stage
///
/// `body` is None when an earlier stage already consumed it.
pub async fn handle<B>(
    ctx: &mut RequestContext,
    cfg: &UploadConfig,
    body: Option<B>,
) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match decode(ctx, cfg, body).await {
        Ok(()) => respond(ctx),
        Err(err) => report_local(&err),
    }
}

fn respond(ctx: &RequestContext) -> Response<Full<Bytes>> {
    logger::log_info(&format!("{:?} {}", ctx.file, ctx.body));
    match &ctx.file {
        Some(file) => http::json_response(StatusCode::OK, file),
        None => http::empty_response(StatusCode::OK),
    }
}

fn report_local(err: &PipelineError) -> Response<Full<Bytes>> {
    logger::log_warning(&format!("Upload rejected: {err}"));
    http::text_response(StatusCode::BAD_REQUEST, &err.to_string())
}

/// Fill `ctx.file` and merge text fields into `ctx.body`
///
/// Non-multipart requests are left untouched. On failure any file stored
/// by this request is removed again.
async fn decode<B>(
    ctx: &mut RequestContext,
    cfg: &UploadConfig,
    body: Option<B>,
) -> Result<(), PipelineError>
where
    B: Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let Some(content_type) = ctx.content_type().map(str::to_owned) else {
        return Ok(());
    };
    if mime::essence(&content_type) != MULTIPART_TYPE {
        return Ok(());
    }
    let Some(body) = body else {
        return Ok(());
    };

    let boundary = multer::parse_boundary(&content_type)?;
    let multipart = multer::Multipart::new(body.into_data_stream(), boundary);
    let result = read_parts(ctx, cfg, multipart).await;
    if result.is_err() {
        if let Some(file) = ctx.file.take() {
            if let Err(e) = fs::remove_file(&file.path).await {
                logger::log_warning(&format!("Failed to remove partial upload {}: {e}", file.path));
            }
        }
    }
    result
}

async fn read_parts(
    ctx: &mut RequestContext,
    cfg: &UploadConfig,
    mut multipart: multer::Multipart<'_>,
) -> Result<(), PipelineError> {
    if !ctx.body.is_object() {
        ctx.body = Value::Object(Map::new());
    }

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if field.file_name().is_none() {
            let text = field.text().await?;
            if let Value::Object(map) = &mut ctx.body {
                insert_form_field(map, &name, Value::String(text));
            }
            continue;
        }

        if name != cfg.field || ctx.file.is_some() {
            return Err(PipelineError::UploadDecode("Unexpected field".to_string()));
        }
        ctx.file = Some(store(field, name, cfg).await?);
    }
    Ok(())
}

async fn store(
    mut field: multer::Field<'_>,
    fieldname: String,
    cfg: &UploadConfig,
) -> Result<UploadedFile, PipelineError> {
    let originalname = field.file_name().unwrap_or_default().to_string();
    let mimetype = field
        .content_type()
        .map_or_else(|| "application/octet-stream".to_string(), ToString::to_string);

    fs::create_dir_all(&cfg.dir)
        .await
        .map_err(|e| PipelineError::UploadDecode(format!("cannot create upload directory: {e}")))?;

    let filename = Uuid::new_v4().simple().to_string();
    let path = Path::new(&cfg.dir).join(&filename);
    let path_str = path.to_string_lossy().into_owned();

    let mut file = fs::File::create(&path)
        .await
        .map_err(|e| PipelineError::UploadDecode(format!("cannot store upload: {e}")))?;

    let mut size = 0u64;
    let copied: Result<(), PipelineError> = async {
        while let Some(chunk) = field.chunk().await? {
            size += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(|e| PipelineError::UploadDecode(format!("cannot store upload: {e}")))?;
        }
        file.flush()
            .await
            .map_err(|e| PipelineError::UploadDecode(format!("cannot store upload: {e}")))
    }
    .await;

    if let Err(err) = copied {
        drop(file);
        if let Err(e) = fs::remove_file(&path).await {
            logger::log_warning(&format!("Failed to remove partial upload {path_str}: {e}"));
        }
        return Err(err);
    }

    Ok(UploadedFile {
        fieldname,
        originalname,
        encoding: "7bit".to_string(),
        mimetype,
        destination: cfg.dir.clone(),
        filename,
        path: path_str,
        size,
    })
}
