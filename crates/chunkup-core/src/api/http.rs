//! libcurl transport for the storage API.
//!
//! One `Easy` handle per call, so a single `HttpStorageApi` can be shared by
//! all chunk-upload workers. Runs in the calling thread. Chunk bodies are
//! streamed from the source file through curl's read callback.

use curl::easy::{Easy, List, ReadError};
use std::io::Read;
use std::time::Duration;
use url::Url;

use super::envelope::decode;
use super::{
    ApiError, ChunkBody, ChunkHandle, PatchRequest, StorageApi, UploadReply, PATCH_ENDPOINT,
    UPLOAD_ENDPOINT,
};
use crate::chunking::ChunkSpec;
use crate::config::ChunkupConfig;
use crate::source::SourceFile;

#[derive(Debug, Clone)]
pub struct HttpStorageApi {
    upload_url: Url,
    patch_url: Url,
    connect_timeout: Option<Duration>,
    timeout: Option<Duration>,
}

impl HttpStorageApi {
    /// Resolves the fixed endpoints against `server_url`. Without timeouts set,
    /// libcurl's defaults apply.
    pub fn new(server_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            upload_url: endpoint(server_url, UPLOAD_ENDPOINT)?,
            patch_url: endpoint(server_url, PATCH_ENDPOINT)?,
            connect_timeout: None,
            timeout: None,
        })
    }

    pub fn from_config(cfg: &ChunkupConfig) -> Result<Self, ApiError> {
        Ok(Self::new(&cfg.server_url)?.with_timeouts(
            cfg.http.connect_timeout_secs.map(Duration::from_secs),
            cfg.http.timeout_secs.map(Duration::from_secs),
        ))
    }

    pub fn with_timeouts(mut self, connect: Option<Duration>, total: Option<Duration>) -> Self {
        self.connect_timeout = connect;
        self.timeout = total;
        self
    }

    pub fn upload_url(&self) -> &Url {
        &self.upload_url
    }

    pub fn patch_url(&self) -> &Url {
        &self.patch_url
    }

    fn easy(&self, url: &Url, content_type: Option<&str>) -> Result<Easy, ApiError> {
        let mut easy = Easy::new();
        easy.url(url.as_str())?;
        easy.follow_location(true)?;
        if let Some(d) = self.connect_timeout {
            easy.connect_timeout(d)?;
        }
        if let Some(d) = self.timeout {
            easy.timeout(d)?;
        }
        let mut list = List::new();
        if let Some(ct) = content_type {
            list.append(&format!("Content-Type: {}", ct))?;
        }
        // Send the body immediately instead of waiting on 100-continue.
        list.append("Expect:")?;
        easy.http_headers(list)?;
        Ok(easy)
    }
}

impl StorageApi for HttpStorageApi {
    fn upload_chunk(&self, file: &SourceFile, chunk: &ChunkSpec) -> Result<ChunkHandle, ApiError> {
        let mut form = ChunkBody::new(file, chunk);
        let mut easy = self.easy(&self.upload_url, Some(&form.content_type()))?;
        easy.post(true)?;
        easy.post_field_size(form.len())?;

        let body = perform(&mut easy, Some(&mut form))?;
        let reply: UploadReply = decode(&body)?;
        tracing::debug!(
            index = chunk.index,
            handle = reply.filename.as_str(),
            "chunk uploaded"
        );
        Ok(reply.filename)
    }

    fn patch(&self, request: &PatchRequest) -> Result<bool, ApiError> {
        let payload = serde_json::to_vec(request)?;
        let mut easy = self.easy(&self.patch_url, Some("application/json"))?;
        easy.post(true)?;
        easy.post_fields_copy(&payload)?;

        let body = perform(&mut easy, None)?;
        let patched: bool = decode(&body)?;
        tracing::debug!(filename = %request.filename, patched, "patch response");
        Ok(patched)
    }
}

/// Runs the transfer, feeding `upload` as the request body when given and
/// collecting the response body. Non-2xx status is an error.
fn perform(easy: &mut Easy, upload: Option<&mut ChunkBody<'_>>) -> Result<Vec<u8>, ApiError> {
    let mut body = Vec::new();
    let mut read_error = None;
    let performed = {
        let mut transfer = easy.transfer();
        if let Some(upload) = upload {
            let failed = &mut read_error;
            transfer.read_function(move |buf| {
                upload.read(buf).map_err(|e| {
                    *failed = Some(e);
                    ReadError::Abort
                })
            })?;
        }
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()
    };
    if let Some(e) = read_error {
        return Err(ApiError::Read(e));
    }
    performed?;
    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(ApiError::Http(code));
    }
    Ok(body)
}

/// Joins `path` onto `server_url`, treating the base as a directory.
fn endpoint(server_url: &str, path: &str) -> Result<Url, ApiError> {
    let mut base = Url::parse(server_url)
        .map_err(|e| ApiError::Request(format!("invalid server URL {:?}: {}", server_url, e)))?;
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    base.join(path)
        .map_err(|e| ApiError::Request(format!("resolve {:?} against {}: {}", path, base, e)))
}
