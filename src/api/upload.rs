use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Method};
use serde::Deserialize;

use super::ApiClient;
use crate::error::AdminError;
use crate::models::UploadedFile;

const CHUNK_SIZE: usize = 64 * 1024;

pub const DOCUMENT_UPLOAD_PATH: &str = "upload/documents";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub sent: u64,
    pub total: u64,
}

impl UploadProgress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.sent.min(self.total) * 100) / self.total) as u8
    }
}

pub type ProgressFn = Arc<dyn Fn(UploadProgress) + Send + Sync>;

#[derive(Deserialize)]
struct UploadData {
    files: Vec<UploadedFile>,
}

impl ApiClient {
    /// Sends `files` as a multipart form under the `files` field, reporting
    /// bytes handed to the connection through `progress`.
    #[tracing::instrument(skip(self, progress), fields(request_id = tracing::field::Empty))]
    pub async fn upload(
        &self,
        path: &str,
        files: &[PathBuf],
        progress: ProgressFn,
    ) -> Result<Vec<UploadedFile>, AdminError> {
        let request = self.authorized(Method::POST, path)?;

        let mut payloads = Vec::with_capacity(files.len());
        for file in files {
            let bytes = tokio::fs::read(file).await?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            payloads.push((name, bytes));
        }

        let total: u64 = payloads.iter().map(|(_, b)| b.len() as u64).sum();
        let sent = Arc::new(AtomicU64::new(0));
        let mut form = Form::new();

        for (name, bytes) in payloads {
            let length = bytes.len() as u64;
            let chunks: Vec<Vec<u8>> = bytes.chunks(CHUNK_SIZE).map(<[u8]>::to_vec).collect();
            let sent = sent.clone();
            let progress = progress.clone();
            let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
                let now = sent.fetch_add(chunk.len() as u64, Ordering::SeqCst) + chunk.len() as u64;
                progress(UploadProgress { sent: now, total });
                Ok::<_, std::io::Error>(chunk)
            }));
            let part = Part::stream_with_length(Body::wrap_stream(stream), length).file_name(name);
            form = form.part("files", part);
        }

        let data: UploadData = self.execute(request.multipart(form)).await?;
        tracing::info!(count = data.files.len(), bytes = total, "upload finished");
        Ok(data.files)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use axum::extract::Multipart;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::session::Session;
    use crate::testing::spawn_backend;

    #[test]
    fn percent_handles_empty_uploads() {
        assert_eq!(UploadProgress { sent: 0, total: 0 }.percent(), 100);
        assert_eq!(UploadProgress { sent: 50, total: 200 }.percent(), 25);
    }

    #[tokio::test]
    async fn uploads_files_and_reports_progress() {
        let app = Router::new().route(
            "/api/upload/documents",
            post(|mut multipart: Multipart| async move {
                let mut files = Vec::new();
                while let Some(field) = multipart.next_field().await.unwrap() {
                    assert_eq!(field.name(), Some("files"));
                    let name = field.file_name().unwrap_or_default().to_string();
                    let size = field.bytes().await.unwrap().len();
                    files.push(json!({
                        "url": format!("/files/{name}"),
                        "originalName": name,
                        "size": size,
                    }));
                }
                Json(json!({"success": true, "data": {"files": files}}))
            }),
        );
        let base = spawn_backend(app).await;
        let client = ApiClient::new(base, Session::in_memory(Some("t".into()))).unwrap();

        let dir = std::env::temp_dir().join(format!("youth-admin-upload-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("minutes.pdf");
        std::fs::write(&file, vec![7u8; 150 * 1024]).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let progress: ProgressFn = Arc::new(move |p| recorder.lock().unwrap().push(p));

        let uploaded = client
            .upload(DOCUMENT_UPLOAD_PATH, &[file], progress)
            .await
            .unwrap();

        assert_eq!(uploaded.len(), 1);
        assert_eq!(uploaded[0].original_name, "minutes.pdf");
        assert_eq!(uploaded[0].size, 150 * 1024);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        let last = seen.last().unwrap();
        assert_eq!(last.sent, last.total);
        assert_eq!(last.percent(), 100);
    }
}
