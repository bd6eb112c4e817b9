//! ImageKit client for media uploads and delivery URLs.
//!
//! Uses the v1 upload API: https://imagekit.io/docs/api-reference/upload-file/upload-file

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

const UPLOAD_URL: &str = "https://upload.imagekit.io/api/v1/files/upload";

#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    private_key: String,
    url_endpoint: String,
}

impl Client {
    pub fn new(
        private_key: impl Into<String>,
        url_endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Request(e.to_string()))?;

        Ok(Self {
            http,
            private_key: private_key.into(),
            url_endpoint: url_endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    /// Upload a file. The stored name is kept as given.
    pub async fn upload(
        &self,
        file: Vec<u8>,
        file_name: &str,
        folder: Option<&str>,
    ) -> Result<UploadResponse, Error> {
        let mut form = Form::new()
            .part("file", Part::bytes(file).file_name(file_name.to_string()))
            .text("fileName", file_name.to_string())
            .text("useUniqueFileName", "false");
        if let Some(folder) = folder {
            form = form.text("folder", folder.to_string());
        }

        let response = self
            .http
            .post(UPLOAD_URL)
            .basic_auth(&self.private_key, Some(""))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))
    }

    /// Delivery URL for a stored file with a transformation applied.
    pub fn url(&self, file_path: &str, transformation: &str) -> String {
        format!(
            "{}/tr:{}/{}",
            self.url_endpoint,
            transformation,
            file_path.trim_start_matches('/')
        )
    }
}

#[derive(Debug)]
pub enum Error {
    Request(String),
    Api { status: u16, message: String },
    Parse(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Request(e) => write!(f, "request failed: {}", e),
            Error::Api { status, message } => write!(f, "API error {}: {}", status, message),
            Error::Parse(e) => write!(f, "parse error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    #[serde(rename = "fileId")]
    pub file_id: String,
    pub name: String,
    pub url: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
}
