//! Media storage abstraction wrapping ImageKit.

use anyhow::Result;
use async_trait::async_trait;

use crate::imagekit;

/// A file to hand to the media host.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub folder: Option<String>,
}

/// Where an uploaded file ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedMedia {
    /// Public URL of the original file.
    pub url: String,
    /// Path within the media host, used to build transformed URLs.
    pub file_path: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload a file and return its public location.
    async fn upload(&self, request: UploadRequest) -> Result<UploadedMedia>;

    /// URL of a stored image resized to `width` with automatic quality and webp.
    fn optimized_url(&self, file_path: &str, width: u32) -> String;
}

/// ImageKit implementation of MediaStore.
pub struct ImageKitMediaStore {
    client: imagekit::Client,
}

impl ImageKitMediaStore {
    pub fn new(client: imagekit::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaStore for ImageKitMediaStore {
    async fn upload(&self, request: UploadRequest) -> Result<UploadedMedia> {
        let response = self
            .client
            .upload(request.bytes, &request.file_name, request.folder.as_deref())
            .await
            .map_err(|e| anyhow::anyhow!("ImageKit upload failed: {}", e))?;

        if response.url.is_empty() {
            anyhow::bail!("ImageKit returned no URL for {}", response.name);
        }

        Ok(UploadedMedia {
            url: response.url,
            file_path: response.file_path,
        })
    }

    fn optimized_url(&self, file_path: &str, width: u32) -> String {
        self.client
            .url(file_path, &format!("q-auto,f-webp,w-{}", width))
    }
}
