//! Supabase Storage implementation of [`ImageStorage`].

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Method;

use linkboard_core::store::ImageStorage;

use crate::supabase::SupabaseClient;

/// Cache lifetime sent with uploads, in seconds.
const CACHE_SECONDS: u32 = 3600;

/// One bucket of a Supabase project's object storage.
pub struct SupabaseStorage {
    client: SupabaseClient,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(client: SupabaseClient, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.client.base_url(),
            self.bucket,
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ImageStorage for SupabaseStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let size = bytes.len();
        let req = self
            .client
            .request(Method::POST, &self.object_url(path))
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .header("cache-control", format!("max-age={}", CACHE_SECONDS))
            .body(bytes);
        self.client.send(req, &format!("upload {}", path)).await?;
        tracing::info!(path, size, "uploaded image");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.client.base_url(),
            self.bucket,
            path.trim_start_matches('/')
        )
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = format!("{}/storage/v1/object/{}", self.client.base_url(), self.bucket);
        let req = self
            .client
            .request(Method::DELETE, &url)
            .json(&serde_json::json!({ "prefixes": paths }));
        self.client.send(req, "remove images").await?;
        tracing::info!(count = paths.len(), "removed images");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;

    fn storage() -> SupabaseStorage {
        let cfg = BackendConfig {
            url: "https://xyz.supabase.co/".into(),
            anon_key: Some("k".into()),
            timeout_secs: 5,
        };
        SupabaseStorage::new(SupabaseClient::new(&cfg).unwrap(), "images")
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            storage().public_url("sections/abc.webp"),
            "https://xyz.supabase.co/storage/v1/object/public/images/sections/abc.webp"
        );
    }

    #[test]
    fn test_object_url() {
        assert_eq!(
            storage().object_url("/cards/1-a.png"),
            "https://xyz.supabase.co/storage/v1/object/images/cards/1-a.png"
        );
    }
}
