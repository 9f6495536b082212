//! Object storage (`/storage/v1/object`).

use bytes::Bytes;
use reqwest::Method;

use crate::client::StudyHubClient;
use crate::error::{Result, check};

/// Percent-encode each path segment, keeping the `/` separators.
pub fn encode_object_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

impl StudyHubClient {
    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.config().base_url(),
            encode_segment(bucket),
            encode_object_path(path)
        )
    }

    /// URL of an object in a public bucket.
    pub fn object_public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config().base_url(),
            encode_segment(bucket),
            encode_object_path(path)
        )
    }

    pub(crate) async fn storage_upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<()> {
        let size = data.len();
        let request = self
            .authorized(Method::POST, &self.object_url(bucket, path))
            .await
            .header("content-type", content_type)
            .header("x-upsert", "false")
            .body(data);
        check(request.send().await?).await?;
        tracing::debug!(bucket, path, size, "Uploaded object");
        Ok(())
    }

    pub(crate) async fn storage_download(&self, bucket: &str, path: &str) -> Result<Bytes> {
        let request = self.authorized(Method::GET, &self.object_url(bucket, path)).await;
        let response = check(request.send().await?).await?;
        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_object_path() {
        assert_eq!(
            encode_object_path("lecture-files/1714560000000.pdf"),
            "lecture-files/1714560000000.pdf"
        );
        assert_eq!(encode_object_path("/a b/ü.txt"), "a%20b/%C3%BC.txt");
    }
}
