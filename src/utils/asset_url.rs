use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Extensions the asset host only serves correctly through its `raw` delivery type.
const RAW_EXTENSIONS: [&str; 10] = [
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "csv", "zip",
];

const IMAGE_SEGMENT: &str = "/image/upload/";
const RAW_SEGMENT: &str = "/raw/upload/";

fn extension(name: &str) -> Option<String> {
    let name = name.split(['?', '#']).next().unwrap_or(name);
    let file = name.rsplit('/').next().unwrap_or(name);
    file.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Rewrite an image delivery URL to raw delivery when the file is a document.
///
/// Uploads go through the image endpoint regardless of type, so documents come
/// back with `/image/upload/` in their URL and 404 until rewritten.
pub fn transform_cloudinary_url(url: &str, file_name: Option<&str>) -> String {
    let ext = file_name.and_then(extension).or_else(|| extension(url));

    let is_document = ext
        .as_deref()
        .is_some_and(|e| RAW_EXTENSIONS.contains(&e));

    if is_document && url.contains(IMAGE_SEGMENT) {
        url.replacen(IMAGE_SEGMENT, RAW_SEGMENT, 1)
    } else {
        url.to_string()
    }
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset host is not configured")]
    NotConfigured,
}

#[derive(Clone)]
pub struct UploadSigner {
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl UploadSigner {
    pub fn new(cloud_name: String, api_key: String, api_secret: String) -> Self {
        Self {
            cloud_name,
            api_key,
            api_secret,
        }
    }

    pub fn upload_url(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/auto/upload",
            self.cloud_name
        )
    }

    /// String-to-sign: sorted `k=v` pairs joined with `&`, secret appended.
    fn string_to_sign(&self, params: &BTreeMap<String, String>) -> String {
        let joined = params
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}{}", joined, self.api_secret)
    }

    pub fn signature(&self, params: &BTreeMap<String, String>) -> String {
        let digest = Sha256::digest(self.string_to_sign(params).as_bytes());
        format!("{:x}", digest)
    }

    /// Parameters a client posts alongside the file to `upload_url`.
    pub fn sign(
        &self,
        mut params: BTreeMap<String, String>,
        timestamp: i64,
    ) -> BTreeMap<String, String> {
        params.insert("timestamp".to_string(), timestamp.to_string());
        let signature = self.signature(&params);

        params.insert("api_key".to_string(), self.api_key.clone());
        params.insert("signature".to_string(), signature);
        params.insert("signature_algorithm".to_string(), "sha256".to_string());
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PDF_URL: &str =
        "https://res.cloudinary.com/demo/image/upload/v1712/attachments/leave-note.pdf";

    #[test]
    fn pdf_is_moved_to_raw_delivery() {
        assert_eq!(
            transform_cloudinary_url(PDF_URL, Some("leave-note.pdf")),
            "https://res.cloudinary.com/demo/raw/upload/v1712/attachments/leave-note.pdf"
        );
        // extension taken from the url when no name is known
        assert_eq!(
            transform_cloudinary_url(PDF_URL, None),
            "https://res.cloudinary.com/demo/raw/upload/v1712/attachments/leave-note.pdf"
        );
    }

    #[test]
    fn file_name_overrides_url_extension() {
        let url = "https://res.cloudinary.com/demo/image/upload/v1/attachments/abc123";
        assert_eq!(
            transform_cloudinary_url(url, Some("Report.DOCX")),
            "https://res.cloudinary.com/demo/raw/upload/v1/attachments/abc123"
        );
    }

    #[test]
    fn images_and_foreign_urls_are_untouched() {
        let img = "https://res.cloudinary.com/demo/image/upload/v1/selfies/u1.jpg";
        assert_eq!(transform_cloudinary_url(img, Some("u1.jpg")), img);

        let other = "https://files.example.com/docs/a.pdf";
        assert_eq!(transform_cloudinary_url(other, Some("a.pdf")), other);

        let already = "https://res.cloudinary.com/demo/raw/upload/v1/a.pdf";
        assert_eq!(transform_cloudinary_url(already, None), already);
    }

    #[test]
    fn query_string_does_not_hide_extension() {
        let url = "https://res.cloudinary.com/demo/image/upload/v1/a.pdf?dl=1";
        assert_eq!(
            transform_cloudinary_url(url, None),
            "https://res.cloudinary.com/demo/raw/upload/v1/a.pdf?dl=1"
        );
    }

    #[test]
    fn signature_covers_sorted_params_and_secret() {
        let signer = UploadSigner::new("demo".into(), "key".into(), "secret".into());

        let mut params = BTreeMap::new();
        params.insert("timestamp".to_string(), "1315060510".to_string());
        params.insert("folder".to_string(), "attendance".to_string());
        params.insert("public_id".to_string(), String::new());

        assert_eq!(
            signer.string_to_sign(&params),
            "folder=attendance&timestamp=1315060510secret"
        );

        let sig = signer.signature(&params);
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn signed_params_carry_key_and_algorithm() {
        let signer = UploadSigner::new("demo".into(), "key".into(), "secret".into());
        let mut params = BTreeMap::new();
        params.insert("folder".to_string(), "profiles".to_string());

        let signed = signer.sign(params, 1_700_000_000);

        assert_eq!(signed["api_key"], "key");
        assert_eq!(signed["timestamp"], "1700000000");
        assert_eq!(signed["signature_algorithm"], "sha256");

        let mut expected = BTreeMap::new();
        expected.insert("folder".to_string(), "profiles".to_string());
        expected.insert("timestamp".to_string(), "1700000000".to_string());
        assert_eq!(signed["signature"], signer.signature(&expected));
        assert_eq!(signer.upload_url(), "https://api.cloudinary.com/v1_1/demo/auto/upload");
    }
}
