use std::fmt;
use std::path::PathBuf;

use crate::recognizer::OcrError;

/// Locator for an uploaded proof image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// Public or presigned object-storage URL.
    Url(String),
    Path(PathBuf),
    /// Image already in memory, e.g. straight from the upload body.
    Bytes(Vec<u8>),
}

impl ImageRef {
    pub fn parse(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            ImageRef::Url(s.to_string())
        } else {
            ImageRef::Path(PathBuf::from(s))
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRef::Url(url) => write!(f, "{url}"),
            ImageRef::Path(path) => write!(f, "{}", path.display()),
            ImageRef::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

/// Fetch the raw image bytes behind a reference.
pub async fn load_image(image: &ImageRef) -> Result<Vec<u8>, OcrError> {
    let bytes = match image {
        ImageRef::Url(url) => {
            let resp = reqwest::get(url)
                .await
                .map_err(|e| OcrError::ImageLoad(format!("fetching {url}: {e}")))?;
            if !resp.status().is_success() {
                return Err(OcrError::ImageLoad(format!(
                    "fetching {url}: HTTP {}",
                    resp.status()
                )));
            }
            resp.bytes()
                .await
                .map_err(|e| OcrError::ImageLoad(format!("reading {url}: {e}")))?
                .to_vec()
        }
        ImageRef::Path(path) => tokio::fs::read(path)
            .await
            .map_err(|e| OcrError::ImageLoad(format!("{}: {e}", path.display())))?,
        ImageRef::Bytes(bytes) => bytes.clone(),
    };

    if bytes.is_empty() {
        return Err(OcrError::ImageLoad(format!("{image}: empty image")));
    }
    Ok(bytes)
}
