//! Turns uploaded image bytes into inline `ImageRef` content.

use std::fmt;
use std::path::Path;

use base64::Engine as _;

use crate::core::error::ChatError;
use crate::core::message::ContentItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    /// Accepts a file extension (`png`, `.jpg`) or a MIME type (`image/jpeg`).
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim().trim_start_matches('.').to_ascii_lowercase();
        let tag = tag.strip_prefix("image/").unwrap_or(&tag);
        match tag {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" | "pjpeg" => Some(ImageFormat::Jpeg),
            "gif" => Some(ImageFormat::Gif),
            "webp" => Some(ImageFormat::Webp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_tag)
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
        }
    }

    fn codec(self) -> image::ImageFormat {
        match self {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Gif => image::ImageFormat::Gif,
            ImageFormat::Webp => image::ImageFormat::WebP,
        }
    }

    /// The bytes must carry this format's signature and decode as a whole.
    fn validate(self, data: &[u8]) -> Result<(), ImageError> {
        let detected = image::guess_format(data).map_err(|_| ImageError::SignatureMismatch(self))?;
        if detected != self.codec() {
            return Err(ImageError::SignatureMismatch(self));
        }
        image::load_from_memory_with_format(data, detected).map_err(|err| {
            ImageError::Malformed {
                format: self,
                reason: err.to_string(),
            }
        })?;
        Ok(())
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageFormat::Png => "PNG",
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Gif => "GIF",
            ImageFormat::Webp => "WebP",
        };
        f.write_str(name)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ImageError {
    UnknownFormat(String),
    Empty,
    SignatureMismatch(ImageFormat),
    Malformed { format: ImageFormat, reason: String },
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::UnknownFormat(tag) => {
                write!(f, "'{tag}' is not a supported format (png, jpeg, gif, webp)")
            }
            ImageError::Empty => write!(f, "image data is empty"),
            ImageError::SignatureMismatch(format) => {
                write!(f, "data is not a valid {format} image")
            }
            ImageError::Malformed { format, reason } => {
                write!(f, "{format} image could not be decoded: {reason}")
            }
        }
    }
}

impl std::error::Error for ImageError {}

impl From<ImageError> for ChatError {
    fn from(err: ImageError) -> Self {
        ChatError::UnsupportedImageFormat(err.to_string())
    }
}

/// Encode raw image bytes as base64 after checking they match `format_tag`.
pub fn encode_image(data: &[u8], format_tag: &str) -> Result<(ImageFormat, String), ImageError> {
    let format = ImageFormat::from_tag(format_tag)
        .ok_or_else(|| ImageError::UnknownFormat(format_tag.to_string()))?;
    if data.is_empty() {
        return Err(ImageError::Empty);
    }
    format.validate(data)?;
    Ok((format, base64::prelude::BASE64_STANDARD.encode(data)))
}

/// Build the `ImageRef` content item for an uploaded image.
pub fn ingest_image(data: &[u8], format_tag: &str) -> Result<ContentItem, ChatError> {
    let (format, encoded) = encode_image(data, format_tag)?;
    Ok(ContentItem::ImageRef {
        mime_type: format.mime_type().to_string(),
        data: encoded,
    })
}

/// A user-supplied image waiting to be ingested.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub name: String,
    pub data: Vec<u8>,
    pub format_tag: String,
}

impl ImageUpload {
    pub fn new(name: impl Into<String>, data: Vec<u8>, format_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data,
            format_tag: format_tag.into(),
        }
    }

    /// Read an image file, taking the format tag from its extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let format_tag = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self::new(path.display().to_string(), data, format_tag))
    }

    pub fn ingest(&self) -> Result<ContentItem, ChatError> {
        ingest_image(&self.data, &self.format_tag)
    }
}

#[cfg(test)]
pub(crate) fn encoded_sample(format: image::ImageFormat) -> Vec<u8> {
    let mut bytes = std::io::Cursor::new(Vec::new());
    image::RgbImage::from_pixel(2, 2, image::Rgb([200, 40, 40]))
        .write_to(&mut bytes, format)
        .expect("sample image encodes");
    bytes.into_inner()
}

#[cfg(test)]
pub(crate) fn tiny_png() -> Vec<u8> {
    encoded_sample(image::ImageFormat::Png)
}
