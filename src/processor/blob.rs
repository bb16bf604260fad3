use base64::Engine;

use crate::imagorpath::filter::ImageType;
use crate::processor::error::ProcessorError;

/// Opaque carrier for encoded image bytes plus a content-type hint, shared
/// between the storage layer (raw fetch/put) and the processor (decode
/// input, export output). Readers are restartable since the bytes are held
/// in memory rather than behind a stream.
#[derive(Debug, Clone)]
pub struct Blob {
    pub data: Vec<u8>,
    pub content_type: String,
}

impl Blob {
    /// Builds a blob, sniffing the content type from the bytes themselves.
    pub fn new(data: Vec<u8>) -> Self {
        let content_type = sniff_content_type(&data);
        Self { data, content_type }
    }

    pub fn with_content_type(data: Vec<u8>, content_type: String) -> Self {
        Self { data, content_type }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The sniffed image type, independent of the declared `content_type`.
    pub fn blob_type(&self) -> Option<ImageType> {
        infer::get(&self.data).and_then(|kind| match kind.extension() {
            "jpg" | "jpeg" => Some(ImageType::JPEG),
            "png" => Some(ImageType::PNG),
            "gif" => Some(ImageType::GIF),
            "webp" => Some(ImageType::WEBP),
            "tif" | "tiff" => Some(ImageType::TIFF),
            "bmp" => Some(ImageType::BMP),
            "heif" | "heic" => Some(ImageType::HEIF),
            "avif" => Some(ImageType::AVIF),
            "jp2" => Some(ImageType::JP2K),
            "pdf" => Some(ImageType::PDF),
            _ => None,
        })
    }

    /// True iff the sniffed type is one libvips can decode as a multi-frame
    /// strip: GIF, or a WEBP whose RIFF container actually carries the
    /// `VP8X` animation flag (a static WEBP sniffs to the same container
    /// type but has no frames to cap).
    pub fn supports_animation(&self) -> bool {
        match self.blob_type() {
            Some(ImageType::GIF) => true,
            Some(ImageType::WEBP) => webp_is_animated(&self.data),
            _ => false,
        }
    }

    /// Parses a `{"base64": "..."}` request body, stripping an optional
    /// `...base64,` data-URL prefix before decoding. An empty body is an
    /// `EMPTY_BODY` error rather than a decode failure.
    pub fn from_json_body(body: &[u8]) -> Result<Self, ProcessorError> {
        if body.is_empty() {
            return Err(ProcessorError::EmptyBody);
        }

        #[derive(serde::Deserialize)]
        struct Base64Body {
            base64: String,
        }

        let parsed: Base64Body = serde_json::from_slice(body)
            .map_err(|e| ProcessorError::InvalidParam(format!("invalid json body: {}", e)))?;

        let encoded = match parsed.base64.rfind("base64,") {
            Some(idx) => &parsed.base64[idx + "base64,".len()..],
            None => parsed.base64.as_str(),
        };

        let data = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| ProcessorError::InvalidParam(format!("invalid base64: {}", e)))?;

        if data.is_empty() {
            return Err(ProcessorError::EmptyBody);
        }

        Ok(Blob::new(data))
    }
}

/// Reads the `VP8X` chunk's flags byte (offset 20 in a well-formed RIFF/
/// WEBP container) and checks the animation bit (`0x02`), per the WebP
/// container spec. A WEBP without a `VP8X` chunk (the common `VP8 `/`VP8L`
/// single-frame case) is never animated.
fn webp_is_animated(data: &[u8]) -> bool {
    const ANIMATION_FLAG: u8 = 0x02;
    if data.len() < 21 || &data[0..4] != b"RIFF" || &data[8..12] != b"WEBP" {
        return false;
    }
    if &data[12..16] != b"VP8X" {
        return false;
    }
    data[20] & ANIMATION_FLAG != 0
}

fn sniff_content_type(data: &[u8]) -> String {
    infer::get(data)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_body_is_empty_body_error() {
        let err = Blob::from_json_body(b"").unwrap_err();
        assert!(matches!(err, ProcessorError::EmptyBody));
    }

    #[test]
    fn strips_data_url_prefix() {
        let body = br#"{"base64":"data:image/png;base64,aGVsbG8="}"#;
        let blob = Blob::from_json_body(body).unwrap();
        assert_eq!(blob.data, b"hello");
    }

    #[test]
    fn blob_type_none_for_garbage() {
        let blob = Blob::new(vec![1, 2, 3]);
        assert!(blob.blob_type().is_none());
        assert!(!blob.supports_animation());
    }

    fn riff_webp(fourcc: &[u8; 4], rest: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"RIFF");
        data.extend_from_slice(&[0u8; 4]);
        data.extend_from_slice(b"WEBP");
        data.extend_from_slice(fourcc);
        data.extend_from_slice(rest);
        data
    }

    #[test]
    fn static_webp_does_not_support_animation() {
        let data = riff_webp(b"VP8 ", &[0u8; 16]);
        assert!(!webp_is_animated(&data));
    }

    #[test]
    fn animated_webp_vp8x_flag_detected() {
        let mut rest = vec![0u8; 4]; // VP8X chunk size
        rest.push(0x02); // flags byte: animation bit set
        rest.extend_from_slice(&[0u8; 16]);
        let data = riff_webp(b"VP8X", &rest);
        assert!(webp_is_animated(&data));
    }
}
