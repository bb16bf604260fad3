use libvips::ops::{
    self, GifsaveBufferOptions, HeifsaveBufferOptions, Jp2ksaveBufferOptions,
    JpegsaveBufferOptions, PngsaveBufferOptions, TiffsaveBufferOptions, WebpsaveBufferOptions,
};

use crate::imagorpath::filter::ImageType;
use crate::processor::blob::Blob;
use crate::processor::error::{Cancellation, ProcessorError};
use crate::processor::image::Image;

/// Per-format export knobs collected by the post-decode filter scan.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExportParams {
    pub quality: u8,
    pub compression: i32,
    pub palette: bool,
    pub bitdepth: i32,
    pub strip_metadata: bool,
}

/// Maps `format` through to a format libvips can actually save. PNG/WEBP/
/// TIFF/GIF/AVIF/HEIF/JP2K pass through if the backend advertises save
/// support; AVIF additionally falls back to HEIF-with-AVIF-compression when
/// direct AVIF save is unavailable. Everything else (including formats the
/// backend can't save at all) collapses to JPEG.
pub fn supported_save_format(format: ImageType) -> ImageType {
    match format {
        ImageType::PNG
        | ImageType::WEBP
        | ImageType::TIFF
        | ImageType::GIF
        | ImageType::AVIF
        | ImageType::HEIF
        | ImageType::JP2K => {
            if ops::type_find("VipsForeignSave", &save_loader_name(format)) {
                format
            } else if format == ImageType::AVIF
                && ops::type_find("VipsForeignSave", &save_loader_name(ImageType::HEIF))
            {
                ImageType::AVIF
            } else {
                ImageType::JPEG
            }
        }
        _ => ImageType::JPEG,
    }
}

fn save_loader_name(format: ImageType) -> String {
    match format {
        ImageType::PNG => "VipsForeignSavePng".to_string(),
        ImageType::WEBP => "VipsForeignSaveWebp".to_string(),
        ImageType::TIFF => "VipsForeignSaveTiff".to_string(),
        ImageType::GIF => "VipsForeignSaveGif".to_string(),
        ImageType::AVIF => "VipsForeignSaveAvif".to_string(),
        ImageType::HEIF => "VipsForeignSaveHeif".to_string(),
        ImageType::JP2K => "VipsForeignSaveJp2k".to_string(),
        _ => "VipsForeignSaveJpeg".to_string(),
    }
}

pub fn content_type(format: ImageType) -> &'static str {
    match format {
        ImageType::PNG => "image/png",
        ImageType::WEBP => "image/webp",
        ImageType::TIFF => "image/tiff",
        ImageType::GIF => "image/gif",
        ImageType::AVIF => "image/avif",
        ImageType::HEIF => "image/heif",
        ImageType::JP2K => "image/jp2",
        ImageType::BMP => "image/bmp",
        ImageType::SVG => "image/svg+xml",
        ImageType::PDF => "application/pdf",
        ImageType::MAGICK => "application/octet-stream",
        ImageType::JPEG => "image/jpeg",
    }
}

/// Encodes `image` to bytes in `format`, honoring per-format params. JPEG
/// additionally supports a MozJPEG preset (pre-seeds quality=75 and enables
/// optimize-coding/interlace/optimize-scans/trellis-quant/quant-table=3)
/// before any explicit `quality` override is applied.
pub fn encode(
    image: &Image,
    format: ImageType,
    params: &ExportParams,
    mozjpeg: bool,
    avif_speed: i32,
) -> Result<Vec<u8>, ProcessorError> {
    let img = image.as_inner();
    match format {
        ImageType::PNG => {
            let mut opts = PngsaveBufferOptions::default();
            if params.quality > 0 {
                opts.q = params.quality as i32;
            }
            opts.palette = params.palette;
            if params.bitdepth > 0 {
                opts.bitdepth = params.bitdepth;
            }
            if params.compression > 0 {
                opts.compression = params.compression;
            }
            opts.strip = params.strip_metadata;
            ops::pngsave_buffer_with_opts(img, &opts)
        }
        ImageType::WEBP => {
            let mut opts = WebpsaveBufferOptions::default();
            if params.quality > 0 {
                opts.q = params.quality as i32;
            }
            opts.strip = params.strip_metadata;
            ops::webpsave_buffer_with_opts(img, &opts)
        }
        ImageType::TIFF => {
            let mut opts = TiffsaveBufferOptions::default();
            if params.quality > 0 {
                opts.q = params.quality as i32;
            }
            opts.strip = params.strip_metadata;
            ops::tiffsave_buffer_with_opts(img, &opts)
        }
        ImageType::GIF => {
            let mut opts = GifsaveBufferOptions::default();
            if params.quality > 0 {
                opts.q = params.quality as i32;
            }
            opts.strip = params.strip_metadata;
            ops::gifsave_buffer_with_opts(img, &opts)
        }
        ImageType::AVIF => {
            let mut opts = HeifsaveBufferOptions::default();
            if params.quality > 0 {
                opts.q = params.quality as i32;
            }
            opts.strip = params.strip_metadata;
            opts.speed = avif_speed;
            opts.compression = ops::ForeignHeifCompression::Av1;
            ops::heifsave_buffer_with_opts(img, &opts)
        }
        ImageType::HEIF => {
            let mut opts = HeifsaveBufferOptions::default();
            if params.quality > 0 {
                opts.q = params.quality as i32;
            }
            ops::heifsave_buffer_with_opts(img, &opts)
        }
        ImageType::JP2K => {
            let mut opts = Jp2ksaveBufferOptions::default();
            if params.quality > 0 {
                opts.q = params.quality as i32;
            }
            ops::jp2ksave_buffer_with_opts(img, &opts)
        }
        _ => {
            let mut opts = JpegsaveBufferOptions::default();
            if mozjpeg {
                opts.q = 75;
                opts.strip = true;
                opts.optimize_coding = true;
                opts.interlace = true;
                opts.optimize_scans = true;
                opts.trellis_quant = true;
                opts.quant_table = 3;
            }
            if params.quality > 0 {
                opts.q = params.quality as i32;
            }
            if params.strip_metadata {
                opts.strip = true;
            }
            ops::jpegsave_buffer_with_opts(img, &opts)
        }
    }
    .map_err(|e| ProcessorError::EncodeFailed(e.to_string()))
}

/// Encodes with the `max_bytes` quality-reduction search: if `maxBytes > 0`
/// and the format isn't PNG, repeatedly halves/shrinks quality until the
/// encoded length is within budget or quality bottoms out at <= 10.
pub fn export_with_max_bytes(
    image: &Image,
    format: ImageType,
    mut params: ExportParams,
    mozjpeg: bool,
    avif_speed: i32,
    max_bytes: usize,
    cancellation: &Cancellation,
) -> Result<Vec<u8>, ProcessorError> {
    loop {
        let buf = encode_with_fallback(image, format, &params, mozjpeg, avif_speed)?;

        let search_active =
            max_bytes > 0 && format != ImageType::PNG && (params.quality > 10 || params.quality == 0);

        if !search_active || buf.len() <= max_bytes {
            return Ok(buf);
        }

        if params.quality == 0 {
            params.quality = 80;
        }
        let delta = buf.len() as f64 / max_bytes as f64;
        let factor = if delta > 3.0 {
            0.25
        } else if delta > 1.5 {
            0.50
        } else {
            0.75
        };
        let next_quality = (params.quality as f64 * factor).round() as u8;
        if next_quality >= params.quality {
            return Ok(buf);
        }
        params.quality = next_quality;

        cancellation.check()?;
    }
}

/// Encodes to `format`, retrying once as JPEG if a WEBP/HEIF/AVIF encode
/// fails with an error that looks like a feature-gap rather than a
/// transient backend fault. Recovers from missing codec support without
/// failing the whole request.
fn encode_with_fallback(
    image: &Image,
    format: ImageType,
    params: &ExportParams,
    mozjpeg: bool,
    avif_speed: i32,
) -> Result<Vec<u8>, ProcessorError> {
    match encode(image, format, params, mozjpeg, avif_speed) {
        Ok(buf) => Ok(buf),
        Err(ProcessorError::EncodeFailed(msg))
            if matches!(format, ImageType::WEBP | ImageType::HEIF | ImageType::AVIF)
                && msg.to_lowercase().contains("encode") =>
        {
            encode(image, ImageType::JPEG, params, mozjpeg, avif_speed)
        }
        Err(e) => Err(e),
    }
}

/// Top-level export entry point used by the orchestrator: resolves the
/// supported save format, runs the `max_bytes` search, and packages the
/// result as a content-typed `Blob`.
pub fn export(
    image: &Image,
    format: ImageType,
    params: ExportParams,
    mozjpeg: bool,
    avif_speed: i32,
    max_bytes: usize,
    cancellation: &Cancellation,
) -> Result<Blob, ProcessorError> {
    let format = supported_save_format(format);
    let buf = export_with_max_bytes(image, format, params, mozjpeg, avif_speed, max_bytes, cancellation)?;
    Ok(Blob::with_content_type(buf, content_type(format).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unsupported_formats_collapse_to_jpeg() {
        assert_eq!(supported_save_format(ImageType::BMP), ImageType::JPEG);
        assert_eq!(supported_save_format(ImageType::SVG), ImageType::JPEG);
    }

    #[test]
    fn content_type_table() {
        assert_eq!(content_type(ImageType::PNG), "image/png");
        assert_eq!(content_type(ImageType::JPEG), "image/jpeg");
    }
}
