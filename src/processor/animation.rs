use libvips::ops::{self, ArrayjoinOptions};

use crate::processor::error::ProcessorError;
use crate::processor::image::Image;

/// Enforces the effective frame cap (`maxN`) by truncating the page stack
/// to the first `max_n` frames. `max_n <= 0` or `max_n == -1` means
/// unlimited; a no-op when the image already has fewer frames.
pub fn cap_frames(image: &Image, max_n: i32) -> Result<Image, ProcessorError> {
    if max_n <= 0 {
        return Ok(image.clone());
    }
    let page_height = image.get_page_height();
    let total_frames = image.get_height() / page_height.max(1);
    if max_n >= total_frames {
        return Ok(image.clone());
    }
    let capped_height = max_n * page_height;
    image.crop(0, 0, image.get_width(), capped_height)
}

/// Splits a multi-page image into its individual frames (as single-page
/// images), for transforms that can't be expressed as a single multi-page
/// operation (e.g. focal-point crop, round_corner, watermark composite).
pub fn frames(image: &Image) -> Result<Vec<Image>, ProcessorError> {
    let page_height = image.get_page_height();
    let frame_count = (image.get_height() / page_height.max(1)).max(1);
    let mut out = Vec::with_capacity(frame_count as usize);
    for i in 0..frame_count {
        out.push(image.crop(0, i * page_height, image.get_width(), page_height)?);
    }
    Ok(out)
}

/// Re-stitches per-frame images (all assumed to share width/height) back
/// into a single multi-page strip, restoring the `page-height` field the
/// encoder reads to know how many frames to emit.
pub fn rejoin(frames: &[Image]) -> Result<Image, ProcessorError> {
    let Some(first) = frames.first() else {
        return Err(ProcessorError::InvalidParam(
            "cannot rejoin zero animation frames".to_string(),
        ));
    };
    let width = first.get_width();
    let height = first.get_page_height();
    let images: Vec<_> = frames.iter().map(|f| f.as_inner().clone()).collect();

    let joined = ops::arrayjoin_with_opts(
        &images,
        &ArrayjoinOptions {
            across: 1,
            ..Default::default()
        },
    )
    .map_err(|e| ProcessorError::BackendFailed(e.to_string()))?;

    joined.image_set_int("page-height", height);
    let _ = width;
    Ok(Image::new(joined))
}

/// Runs `f` independently over every frame of an animated image and
/// rejoins the results. Geometry/percentage args passed to `f` should
/// already have been resolved against per-frame dimensions by the caller.
/// Mirrors the source's per-frame decode-transform-re-encode fallback,
/// generalized to operate on in-memory page slices rather than a
/// GIF-specific re-encoder.
pub fn transform_per_frame<F>(image: &Image, max_n: i32, f: F) -> Result<Image, ProcessorError>
where
    F: Fn(&Image) -> Result<Image, ProcessorError>,
{
    let capped = cap_frames(image, max_n)?;
    let transformed: Result<Vec<Image>, ProcessorError> =
        frames(&capped)?.iter().map(f).collect();
    rejoin(&transformed?)
}
