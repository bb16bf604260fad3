use std::ops::Deref;

use crate::imagorpath::{
    color::Color,
    filter::{Filter, LabelPosition},
    params::{Params, TrimBy},
};
use crate::processor::error::ProcessorError;
use color_eyre::{
    eyre::{self, Context},
    Result,
};
use libvips::{
    ops::{
        self, Composite2Options, Direction, EmbedOptions, FindTrimOptions, FlattenOptions,
        Interesting, SharpenOptions, Size, TextOptions, ThumbnailImageOptions,
    },
    VipsImage,
};
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct Image(VipsImage);

impl Image {
    pub fn new(image: VipsImage) -> Self {
        Image(image)
    }

    pub fn from_file(path: &str) -> Result<Self, ProcessorError> {
        let image =
            VipsImage::new_from_file(path).map_err(|e| ProcessorError::LoadFailed(e.to_string()))?;
        Ok(Image(image))
    }

    /// Plain decode (no shrink-on-load), honoring `page`/`dpi` and the
    /// animation frame cap `n` (-1 for unlimited).
    pub fn decode(bytes: &[u8], page: usize, dpi: u32, n: i32) -> Result<Self, ProcessorError> {
        let options = format!("[page={},n={},dpi={}]", page.saturating_sub(1), n, dpi.max(1));
        let image = VipsImage::new_from_buffer(bytes, &options)
            .map_err(|e| ProcessorError::UnsupportedFormat(e.to_string()))?;
        Ok(Image(image))
    }

    /// Shrink-on-load decode straight from the encoded bytes, bounding peak
    /// memory to roughly `width x height` instead of allocating the full
    /// source raster first.
    pub fn decode_thumbnail(
        bytes: &[u8],
        width: i32,
        height: i32,
        interesting: Interesting,
        size: Size,
        n: i32,
    ) -> Result<Self, ProcessorError> {
        let image = ops::thumbnail_buffer_with_opts(
            bytes,
            width,
            &libvips::ops::ThumbnailBufferOptions {
                height,
                crop: interesting,
                size,
                option_string: format!("n={}", n),
                ..Default::default()
            },
        )
        .map_err(|e| ProcessorError::UnsupportedFormat(e.to_string()))?;
        Ok(Image(image))
    }

    pub fn into_inner(self) -> VipsImage {
        self.0
    }

    pub fn as_inner(&self) -> &VipsImage {
        &self.0
    }

    pub fn is_animated(&self) -> bool {
        self.0.get_height() > self.0.get_page_height()
    }

    /// The EXIF fields attached to the decoded image, keyed by libvips'
    /// `exif-ifdN-FieldName` field names with the `exif-` prefix stripped.
    pub fn exif_map(&self) -> std::collections::HashMap<String, String> {
        let mut map = std::collections::HashMap::new();
        for field in self.0.image_get_fields() {
            if let Some(name) = field.strip_prefix("exif-") {
                if let Ok(value) = self.0.get_string(&field) {
                    map.insert(name.to_string(), value);
                }
            }
        }
        map
    }

    /// The EXIF orientation tag (1-8), or 0 if the field is absent.
    pub fn get_orientation(&self) -> i32 {
        self.0.get_int("orientation").unwrap_or(0)
    }

    #[instrument(skip(self))]
    pub fn apply_orientation(&self, orient: i32) -> Result<Self, ProcessorError> {
        if orient > 0 {
            let rotated = ops::rotate(&self.0, orient as f64)
                .map_err(|e| ProcessorError::EncodeFailed(e.to_string()))?;

            Ok(Image::new(rotated))
        } else {
            Ok(self.clone())
        }
    }

    pub fn calculate_dimensions(&self, params: &Params, upscale: bool) -> (i32, i32) {
        match (params.width, params.height) {
            (None, None) => (self.0.get_width(), self.0.get_page_height()),
            (None, Some(h)) => {
                let w = self.0.get_width() * h / self.0.get_page_height();
                (
                    if !upscale {
                        w.min(self.0.get_width())
                    } else {
                        w
                    },
                    h,
                )
            }
            (Some(w), None) => {
                let h = self.0.get_page_height() * w / self.0.get_width();
                (
                    w,
                    if !upscale {
                        h.min(self.0.get_page_height())
                    } else {
                        h
                    },
                )
            }
            (Some(w), Some(h)) => (w, h),
        }
    }

    /// Resizes towards `(width, height)` using `fit_in`/`stretch` semantics
    /// resolved by `processor::geometry`. Plain thumbnail-crop (the common
    /// case, neither flag set) is handled by the caller via `thumbnail`.
    pub fn resize_image(
        &self,
        width: i32,
        height: i32,
        fit_in: bool,
        stretch: bool,
        upscale: bool,
    ) -> Result<Image, ProcessorError> {
        let should_resize =
            upscale || width < self.0.get_width() || height < self.0.get_page_height();

        let size = if fit_in {
            Size::Both
        } else if stretch {
            Size::Force
        } else {
            return Ok(self.to_owned());
        };

        if should_resize {
            let thumbnail = ops::thumbnail_image_with_opts(
                &self.0,
                width,
                &ThumbnailImageOptions {
                    height,
                    crop: Interesting::None,
                    size,
                    ..Default::default()
                },
            )
            .map_err(|e| ProcessorError::EncodeFailed(e.to_string()))?;

            Ok(Image::new(thumbnail))
        } else {
            Ok(self.to_owned())
        }
    }

    /// Shrink-on-load thumbnail with crop-based fill, used for the common
    /// "fixed size, smart/attention or aligned crop" case.
    pub fn thumbnail(
        &self,
        width: i32,
        height: i32,
        interesting: Interesting,
    ) -> Result<Image, ProcessorError> {
        let thumbnail = ops::thumbnail_image_with_opts(
            &self.0,
            width,
            &ThumbnailImageOptions {
                height,
                crop: interesting,
                size: Size::Both,
                ..Default::default()
            },
        )
        .map_err(|e| ProcessorError::EncodeFailed(e.to_string()))?;

        Ok(Image::new(thumbnail))
    }

    pub fn crop(&self, left: i32, top: i32, width: i32, height: i32) -> Result<Self, ProcessorError> {
        let cropped = ops::extract_area(&self.0, left, top, width, height)
            .map_err(|e| ProcessorError::EncodeFailed(e.to_string()))?;
        Ok(Image::new(cropped))
    }

    /// Samples the background pixel (top-left or bottom-right, per
    /// `trim_by`) and finds the bounding box of content that differs from it
    /// by more than `tolerance`. Callers are expected to have already
    /// checked `!is_animated()`.
    pub fn find_trim(&self, trim_by: TrimBy, tolerance: i32) -> Result<(i32, i32, i32, i32), ProcessorError> {
        let (x, y) = match trim_by {
            TrimBy::TopLeft => (0, 0),
            TrimBy::BottomRight => (self.0.get_width() - 1, self.0.get_page_height() - 1),
        };
        let tolerance = if tolerance <= 0 { 1 } else { tolerance };

        let background = ops::getpoint(&self.0, x, y)
            .map_err(|e| ProcessorError::BackendFailed(e.to_string()))?;

        ops::find_trim_with_opts(
            &self.0,
            &FindTrimOptions {
                threshold: tolerance as f64,
                background,
                ..Default::default()
            },
        )
        .map_err(|e| ProcessorError::BackendFailed(e.to_string()))
    }

    /// Crop-preserving-focal-point resize: carves out a source-coordinate
    /// window with the target aspect ratio, centred on the (normalized)
    /// focal point and clamped to stay within bounds, then thumbnails that
    /// window down to `(width, height)`.
    pub fn focal_thumbnail(
        &self,
        width: i32,
        height: i32,
        focal_x: f64,
        focal_y: f64,
    ) -> Result<Image, ProcessorError> {
        let src_w = self.0.get_width() as f64;
        let src_h = self.0.get_page_height() as f64;
        let target_aspect = width as f64 / height as f64;
        let src_aspect = src_w / src_h;

        let (crop_w, crop_h) = if src_aspect > target_aspect {
            (src_h * target_aspect, src_h)
        } else {
            (src_w, src_w / target_aspect)
        };

        let focal_px_x = (focal_x * src_w).clamp(0.0, src_w);
        let focal_px_y = (focal_y * src_h).clamp(0.0, src_h);

        let left = (focal_px_x - crop_w / 2.0).clamp(0.0, (src_w - crop_w).max(0.0));
        let top = (focal_px_y - crop_h / 2.0).clamp(0.0, (src_h - crop_h).max(0.0));

        let cropped = self.crop(
            left.round() as i32,
            top.round() as i32,
            crop_w.round().max(1.0) as i32,
            crop_h.round().max(1.0) as i32,
        )?;
        cropped.thumbnail(width, height, Interesting::None)
    }

    /// Resolution guard run after crop-to-fill resize; `0` disables it.
    pub fn check_resolution(&self, max_resolution: i64) -> Result<(), ProcessorError> {
        if max_resolution <= 0 {
            return Ok(());
        }
        let resolution = self.0.get_width() as i64 * self.0.get_page_height() as i64;
        if resolution > max_resolution {
            Err(ProcessorError::ResolutionExceeded(format!(
                "{}x{} ({} px) exceeds max resolution {} px",
                self.0.get_width(),
                self.0.get_page_height(),
                resolution,
                max_resolution
            )))
        } else {
            Ok(())
        }
    }

    /// Loads the watermark image via `load`, optionally resizes it to a
    /// percentage of the base image, applies alpha, resolves its position,
    /// and composites it over `self`. Position supports absolute pixels,
    /// `center`, `Np` (percent of base dimension), or negative (anchored to
    /// the far edge).
    #[allow(clippy::too_many_arguments)]
    pub fn watermark(
        &self,
        overlay_bytes: &[u8],
        x: &crate::imagorpath::filter::WatermarkPosition,
        y: &crate::imagorpath::filter::WatermarkPosition,
        alpha: u8,
        w_ratio: Option<f32>,
        h_ratio: Option<f32>,
    ) -> Result<Self> {
        use crate::imagorpath::filter::WatermarkPosition;

        let overlay = VipsImage::new_from_buffer(overlay_bytes, "")
            .map_err(|e| eyre::eyre!("Failed to load watermark image: {}", e))?;

        let overlay = if w_ratio.is_some() || h_ratio.is_some() {
            let w = w_ratio
                .map(|r| self.0.get_width() * (r as i32) / 100)
                .unwrap_or(overlay.get_width());
            let h = h_ratio
                .map(|r| self.0.get_page_height() * (r as i32) / 100)
                .unwrap_or(overlay.get_page_height());
            if w < overlay.get_width() || h < overlay.get_page_height() {
                ops::thumbnail_image_with_opts(
                    &overlay,
                    w,
                    &ThumbnailImageOptions {
                        height: h,
                        crop: Interesting::None,
                        ..Default::default()
                    },
                )
                .map_err(|e| eyre::eyre!("Failed to resize watermark: {}", e))?
            } else {
                overlay
            }
        } else {
            overlay
        };

        let overlay = if alpha > 0 {
            let overlay = if !overlay.image_hasalpha() {
                ops::bandjoin_const(&overlay, &mut [255.0])
                    .map_err(|e| eyre::eyre!("Failed to add alpha to watermark: {}", e))?
            } else {
                overlay
            };
            let factor = 1.0 - (alpha as f64) / 100.0;
            ops::linear(
                &overlay,
                &mut [1.0, 1.0, 1.0, factor],
                &mut [0.0, 0.0, 0.0, 0.0],
            )
            .map_err(|e| eyre::eyre!("Failed to apply watermark alpha: {}", e))?
        } else {
            overlay
        };

        let resolve = |pos: &WatermarkPosition, base: i32, overlay_dim: i32| -> i32 {
            match pos {
                WatermarkPosition::Center => (base - overlay_dim) / 2,
                WatermarkPosition::Left | WatermarkPosition::Top => 0,
                WatermarkPosition::Right | WatermarkPosition::Bottom => base - overlay_dim,
                WatermarkPosition::Percentage(p) => (p.0 * base as f32) as i32,
                WatermarkPosition::Pixels(p) => {
                    if *p < 0 {
                        base - overlay_dim + p
                    } else {
                        *p
                    }
                }
                WatermarkPosition::Repeat => 0,
            }
        };

        let px = resolve(x, self.0.get_width(), overlay.get_width());
        let py = resolve(y, self.0.get_page_height(), overlay.get_page_height());

        let composited = ops::composite_2_with_opts(
            &self.0,
            &overlay,
            ops::BlendMode::Over,
            &Composite2Options {
                x: px,
                y: py,
                ..Default::default()
            },
        )
        .map_err(|e| eyre::eyre!("Failed to composite watermark: {}", e))?;

        Ok(Self(composited))
    }

    pub fn apply_flip(&self, h_flip: bool, v_flip: bool) -> Result<Self, ProcessorError> {
        let flipped = if h_flip {
            ops::flip(&self.0, Direction::Horizontal)
                .map_err(|e| ProcessorError::EncodeFailed(e.to_string()))?
        } else {
            self.0.clone()
        };

        if v_flip {
            let v_flipped = ops::flip(&flipped, Direction::Vertical)
                .map_err(|e| ProcessorError::EncodeFailed(e.to_string()))?;

            Ok(Image::new(v_flipped))
        } else {
            Ok(Image::new(flipped))
        }
    }

    /// Embeds the image centred into a `width`x`height` canvas, then grows
    /// that canvas by `padding_left/top/right/bottom` (§4.4): the true
    /// output size is `(width+p_left+p_right, height+p_top+p_bottom)`, with
    /// the centred placement shifted by `(p_left, p_top)` from the padded
    /// canvas' origin.
    #[tracing::instrument(skip(self))]
    #[allow(clippy::too_many_arguments)]
    pub fn fill(
        &self,
        width: i32,
        height: i32,
        p_left: i32,
        p_top: i32,
        p_right: i32,
        p_bottom: i32,
        color: &Color,
    ) -> Result<Self> {
        let total_width = width + p_left + p_right;
        let total_height = height + p_top + p_bottom;
        let left = (width - self.0.get_width()) / 2 + p_left;
        let top = (height - self.0.get_page_height()) / 2 + p_top;

        match color {
            Color::None => {
                let img = if self.0.get_bands() < 3 {
                    ops::colourspace(&self.0, ops::Interpretation::Srgb)?
                } else {
                    self.0.clone()
                };

                let img = if !img.image_hasalpha() {
                    ops::bandjoin_const(&img, &mut [255.0])?
                } else {
                    img
                };

                let embedded = ops::embed_with_opts(
                    &img,
                    left,
                    top,
                    total_width,
                    total_height,
                    &EmbedOptions {
                        extend: ops::Extend::Background,
                        background: vec![0.0, 0.0, 0.0, 0.0],
                        ..Default::default()
                    },
                )?;

                Ok(Self(embedded))
            }
            Color::Blur if !self.is_animated() => {
                let copy = self.0.clone();

                let blurred = ops::thumbnail_image_with_opts(
                    &self.0,
                    total_width,
                    &ThumbnailImageOptions {
                        height: total_height,
                        size: Size::Force,
                        ..Default::default()
                    },
                )?;
                let blurred = ops::gaussblur(&blurred, 50.0)?;

                let result = ops::composite_2_with_opts(
                    &blurred,
                    &copy,
                    ops::BlendMode::Over,
                    &Composite2Options {
                        x: left,
                        y: top,
                        ..Default::default()
                    },
                )?;

                Ok(Self(result))
            }
            _ => {
                let (r, g, b) = color
                    .to_rgb(self.as_inner())
                    .ok_or_else(|| eyre::eyre!("invalid fill color"))?;

                let img = if self.0.image_hasalpha() {
                    ops::flatten_with_opts(
                        &self.0,
                        &FlattenOptions {
                            background: vec![r.into(), g.into(), b.into()],
                            ..Default::default()
                        },
                    )?
                } else {
                    self.0.clone()
                };

                let embedded = ops::embed_with_opts(
                    &img,
                    left,
                    top,
                    total_width,
                    total_height,
                    &EmbedOptions {
                        extend: ops::Extend::Background,
                        background: vec![r.into(), g.into(), b.into()],
                        ..Default::default()
                    },
                )?;

                Ok(Self(embedded))
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn apply(&self, filter: &Filter) -> Result<Self> {
        match filter {
            Filter::RoundCorner(params) => {
                let width = self.get_width();
                let height = self.get_height();

                let mask = ops::black(width, height)?;

                ops::draw_rect(&mask, &mut [255.0], 0, 0, width, height)?;

                let img = if !self.0.image_hasalpha() {
                    ops::bandjoin_const(self.as_inner(), &mut [255.0])?
                } else {
                    self.0.clone()
                };

                let rx = params.rx as f64;
                let ry = params.ry.unwrap_or(params.rx) as f64;

                let corner = ops::black(rx as i32, ry as i32)?;
                ops::draw_circle(&corner, &mut [255.0], rx as i32 / 2, ry as i32 / 2, rx as i32 / 2)?;

                let corners = [
                    (0, 0),
                    (width - rx as i32, 0),
                    (0, height - ry as i32),
                    (width - rx as i32, height - ry as i32),
                ];

                for (x, y) in corners.iter() {
                    ops::composite_2_with_opts(
                        &mask,
                        &corner,
                        ops::BlendMode::Over,
                        &Composite2Options {
                            x: *x,
                            y: *y,
                            ..Default::default()
                        },
                    )?;
                }

                let img = ops::multiply(&img, &mask)
                    .map_err(|e| eyre::eyre!("Failed to apply rounded corners: {}", e))?;

                if let Some(color) = &params.color {
                    let (r, g, b) = color
                        .to_rgb(self.as_inner())
                        .ok_or_else(|| eyre::eyre!("invalid round_corner color"))?;
                    let flattened = ops::flatten_with_opts(
                        &img,
                        &FlattenOptions {
                            background: vec![r.into(), g.into(), b.into()],
                            ..Default::default()
                        },
                    )?;
                    return Ok(Image::new(flattened));
                }

                Ok(Image::new(img))
            }
            Filter::Rotate(angle) => {
                let angle = *angle as f64;
                let img = ops::rotate(&self.0, angle)
                    .map_err(|e| eyre::eyre!("Failed to apply rotate filter: {}", e))?;

                Ok(Image::new(img))
            }
            Filter::Label(params) => {
                let img = match self.0.get_interpretation()? as i32 {
                    x if x == ops::Interpretation::BW as i32
                        || x == ops::Interpretation::Cmyk as i32
                        || x == ops::Interpretation::Lab as i32 =>
                    {
                        ops::colourspace(&self.0, ops::Interpretation::Srgb)?
                    }
                    _ => self.0.clone(),
                };

                let img = if !img.image_hasalpha() {
                    ops::bandjoin_const(&img, &mut [255.0])?
                } else {
                    img
                };

                let width = img.get_width();
                let x = match params.x {
                    LabelPosition::Center => width / 2,
                    LabelPosition::Right => width,
                    LabelPosition::Left => 0,
                    LabelPosition::Pixels(px) => {
                        if px < 0 {
                            width + px
                        } else {
                            px
                        }
                    }
                    LabelPosition::Percentage(pct) => (pct.0 * width as f32) as i32,
                    _ => 0,
                };

                let height = img.get_height();
                let y = match params.y {
                    LabelPosition::Center => (height - params.size as i32) / 2,
                    LabelPosition::Top => 0,
                    LabelPosition::Bottom => height - params.size as i32,
                    LabelPosition::Pixels(px) => {
                        if px < 0 {
                            height + px - params.size as i32
                        } else {
                            px
                        }
                    }
                    LabelPosition::Percentage(pct) => (pct.0 * height as f32) as i32,
                    _ => 0,
                };

                let (r, g, b) = params
                    .color
                    .to_rgb(&img)
                    .ok_or_else(|| eyre::eyre!("Invalid color"))?;

                let alpha = params.alpha.unwrap_or(255);
                let font = params.font.as_deref().unwrap_or("sans");

                let text = ops::text_with_opts(
                    &params.text,
                    &TextOptions {
                        font: font.to_string(),
                        width,
                        height: params.size as i32,
                        align: match params.x {
                            LabelPosition::Center => ops::Align::Centre,
                            LabelPosition::Right => ops::Align::High,
                            _ => ops::Align::Low,
                        },
                        dpi: 72,
                        justify: true,
                        rgba: true,
                        spacing: 0,
                        ..Default::default()
                    },
                )?;

                let text = ops::linear(
                    &text,
                    &mut [
                        r as f64 / 255.0,
                        g as f64 / 255.0,
                        b as f64 / 255.0,
                        alpha as f64 / 255.0,
                    ],
                    &mut [0.0, 0.0, 0.0, 0.0],
                )?;

                let img = ops::composite_2_with_opts(
                    &img,
                    &text,
                    ops::BlendMode::Over,
                    &Composite2Options {
                        x,
                        y,
                        ..Default::default()
                    },
                )
                .map_err(|e| eyre::eyre!("Failed to apply label: {}", e))?;

                Ok(Self(img))
            }
            Filter::Grayscale => ops::colourspace(&self.0, ops::Interpretation::BW)
                .map_err(|e| eyre::eyre!("Failed to apply grayscale filter: {}", e))
                .map(Self),
            Filter::Brightness(brightness) => {
                let has_alpha = self.0.image_hasalpha();
                let add = *brightness as f64 * 256.0 / 100.0;

                let mut mul = vec![1.0, 1.0, 1.0];
                let mut beta = vec![add, add, add];
                if has_alpha {
                    mul.push(1.0);
                    beta.push(0.0);
                }

                let img = ops::linear(&self.0, mul.as_mut_slice(), beta.as_mut_slice())
                    .map_err(|e| eyre::eyre!("Failed to apply brightness filter: {}", e))?;

                Ok(Self(img))
            }
            Filter::BackgroundColor(color) => {
                if !self.0.image_hasalpha() {
                    return Ok(self.to_owned());
                }

                let (r, g, b) = color
                    .to_rgb(self.as_inner())
                    .ok_or_else(|| eyre::eyre!("Invalid color"))?;

                let flattened = ops::flatten_with_opts(
                    &self.0,
                    &FlattenOptions {
                        background: vec![r.into(), g.into(), b.into()],
                        ..Default::default()
                    },
                )
                .map_err(|e| {
                    color_eyre::Report::msg(format!("Failed to apply background color: {}", e))
                })?;

                Ok(Self(flattened))
            }
            Filter::Contrast(contrast) => {
                let has_alpha = self.0.image_hasalpha();
                let a = *contrast as f64 * 256.0 / 100.0;
                let b = 128.0 - 128.0 * a;

                let mut mul = vec![a, a, a];
                let mut beta = vec![b, b, b];
                if has_alpha {
                    mul.push(1.0);
                    beta.push(0.0);
                }

                let img = ops::linear(&self.0, mul.as_mut_slice(), beta.as_mut_slice())
                    .map_err(|e| eyre::eyre!("Failed to apply contrast filter: {}", e))?;

                Ok(Self(img))
            }
            Filter::Modulate(brightness, saturation, hue) => {
                Ok(Self(self.modulate_raw(*brightness as f64, *saturation as f64, *hue as f64)?))
            }
            Filter::Hue(hue) => Ok(Self(self.modulate_raw(0.0, 0.0, *hue as f64)?)),
            Filter::Saturation(s) => {
                let s = 1.0 + (*s as f64) / 100.0;
                Ok(Self(self.modulate_raw((s - 1.0) * 0.0, (s - 1.0) * 100.0, 0.0)?))
            }
            Filter::Rgb(r, g, b) => {
                let has_alpha = self.0.image_hasalpha();
                let scale = |v: i32| v as f64 * 256.0 / 100.0;

                let mut mul = vec![1.0, 1.0, 1.0];
                let mut add = vec![scale(*r), scale(*g), scale(*b)];
                if has_alpha {
                    mul.push(1.0);
                    add.push(0.0);
                }

                let img = ops::linear(&self.0, mul.as_mut_slice(), add.as_mut_slice())
                    .map_err(|e| eyre::eyre!("Failed to apply rgb filter: {}", e))?;

                Ok(Self(img))
            }
            Filter::Blur(blur) => {
                if self.is_animated() {
                    return Ok(self.to_owned());
                }

                let sigma = blur.0 as f64;

                if sigma > 0.0 {
                    return ops::gaussblur(&self.0, sigma)
                        .map_err(|e| eyre::eyre!("Failed to apply blur filter: {}", e))
                        .map(Self);
                }

                Ok(self.to_owned())
            }
            Filter::Sharpen(sharpen) => {
                if self.is_animated() {
                    return Ok(self.to_owned());
                }

                let sigma = (1.0 + sharpen.0 * 2.0) as f64;

                if sigma <= 0.0 {
                    return Ok(self.to_owned());
                }

                ops::sharpen_with_opts(
                    &self.0,
                    &SharpenOptions {
                        sigma,
                        x_1: 1.0,
                        m_1: 2.0,
                        ..Default::default()
                    },
                )
                .map_err(|e| eyre::eyre!("Failed to apply sharpen filter: {}", e))
                .map(Self)
            }
            // Per-filter ICC removal. Distinct from `StripExif` below: the
            // upstream implementation conflated the two by routing both
            // through the same ICC-strip call, which silently dropped EXIF
            // while leaving the ICC profile (or vice versa) untouched.
            Filter::StripIcc => {
                let img = self.0.clone();
                img.image_remove("icc-profile-data");
                Ok(Self(img))
            }
            Filter::StripExif => {
                let img = self.0.clone();
                img.image_remove("exif-data");
                img.image_remove("exif-ifd0-Orientation");
                Ok(Self(img))
            }
            Filter::StripMetadata => {
                let img = self.0.clone();
                img.image_remove("icc-profile-data");
                img.image_remove("exif-data");
                img.image_remove("xmp-data");
                img.image_remove("iptc-data");
                Ok(Self(img))
            }
            Filter::Proportion(proportion) => {
                let mut scale = proportion.0.clamp(0.0, 100.0);
                if scale > 1.0 {
                    scale /= 100.0
                }

                let width = (self.0.get_width() as f32 * scale).round() as i32;
                let height = (self.0.get_height() as f32 * scale).round() as i32;

                let thumbnail = ops::thumbnail_image_with_opts(
                    &self.0,
                    width,
                    &ThumbnailImageOptions {
                        height,
                        crop: Interesting::None,
                        ..Default::default()
                    },
                )
                .wrap_err("Failed to apply proportion filter")?;

                Ok(Self(thumbnail))
            }
            _ => Ok(self.to_owned()),
        }
    }

    fn modulate_raw(&self, brightness_pct: f64, saturation_pct: f64, hue_deg: f64) -> Result<VipsImage> {
        let b = 1.0 + brightness_pct / 100.0;
        let s = 1.0 + saturation_pct / 100.0;
        let h = hue_deg;

        let colorspace = match self.0.get_interpretation()? {
            ops::Interpretation::Rgb => ops::Interpretation::Srgb,
            cs => cs,
        };

        let has_alpha = self.0.image_hasalpha();
        let mut multiplications: Vec<f64> = if has_alpha {
            vec![b, s, 1.0, 1.0]
        } else {
            vec![b, s, 1.0]
        };
        let mut additions: Vec<f64> = if has_alpha {
            vec![0.0, 0.0, h, 0.0]
        } else {
            vec![0.0, 0.0, h]
        };

        let colorspace_img = ops::colourspace(&self.0, ops::Interpretation::Lch)?;
        let linear_img = ops::linear(
            &colorspace_img,
            multiplications.as_mut_slice(),
            additions.as_mut_slice(),
        )?;
        let final_img = ops::colourspace(&linear_img, colorspace)?;

        Ok(final_img)
    }
}

impl Deref for Image {
    type Target = VipsImage;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
