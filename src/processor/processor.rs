use crate::config::ProcessorSettings;
use crate::imagorpath::color::Color;
use crate::imagorpath::filter::{Filter, FocalParams, ImageType};
use crate::imagorpath::params::Params;
use crate::processor::animation;
use crate::processor::blob::Blob;
use crate::processor::encode::{self, ExportParams};
use crate::processor::error::{Cancellation, ProcessorError};
use crate::processor::geometry::{self, Focal, GeometryPlan};
use crate::processor::image::Image;
use crate::processor::metadata::{self, Metadata};

/// Loads a secondary image (currently only the `watermark` filter's operand)
/// by storage path, returning its raw encoded bytes.
pub type Loader<'a> = dyn Fn(&str) -> Result<Vec<u8>, ProcessorError> + Send + Sync + 'a;

pub struct Processor {
    disable_blur: bool,
    disabled_filters: Vec<String>,
    max_filter_ops: usize,
    max_width: i32,
    max_height: i32,
    max_resolution: i64,
    max_animation_frames: usize,
    strip_metadata: bool,
    avif_speed: i32,
    mozjpeg: bool,
}

impl Processor {
    pub fn new(settings: &ProcessorSettings) -> Self {
        Self {
            disable_blur: settings.disable_blur,
            disabled_filters: settings.disabled_filters.clone(),
            max_filter_ops: settings.max_filter_ops,
            max_width: settings.max_width,
            max_height: settings.max_height,
            max_resolution: (settings.max_resolution as i64).max(0),
            max_animation_frames: settings.max_animation_frames,
            strip_metadata: settings.strip_metadata,
            avif_speed: settings.avif_speed,
            mozjpeg: settings.mozjpeg,
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn startup(&self) -> Result<(), ProcessorError> {
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn shutdown(&self) -> Result<(), ProcessorError> {
        Ok(())
    }

    fn enabled_filters<'a>(&self, params: &'a Params) -> Vec<&'a Filter> {
        params
            .filters
            .iter()
            .filter(|f| !self.disabled_filters.iter().any(|n| n == f.name()))
            .filter(|f| !(self.disable_blur && matches!(f, Filter::Blur(_))))
            .take(self.max_filter_ops.max(1))
            .collect()
    }

    /// §4.1 Phase A: a pre-decode pass over `params.filters` that decides
    /// everything the decoder needs to know *before* any pixels are read --
    /// whether shrink-on-load can be used, how many animation frames to
    /// decode, which page/DPI to rasterize at, and whether EXIF/ICC/XMP
    /// should be dropped. Kept entirely separate from the post-decode scan
    /// (§4.1 Phase E) since some of what that pass resolves -- `AutoJpg`'s
    /// alpha check, `fill`'s auto-color sampling, focal-rect normalization --
    /// can only be decided once the source pixels exist.
    #[tracing::instrument(skip(self, params))]
    fn preprocess(&self, blob: &Blob, params: &Params) -> PreDecodePlan {
        let initial = PreDecodePlan {
            thumbnail_not_supported: params.trim,
            upscale: !params.fit_in,
            strip_exif: false,
            strip_metadata: self.strip_metadata,
            orient: 0,
            format: None,
            max_n: if blob.supports_animation() {
                self.max_animation_frames.max(1) as i32
            } else {
                1
            },
            max_bytes: 0,
            page: 1,
            dpi: 0,
            focal_params: Vec::new(),
        };

        self.enabled_filters(params)
            .into_iter()
            .fold(initial, |acc, filter| match filter {
                Filter::Format(format) => PreDecodePlan {
                    format: Some(*format),
                    max_n: if !format.is_animation_supported() { 1 } else { acc.max_n },
                    ..acc
                },
                Filter::MaxFrames(frames) => PreDecodePlan {
                    max_n: if *frames > 0 && (*frames as i32) < acc.max_n {
                        *frames as i32
                    } else {
                        acc.max_n
                    },
                    ..acc
                },
                Filter::Upscale => PreDecodePlan { upscale: true, ..acc },
                Filter::Fill(Color::Auto) | Filter::BackgroundColor(Color::Auto) => {
                    PreDecodePlan { thumbnail_not_supported: true, ..acc }
                }
                Filter::Page(page) => PreDecodePlan { page: (*page).max(1), ..acc },
                Filter::Dpi(dpi) => PreDecodePlan { dpi: (*dpi).max(0), ..acc },
                Filter::Orient(orient) if *orient > 0 => PreDecodePlan {
                    orient: *orient,
                    thumbnail_not_supported: true,
                    ..acc
                },
                Filter::MaxBytes(max_bytes) => PreDecodePlan {
                    max_bytes: *max_bytes,
                    thumbnail_not_supported: true,
                    ..acc
                },
                Filter::Focal(f) => {
                    let mut focal_params = acc.focal_params.clone();
                    focal_params.push(f.clone());
                    PreDecodePlan {
                        thumbnail_not_supported: true,
                        focal_params,
                        ..acc
                    }
                }
                Filter::Rotate(_) | Filter::RoundCorner(_) | Filter::Watermark(_) => {
                    PreDecodePlan { thumbnail_not_supported: true, ..acc }
                }
                Filter::StripExif => PreDecodePlan { strip_exif: true, ..acc },
                Filter::StripMetadata => PreDecodePlan { strip_metadata: true, ..acc },
                _ => acc,
            })
    }

    /// §4.1 Phase E: the post-decode scan. Builds the export knobs and
    /// applies every per-pixel filter that doesn't need external context.
    /// `Watermark` and `Fill` are intercepted here rather than dispatched
    /// through `Image::apply` since they need the loader callback /
    /// padding params respectively, mirroring the source's special-cased
    /// `filter.Name == "fill"` / `"watermark"` handling.
    #[tracing::instrument(skip(self, params, load))]
    fn apply_filters(
        &self,
        image: Image,
        params: &Params,
        max_n: i32,
        load: &Loader<'_>,
    ) -> Result<(Image, ExportParams, bool), ProcessorError> {
        let mut export = ExportParams {
            strip_metadata: self.strip_metadata,
            ..ExportParams::default()
        };
        let mut autojpg = false;
        let mut img = image;

        for filter in self.enabled_filters(params) {
            match filter {
                Filter::Quality(q) => export.quality = *q,
                Filter::AutoJpg => autojpg = true,
                Filter::StripMetadata => export.strip_metadata = true,
                Filter::Fill(color) => {
                    img = apply_fill(&img, params, color, max_n)?;
                }
                Filter::Watermark(w) => {
                    img = apply_watermark(&img, w, max_n, load)?;
                }
                Filter::Rotate(_) | Filter::RoundCorner(_) | Filter::Label(_) if img.is_animated() => {
                    let f = filter.clone();
                    img = animation::transform_per_frame(&img, max_n, |frame| frame.apply(&f).map_err(to_processor_err))?;
                }
                _ => {
                    img = img.apply(filter).map_err(to_processor_err)?;
                }
            }
        }

        Ok((img, export, autojpg))
    }

    /// The full pipeline, §4.1 Phases A-H.
    #[tracing::instrument(skip(self, blob, params, load))]
    pub fn process(
        &self,
        blob: &Blob,
        params: &Params,
        load: &Loader<'_>,
        cancellation: &Cancellation,
    ) -> Result<Blob, ProcessorError> {
        if blob.is_empty() {
            return Err(ProcessorError::EmptyBody);
        }
        cancellation.check()?;

        let plan = self.preprocess(blob, params);

        // Phase B: decode, shrink-on-load when the pre-decode scan allows it.
        let thumbnail_plan = if plan.thumbnail_not_supported {
            None
        } else {
            geometry::plan_thumbnail(params, plan.upscale, self.max_width, self.max_height)
        };

        let (mut image, used_thumbnail) = match thumbnail_plan {
            Some(t) => (
                Image::decode_thumbnail(&blob.data, t.width, t.height, t.interest, t.size, plan.max_n)?,
                true,
            ),
            None => (Image::decode(&blob.data, plan.page, plan.dpi, plan.max_n)?, false),
        };
        cancellation.check()?;

        // Phase C: orientation.
        image = if plan.orient > 0 {
            image.apply_orientation(plan.orient)?
        } else {
            image
        };

        // Phase D: format selection. An explicit `format()` filter wins;
        // otherwise the blob's sniffed source type carries through, falling
        // back to JPEG for anything the sniffer didn't recognize.
        let source_format = blob.blob_type().unwrap_or(ImageType::JPEG);
        let mut format = plan.format.unwrap_or(source_format);

        // Phase E: post-decode filter scan + generic filter application.
        let orig_width = image.get_width() as f64;
        let orig_height = image.get_page_height() as f64;
        let focal_rects: Vec<Focal> = plan
            .focal_params
            .iter()
            .filter_map(|f| geometry::resolve_focal(f, orig_width, orig_height))
            .collect();

        let (image_after_filters, export, autojpg) =
            self.apply_filters(image, params, plan.max_n, load)?;
        image = image_after_filters;
        cancellation.check()?;

        if autojpg && format == ImageType::PNG && !image.image_hasalpha() {
            format = ImageType::JPEG;
        }

        // Phase F: geometry (crop/trim/resize/flip).
        image = geometry::apply_geometry(GeometryPlan {
            image: &image,
            params,
            thumbnail: used_thumbnail,
            upscale: plan.upscale,
            focal_rects: &focal_rects,
            max_resolution: self.max_resolution,
        })?;
        cancellation.check()?;

        // Phase G: metadata shortcut -- short-circuits the export loop.
        if params.meta {
            let meta: Metadata = metadata::metadata(&image, format, plan.strip_exif || export.strip_metadata);
            let json = serde_json::to_vec(&meta)
                .map_err(|e| ProcessorError::EncodeFailed(format!("metadata serialization: {}", e)))?;
            return Ok(Blob::with_content_type(json, "application/json".to_string()));
        }

        if plan.strip_exif {
            image = image.apply(&Filter::StripExif).map_err(to_processor_err)?;
        }

        // Phase H: export loop (format fallback cascade + max_bytes search).
        encode::export(
            &image,
            format,
            export,
            self.mozjpeg,
            self.avif_speed,
            plan.max_bytes,
            cancellation,
        )
    }
}

fn to_processor_err(e: color_eyre::Report) -> ProcessorError {
    ProcessorError::BackendFailed(e.to_string())
}

fn apply_watermark(
    image: &Image,
    w: &crate::imagorpath::filter::WatermarkParams,
    max_n: i32,
    load: &Loader<'_>,
) -> Result<Image, ProcessorError> {
    let bytes = load(&w.image)?;
    if image.is_animated() {
        animation::transform_per_frame(image, max_n, |frame| {
            frame
                .watermark(&bytes, &w.x, &w.y, w.alpha, w.w_ratio.map(|v| v.0), w.h_ratio.map(|v| v.0))
                .map_err(to_processor_err)
        })
    } else {
        image
            .watermark(&bytes, &w.x, &w.y, w.alpha, w.w_ratio.map(|v| v.0), w.h_ratio.map(|v| v.0))
            .map_err(to_processor_err)
    }
}

/// The `fill` filter pads the image out to the requested `(width, height)`
/// plus `padding_left/top/right/bottom` (§4.4), with `color` (or a
/// blurred/auto-sampled background), run after any fit-in resize has
/// already shrunk the source to fit inside that box. Padding is read here
/// and only here -- it has no effect without a `fill` filter in the request.
fn apply_fill(image: &Image, params: &Params, color: &Color, max_n: i32) -> Result<Image, ProcessorError> {
    let width = params.width.unwrap_or(image.get_width());
    let height = params.height.unwrap_or(image.get_page_height());
    let p_left = params.padding_left.unwrap_or(0);
    let p_top = params.padding_top.unwrap_or(0);
    let p_right = params.padding_right.unwrap_or(0);
    let p_bottom = params.padding_bottom.unwrap_or(0);

    if image.is_animated() {
        animation::transform_per_frame(image, max_n, |frame| {
            frame
                .fill(width, height, p_left, p_top, p_right, p_bottom, color)
                .map_err(to_processor_err)
        })
    } else {
        image
            .fill(width, height, p_left, p_top, p_right, p_bottom, color)
            .map_err(to_processor_err)
    }
}

#[derive(Clone, Debug)]
struct PreDecodePlan {
    thumbnail_not_supported: bool,
    upscale: bool,
    strip_exif: bool,
    strip_metadata: bool,
    orient: i32,
    format: Option<ImageType>,
    max_n: i32,
    max_bytes: usize,
    page: usize,
    dpi: u32,
    focal_params: Vec<FocalParams>,
}
