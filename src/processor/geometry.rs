use libvips::ops::{Interesting, Size};

use crate::imagorpath::filter::FocalParams;
use crate::imagorpath::params::{HAlign, Params, TrimBy, VAlign};
use crate::processor::error::ProcessorError;
use crate::processor::image::Image;

/// Source-coordinate rectangle whose area-weighted centroid biases crop
/// positioning. Resolved once, immediately after decode, against
/// `orig_width`/`orig_height` -- never against post-resize dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct Focal {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

/// Resolves the `focal` filter's args into source-coordinate rects.
/// Invalid rects (`right <= left` or `bottom <= top`) are dropped silently.
pub fn resolve_focal(params: &FocalParams, orig_width: f64, orig_height: f64) -> Option<Focal> {
    let mut f = match params {
        FocalParams::Region {
            top_left,
            bottom_right,
        } => Focal {
            left: top_left.0 as f64,
            top: top_left.1 as f64,
            right: bottom_right.0 as f64,
            bottom: bottom_right.1 as f64,
        },
        FocalParams::Point(x, y) => {
            let left = x.0 as f64;
            let top = y.0 as f64;
            Focal {
                left,
                top,
                right: left + 1.0,
                bottom: top + 1.0,
            }
        }
    };
    if f.left < 1.0 && f.top < 1.0 && f.right <= 1.0 && f.bottom <= 1.0 {
        f.left *= orig_width;
        f.right *= orig_width;
        f.top *= orig_height;
        f.bottom *= orig_height;
    }
    if f.right > f.left && f.bottom > f.top {
        Some(f)
    } else {
        None
    }
}

/// Area-weighted centroid of the given rects, in source pixel coordinates.
pub fn focal_centroid(rects: &[Focal]) -> (f64, f64) {
    let total_area: f64 = rects
        .iter()
        .map(|f| (f.right - f.left) * (f.bottom - f.top))
        .sum();
    if total_area <= 0.0 {
        return (0.0, 0.0);
    }
    let mut x = 0.0;
    let mut y = 0.0;
    for f in rects {
        let area = (f.right - f.left) * (f.bottom - f.top);
        let weight = area / total_area;
        x += (f.left + f.right) / 2.0 * weight;
        y += (f.top + f.bottom) / 2.0 * weight;
    }
    (x, y)
}

/// Resolved crop rectangle in source pixel coordinates, or `None` when no
/// crop applies (all-zero `Crop*`, or the resolved rect collapsed).
#[derive(Clone, Copy, Debug, Default)]
pub struct CropRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

/// Resolves `Crop*` params against `orig_width`/`orig_height`. Fractions
/// (all four `<= 1`) are scaled and rounded to pixels; zero `CropRight`/
/// `CropBottom` default to `orig - 1`; both are clamped to `orig - 1`.
pub fn resolve_crop(params: &Params, orig_width: f64, orig_height: f64) -> Option<CropRect> {
    let crop_left = params.crop_left.map(|v| v.0 as f64).unwrap_or(0.0);
    let crop_top = params.crop_top.map(|v| v.0 as f64).unwrap_or(0.0);
    let crop_right = params.crop_right.map(|v| v.0 as f64).unwrap_or(0.0);
    let crop_bottom = params.crop_bottom.map(|v| v.0 as f64).unwrap_or(0.0);

    if crop_left <= 0.0 && crop_top <= 0.0 && crop_right <= 0.0 && crop_bottom <= 0.0 {
        return None;
    }

    let mut left = crop_left.max(0.0);
    let mut top = crop_top.max(0.0);
    let mut right = crop_right;
    let mut bottom = crop_bottom;

    if crop_left < 1.0 && crop_top < 1.0 && crop_right <= 1.0 && crop_bottom <= 1.0 {
        left = (left * orig_width).round();
        top = (top * orig_height).round();
        right = (right * orig_width).round();
        bottom = (bottom * orig_height).round();
    }

    if right <= 0.0 {
        right = orig_width - 1.0;
    }
    if bottom <= 0.0 {
        bottom = orig_height - 1.0;
    }
    right = right.min(orig_width - 1.0);
    bottom = bottom.min(orig_height - 1.0);

    Some(CropRect {
        left,
        top,
        right,
        bottom,
    })
}

/// Crop-focus mode. `Force` stretches instead of cropping.
pub use libvips::ops::Interesting as Interest;

/// Whether the pre-decode filter scan forces a full (non-thumbnail) decode:
/// trim, focal, rotate, explicit `max_bytes`/`orient`, or `fill=auto` all
/// disable the shrink-on-load fast path since they need source-resolution
/// pixels to operate correctly.
pub fn thumbnail_not_supported(params: &Params) -> bool {
    params.trim
}

/// A planned shrink-on-load (thumbnail) decode. When `Some`, the decoder
/// should be invoked with these dimensions instead of a plain/bounded
/// decode; `interest`/`size` mirror libvips' thumbnail crop semantics.
#[derive(Clone, Copy, Debug)]
pub struct ThumbnailPlan {
    pub width: i32,
    pub height: i32,
    pub interest: Interesting,
    pub size: Size,
}

/// Resolves the shrink-on-load decode plan (§4.1 Phase B.1), or `None` if
/// the request doesn't qualify (explicit crop present, or no size hint that
/// maps to a supported thumbnail shape) and a full decode should run instead.
pub fn plan_thumbnail(
    params: &Params,
    upscale: bool,
    max_width: i32,
    max_height: i32,
) -> Option<ThumbnailPlan> {
    if thumbnail_not_supported(params) {
        return None;
    }
    let has_crop = params.crop_left.is_some()
        || params.crop_top.is_some()
        || params.crop_right.is_some()
        || params.crop_bottom.is_some();
    if has_crop {
        return None;
    }

    let width = params.width.unwrap_or(0);
    let height = params.height.unwrap_or(0);

    if params.fit_in {
        if width > 0 || height > 0 {
            let w = if width > 0 { width } else { max_width };
            let h = if height > 0 { height } else { max_height };
            let size = if upscale { Size::Both } else { Size::Down };
            return Some(ThumbnailPlan {
                width: w,
                height: h,
                interest: Interesting::None,
                size,
            });
        }
        return None;
    }

    if params.stretch {
        if width > 0 && height > 0 {
            return Some(ThumbnailPlan {
                width,
                height,
                interest: Interesting::None,
                size: Size::Force,
            });
        }
        return None;
    }

    if width > 0 && height > 0 {
        let interest = if params.smart {
            Some(Interesting::Attention)
        } else if matches!(params.v_align, Some(VAlign::Top)) && params.h_align.is_none() {
            Some(Interesting::Low)
        } else if matches!(params.h_align, Some(HAlign::Left)) && params.v_align.is_none() {
            Some(Interesting::Low)
        } else if matches!(params.v_align, Some(VAlign::Bottom)) && params.h_align.is_none() {
            Some(Interesting::High)
        } else if matches!(params.h_align, Some(HAlign::Right)) && params.v_align.is_none() {
            Some(Interesting::High)
        } else if matches!(params.v_align, None | Some(VAlign::Middle))
            && matches!(params.h_align, None | Some(HAlign::Center))
        {
            Some(Interesting::Centre)
        } else {
            None
        };
        interest.map(|interest| ThumbnailPlan {
            width,
            height,
            interest,
            size: Size::Both,
        })
    } else if width > 0 {
        Some(ThumbnailPlan {
            width,
            height: max_height,
            interest: Interesting::None,
            size: Size::Both,
        })
    } else if height > 0 {
        Some(ThumbnailPlan {
            width: max_width,
            height,
            interest: Interesting::None,
            size: Size::Both,
        })
    } else {
        None
    }
}

/// Full geometry resolution for the post-decode plan (§4.2): crop/trim
/// apply, size resolution, resize (fit-in/stretch/crop-to-fill), flips.
/// Skipped almost entirely when `thumbnail` is true -- decode already did
/// the heavy lifting; only crop/trim/flips still apply in that case.
pub struct GeometryPlan<'a> {
    pub image: &'a Image,
    pub params: &'a Params,
    pub thumbnail: bool,
    pub upscale: bool,
    pub focal_rects: &'a [Focal],
    pub max_resolution: i64,
}

pub fn apply_geometry(plan: GeometryPlan<'_>) -> Result<Image, ProcessorError> {
    let GeometryPlan {
        image,
        params,
        thumbnail,
        upscale,
        focal_rects,
        max_resolution,
    } = plan;

    let orig_width = image.get_width() as f64;
    let orig_height = image.get_page_height() as f64;

    let mut crop = resolve_crop(params, orig_width, orig_height);

    if params.trim && !image.is_animated() {
        if let Ok((l, t, w, h)) = image.find_trim(params.trim_by, params.trim_tolerance.map(|v| v.0 as i32).unwrap_or(0))
        {
            let (l, t, w, h) = (l as f64, t as f64, w as f64, h as f64);
            crop = Some(match crop {
                Some(c) => CropRect {
                    left: c.left.max(l),
                    top: c.top.max(t),
                    right: if c.right > 0.0 {
                        c.right.min(l + w)
                    } else {
                        l + w
                    },
                    bottom: if c.bottom > 0.0 {
                        c.bottom.min(t + h)
                    } else {
                        t + h
                    },
                },
                None => CropRect {
                    left: l,
                    top: t,
                    right: l + w,
                    bottom: t + h,
                },
            });
        }
    }

    let image = if let Some(c) = crop {
        if c.right > c.left && c.bottom > c.top {
            image.crop(
                c.left as i32,
                c.top as i32,
                (c.right - c.left) as i32,
                (c.bottom - c.top) as i32,
            )?
        } else {
            image.to_owned()
        }
    } else {
        image.to_owned()
    };

    let (w, h) = image.calculate_dimensions(params, upscale);

    let image = if thumbnail {
        image
    } else if params.fit_in {
        if upscale || w < image.get_width() || h < image.get_page_height() {
            image.resize_image(w, h, true, false, upscale)?
        } else {
            image
        }
    } else if params.stretch {
        if upscale || (w < image.get_width() && h < image.get_page_height()) {
            image.resize_image(w, h, false, true, upscale)?
        } else {
            image
        }
    } else if upscale || w < image.get_width() || h < image.get_page_height() {
        let interest = if params.smart {
            Interesting::Attention
        } else if (w as f64) / (h as f64) > (image.get_width() as f64) / (image.get_page_height() as f64) {
            match params.v_align {
                Some(VAlign::Top) => Interesting::Low,
                Some(VAlign::Bottom) => Interesting::High,
                _ => Interesting::Centre,
            }
        } else {
            match params.h_align {
                Some(HAlign::Left) => Interesting::Low,
                Some(HAlign::Right) => Interesting::High,
                _ => Interesting::Centre,
            }
        };

        let resized = if !focal_rects.is_empty() {
            let (focal_x, focal_y) = focal_centroid(focal_rects);
            let crop_left = crop.map(|c| c.left).unwrap_or(0.0);
            let crop_top = crop.map(|c| c.top).unwrap_or(0.0);
            let rel_x = (focal_x - crop_left) / image.get_width() as f64;
            let rel_y = (focal_y - crop_top) / image.get_page_height() as f64;
            image.focal_thumbnail(w, h, rel_x, rel_y)?
        } else {
            image.thumbnail(w, h, interest)?
        };

        resized.check_resolution(max_resolution)?;
        resized
    } else {
        image
    };

    image.apply_flip(params.h_flip, params.v_flip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn crop_all_zero_skips() {
        assert!(resolve_crop(&Params::default(), 1000.0, 500.0).is_none());
    }

    #[test]
    fn crop_fractions_scale_to_pixels() {
        let mut p = Params::default();
        p.crop_left = Some(crate::imagorpath::params::F32(0.1));
        p.crop_top = Some(crate::imagorpath::params::F32(0.1));
        p.crop_right = Some(crate::imagorpath::params::F32(0.9));
        p.crop_bottom = Some(crate::imagorpath::params::F32(0.9));
        let c = resolve_crop(&p, 1000.0, 1000.0).unwrap();
        assert_eq!((c.left, c.top, c.right, c.bottom), (100.0, 100.0, 900.0, 900.0));
    }

    #[test]
    fn focal_point_normalizes_and_expands() {
        let params = FocalParams::Point(crate::imagorpath::params::F32(0.5), crate::imagorpath::params::F32(0.5));
        let f = resolve_focal(&params, 1000.0, 1000.0).unwrap();
        assert_eq!((f.left, f.top), (500.0, 500.0));
        assert_eq!((f.right, f.bottom), (501.0, 501.0));
    }

    #[test]
    fn invalid_focal_rect_dropped() {
        let params = FocalParams::Region {
            top_left: (crate::imagorpath::params::F32(10.0), crate::imagorpath::params::F32(10.0)),
            bottom_right: (crate::imagorpath::params::F32(5.0), crate::imagorpath::params::F32(5.0)),
        };
        assert!(resolve_focal(&params, 1000.0, 1000.0).is_none());
    }

    #[test]
    fn centroid_weights_by_area() {
        let rects = vec![
            Focal { left: 0.0, top: 0.0, right: 10.0, bottom: 10.0 },
            Focal { left: 90.0, top: 90.0, right: 100.0, bottom: 100.0 },
        ];
        let (x, y) = focal_centroid(&rects);
        assert_eq!((x, y), (50.0, 50.0));
    }
}
