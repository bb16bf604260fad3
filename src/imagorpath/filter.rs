use crate::imagorpath::{color::Color, params::F32};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The parsed, typed vocabulary of filters a path can request. Pixel-level
/// semantics live in `processor::image`; this module only owns the shape and
/// the canonical string rendering used by `generate`/`hasher`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    BackgroundColor(Color),
    Blur(F32),
    Brightness(i32),
    Contrast(i32),
    Fill(Color),
    Focal(FocalParams),
    Format(ImageType),
    Grayscale,
    Hue(i32),
    Label(LabelParams),
    MaxBytes(usize),
    MaxFrames(usize),
    Modulate(u32, u32, u32),
    Orient(i32),
    Page(usize),
    Dpi(u32),
    Proportion(F32),
    Quality(u8),
    Rgb(i32, i32, i32),
    Rotate(i32),
    RoundCorner(RoundedCornerParams),
    Saturation(i32),
    Sharpen(F32),
    StripExif,
    StripIcc,
    StripMetadata,
    Upscale,
    NoUpscale,
    AutoJpg,
    Watermark(WatermarkParams),
}

impl Filter {
    /// The name this filter was parsed from / is generated under. Used by
    /// the hasher to find a `format` override without matching on strings.
    pub fn name(&self) -> &'static str {
        match self {
            Filter::BackgroundColor(_) => "background_color",
            Filter::Blur(_) => "blur",
            Filter::Brightness(_) => "brightness",
            Filter::Contrast(_) => "contrast",
            Filter::Fill(_) => "fill",
            Filter::Focal(_) => "focal",
            Filter::Format(_) => "format",
            Filter::Grayscale => "grayscale",
            Filter::Hue(_) => "hue",
            Filter::Label(_) => "label",
            Filter::MaxBytes(_) => "max_bytes",
            Filter::MaxFrames(_) => "max_frames",
            Filter::Modulate(..) => "modulate",
            Filter::Orient(_) => "orient",
            Filter::Page(_) => "page",
            Filter::Dpi(_) => "dpi",
            Filter::Proportion(_) => "proportion",
            Filter::Quality(_) => "quality",
            Filter::Rgb(..) => "rgb",
            Filter::Rotate(_) => "rotate",
            Filter::RoundCorner(_) => "round_corner",
            Filter::Saturation(_) => "saturation",
            Filter::Sharpen(_) => "sharpen",
            Filter::StripExif => "strip_exif",
            Filter::StripIcc => "strip_icc",
            Filter::StripMetadata => "strip_metadata",
            Filter::Upscale => "upscale",
            Filter::NoUpscale => "no_upscale",
            Filter::AutoJpg => "autojpg",
            Filter::Watermark(_) => "watermark",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::BackgroundColor(color) => write!(f, "background_color({})", color),
            Filter::Blur(amount) => write!(f, "blur({})", amount.0),
            Filter::Brightness(value) => write!(f, "brightness({})", value),
            Filter::Contrast(value) => write!(f, "contrast({})", value),
            Filter::Fill(color) => write!(f, "fill({})", color),
            Filter::Focal(value) => write!(f, "focal({})", value),
            Filter::Format(format) => write!(f, "format({})", format),
            Filter::Grayscale => write!(f, "grayscale()"),
            Filter::Hue(value) => write!(f, "hue({})", value),
            Filter::Label(params) => write!(
                f,
                "label({},{},{},{},{})",
                params.text, params.x, params.y, params.size, params.color
            ),
            Filter::MaxBytes(value) => write!(f, "max_bytes({})", value),
            Filter::MaxFrames(value) => write!(f, "max_frames({})", value),
            Filter::Modulate(b, s, h) => write!(f, "modulate({},{},{})", b, s, h),
            Filter::Orient(value) => write!(f, "orient({})", value),
            Filter::Page(value) => write!(f, "page({})", value),
            Filter::Dpi(value) => write!(f, "dpi({})", value),
            Filter::Proportion(value) => write!(f, "proportion({})", value.0),
            Filter::Quality(value) => write!(f, "quality({})", value),
            Filter::Rgb(r, g, b) => write!(f, "rgb({},{},{})", r, g, b),
            Filter::Rotate(value) => write!(f, "rotate({})", value),
            Filter::RoundCorner(params) => match (&params.ry, &params.color) {
                (Some(ry), Some(color)) => {
                    write!(f, "round_corner({},{},{})", params.rx, ry, color)
                }
                (Some(ry), None) => write!(f, "round_corner({},{})", params.rx, ry),
                (None, _) => write!(f, "round_corner({})", params.rx),
            },
            Filter::Saturation(value) => write!(f, "saturation({})", value),
            Filter::Sharpen(value) => write!(f, "sharpen({})", value.0),
            Filter::StripExif => write!(f, "strip_exif()"),
            Filter::StripIcc => write!(f, "strip_icc()"),
            Filter::StripMetadata => write!(f, "strip_metadata()"),
            Filter::Upscale => write!(f, "upscale()"),
            Filter::NoUpscale => write!(f, "no_upscale()"),
            Filter::AutoJpg => write!(f, "autojpg()"),
            Filter::Watermark(params) => {
                write!(
                    f,
                    "watermark({},{},{},{}",
                    params.image, params.x, params.y, params.alpha
                )?;
                if let Some(w) = &params.w_ratio {
                    write!(f, ",{}", w.0)?;
                }
                if let Some(h) = &params.h_ratio {
                    write!(f, ",{}", h.0)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    GIF,
    JPEG,
    PNG,
    MAGICK,
    PDF,
    SVG,
    TIFF,
    WEBP,
    HEIF,
    BMP,
    AVIF,
    JP2K,
}

impl ImageType {
    pub fn is_animation_supported(&self) -> bool {
        matches!(self, ImageType::GIF | ImageType::WEBP)
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageType::GIF => write!(f, "gif"),
            ImageType::JPEG => write!(f, "jpeg"),
            ImageType::PNG => write!(f, "png"),
            ImageType::MAGICK => write!(f, "magick"),
            ImageType::PDF => write!(f, "pdf"),
            ImageType::SVG => write!(f, "svg"),
            ImageType::TIFF => write!(f, "tiff"),
            ImageType::WEBP => write!(f, "webp"),
            ImageType::HEIF => write!(f, "heif"),
            ImageType::BMP => write!(f, "bmp"),
            ImageType::AVIF => write!(f, "avif"),
            ImageType::JP2K => write!(f, "jp2k"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WatermarkParams {
    pub image: String,
    pub x: WatermarkPosition,
    pub y: WatermarkPosition,
    pub alpha: u8,
    pub w_ratio: Option<F32>,
    pub h_ratio: Option<F32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum WatermarkPosition {
    Pixels(i32),
    Percentage(F32),
    Left,
    Right,
    Center,
    Top,
    Bottom,
    Repeat,
}

impl fmt::Display for WatermarkPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatermarkPosition::Pixels(p) => write!(f, "{}", p),
            WatermarkPosition::Percentage(p) => write!(f, "{}p", p.0),
            WatermarkPosition::Left => write!(f, "left"),
            WatermarkPosition::Right => write!(f, "right"),
            WatermarkPosition::Center => write!(f, "center"),
            WatermarkPosition::Top => write!(f, "top"),
            WatermarkPosition::Bottom => write!(f, "bottom"),
            WatermarkPosition::Repeat => write!(f, "repeat"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RoundedCornerParams {
    pub rx: u32,
    pub ry: Option<u32>,
    pub color: Option<Color>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LabelParams {
    pub text: String,
    pub x: LabelPosition,
    pub y: LabelPosition,
    pub size: u32,
    pub color: Color,
    pub alpha: Option<u8>,
    pub font: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum LabelPosition {
    Pixels(i32),
    Percentage(F32),
    Left,
    Right,
    Center,
    Top,
    Bottom,
}

impl fmt::Display for LabelPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelPosition::Pixels(p) => write!(f, "{}", p),
            LabelPosition::Percentage(p) => write!(f, "{}p", p.0),
            LabelPosition::Left => write!(f, "left"),
            LabelPosition::Right => write!(f, "right"),
            LabelPosition::Center => write!(f, "center"),
            LabelPosition::Top => write!(f, "top"),
            LabelPosition::Bottom => write!(f, "bottom"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum FocalParams {
    Region {
        top_left: (F32, F32),
        bottom_right: (F32, F32),
    },
    Point(F32, F32),
}

impl fmt::Display for FocalParams {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FocalParams::Region {
                top_left,
                bottom_right,
            } => {
                write!(
                    f,
                    "{}x{}:{}x{}",
                    top_left.0, top_left.1, bottom_right.0, bottom_right.1
                )
            }
            FocalParams::Point(x, y) => write!(f, "{}x{}", x, y),
        }
    }
}
