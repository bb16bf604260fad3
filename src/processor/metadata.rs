use serde::Serialize;
use std::collections::HashMap;

use crate::imagorpath::filter::ImageType;
use crate::processor::encode::content_type;
use crate::processor::image::Image;

/// Metadata-only response shape (§4.8), emitted instead of an export when
/// `params.Meta` is set.
#[derive(Serialize, Debug)]
pub struct Metadata {
    pub format: String,
    pub content_type: String,
    pub width: i32,
    pub height: i32,
    pub pages: i32,
    pub bands: i32,
    pub orientation: i32,
    pub exif: HashMap<String, String>,
}

pub fn metadata(image: &Image, format: ImageType, strip_exif: bool) -> Metadata {
    let pages = if format.is_animation_supported() {
        image.get_height() / image.get_page_height().max(1)
    } else {
        1
    };

    let exif = if strip_exif {
        HashMap::new()
    } else {
        image.exif_map()
    };

    Metadata {
        format: format.to_string(),
        content_type: content_type(format).to_string(),
        width: image.get_width(),
        height: image.get_page_height(),
        pages,
        bands: image.get_bands(),
        orientation: image.get_orientation(),
        exif,
    }
}
