//! Image metadata handling (EXIF/ICC) on encoded payloads
//!
//! Only JPEG, PNG and WebP containers carry metadata we know how to edit; other
//! payloads pass through unchanged.

use bytes::Bytes;
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::webp::WebP;
use img_parts::{ImageEXIF, ImageICC};

/// Remove EXIF and ICC chunks from an encoded image
pub fn strip_metadata(data: Bytes) -> Bytes {
    if let Ok(mut jpeg) = Jpeg::from_bytes(data.clone()) {
        jpeg.set_exif(None);
        jpeg.set_icc_profile(None);
        return jpeg.encoder().bytes();
    }

    if let Ok(mut png) = Png::from_bytes(data.clone()) {
        png.set_exif(None);
        png.set_icc_profile(None);
        return png.encoder().bytes();
    }

    if let Ok(mut webp) = WebP::from_bytes(data.clone()) {
        webp.set_exif(None);
        webp.set_icc_profile(None);
        return webp.encoder().bytes();
    }

    data
}

/// EXIF block of an encoded image, if any
pub fn read_exif(data: &Bytes) -> Option<Bytes> {
    if let Ok(jpeg) = Jpeg::from_bytes(data.clone()) {
        return jpeg.exif();
    }
    if let Ok(png) = Png::from_bytes(data.clone()) {
        return png.exif();
    }
    if let Ok(webp) = WebP::from_bytes(data.clone()) {
        return webp.exif();
    }
    None
}

/// Copy the EXIF block of `source` into `target`.
///
/// Returns `target` unchanged when the source has no EXIF or the target
/// container cannot hold it.
pub fn copy_exif(source: &Bytes, target: Bytes) -> Bytes {
    let Some(exif) = read_exif(source) else {
        return target;
    };

    if let Ok(mut jpeg) = Jpeg::from_bytes(target.clone()) {
        jpeg.set_exif(Some(exif));
        return jpeg.encoder().bytes();
    }
    if let Ok(mut png) = Png::from_bytes(target.clone()) {
        png.set_exif(Some(exif));
        return png.encoder().bytes();
    }
    if let Ok(mut webp) = WebP::from_bytes(target.clone()) {
        webp.set_exif(Some(exif));
        return webp.encoder().bytes();
    }

    tracing::debug!("Target container cannot carry EXIF, dropping it");
    target
}
