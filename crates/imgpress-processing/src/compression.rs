//! Image compression
//!
//! [`ImageCompressor`] decodes a source file, optionally shrinks it to a maximum
//! edge, re-encodes it in the requested container and keeps lowering quality
//! (and, when resizing is allowed, dimensions) until the output fits under the
//! size ceiling or the attempts run out.

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder, ImageFormat};
use image::{ImageReader, RgbImage};
use std::io::Cursor;

use imgpress_core::{CompressionSettings, ImageFile, OutputFormat, PressError, PressResult};

use crate::metadata::{copy_exif, strip_metadata};
use crate::naming::with_extension;
use crate::traits::ImageCompression;

/// Attempts made to get under the size ceiling after the first encode
const MAX_SIZE_ITERATIONS: usize = 10;
/// Multiplier applied to quality and dimensions on each attempt
const SHRINK_FACTOR: f32 = 0.9;
const MIN_QUALITY: f32 = 0.1;

/// Container the compressor actually writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Jpeg,
    Png,
    Webp,
    Gif,
    Bmp,
}

impl Encoding {
    fn from_source(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Encoding::Jpeg),
            ImageFormat::Png => Some(Encoding::Png),
            ImageFormat::WebP => Some(Encoding::Webp),
            ImageFormat::Gif => Some(Encoding::Gif),
            ImageFormat::Bmp => Some(Encoding::Bmp),
            _ => None,
        }
    }

    fn resolve(requested: OutputFormat, source: ImageFormat) -> PressResult<Self> {
        match requested {
            OutputFormat::Jpeg => Ok(Encoding::Jpeg),
            OutputFormat::Png => Ok(Encoding::Png),
            OutputFormat::Webp => Ok(Encoding::Webp),
            OutputFormat::Auto => Self::from_source(source).ok_or_else(|| {
                PressError::CompressionFailure(format!("Unsupported source format: {:?}", source))
            }),
        }
    }

    fn is_lossy(self) -> bool {
        matches!(self, Encoding::Jpeg | Encoding::Webp)
    }

    fn mime_type(self) -> &'static str {
        match self {
            Encoding::Jpeg => "image/jpeg",
            Encoding::Png => "image/png",
            Encoding::Webp => "image/webp",
            Encoding::Gif => "image/gif",
            Encoding::Bmp => "image/bmp",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Encoding::Jpeg => "jpg",
            Encoding::Png => "png",
            Encoding::Webp => "webp",
            Encoding::Gif => "gif",
            Encoding::Bmp => "bmp",
        }
    }
}

fn compression_error(context: &str, err: impl std::fmt::Display) -> PressError {
    PressError::CompressionFailure(format!("{}: {}", context, err))
}

/// Default compression operation backed by the `image` and `webp` crates
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCompressor;

impl ImageCompressor {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous compression; runs on whatever thread calls it.
    pub fn compress_blocking(
        file: &ImageFile,
        settings: &CompressionSettings,
    ) -> PressResult<ImageFile> {
        settings.validate()?;

        let reader = ImageReader::new(Cursor::new(file.data.as_ref()))
            .with_guessed_format()
            .map_err(|e| compression_error("Failed to read image", e))?;
        let source_format = reader.format().ok_or_else(|| {
            PressError::CompressionFailure(format!("Unrecognized image format: {}", file.name))
        })?;
        let decoded = reader
            .decode()
            .map_err(|e| compression_error("Failed to decode image", e))?;

        let encoding = Encoding::resolve(settings.output_format, source_format)?;
        let format_changed = Encoding::from_source(source_format) != Some(encoding);

        let (mut working, mut resized) = match settings.max_width_or_height {
            Some(max_edge) => Self::fit_within(&decoded, max_edge),
            None => (decoded, false),
        };

        let mut quality = settings.quality;
        let mut best = Self::encode(&working, encoding, quality)?;
        let ceiling = settings.max_size_bytes();
        let can_shrink = settings.max_width_or_height.is_some();

        let mut iterations = 0;
        while best.len() as u64 > ceiling && iterations < MAX_SIZE_ITERATIONS {
            let can_lower_quality = encoding.is_lossy() && quality > MIN_QUALITY;
            if !can_lower_quality && !can_shrink {
                break;
            }
            iterations += 1;

            if can_lower_quality {
                quality = (quality * SHRINK_FACTOR).max(MIN_QUALITY);
            }
            if can_shrink {
                working = Self::scale(&working, SHRINK_FACTOR);
                resized = true;
            }

            let attempt = Self::encode(&working, encoding, quality)?;
            if attempt.len() < best.len() {
                best = attempt;
            }
        }

        if best.len() as u64 > ceiling {
            tracing::debug!(
                file = %file.name,
                size = best.len(),
                ceiling = ceiling,
                "Size ceiling not reachable, keeping smallest attempt"
            );
        }

        // Re-encoding a file into the same container only pays off when it shrinks it
        if !resized && !format_changed && best.len() >= file.data.len() {
            let data = if settings.remove_metadata {
                strip_metadata(file.data.clone())
            } else {
                file.data.clone()
            };
            return Ok(ImageFile::new(file.name.clone(), file.content_type.clone(), data));
        }

        let data = if settings.remove_metadata {
            best
        } else {
            copy_exif(&file.data, best)
        };

        let name = if format_changed {
            with_extension(&file.name, encoding.extension())
        } else {
            file.name.clone()
        };

        Ok(ImageFile::new(name, encoding.mime_type(), data))
    }

    /// Shrink so the longer edge is at most `max_edge`, keeping the aspect ratio.
    /// Returns whether the image was resized.
    fn fit_within(img: &DynamicImage, max_edge: u32) -> (DynamicImage, bool) {
        let (width, height) = img.dimensions();
        if width.max(height) <= max_edge {
            return (img.clone(), false);
        }
        (img.resize(max_edge, max_edge, FilterType::Lanczos3), true)
    }

    fn scale(img: &DynamicImage, factor: f32) -> DynamicImage {
        let (width, height) = img.dimensions();
        let new_width = ((width as f32 * factor).round() as u32).max(1);
        let new_height = ((height as f32 * factor).round() as u32).max(1);
        img.resize_exact(new_width, new_height, FilterType::Lanczos3)
    }

    fn encode(img: &DynamicImage, encoding: Encoding, quality: f32) -> PressResult<Bytes> {
        match encoding {
            Encoding::Jpeg => Self::encode_jpeg(img, quality),
            Encoding::Png => Self::encode_png(img),
            Encoding::Webp => Self::encode_webp(img, quality),
            Encoding::Gif => Self::encode_with(img, ImageFormat::Gif),
            Encoding::Bmp => Self::encode_with(img, ImageFormat::Bmp),
        }
    }

    fn encode_jpeg(img: &DynamicImage, quality: f32) -> PressResult<Bytes> {
        let rgb = Self::flatten_alpha(img);
        let (width, height) = rgb.dimensions();
        let jpeg_quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;

        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, jpeg_quality)
            .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
            .map_err(|e| compression_error("JPEG encoding failed", e))?;

        Ok(Bytes::from(buffer))
    }

    fn encode_png(img: &DynamicImage) -> PressResult<Bytes> {
        let (width, height) = img.dimensions();
        let mut buffer = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, PngFilterType::Adaptive);

        let result = if img.color().has_alpha() {
            let rgba = img.to_rgba8();
            encoder.write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
        } else {
            let rgb = img.to_rgb8();
            encoder.write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        };
        result.map_err(|e| compression_error("PNG encoding failed", e))?;

        Ok(Bytes::from(buffer))
    }

    fn encode_webp(img: &DynamicImage, quality: f32) -> PressResult<Bytes> {
        let (width, height) = img.dimensions();
        let rgba = img.to_rgba8();

        let encoder = webp::Encoder::from_rgba(rgba.as_raw(), width, height);
        let webp_data = encoder
            .encode_simple(false, (quality * 100.0).clamp(0.0, 100.0))
            .map_err(|e| compression_error("WebP encoding failed", format!("{:?}", e)))?;

        Ok(Bytes::copy_from_slice(&webp_data))
    }

    fn encode_with(img: &DynamicImage, format: ImageFormat) -> PressResult<Bytes> {
        let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
        let mut buffer = Vec::new();
        rgba.write_to(&mut Cursor::new(&mut buffer), format)
            .map_err(|e| compression_error("Encoding failed", e))?;
        Ok(Bytes::from(buffer))
    }

    /// Composite onto white so transparent regions do not turn black in JPEG
    fn flatten_alpha(img: &DynamicImage) -> RgbImage {
        if !img.color().has_alpha() {
            return img.to_rgb8();
        }

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        RgbImage::from_fn(width, height, |x, y| {
            let [r, g, b, a] = rgba.get_pixel(x, y).0;
            let alpha = a as u32;
            let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
            image::Rgb([blend(r), blend(g), blend(b)])
        })
    }
}

#[async_trait]
impl ImageCompression for ImageCompressor {
    async fn compress(
        &self,
        file: &ImageFile,
        settings: &CompressionSettings,
    ) -> PressResult<ImageFile> {
        if !settings.offload_to_worker {
            return Self::compress_blocking(file, settings);
        }

        let file = file.clone();
        let settings = settings.clone();
        // Decode/encode are CPU-bound; run off the async pool to avoid blocking other tasks.
        tokio::task::spawn_blocking(move || Self::compress_blocking(&file, &settings))
            .await
            .map_err(|e| PressError::Internal(format!("Compression worker failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::read_exif;
    use image::{Rgba, RgbaImage};
    use img_parts::jpeg::Jpeg;
    use img_parts::ImageEXIF;

    /// Noisy image so that encoders cannot squeeze it to nothing
    fn create_noisy_image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let v = (x.wrapping_mul(7919) ^ y.wrapping_mul(104_729)).wrapping_mul(2_654_435_761);
            Rgba([(v >> 8) as u8, (v >> 16) as u8, (v >> 24) as u8, 255])
        })
    }

    fn encode_as(img: &RgbaImage, format: ImageFormat) -> Vec<u8> {
        let dynamic = if format == ImageFormat::Jpeg {
            DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img.clone()).to_rgb8())
        } else {
            DynamicImage::ImageRgba8(img.clone())
        };
        let mut buffer = Vec::new();
        dynamic
            .write_to(&mut Cursor::new(&mut buffer), format)
            .unwrap();
        buffer
    }

    fn png_file(width: u32, height: u32) -> ImageFile {
        let data = encode_as(&create_noisy_image(width, height), ImageFormat::Png);
        ImageFile::new("photo.png", "image/png", data)
    }

    fn inline_settings() -> CompressionSettings {
        CompressionSettings {
            offload_to_worker: false,
            ..Default::default()
        }
    }

    fn decoded_format(file: &ImageFile) -> ImageFormat {
        image::guess_format(&file.data).unwrap()
    }

    #[test]
    fn test_encoding_resolve() {
        assert_eq!(
            Encoding::resolve(OutputFormat::Auto, ImageFormat::Gif).unwrap(),
            Encoding::Gif
        );
        assert_eq!(
            Encoding::resolve(OutputFormat::Webp, ImageFormat::Png).unwrap(),
            Encoding::Webp
        );
        assert!(Encoding::resolve(OutputFormat::Auto, ImageFormat::Tiff).is_err());
    }

    #[test]
    fn test_auto_keeps_png_format() {
        let source = png_file(64, 64);
        let out = ImageCompressor::compress_blocking(&source, &inline_settings()).unwrap();
        assert_eq!(out.content_type, "image/png");
        assert_eq!(out.name, "photo.png");
        assert_eq!(decoded_format(&out), ImageFormat::Png);
        assert!(out.size() <= source.size());
    }

    #[test]
    fn test_explicit_webp_changes_name_and_type() {
        let source = png_file(64, 64);
        let settings = CompressionSettings {
            output_format: OutputFormat::Webp,
            ..inline_settings()
        };
        let out = ImageCompressor::compress_blocking(&source, &settings).unwrap();
        assert_eq!(out.content_type, "image/webp");
        assert_eq!(out.name, "photo.webp");
        assert_eq!(decoded_format(&out), ImageFormat::WebP);
    }

    #[test]
    fn test_explicit_jpeg_from_png() {
        let source = png_file(48, 32);
        let settings = CompressionSettings {
            output_format: OutputFormat::Jpeg,
            ..inline_settings()
        };
        let out = ImageCompressor::compress_blocking(&source, &settings).unwrap();
        assert_eq!(out.content_type, "image/jpeg");
        assert_eq!(out.name, "photo.jpg");
        let img = image::load_from_memory(&out.data).unwrap();
        assert_eq!(img.dimensions(), (48, 32));
    }

    #[test]
    fn test_max_edge_bounds_longer_side() {
        let source = png_file(200, 100);
        let settings = CompressionSettings {
            max_width_or_height: Some(50),
            ..inline_settings()
        };
        let out = ImageCompressor::compress_blocking(&source, &settings).unwrap();
        let img = image::load_from_memory(&out.data).unwrap();
        assert_eq!(img.dimensions(), (50, 25));
    }

    #[test]
    fn test_size_ceiling_shrinks_when_resizing_allowed() {
        let source = png_file(256, 256);
        let settings = CompressionSettings {
            max_width_or_height: Some(256),
            max_size_mb: 20_000.0 / (1024.0 * 1024.0),
            output_format: OutputFormat::Jpeg,
            ..inline_settings()
        };
        let unconstrained = ImageCompressor::compress_blocking(
            &source,
            &CompressionSettings {
                max_size_mb: 100.0,
                ..settings.clone()
            },
        )
        .unwrap();
        let constrained = ImageCompressor::compress_blocking(&source, &settings).unwrap();
        assert!(constrained.size() < unconstrained.size());
        let img = image::load_from_memory(&constrained.data).unwrap();
        assert!(img.width() < 256);
    }

    #[test]
    fn test_unreachable_ceiling_is_not_an_error() {
        let source = png_file(64, 64);
        let settings = CompressionSettings {
            max_size_mb: 0.000_001,
            ..inline_settings()
        };
        assert!(ImageCompressor::compress_blocking(&source, &settings).is_ok());
    }

    #[test]
    fn test_gif_and_bmp_roundtrip_in_auto() {
        let img = create_noisy_image(16, 16);
        for (format, mime) in [(ImageFormat::Gif, "image/gif"), (ImageFormat::Bmp, "image/bmp")] {
            let source = ImageFile::new("anim", mime, encode_as(&img, format));
            let out = ImageCompressor::compress_blocking(&source, &inline_settings()).unwrap();
            assert_eq!(out.content_type, mime);
            assert_eq!(decoded_format(&out), format);
        }
    }

    #[test]
    fn test_remove_metadata_strips_exif() {
        let jpeg = encode_as(&create_noisy_image(32, 32), ImageFormat::Jpeg);
        let mut parsed = Jpeg::from_bytes(Bytes::from(jpeg)).unwrap();
        parsed.set_exif(Some(Bytes::from_static(b"MM\x00\x2a\x00\x00\x00\x08\x00\x00")));
        let source = ImageFile::new("shot.jpg", "image/jpeg", parsed.encoder().bytes());
        assert!(read_exif(&source.data).is_some());

        let stripped = ImageCompressor::compress_blocking(&source, &inline_settings()).unwrap();
        assert!(read_exif(&stripped.data).is_none());

        let keep = CompressionSettings {
            remove_metadata: false,
            ..inline_settings()
        };
        let kept = ImageCompressor::compress_blocking(&source, &keep).unwrap();
        assert!(read_exif(&kept.data).is_some());
    }

    #[test]
    fn test_flatten_alpha_onto_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0])));
        let flat = ImageCompressor::flatten_alpha(&img);
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_invalid_payload_fails() {
        let source = ImageFile::new("broken.png", "image/png", b"not an image".to_vec());
        let result = ImageCompressor::compress_blocking(&source, &inline_settings());
        assert!(matches!(result, Err(PressError::CompressionFailure(_))));
    }

    #[test]
    fn test_invalid_settings_fail() {
        let source = png_file(8, 8);
        let settings = CompressionSettings {
            quality: 0.0,
            ..inline_settings()
        };
        assert!(matches!(
            ImageCompressor::compress_blocking(&source, &settings),
            Err(PressError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_offloaded_compression() {
        let compressor = ImageCompressor::new();
        let source = png_file(32, 32);
        let out = compressor
            .compress(&source, &CompressionSettings::default())
            .await
            .unwrap();
        assert_eq!(out.content_type, "image/png");
    }
}
