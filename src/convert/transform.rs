use image::codecs::jpeg::JpegEncoder;
use image::error::{DecodingError, ImageFormatHint};
use image::imageops::FilterType;
use image::{
    ColorType, DynamicImage, GrayAlphaImage, GrayImage, ImageError, ImageFormat, ImageResult, RgbImage,
    RgbaImage,
};
use tracing::warn;

use crate::convert::job::DecoderOptions;

/// JPEG end-of-image marker.
pub const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// PNG file signature.
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Decodes `bytes`. On failure, and if enabled, makes exactly one repair
/// attempt: a PNG is decoded row by row as far as its data reaches, anything
/// else is retried with the JPEG end-of-image marker appended. The repair
/// error is the one returned.
pub fn decode_with_repair(bytes: &[u8], options: &DecoderOptions) -> ImageResult<DynamicImage> {
    match image::load_from_memory(bytes) {
        Ok(img) => Ok(img),
        Err(err) if options.repair_truncated && bytes.starts_with(&PNG_SIGNATURE) => {
            warn!(error = %err, "decode failed, loading the rows that are present");
            decode_partial_png(bytes)
        }
        Err(err) if options.repair_truncated => {
            warn!(error = %err, "decode failed, retrying with end-of-image marker");
            let mut repaired = Vec::with_capacity(bytes.len() + JPEG_EOI.len());
            repaired.extend_from_slice(bytes);
            repaired.extend_from_slice(&JPEG_EOI);
            image::load_from_memory(&repaired)
        }
        Err(err) => Err(err),
    }
}

// ---------------------------------------------------------------------------
// Truncated PNG loading
// ---------------------------------------------------------------------------

/// Decodes a PNG whose stream ends early. Rows up to the first decoding
/// error are kept and the remaining rows are left black.
///
/// # Errors
/// Fails when the header is unreadable, the image is interlaced (its rows
/// arrive in passes, so a prefix is not a usable picture), or not a single
/// row could be decoded.
pub fn decode_partial_png(bytes: &[u8]) -> ImageResult<DynamicImage> {
    let mut decoder = png::Decoder::new(bytes);
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder.read_info().map_err(png_error)?;

    let (width, height, interlaced) = {
        let info = reader.info();
        (info.width, info.height, info.interlaced)
    };
    if interlaced {
        return Err(png_error("interlaced image is truncated"));
    }
    let (color, _) = reader.output_color_type();
    let row_len = width as usize * color.samples();
    if row_len == 0 {
        return Err(png_error("image has no pixels"));
    }

    let mut buf = vec![0u8; row_len * height as usize];
    let mut rows = 0usize;
    for line in buf.chunks_exact_mut(row_len) {
        match reader.next_row() {
            Ok(Some(row)) => {
                let data = row.data();
                let n = data.len().min(row_len);
                line[..n].copy_from_slice(&data[..n]);
                rows += 1;
            }
            Ok(None) => break,
            Err(err) => {
                warn!(rows, height, error = %err, "PNG data ends early");
                break;
            }
        }
    }
    if rows == 0 {
        return Err(png_error("no image rows could be decoded"));
    }

    let img = match color {
        png::ColorType::Grayscale => GrayImage::from_raw(width, height, buf).map(DynamicImage::ImageLuma8),
        png::ColorType::GrayscaleAlpha => {
            GrayAlphaImage::from_raw(width, height, buf).map(DynamicImage::ImageLumaA8)
        }
        png::ColorType::Rgb => RgbImage::from_raw(width, height, buf).map(DynamicImage::ImageRgb8),
        png::ColorType::Rgba => RgbaImage::from_raw(width, height, buf).map(DynamicImage::ImageRgba8),
        png::ColorType::Indexed => None,
    };
    img.ok_or_else(|| png_error("unsupported PNG colour layout"))
}

fn png_error<E>(err: E) -> ImageError
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    ImageError::Decoding(DecodingError::new(ImageFormatHint::Exact(ImageFormat::Png), err))
}

/// Drops alpha/grey channels to RGB8 and resizes to exactly `width × height`.
pub fn to_rgb_resized(img: &DynamicImage, width: u32, height: u32, filter: FilterType) -> RgbImage {
    let rgb = img.to_rgb8();
    image::imageops::resize(&rgb, width, height, filter)
}

/// Encodes an RGB image as baseline JPEG in memory.
pub fn encode_jpeg(img: &RgbImage, quality: u8) -> ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).encode(
        img.as_raw(),
        img.width(),
        img.height(),
        ColorType::Rgb8,
    )?;
    Ok(buf)
}
