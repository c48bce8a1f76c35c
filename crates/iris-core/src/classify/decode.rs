//! Image decoding with format detection and dimension validation.

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

use crate::error::ClassifyError;

/// Result of decoding an image payload.
#[derive(Debug)]
pub struct DecodedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Detected image format
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

/// Decode an image from an in-memory byte buffer.
///
/// The format is detected from the content, never from metadata. Images
/// exceeding `max_dimension` on either axis are rejected before any further
/// processing.
pub fn decode_image(bytes: Vec<u8>, max_dimension: u32) -> Result<DecodedImage, ClassifyError> {
    let cursor = Cursor::new(bytes);
    let reader = image::ImageReader::new(cursor)
        .with_guessed_format()
        .map_err(|e| ClassifyError::Decode {
            message: format!("Cannot detect image format: {}", e),
        })?;
    let format = reader.format().ok_or_else(|| ClassifyError::Decode {
        message: "Unrecognized image format".to_string(),
    })?;
    let image = reader.decode().map_err(|e| ClassifyError::Decode {
        message: e.to_string(),
    })?;

    let (width, height) = image.dimensions();
    if width > max_dimension || height > max_dimension {
        return Err(ClassifyError::ImageTooLarge {
            width,
            height,
            max_dim: max_dimension,
        });
    }

    Ok(DecodedImage {
        image,
        format,
        width,
        height,
    })
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        ImageFormat::Ico => "ico".to_string(),
        ImageFormat::Pnm => "pnm".to_string(),
        ImageFormat::Avif => "avif".to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgb8(width, height);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_png_from_bytes() {
        let decoded = decode_image(png_bytes(8, 6), 10_000).unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!(decoded.width, 8);
        assert_eq!(decoded.height, 6);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_image(b"not an image at all".to_vec(), 10_000).unwrap_err();
        assert!(matches!(err, ClassifyError::Decode { .. }));
    }

    #[test]
    fn test_decode_rejects_oversized_image() {
        let err = decode_image(png_bytes(64, 64), 32).unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::ImageTooLarge {
                width: 64,
                height: 64,
                max_dim: 32
            }
        ));
    }

    #[test]
    fn test_format_to_string() {
        assert_eq!(format_to_string(ImageFormat::Jpeg), "jpeg");
        assert_eq!(format_to_string(ImageFormat::Png), "png");
        assert_eq!(format_to_string(ImageFormat::WebP), "webp");
    }
}
