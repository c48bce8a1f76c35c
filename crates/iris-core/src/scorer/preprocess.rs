//! Image preprocessing for CLIP inference.
//!
//! CLIP ViT-B/32 expects:
//! - Input size: 224×224 pixels (shortest-edge resize, then center crop)
//! - Normalization: per-channel `(pixel/255 - mean) / std` with the CLIP
//!   training statistics
//! - Channel order: RGB
//! - Tensor layout: NCHW [batch, channels, height, width]

use image::{DynamicImage, GenericImageView};
use ndarray::Array4;

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

/// CLIP normalization mean (per channel, RGB).
const NORM_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// CLIP normalization std (per channel, RGB).
const NORM_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Preprocess an image for CLIP visual inference.
///
/// Resizes so the shortest edge is `image_size`, center-crops to
/// `image_size × image_size`, converts to RGB, normalizes per channel, and
/// returns an NCHW tensor suitable for ONNX Runtime.
pub fn preprocess(image: &DynamicImage, image_size: u32) -> Array4<f32> {
    let (w, h) = image.dimensions();
    // Shortest edge lands exactly on image_size; the other edge keeps the
    // aspect ratio and is trimmed by the center crop.
    let (new_w, new_h) = if w <= h {
        (
            image_size,
            (h as f32 * image_size as f32 / w as f32).round() as u32,
        )
    } else {
        (
            (w as f32 * image_size as f32 / h as f32).round() as u32,
            image_size,
        )
    };
    let resized = image.resize_exact(new_w, new_h, image::imageops::FilterType::CatmullRom);

    let left = (new_w - image_size) / 2;
    let top = (new_h - image_size) / 2;
    let cropped = resized.crop_imm(left, top, image_size, image_size);
    let rgb = cropped.to_rgb8();

    let size = image_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, CHANNELS, size, size));

    // Access raw RGB bytes and the tensor slice directly to avoid per-pixel
    // bounds-checking overhead from get_pixel() and 4D ndarray indexing.
    let raw = rgb.as_raw();
    let tensor_data = tensor.as_slice_mut().unwrap();
    for (i, pixel) in raw.chunks_exact(3).enumerate() {
        let y = i / size;
        let x = i % size;
        for (c, &val) in pixel.iter().enumerate() {
            // NCHW layout: offset = c * size * size + y * size + x
            let idx = c * size * size + y * size + x;
            tensor_data[idx] = (val as f32 / 255.0 - NORM_MEAN[c]) / NORM_STD[c];
        }
    }

    tensor
}
