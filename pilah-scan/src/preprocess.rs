//! Image → model input tensor
//!
//! Nearest-neighbour resize to 224×224 (source index `floor(dst * in / out)`,
//! no corner alignment), cast to `f32`, scale by 1/255, NHWC layout with a
//! batch dimension of one.

use image::RgbImage;
use ndarray::{Array4, ArrayView4};

use crate::capture::decode_image;
use crate::error::{Result, ScanError};

/// Model input edge length in pixels
pub const INPUT_SIZE: usize = 224;

/// Colour channels per pixel (RGB)
pub const CHANNELS: usize = 3;

/// Shape of every [`InputTensor`]
pub const INPUT_SHAPE: [usize; 4] = [1, INPUT_SIZE, INPUT_SIZE, CHANNELS];

/// Normalised model input of shape `(1, 224, 224, 3)`
///
/// Owned by value through inference; dropping it frees the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: Array4<f32>,
}

impl InputTensor {
    /// Wrap an existing array, checking its shape
    pub fn from_array(data: Array4<f32>) -> Result<Self> {
        if data.shape() != INPUT_SHAPE {
            return Err(ScanError::InvalidFrame(format!(
                "tensor shape {:?}, expected {:?}",
                data.shape(),
                INPUT_SHAPE
            )));
        }
        Ok(Self { data })
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.data
    }

    pub fn into_array(self) -> Array4<f32> {
        self.data
    }
}

/// Nearest source index for `dst` when mapping `in_len` pixels onto `out_len`
fn nearest_index(dst: usize, in_len: usize, out_len: usize) -> usize {
    let src = (dst as u64 * in_len as u64 / out_len as u64) as usize;
    src.min(in_len - 1)
}

/// Convert a decoded image into a model input tensor
///
/// # Errors
/// [`ScanError::InvalidFrame`] for a zero-sized image.
pub fn preprocess(image: &RgbImage) -> Result<InputTensor> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ScanError::InvalidFrame(format!(
            "image has no pixels ({width}x{height})"
        )));
    }
    let (width, height) = (width as usize, height as usize);

    let cols: Vec<u32> = (0..INPUT_SIZE)
        .map(|x| nearest_index(x, width, INPUT_SIZE) as u32)
        .collect();
    let rows: Vec<u32> = (0..INPUT_SIZE)
        .map(|y| nearest_index(y, height, INPUT_SIZE) as u32)
        .collect();

    let data = Array4::from_shape_fn(INPUT_SHAPE, |(_, y, x, c)| {
        let pixel = image.get_pixel(cols[x], rows[y]);
        f32::from(pixel.0[c]) / 255.0
    });

    Ok(InputTensor { data })
}

/// Decode encoded image bytes (JPEG, PNG, ...) and preprocess them
pub fn preprocess_bytes(bytes: &[u8]) -> Result<InputTensor> {
    let image = decode_image(bytes)?;
    preprocess(&image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_shape_and_range() {
        for (w, h) in [(224, 224), (640, 480), (31, 97), (1, 1)] {
            let image = RgbImage::from_fn(w, h, |x, y| {
                Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
            });
            let tensor = preprocess(&image).unwrap();
            assert_eq!(tensor.shape(), &INPUT_SHAPE);
            assert!(tensor.view().iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_white_maps_to_one() {
        let image = RgbImage::from_pixel(50, 50, Rgb([255, 255, 255]));
        let tensor = preprocess(&image).unwrap();
        assert!(tensor.view().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_identity_at_native_size() {
        let image = RgbImage::from_fn(224, 224, |x, y| Rgb([x as u8, y as u8, 7]));
        let tensor = preprocess(&image).unwrap();
        let view = tensor.view();
        assert_eq!(view[[0, 10, 20, 0]], 20.0 / 255.0);
        assert_eq!(view[[0, 10, 20, 1]], 10.0 / 255.0);
        assert_eq!(view[[0, 10, 20, 2]], 7.0 / 255.0);
    }

    #[test]
    fn test_nearest_index_floor() {
        // 448 → 224 picks every other source pixel
        assert_eq!(nearest_index(0, 448, 224), 0);
        assert_eq!(nearest_index(1, 448, 224), 2);
        assert_eq!(nearest_index(223, 448, 224), 446);
        // upscaling repeats pixels
        assert_eq!(nearest_index(223, 2, 224), 1);
        assert_eq!(nearest_index(111, 2, 224), 0);
        assert_eq!(nearest_index(112, 2, 224), 1);
    }

    #[test]
    fn test_empty_image_rejected() {
        let image = RgbImage::new(0, 10);
        assert!(matches!(preprocess(&image), Err(ScanError::InvalidFrame(_))));
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let err = preprocess_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ScanError::InvalidFrame(_)));
    }

    #[test]
    fn test_from_array_checks_shape() {
        assert!(InputTensor::from_array(Array4::zeros((1, 224, 224, 3))).is_ok());
        assert!(InputTensor::from_array(Array4::zeros((1, 3, 224, 224))).is_err());
    }
}
