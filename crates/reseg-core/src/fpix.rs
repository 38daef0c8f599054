//! FPix - Floating-point raster
//!
//! `FPix` is a 2D array of `f32` values. It holds distance transforms, where
//! integer precision is insufficient.
//!
//! # Examples
//!
//! ```
//! use reseg_core::FPix;
//!
//! let mut fpix = FPix::new(100, 100).unwrap();
//! fpix.set_pixel(10, 20, 0.5).unwrap();
//! assert_eq!(fpix.get_pixel(10, 20), Some(0.5));
//! assert_eq!(fpix.max_value(), 0.5);
//! ```

use crate::error::{Error, Result};

/// Floating-point raster
///
/// # Memory Layout
///
/// Data is stored in row-major order with no padding. The pixel at (x, y)
/// is at index `y * width + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct FPix {
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
    /// Pixel data (row-major, no padding)
    data: Vec<f32>,
}

impl FPix {
    /// Create a new FPix with all pixels set to zero
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` if width or height is 0.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::new_with_value(width, height, 0.0)
    }

    /// Create a new FPix with all pixels set to `value`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` if width or height is 0.
    pub fn new_with_value(width: u32, height: u32, value: f32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }
        Ok(FPix {
            width,
            height,
            data: vec![value; (width as usize) * (height as usize)],
        })
    }

    /// Create an FPix from raw row-major data
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are zero or the data length does
    /// not match `width * height`.
    pub fn from_data(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }
        let expected = (width as usize) * (height as usize);
        if data.len() != expected {
            return Err(Error::InvalidParameter(format!(
                "data length {} does not match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(FPix {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get a pixel value, or `None` outside the raster
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<f32> {
        if x < self.width && y < self.height {
            Some(self.data[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    /// Get a pixel value without the `Option` wrapper
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is outside the raster.
    #[inline]
    pub fn get_pixel_unchecked(&self, x: u32, y: u32) -> f32 {
        self.data[(y * self.width + x) as usize]
    }

    /// Set a pixel value
    ///
    /// # Errors
    ///
    /// Returns `Error::PixelOutOfBounds` outside the raster.
    pub fn set_pixel(&mut self, x: u32, y: u32, value: f32) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::PixelOutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        self.data[(y * self.width + x) as usize] = value;
        Ok(())
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Largest pixel value (0 for an all-zero raster)
    pub fn max_value(&self) -> f32 {
        self.data.iter().copied().fold(0.0, f32::max)
    }

    /// Multiply every pixel by a constant
    pub fn mul_constant(&mut self, factor: f32) {
        for v in self.data.iter_mut() {
            *v *= factor;
        }
    }
}
