//! Mask - Binary raster
//!
//! A `Mask` is a 2D grid of booleans. It is used for the binarized page
//! (`true` = ink), for rasterized line polygons and for the ignore area of a
//! scope.
//!
//! # Memory Layout
//!
//! Data is stored in row-major order with no padding. The pixel at (x, y)
//! is at index `y * width + x`.

use crate::box_::Box;
use crate::error::{Error, Result};
use image::{GrayImage, Luma};

/// Binary raster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
    /// Pixel data (row-major, no padding)
    data: Vec<bool>,
}

impl Mask {
    /// Create a new mask with all pixels OFF
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` if width or height is 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use reseg_core::Mask;
    ///
    /// let mask = Mask::new(64, 32).unwrap();
    /// assert_eq!(mask.dimensions(), (64, 32));
    /// assert_eq!(mask.count(), 0);
    /// ```
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::new_with_value(width, height, false)
    }

    /// Create a new mask with all pixels set to `value`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` if width or height is 0.
    pub fn new_with_value(width: u32, height: u32, value: bool) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }
        let size = (width as usize) * (height as usize);
        Ok(Mask {
            width,
            height,
            data: vec![value; size],
        })
    }

    /// Create a mask from raw row-major data
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are zero or the data length does
    /// not match `width * height`.
    pub fn from_data(width: u32, height: u32, data: Vec<bool>) -> Result<Self> {
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
        Ok(Mask {
            width,
            height,
            data,
        })
    }

    /// Wrap data whose length is already known to match the dimensions
    pub(crate) fn from_raw_parts(width: u32, height: u32, data: Vec<bool>) -> Self {
        debug_assert_eq!(data.len(), (width as usize) * (height as usize));
        Mask {
            width,
            height,
            data,
        }
    }

    /// Create a mask by evaluating `f(x, y)` for every pixel
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` if width or height is 0.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Result<Self> {
        let mut mask = Self::new(width, height)?;
        for y in 0..height {
            for x in 0..width {
                mask.data[(y * width + x) as usize] = f(x, y);
            }
        }
        Ok(mask)
    }

    /// Binarize an 8-bit grayscale image
    ///
    /// A pixel is foreground (ink) when its value is at most the midrange
    /// `(min + max) / 2` of the image, so dark-on-light input yields `true`
    /// for text.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` for an empty image.
    pub fn from_luma(image: &GrayImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }
        let (mut min, mut max) = (u8::MAX, u8::MIN);
        for Luma([v]) in image.pixels() {
            min = min.min(*v);
            max = max.max(*v);
        }
        let midrange = (min as f32 + max as f32) / 2.0;
        let data = image.pixels().map(|Luma([v])| *v as f32 <= midrange).collect();
        Self::from_data(width, height, data)
    }

    /// Render as a grayscale image with black ink on white
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.get_pixel_unchecked(x, y) { 0 } else { 255 }])
        })
    }

    /// Get the width
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the height
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get dimensions as (width, height)
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get a pixel value, or `None` outside the raster
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<bool> {
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
    pub fn get_pixel_unchecked(&self, x: u32, y: u32) -> bool {
        self.data[(y * self.width + x) as usize]
    }

    /// Set a pixel value
    ///
    /// # Errors
    ///
    /// Returns `Error::PixelOutOfBounds` outside the raster.
    pub fn set_pixel(&mut self, x: u32, y: u32, value: bool) -> Result<()> {
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

    /// Set a pixel value, ignoring coordinates outside the raster
    #[inline]
    pub fn set_pixel_clipped(&mut self, x: i64, y: i64, value: bool) {
        if x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64 {
            self.data[(y as u32 * self.width + x as u32) as usize] = value;
        }
    }

    /// Get the raw data
    #[inline]
    pub fn data(&self) -> &[bool] {
        &self.data
    }

    /// Get the raw data mutably
    #[inline]
    pub fn data_mut(&mut self) -> &mut [bool] {
        &mut self.data
    }

    /// Number of ON pixels
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Whether any pixel is ON
    pub fn any(&self) -> bool {
        self.data.iter().any(|&v| v)
    }

    /// Number of pixels ON in both masks
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if the sizes differ.
    pub fn count_and(&self, other: &Mask) -> Result<usize> {
        self.check_same_size(other)?;
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .filter(|&(&a, &b)| a && b)
            .count())
    }

    /// Pixel-wise AND
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if the sizes differ.
    pub fn and(&self, other: &Mask) -> Result<Mask> {
        self.combine(other, |a, b| a && b)
    }

    /// Pixel-wise OR
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if the sizes differ.
    pub fn or(&self, other: &Mask) -> Result<Mask> {
        self.combine(other, |a, b| a || b)
    }

    /// Pixels ON in `self` and OFF in `other`
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if the sizes differ.
    pub fn and_not(&self, other: &Mask) -> Result<Mask> {
        self.combine(other, |a, b| a && !b)
    }

    /// Pixel-wise NOT
    pub fn invert(&self) -> Mask {
        Mask {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| !v).collect(),
        }
    }

    /// Set every pixel ON in `other` to `value`
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if the sizes differ.
    pub fn set_masked(&mut self, other: &Mask, value: bool) -> Result<()> {
        self.check_same_size(other)?;
        for (dst, &on) in self.data.iter_mut().zip(&other.data) {
            if on {
                *dst = value;
            }
        }
        Ok(())
    }

    /// Extract the part of the mask covered by `rect`
    ///
    /// Parts of `rect` outside the raster read as OFF.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` if `rect` is empty.
    pub fn crop(&self, rect: &Box) -> Result<Mask> {
        if rect.w <= 0 || rect.h <= 0 {
            return Err(Error::InvalidDimension {
                width: rect.w.max(0) as u32,
                height: rect.h.max(0) as u32,
            });
        }
        Mask::from_fn(rect.w as u32, rect.h as u32, |x, y| {
            let sx = rect.x as i64 + x as i64;
            let sy = rect.y as i64 + y as i64;
            sx >= 0
                && sy >= 0
                && sx < self.width as i64
                && sy < self.height as i64
                && self.get_pixel_unchecked(sx as u32, sy as u32)
        })
    }

    /// Bounding box of the ON pixels, or `None` for an empty mask
    pub fn bounding_box(&self) -> Option<Box> {
        let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
        let (mut max_x, mut max_y) = (0u32, 0u32);
        let mut found = false;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get_pixel_unchecked(x, y) {
                    found = true;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }
        found.then(|| {
            Box::new_unchecked(
                min_x as i32,
                min_y as i32,
                (max_x - min_x + 1) as i32,
                (max_y - min_y + 1) as i32,
            )
        })
    }

    fn combine(&self, other: &Mask, op: impl Fn(bool, bool) -> bool) -> Result<Mask> {
        self.check_same_size(other)?;
        Ok(Mask {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| op(a, b))
                .collect(),
        })
    }

    pub(crate) fn check_same_size(&self, other: &Mask) -> Result<()> {
        check_dimensions(self.dimensions(), other.dimensions())
    }
}

/// Check that two rasters have the same size
///
/// # Errors
///
/// Returns `Error::DimensionMismatch` if the sizes differ.
pub fn check_dimensions(expected: (u32, u32), actual: (u32, u32)) -> Result<()> {
    if expected != actual {
        return Err(Error::DimensionMismatch { expected, actual });
    }
    Ok(())
}
