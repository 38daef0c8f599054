//! LabelMap - Integer label raster
//!
//! Each pixel holds a label: 0 means unlabeled/background, positive values
//! are 1-based indices into some ordered list (connected components, existing
//! lines, or candidate lines, depending on the stage).

use crate::error::{Error, Result};
use crate::mask::{Mask, check_dimensions};
use image::{GrayImage, Luma};

/// Integer label raster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    width: u32,
    height: u32,
    data: Vec<u32>,
}

impl LabelMap {
    /// Create a new label map with all pixels unlabeled
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` if width or height is 0.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }
        Ok(LabelMap {
            width,
            height,
            data: vec![0; (width as usize) * (height as usize)],
        })
    }

    /// Create a label map from raw row-major data
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are zero or the data length does
    /// not match `width * height`.
    pub fn from_data(width: u32, height: u32, data: Vec<u32>) -> Result<Self> {
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
        Ok(LabelMap {
            width,
            height,
            data,
        })
    }

    /// Create a map with `label` wherever `mask` is ON
    pub fn from_mask(mask: &Mask, label: u32) -> Self {
        LabelMap {
            width: mask.width(),
            height: mask.height(),
            data: mask
                .data()
                .iter()
                .map(|&on| if on { label } else { 0 })
                .collect(),
        }
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

    /// Get a label, or `None` outside the raster
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x < self.width && y < self.height {
            Some(self.data[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    /// Get a label without the `Option` wrapper
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is outside the raster.
    #[inline]
    pub fn get_pixel_unchecked(&self, x: u32, y: u32) -> u32 {
        self.data[(y * self.width + x) as usize]
    }

    /// Set a label
    ///
    /// # Errors
    ///
    /// Returns `Error::PixelOutOfBounds` outside the raster.
    pub fn set_pixel(&mut self, x: u32, y: u32, label: u32) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::PixelOutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        self.data[(y * self.width + x) as usize] = label;
        Ok(())
    }

    #[inline]
    pub fn data(&self) -> &[u32] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u32] {
        &mut self.data
    }

    /// Largest label present (0 for an unlabeled map)
    pub fn max_label(&self) -> u32 {
        self.data.iter().copied().max().unwrap_or(0)
    }

    /// Mask of all pixels carrying `label`
    pub fn mask_of(&self, label: u32) -> Mask {
        let data = self.data.iter().map(|&l| l == label).collect();
        Mask::from_raw_parts(self.width, self.height, data)
    }

    /// Mask of all labeled pixels
    pub fn nonzero_mask(&self) -> Mask {
        let data = self.data.iter().map(|&l| l != 0).collect();
        Mask::from_raw_parts(self.width, self.height, data)
    }

    /// Number of pixels carrying `label`
    pub fn count(&self, label: u32) -> usize {
        self.data.iter().filter(|&&l| l == label).count()
    }

    /// Number of pixels carrying `label` that are also ON in `mask`
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if the sizes differ.
    pub fn count_masked(&self, label: u32, mask: &Mask) -> Result<usize> {
        check_dimensions(self.dimensions(), mask.dimensions())?;
        Ok(self
            .data
            .iter()
            .zip(mask.data())
            .filter(|&(&l, &on)| on && l == label)
            .count())
    }

    /// Pixel counts per label, indexed by label (index 0 = unlabeled)
    pub fn histogram(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.max_label() as usize + 1];
        for &l in &self.data {
            counts[l as usize] += 1;
        }
        counts
    }

    /// Zero every pixel that is OFF in `mask`
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if the sizes differ.
    pub fn retain_masked(&mut self, mask: &Mask) -> Result<()> {
        check_dimensions(self.dimensions(), mask.dimensions())?;
        for (l, &on) in self.data.iter_mut().zip(mask.data()) {
            if !on {
                *l = 0;
            }
        }
        Ok(())
    }

    /// Replace every label through a lookup table indexed by label
    ///
    /// Labels beyond the table end map to 0.
    pub fn relabel(&mut self, table: &[u32]) {
        for l in self.data.iter_mut() {
            *l = table.get(*l as usize).copied().unwrap_or(0);
        }
    }

    /// Render as a grayscale image for inspection
    ///
    /// Labels are spread over the gray range; unlabeled pixels are white.
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let label = self.get_pixel_unchecked(x, y);
            if label == 0 {
                Luma([255])
            } else {
                Luma([(label.wrapping_mul(47) % 223) as u8])
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mask_and_mask_of() {
        let mask = Mask::from_fn(3, 2, |x, y| x == y).unwrap();
        let labels = LabelMap::from_mask(&mask, 7);
        assert_eq!(labels.max_label(), 7);
        assert_eq!(labels.count(7), 2);
        assert_eq!(labels.mask_of(7), mask);
        assert_eq!(labels.nonzero_mask(), mask);
    }

    #[test]
    fn test_histogram_and_relabel() {
        let mut labels = LabelMap::from_data(4, 1, vec![0, 2, 2, 1]).unwrap();
        assert_eq!(labels.histogram(), vec![1, 1, 2]);
        labels.relabel(&[0, 5]);
        assert_eq!(labels.data(), &[0, 0, 0, 5]);
    }

    #[test]
    fn test_count_masked_and_retain() {
        let mut labels = LabelMap::from_data(3, 1, vec![1, 1, 2]).unwrap();
        let mask = Mask::from_data(3, 1, vec![true, false, true]).unwrap();
        assert_eq!(labels.count_masked(1, &mask).unwrap(), 1);
        labels.retain_masked(&mask).unwrap();
        assert_eq!(labels.data(), &[1, 0, 2]);
    }

    #[test]
    fn test_from_data_length_check() {
        assert!(LabelMap::from_data(2, 2, vec![0; 3]).is_err());
    }
}
