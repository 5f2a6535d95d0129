//! Validity-masked float arrays.
//!
//! A [`MaskedArray`] is a row-major `f32` grid with a per-pixel boolean
//! companion marking which pixels are invalid (NoData, NaN, or masked by
//! an upstream product). All derived-product math in this crate flows
//! through this type.

use serde::Serialize;

/// Tolerance for near-equality against a NoData sentinel.
pub const FLOAT_TOLERANCE: f32 = 1e-6;

/// NoData sentinel assigned to derived products.
pub const DEFAULT_NODATA: f32 = -9999.0;

/// Row-major f32 grid with a validity mask (`true` = invalid).
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedArray {
    width: usize,
    height: usize,
    data: Vec<f32>,
    mask: Vec<bool>,
}

/// Summary statistics over the valid pixels of an array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub stdev: f32,
}

impl MaskedArray {
    /// Create an array from data and an explicit mask.
    ///
    /// # Panics
    ///
    /// Panics if `data` or `mask` length differs from `width * height`.
    pub fn new(width: usize, height: usize, data: Vec<f32>, mask: Vec<bool>) -> Self {
        assert_eq!(data.len(), width * height, "data length mismatch");
        assert_eq!(mask.len(), width * height, "mask length mismatch");
        Self {
            width,
            height,
            data,
            mask,
        }
    }

    /// Create an array with every pixel valid.
    pub fn from_data(width: usize, height: usize, data: Vec<f32>) -> Self {
        let mask = vec![false; data.len()];
        Self::new(width, height, data, mask)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Value at (x, y), or `None` if out of range or masked.
    pub fn value(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = y * self.width + x;
        if self.mask[i] {
            None
        } else {
            Some(self.data[i])
        }
    }

    /// Number of valid pixels.
    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|m| !**m).count()
    }

    /// Mask pixels equal to the NoData sentinel (exact or within
    /// [`FLOAT_TOLERANCE`]) and pixels holding non-finite values.
    pub fn mask_nodata(&mut self, nodata: f32) {
        for (value, masked) in self.data.iter().zip(self.mask.iter_mut()) {
            if !value.is_finite() || (value - nodata).abs() <= FLOAT_TOLERANCE {
                *masked = true;
            }
        }
    }

    /// Union another array's mask into this one, aligning by nearest-index
    /// resampling when the resolutions differ.
    pub fn union_mask(&mut self, other: &MaskedArray) {
        if other.width == self.width && other.height == self.height {
            for (masked, upstream) in self.mask.iter_mut().zip(other.mask.iter()) {
                *masked |= *upstream;
            }
            return;
        }
        let aligned = other.resample_nearest(self.width, self.height);
        for (masked, upstream) in self.mask.iter_mut().zip(aligned.mask.iter()) {
            *masked |= *upstream;
        }
    }

    /// Nearest-index resample to the requested output shape.
    pub fn resample_nearest(&self, out_width: usize, out_height: usize) -> MaskedArray {
        let mut data = Vec::with_capacity(out_width * out_height);
        let mut mask = Vec::with_capacity(out_width * out_height);
        for oy in 0..out_height {
            let sy = nearest_index(oy, out_height, self.height);
            for ox in 0..out_width {
                let sx = nearest_index(ox, out_width, self.width);
                let i = sy * self.width + sx;
                data.push(self.data[i]);
                mask.push(self.mask[i]);
            }
        }
        MaskedArray::new(out_width, out_height, data, mask)
    }

    /// Append `other` below this array. Widths must match.
    pub fn append_rows(&mut self, other: MaskedArray) {
        assert_eq!(self.width, other.width, "row concat width mismatch");
        self.height += other.height;
        self.data.extend(other.data);
        self.mask.extend(other.mask);
    }

    /// Min/max/mean/stdev over valid pixels. `None` if everything is
    /// masked.
    pub fn stats(&self) -> Option<Stats> {
        let mut count = 0usize;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0f64;

        for (value, masked) in self.data.iter().zip(self.mask.iter()) {
            if *masked {
                continue;
            }
            count += 1;
            min = min.min(*value);
            max = max.max(*value);
            sum += f64::from(*value);
        }
        if count == 0 {
            return None;
        }

        let mean = sum / count as f64;
        let mut var = 0f64;
        for (value, masked) in self.data.iter().zip(self.mask.iter()) {
            if !*masked {
                let d = f64::from(*value) - mean;
                var += d * d;
            }
        }
        var /= count as f64;

        Some(Stats {
            min,
            max,
            mean: mean as f32,
            stdev: var.sqrt() as f32,
        })
    }
}

/// Map an output index onto a source axis by nearest sampling.
#[inline]
fn nearest_index(out_i: usize, out_len: usize, src_len: usize) -> usize {
    if out_len == 0 || src_len == 0 {
        return 0;
    }
    let pos = (out_i as f64 + 0.5) * src_len as f64 / out_len as f64;
    (pos as usize).min(src_len - 1)
}
