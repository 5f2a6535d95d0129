//! Windowed raster reading with bounded peak memory.
//!
//! Large rasters are read along the shorter axis in a single pass and
//! along the longer axis in step-sized slices, each slice downsampled
//! before the next one is fetched. This trades read latency for a bound
//! on how much full-resolution data is in memory at once. Callers that
//! need full fidelity use `step_pct = 100, resolution_pct = 100`.

use super::{MaskedArray, RasterSource, StoreError};

/// Smallest usable scale factor when the requested resolution is zero.
const MIN_SCALE: f32 = 0.0001;

/// Slice-and-downsample reader over a [`RasterSource`].
#[derive(Debug, Clone, Copy)]
pub struct WindowReader {
    /// Row/column step as a percentage of the longer axis, clamped to
    /// [0, 100]. `0` reads one row/col at a time, `100` the whole raster
    /// in one pass.
    pub step_pct: f32,
    /// Target resolution percentage, clamped to [0, 100].
    pub resolution_pct: f32,
}

impl Default for WindowReader {
    fn default() -> Self {
        // Quarter-extent slices at full resolution.
        Self {
            step_pct: 25.0,
            resolution_pct: 100.0,
        }
    }
}

impl WindowReader {
    pub fn new(step_pct: f32, resolution_pct: f32) -> Self {
        Self {
            step_pct,
            resolution_pct,
        }
    }

    /// Integer slice size along an axis of `longer` pixels.
    pub fn step_size(&self, longer: usize) -> usize {
        if self.step_pct <= 0.0 {
            return 1;
        }
        if self.step_pct >= 100.0 {
            return longer.max(1);
        }
        (((longer as f32) * self.step_pct / 100.0).round() as usize).max(1)
    }

    /// Output scale factor.
    pub fn scale(&self) -> f32 {
        if self.resolution_pct <= 0.0 {
            return MIN_SCALE;
        }
        if self.resolution_pct >= 100.0 {
            return 1.0;
        }
        self.resolution_pct / 100.0
    }

    /// Read a whole band through slices, masking NoData and non-finite
    /// values and unioning an optional upstream invalid mask (aligned by
    /// nearest-index resampling when resolutions differ).
    pub fn read(
        &self,
        source: &dyn RasterSource,
        band: &str,
        nodata: f32,
        upstream: Option<&MaskedArray>,
    ) -> Result<MaskedArray, StoreError> {
        let geometry = source.geometry();
        let (width, height) = (geometry.width, geometry.height);
        let scale = self.scale();

        // Slice along the longer axis; the shorter one is read whole.
        let mut array = if height >= width {
            let step = self.step_size(height);
            let out_width = scaled(width, scale);
            let mut rows: Option<MaskedArray> = None;

            let mut y = 0;
            while y < height {
                let slice_height = step.min(height - y);
                let out_height = scaled(slice_height, scale);
                let slice =
                    source.read_window(band, 0, y, width, slice_height, out_width, out_height)?;
                rows = Some(match rows.take() {
                    Some(mut acc) => {
                        acc.append_rows(slice);
                        acc
                    }
                    None => slice,
                });
                y += slice_height;
            }
            rows.unwrap_or_else(|| MaskedArray::from_data(0, 0, Vec::new()))
        } else {
            let step = self.step_size(width);
            let out_height = scaled(height, scale);

            let mut slices = Vec::new();
            let mut x = 0;
            while x < width {
                let slice_width = step.min(width - x);
                let out_width = scaled(slice_width, scale);
                slices.push(source.read_window(
                    band,
                    x,
                    0,
                    slice_width,
                    height,
                    out_width,
                    out_height,
                )?);
                x += slice_width;
            }
            concat_columns(&slices, out_height)
        };

        array.mask_nodata(nodata);
        if let Some(upstream) = upstream {
            array.union_mask(upstream);
        }
        Ok(array)
    }
}

/// Scaled output length, never below one pixel.
#[inline]
fn scaled(len: usize, scale: f32) -> usize {
    (((len as f32) * scale).round() as usize).max(1)
}

/// Stitch column slices of equal height side by side.
fn concat_columns(slices: &[MaskedArray], out_height: usize) -> MaskedArray {
    let total_width: usize = slices.iter().map(|s| s.width()).sum();
    let mut data = Vec::with_capacity(total_width * out_height);
    let mut mask = Vec::with_capacity(total_width * out_height);

    for y in 0..out_height {
        for slice in slices {
            let start = y * slice.width();
            data.extend_from_slice(&slice.data()[start..start + slice.width()]);
            mask.extend_from_slice(&slice.mask()[start..start + slice.width()]);
        }
    }
    MaskedArray::new(total_width, out_height, data, mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Geometry;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory raster: value = row index, one band named "1".
    struct GridSource {
        width: usize,
        height: usize,
        nodata_rows: usize,
        reads: AtomicUsize,
    }

    impl GridSource {
        fn new(width: usize, height: usize) -> Self {
            Self {
                width,
                height,
                nodata_rows: 0,
                reads: AtomicUsize::new(0),
            }
        }
    }

    impl RasterSource for GridSource {
        fn geometry(&self) -> Geometry {
            Geometry {
                width: self.width,
                height: self.height,
                projection: "EPSG:32633".to_string(),
                origin: (0.0, 0.0),
                pixel_size: (30.0, -30.0),
            }
        }

        fn nodata(&self, _band: &str) -> Option<f32> {
            Some(-9999.0)
        }

        fn read_window(
            &self,
            _band: &str,
            x_off: usize,
            y_off: usize,
            width: usize,
            height: usize,
            out_width: usize,
            out_height: usize,
        ) -> Result<MaskedArray, StoreError> {
            self.reads.fetch_add(1, Ordering::Relaxed);
            let mut data = Vec::with_capacity(out_width * out_height);
            for oy in 0..out_height {
                let sy = y_off + (oy * height) / out_height.max(1);
                for ox in 0..out_width {
                    let _sx = x_off + (ox * width) / out_width.max(1);
                    if sy < self.nodata_rows {
                        data.push(-9999.0);
                    } else {
                        data.push(sy as f32);
                    }
                }
            }
            Ok(MaskedArray::from_data(out_width, out_height, data))
        }
    }

    #[test]
    fn test_step_size_bounds() {
        assert_eq!(WindowReader::new(0.0, 100.0).step_size(500), 1);
        assert_eq!(WindowReader::new(-5.0, 100.0).step_size(500), 1);
        assert_eq!(WindowReader::new(100.0, 100.0).step_size(500), 500);
        assert_eq!(WindowReader::new(150.0, 100.0).step_size(500), 500);
        assert_eq!(WindowReader::new(20.0, 100.0).step_size(500), 100);
        // Proportional step never collapses to zero.
        assert_eq!(WindowReader::new(1.0, 100.0).step_size(10), 1);
    }

    #[test]
    fn test_scale_bounds() {
        assert_eq!(WindowReader::new(100.0, 0.0).scale(), MIN_SCALE);
        assert_eq!(WindowReader::new(100.0, -1.0).scale(), MIN_SCALE);
        assert_eq!(WindowReader::new(100.0, 100.0).scale(), 1.0);
        assert_eq!(WindowReader::new(100.0, 120.0).scale(), 1.0);
        assert_eq!(WindowReader::new(100.0, 50.0).scale(), 0.5);
    }

    #[test]
    fn test_read_downsampled_shape() {
        // 40x100 raster, r=50 s=20: rows are the longer axis, sliced in
        // steps of 20 and each downsampled to 10 output rows.
        let source = GridSource::new(40, 100);
        let reader = WindowReader::new(20.0, 50.0);

        let array = reader.read(&source, "1", -9999.0, None).unwrap();

        assert_eq!(array.width(), 20);
        assert_eq!(array.height(), 50);
        assert_eq!(source.reads.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_read_full_fidelity_single_pass() {
        let source = GridSource::new(8, 6);
        let reader = WindowReader::new(100.0, 100.0);

        let array = reader.read(&source, "1", -9999.0, None).unwrap();

        assert_eq!(array.width(), 8);
        assert_eq!(array.height(), 6);
        assert_eq!(source.reads.load(Ordering::Relaxed), 1);
        // Row values survive untouched at full fidelity.
        assert_eq!(array.value(0, 5), Some(5.0));
    }

    #[test]
    fn test_read_slices_wide_raster_by_columns() {
        let source = GridSource::new(100, 10);
        let reader = WindowReader::new(25.0, 100.0);

        let array = reader.read(&source, "1", -9999.0, None).unwrap();

        assert_eq!(array.width(), 100);
        assert_eq!(array.height(), 10);
        assert_eq!(source.reads.load(Ordering::Relaxed), 4);
        assert_eq!(array.value(99, 3), Some(3.0));
    }

    #[test]
    fn test_read_masks_nodata_rows() {
        let mut source = GridSource::new(4, 8);
        source.nodata_rows = 2;
        let reader = WindowReader::new(100.0, 100.0);

        let array = reader.read(&source, "1", -9999.0, None).unwrap();

        assert_eq!(array.value(0, 0), None);
        assert_eq!(array.value(0, 1), None);
        assert_eq!(array.value(0, 2), Some(2.0));
        assert_eq!(array.valid_count(), 4 * 6);
    }

    #[test]
    fn test_read_applies_upstream_mask_with_resampling() {
        let source = GridSource::new(4, 8);
        let reader = WindowReader::new(100.0, 50.0);

        // Upstream invalid mask at full resolution, top half invalid.
        let mut upstream_mask = vec![false; 4 * 8];
        for m in upstream_mask.iter_mut().take(4 * 4) {
            *m = true;
        }
        let upstream = MaskedArray::new(4, 8, vec![0.0; 4 * 8], upstream_mask);

        let array = reader.read(&source, "1", -9999.0, Some(&upstream)).unwrap();

        assert_eq!(array.width(), 2);
        assert_eq!(array.height(), 4);
        assert_eq!(array.value(0, 0), None);
        assert_eq!(array.value(0, 1), None);
        assert!(array.value(0, 2).is_some());
        assert!(array.value(0, 3).is_some());
    }
}
