// src/utils.rs

//! Small helpers shared by the sampling and display code: per-superpixel
//! pixel copies, patch extraction in raster order, and argsort.

use ndarray::ArrayView1;

use crate::core::{Image, SegmentMap};

/// Number of superpixels in a segment map. Ids are assumed to cover
/// `{0 .. K-1}`, so this is the maximum id plus one (0 for an empty map).
pub fn num_segments(segments: &SegmentMap) -> usize {
    segments.iter().map(|&id| id as usize + 1).max().unwrap_or(0)
}

/// Copies every pixel of `segment` from `src` into `out`. Both images
/// must share the segment map's height/width.
pub fn copy_segment_pixels(src: &Image, segments: &SegmentMap, segment: u32, out: &mut Image) {
    let (height, width, channels) = src.dim();
    for y in 0..height {
        for x in 0..width {
            if segments[[y, x]] == segment {
                for c in 0..channels {
                    out[[y, x, c]] = src[[y, x, c]];
                }
            }
        }
    }
}

/// Flattens the pixels of one superpixel into a vector, raster order,
/// channels innermost. Two patches extracted with the same segment map
/// are comparable element-for-element.
pub fn extract_patch(image: &Image, segments: &SegmentMap, segment: u32) -> Vec<f64> {
    let (height, width, channels) = image.dim();
    let mut patch = Vec::new();
    for y in 0..height {
        for x in 0..width {
            if segments[[y, x]] == segment {
                for c in 0..channels {
                    patch.push(image[[y, x, c]]);
                }
            }
        }
    }
    patch
}

/// Writes a patch produced by `extract_patch` back over the pixels of
/// `segment`, in the same raster order.
pub fn write_patch(patch: &[f64], segments: &SegmentMap, segment: u32, out: &mut Image) {
    let (height, width, channels) = out.dim();
    let mut i = 0;
    for y in 0..height {
        for x in 0..width {
            if segments[[y, x]] == segment {
                for c in 0..channels {
                    out[[y, x, c]] = patch[i];
                    i += 1;
                }
            }
        }
    }
}

/// Euclidean distance between two equally shaped patches.
pub fn patch_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Indices of `values` sorted by descending value.
pub fn argsort_descending(values: ArrayView1<f64>) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn checkerboard() -> (Image, SegmentMap) {
        let mut image = Image::zeros((2, 2, 2));
        for (i, v) in image.iter_mut().enumerate() {
            *v = i as f64;
        }
        let segments = Array2::from_shape_vec((2, 2), vec![0u32, 1, 1, 0]).unwrap();
        (image, segments)
    }

    #[test]
    fn segment_count_is_max_id_plus_one() {
        let (_, segments) = checkerboard();
        assert_eq!(num_segments(&segments), 2);
        assert_eq!(num_segments(&Array2::<u32>::zeros((0, 0))), 0);
    }

    #[test]
    fn patch_roundtrip_preserves_raster_order() {
        let (image, segments) = checkerboard();
        let patch = extract_patch(&image, &segments, 1);
        // Pixels (0,1) and (1,0), channels innermost.
        assert_eq!(patch, vec![2.0, 3.0, 4.0, 5.0]);

        let mut out = Image::zeros((2, 2, 2));
        write_patch(&patch, &segments, 1, &mut out);
        assert_abs_diff_eq!(out[[0, 1, 0]], 2.0);
        assert_abs_diff_eq!(out[[1, 0, 1]], 5.0);
        assert_abs_diff_eq!(out[[0, 0, 0]], 0.0); // other segment untouched
    }

    #[test]
    fn copy_segment_pixels_touches_only_the_segment() {
        let (image, segments) = checkerboard();
        let mut out = Image::zeros((2, 2, 2));
        copy_segment_pixels(&image, &segments, 0, &mut out);
        assert_abs_diff_eq!(out[[0, 0, 1]], 1.0);
        assert_abs_diff_eq!(out[[1, 1, 0]], 6.0);
        assert_abs_diff_eq!(out[[0, 1, 0]], 0.0);
    }

    #[test]
    fn argsort_descending_orders_by_value() {
        let probs = array![0.1, 0.7, 0.2];
        assert_eq!(argsort_descending(probs.view()), vec![1, 2, 0]);
    }

    #[test]
    fn patch_distance_is_euclidean() {
        assert_abs_diff_eq!(patch_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_abs_diff_eq!(patch_distance(&[1.0], &[1.0]), 0.0);
    }
}
