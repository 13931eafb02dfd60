// src/algorithms/replacement.rs

//! Region-replacement strategies: how an "off" superpixel gets its
//! substitute pixels when a perturbed image is composed. The sampler is
//! generic over the strategy; picking one happens at explainer
//! construction.

use ndarray::ArrayView1;
use rand::{Rng, RngCore};
use rand_distr::{Bernoulli, Distribution};

use crate::core::{Image, LimeError, Result, SegmentMap};
use crate::utils::{
    copy_segment_pixels, extract_patch, num_segments, patch_distance, write_patch,
};

/// Fills "off" superpixels with substitute pixels.
///
/// `prepare` runs once per explanation, before any row is composed;
/// strategies with a precomputed substitute (the fudged image, the patch
/// wall) build it there and only read it afterwards.
pub trait ReplacementStrategy {
    fn prepare(&mut self, image: &Image, segments: &SegmentMap) -> Result<()>;

    /// Writes the replacement pixels for one off superpixel into `out`.
    fn fill_segment(
        &self,
        image: &Image,
        segments: &SegmentMap,
        segment: u32,
        out: &mut Image,
        rng: &mut dyn RngCore,
    ) -> Result<()>;

    /// Fills every off superpixel of `row` into a working buffer that
    /// already holds the original image's pixels.
    fn fill_row(
        &self,
        image: &Image,
        segments: &SegmentMap,
        row: ArrayView1<f64>,
        out: &mut Image,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        for (segment, &on) in row.iter().enumerate() {
            if on == 0.0 {
                self.fill_segment(image, segments, segment as u32, out, rng)?;
            }
        }
        Ok(())
    }

    /// Builds the perturbed image for one on/off row: superpixels at 1
    /// keep the original pixels, superpixels at 0 are replaced.
    fn compose(
        &self,
        image: &Image,
        segments: &SegmentMap,
        row: ArrayView1<f64>,
        rng: &mut dyn RngCore,
    ) -> Result<Image> {
        let mut out = image.clone();
        self.fill_row(image, segments, row, &mut out, rng)?;
        Ok(out)
    }
}

fn check_pool_shapes(pool: &[Image], image: &Image, name: &str) -> Result<()> {
    for (i, candidate) in pool.iter().enumerate() {
        if candidate.dim() != image.dim() {
            return Err(LimeError::IncompatibleDimensions(format!(
                "{} image {} has shape {:?}, but the explained image has shape {:?}.",
                name,
                i,
                candidate.dim(),
                image.dim()
            )));
        }
    }
    Ok(())
}

/// Context-free baseline: one fixed fudged image, either the
/// per-superpixel mean color of the original (default) or a constant
/// color broadcast over the whole image.
#[derive(Debug, Clone)]
pub struct Fudge {
    hide_color: Option<Vec<f64>>,
    fudged: Option<Image>,
}

impl Fudge {
    /// Mean-color fudging: each superpixel is replaced by its own mean.
    pub fn mean_color() -> Self {
        Fudge {
            hide_color: None,
            fudged: None,
        }
    }

    /// Constant-color fudging, one intensity per channel.
    pub fn constant_color(hide_color: Vec<f64>) -> Self {
        Fudge {
            hide_color: Some(hide_color),
            fudged: None,
        }
    }

    fn fudged(&self) -> Result<&Image> {
        self.fudged.as_ref().ok_or_else(|| {
            LimeError::InternalError("Fudge used before prepare() was called.".to_string())
        })
    }
}

impl ReplacementStrategy for Fudge {
    fn prepare(&mut self, image: &Image, segments: &SegmentMap) -> Result<()> {
        let (height, width, channels) = image.dim();
        let fudged = match &self.hide_color {
            Some(color) => {
                if color.len() != channels {
                    return Err(LimeError::IncompatibleDimensions(format!(
                        "hide_color has {} channels, but the image has {}.",
                        color.len(),
                        channels
                    )));
                }
                let mut fudged = Image::zeros((height, width, channels));
                for y in 0..height {
                    for x in 0..width {
                        for c in 0..channels {
                            fudged[[y, x, c]] = color[c];
                        }
                    }
                }
                fudged
            }
            None => {
                let k = num_segments(segments);
                let mut sums = vec![vec![0.0; channels]; k];
                let mut counts = vec![0usize; k];
                for y in 0..height {
                    for x in 0..width {
                        let segment = segments[[y, x]] as usize;
                        counts[segment] += 1;
                        for c in 0..channels {
                            sums[segment][c] += image[[y, x, c]];
                        }
                    }
                }
                let mut fudged = image.clone();
                for y in 0..height {
                    for x in 0..width {
                        let segment = segments[[y, x]] as usize;
                        for c in 0..channels {
                            fudged[[y, x, c]] = sums[segment][c] / counts[segment] as f64;
                        }
                    }
                }
                fudged
            }
        };
        self.fudged = Some(fudged);
        Ok(())
    }

    fn fill_segment(
        &self,
        _image: &Image,
        segments: &SegmentMap,
        segment: u32,
        out: &mut Image,
        _rng: &mut dyn RngCore,
    ) -> Result<()> {
        copy_segment_pixels(self.fudged()?, segments, segment, out);
        Ok(())
    }
}

/// "What if this region looked like it does in other images": each off
/// superpixel independently copies its pixels from one uniformly chosen
/// pool member.
#[derive(Debug, Clone)]
pub struct Pool {
    pool: Vec<Image>,
}

impl Pool {
    pub fn new(pool: Vec<Image>) -> Result<Self> {
        if pool.is_empty() {
            return Err(LimeError::EmptyPool(
                "Pool replacement needs at least one candidate image.".to_string(),
            ));
        }
        Ok(Pool { pool })
    }
}

impl ReplacementStrategy for Pool {
    fn prepare(&mut self, image: &Image, _segments: &SegmentMap) -> Result<()> {
        check_pool_shapes(&self.pool, image, "Pool")
    }

    fn fill_segment(
        &self,
        _image: &Image,
        segments: &SegmentMap,
        segment: u32,
        out: &mut Image,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        let candidate = &self.pool[rng.gen_range(0..self.pool.len())];
        copy_segment_pixels(candidate, segments, segment, out);
        Ok(())
    }
}

/// Cluster-biased pool substitution: with probability `same_clus_prob`
/// the candidate is drawn from the same-cluster pool, otherwise from the
/// pool of all other images.
#[derive(Debug, Clone)]
pub struct MixedPool {
    same_cluster: Vec<Image>,
    other: Vec<Image>,
    same_cluster_draw: Bernoulli,
}

impl MixedPool {
    pub fn new(same_cluster: Vec<Image>, other: Vec<Image>, same_clus_prob: f64) -> Result<Self> {
        if same_cluster.is_empty() || other.is_empty() {
            return Err(LimeError::EmptyPool(
                "MixedPool replacement needs both pools to be non-empty.".to_string(),
            ));
        }
        let same_cluster_draw = Bernoulli::new(same_clus_prob).map_err(|_| {
            LimeError::InvalidInput(format!(
                "same_clus_prob must be within [0, 1], got {}.",
                same_clus_prob
            ))
        })?;
        Ok(MixedPool {
            same_cluster,
            other,
            same_cluster_draw,
        })
    }
}

impl ReplacementStrategy for MixedPool {
    fn prepare(&mut self, image: &Image, _segments: &SegmentMap) -> Result<()> {
        check_pool_shapes(&self.same_cluster, image, "MixedPool same-cluster")?;
        check_pool_shapes(&self.other, image, "MixedPool other")
    }

    fn fill_segment(
        &self,
        _image: &Image,
        segments: &SegmentMap,
        segment: u32,
        out: &mut Image,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        let source = if self.same_cluster_draw.sample(rng) {
            &self.same_cluster
        } else {
            &self.other
        };
        let candidate = &source[rng.gen_range(0..source.len())];
        copy_segment_pixels(candidate, segments, segment, out);
        Ok(())
    }
}

/// The least-surprising substitute: once per explanation, every
/// superpixel picks the pool patch with the smallest strictly positive
/// Euclidean distance to the original image's own patch, and the winners
/// form one composite patch wall reused by every row.
#[derive(Debug, Clone)]
pub struct PatchSimilarity {
    pool: Vec<Image>,
    patch_wall: Option<Image>,
}

impl PatchSimilarity {
    pub fn new(pool: Vec<Image>) -> Result<Self> {
        if pool.is_empty() {
            return Err(LimeError::EmptyPool(
                "PatchSimilarity replacement needs at least one candidate image.".to_string(),
            ));
        }
        Ok(PatchSimilarity {
            pool,
            patch_wall: None,
        })
    }

    /// The composite substitute image, available after `prepare`.
    pub fn patch_wall(&self) -> Result<&Image> {
        self.patch_wall.as_ref().ok_or_else(|| {
            LimeError::InternalError(
                "PatchSimilarity used before prepare() was called.".to_string(),
            )
        })
    }
}

impl ReplacementStrategy for PatchSimilarity {
    // The per-superpixel search is independent across superpixels; each
    // wall slot is written exactly once.
    fn prepare(&mut self, image: &Image, segments: &SegmentMap) -> Result<()> {
        check_pool_shapes(&self.pool, image, "PatchSimilarity")?;
        let mut wall = image.clone();
        for segment in 0..num_segments(segments) as u32 {
            let reference = extract_patch(image, segments, segment);
            let mut best: Option<Vec<f64>> = None;
            let mut best_distance = f64::INFINITY;
            for candidate in &self.pool {
                let patch = extract_patch(candidate, segments, segment);
                let distance = patch_distance(&reference, &patch);
                // An identical patch (the image itself in the pool, or a
                // duplicate) is never a useful substitute.
                if distance > 0.0 && distance < best_distance {
                    best_distance = distance;
                    best = Some(patch);
                }
            }
            if let Some(patch) = best {
                write_patch(&patch, segments, segment, &mut wall);
            }
        }
        log::debug!(
            "patch wall built from {} candidates over {} superpixels",
            self.pool.len(),
            num_segments(segments)
        );
        self.patch_wall = Some(wall);
        Ok(())
    }

    fn fill_segment(
        &self,
        _image: &Image,
        segments: &SegmentMap,
        segment: u32,
        out: &mut Image,
        _rng: &mut dyn RngCore,
    ) -> Result<()> {
        copy_segment_pixels(self.patch_wall()?, segments, segment, out);
        Ok(())
    }
}
