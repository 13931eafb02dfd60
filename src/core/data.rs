// src/core/data.rs
use std::collections::BTreeMap;
use std::fmt;

use ndarray::{Array1, Array2, Array3};

use crate::core::errors::{LimeError, Result};
use crate::utils::copy_segment_pixels;

/// An image as a height x width x channel array of intensities.
/// We use `f64` for flexibility with various model inputs and calculations.
pub type Image = Array3<f64>;

/// A superpixel label map with the same height/width as the image it
/// segments. Ids are expected to cover `{0 .. K-1}` with no gaps.
pub type SegmentMap = Array2<u32>;

/// The perturbation neighborhood drawn around one image: the binary
/// on/off matrix, the classifier's probabilities for each perturbed
/// image, and each row's distance to the unperturbed row 0.
#[derive(Debug, Clone)]
pub struct Neighborhood {
    /// `num_samples x num_superpixels` binary matrix; row 0 is all ones.
    pub samples: Array2<f64>,
    /// `num_samples x num_classes` probability matrix, row-aligned with
    /// `samples`.
    pub labels: Array2<f64>,
    /// Distance of each row of `samples` to row 0; entry 0 is exactly 0.
    pub distances: Array1<f64>,
}

impl Neighborhood {
    pub fn num_samples(&self) -> usize {
        self.samples.nrows()
    }

    pub fn num_superpixels(&self) -> usize {
        self.samples.ncols()
    }

    pub fn num_classes(&self) -> usize {
        self.labels.ncols()
    }
}

/// Output of the external surrogate fitter for one label: an intercept,
/// a sparse weight per selected superpixel (sorted by the fitter, largest
/// magnitude first), a fidelity score and the surrogate's prediction at
/// the unperturbed sample.
#[derive(Debug, Clone)]
pub struct SurrogateFit {
    pub intercept: f64,
    pub feature_weights: Vec<(usize, f64)>,
    pub score: f64,
    pub local_pred: f64,
}

/// Options controlling how `ImageExplanation::get_image_and_mask` turns
/// the surrogate weights into a highlighted image and a region mask.
#[derive(Debug, Clone)]
pub struct MaskOptions {
    /// Only take superpixels that push toward the label. When false, the
    /// top `num_features` superpixels are used, positive or negative.
    pub positive_only: bool,
    /// Zero out everything outside the selected superpixels.
    pub hide_rest: bool,
    /// Number of superpixels to include in the display.
    pub num_features: usize,
    /// Superpixels below this weight are skipped.
    pub min_weight: f64,
}

impl Default for MaskOptions {
    fn default() -> Self {
        MaskOptions {
            positive_only: true,
            hide_rest: false,
            num_features: 5,
            min_weight: 0.0,
        }
    }
}

// Display channels lit up for selected superpixels.
const NEGATIVE_CHANNEL: usize = 0;
const POSITIVE_CHANNEL: usize = 1;

/// A fitted explanation for one image: the per-label surrogate fits plus
/// everything needed to render them back onto the image.
#[derive(Debug, Clone)]
pub struct ImageExplanation {
    image: Image,
    segments: SegmentMap,
    /// Labels ordered by descending baseline probability, when the
    /// explainer was asked for the top labels instead of a fixed set.
    pub top_labels: Option<Vec<usize>>,
    fits: BTreeMap<usize, SurrogateFit>,
}

impl ImageExplanation {
    pub fn new(image: Image, segments: SegmentMap) -> Self {
        ImageExplanation {
            image,
            segments,
            top_labels: None,
            fits: BTreeMap::new(),
        }
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn segments(&self) -> &SegmentMap {
        &self.segments
    }

    pub fn insert(&mut self, label: usize, fit: SurrogateFit) {
        self.fits.insert(label, fit);
    }

    /// Labels this explanation covers, ascending.
    pub fn labels(&self) -> Vec<usize> {
        self.fits.keys().copied().collect()
    }

    pub fn fit(&self, label: usize) -> Result<&SurrogateFit> {
        self.fits.get(&label).ok_or(LimeError::LabelNotFound(label))
    }

    pub fn intercept(&self, label: usize) -> Result<f64> {
        Ok(self.fit(label)?.intercept)
    }

    pub fn feature_weights(&self, label: usize) -> Result<&[(usize, f64)]> {
        Ok(&self.fit(label)?.feature_weights)
    }

    /// Renders the explanation for `label` as `(image, mask)`. The mask
    /// holds 0 for unselected pixels; in positive-only mode selected
    /// pixels are 1, otherwise 1 for negative-weight superpixels and 2
    /// for the rest. Selected superpixels keep their original pixels and
    /// get one display channel saturated to the image maximum.
    pub fn get_image_and_mask(
        &self,
        label: usize,
        options: &MaskOptions,
    ) -> Result<(Image, Array2<u8>)> {
        let fit = self.fits.get(&label).ok_or(LimeError::LabelNotFound(label))?;
        let (height, width, channels) = self.image.dim();
        let mut mask = Array2::<u8>::zeros((height, width));
        let mut output = if options.hide_rest {
            Image::zeros((height, width, channels))
        } else {
            self.image.clone()
        };
        let max_intensity = self.image.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if options.positive_only {
            let selected: Vec<usize> = fit
                .feature_weights
                .iter()
                .filter(|(_, w)| *w > 0.0 && *w > options.min_weight)
                .map(|(f, _)| *f)
                .take(options.num_features)
                .collect();
            for segment in selected {
                copy_segment_pixels(&self.image, &self.segments, segment as u32, &mut output);
                self.mark_segment(segment as u32, &mut output, &mut mask, 1, POSITIVE_CHANNEL, max_intensity);
            }
        } else {
            for &(segment, weight) in fit.feature_weights.iter().take(options.num_features) {
                if weight.abs() < options.min_weight {
                    continue;
                }
                let (mask_value, channel) = if weight < 0.0 {
                    (1, NEGATIVE_CHANNEL)
                } else {
                    (2, POSITIVE_CHANNEL)
                };
                copy_segment_pixels(&self.image, &self.segments, segment as u32, &mut output);
                self.mark_segment(segment as u32, &mut output, &mut mask, mask_value, channel, max_intensity);
            }
        }
        Ok((output, mask))
    }

    fn mark_segment(
        &self,
        segment: u32,
        output: &mut Image,
        mask: &mut Array2<u8>,
        mask_value: u8,
        channel: usize,
        intensity: f64,
    ) {
        let (height, width, channels) = output.dim();
        for y in 0..height {
            for x in 0..width {
                if self.segments[[y, x]] == segment {
                    mask[[y, x]] = mask_value;
                    if channel < channels {
                        output[[y, x, channel]] = intensity;
                    }
                }
            }
        }
    }
}

impl fmt::Display for ImageExplanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ImageExplanation:")?;
        for (label, fit) in &self.fits {
            writeln!(f, "  Label {}:", label)?;
            writeln!(f, "    Intercept:        {:.4}", fit.intercept)?;
            writeln!(f, "    Fidelity Score:   {:.4}", fit.score)?;
            writeln!(f, "    Local Prediction: {:.4}", fit.local_pred)?;
            writeln!(f, "    Superpixel Weights:")?;
            for (segment, weight) in &fit.feature_weights {
                writeln!(f, "      Superpixel {}: {:.4}", segment, weight)?;
            }
        }
        Ok(())
    }
}
