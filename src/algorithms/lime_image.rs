// src/algorithms/lime_image.rs

//! The explainer itself: segmentation, neighborhood sampling, distance
//! weighting and one surrogate fit per requested label.

use rand::Rng;

use crate::algorithms::distance::DistanceMetric;
use crate::algorithms::replacement::{Fudge, ReplacementStrategy};
use crate::algorithms::sampler::{sample_neighborhood, sample_neighborhood_with_images};
use crate::core::{Image, ImageExplanation, LimeError, Neighborhood, Result};
use crate::traits::{ClassifierModel, FeatureSelection, FitRequest, RegressorKind, Segmenter, SurrogateFitter};
use crate::utils::argsort_descending;

/// Configuration for a LIME image explanation.
#[derive(Debug, Clone)]
pub struct LimeConfig {
    /// Width of the exponential kernel applied downstream by the fitter.
    pub kernel_width: f64,
    /// Size of the perturbation neighborhood.
    pub num_samples: usize,
    /// The classifier is invoked on batches of this many images.
    pub batch_size: usize,
    pub distance_metric: DistanceMetric,
    /// Constant color for off superpixels; None means per-superpixel
    /// mean-color fudging.
    pub hide_color: Option<Vec<f64>>,
    /// When set, explain the K highest-probability labels of the
    /// unperturbed sample instead of a caller-given label set.
    pub top_labels: Option<usize>,
    /// Maximum number of superpixels in each label's explanation.
    pub num_features: usize,
    pub feature_selection: FeatureSelection,
    pub regressor: Option<RegressorKind>,
}

impl Default for LimeConfig {
    fn default() -> Self {
        LimeConfig {
            kernel_width: 0.25,
            num_samples: 1000,
            batch_size: 10,
            distance_metric: DistanceMetric::Cosine,
            hide_color: None,
            top_labels: Some(5),
            num_features: 100_000,
            feature_selection: FeatureSelection::Auto,
            regressor: None,
        }
    }
}

impl LimeConfig {
    fn validate(&self) -> Result<()> {
        if !(self.kernel_width > 0.0) {
            return Err(LimeError::InvalidInput(format!(
                "kernel_width must be greater than zero, got {}.",
                self.kernel_width
            )));
        }
        if self.num_samples == 0 {
            return Err(LimeError::InvalidInput(
                "num_samples must be greater than zero.".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(LimeError::InvalidInput(
                "batch_size must be greater than zero.".to_string(),
            ));
        }
        Ok(())
    }
}

/// Explains a black-box image classifier's prediction for one image by
/// fitting a weighted sparse linear surrogate on a perturbation
/// neighborhood.
pub struct LimeImageExplainer {
    config: LimeConfig,
    strategy: Box<dyn ReplacementStrategy>,
}

impl LimeImageExplainer {
    /// Explainer with the default Fudge replacement, mean-color or
    /// constant-color depending on `hide_color`.
    pub fn new(config: LimeConfig) -> Result<Self> {
        config.validate()?;
        let strategy: Box<dyn ReplacementStrategy> = match &config.hide_color {
            Some(color) => Box::new(Fudge::constant_color(color.clone())),
            None => Box::new(Fudge::mean_color()),
        };
        Ok(LimeImageExplainer { config, strategy })
    }

    /// Explainer with an injected replacement strategy (pool, mixed
    /// pool, patch similarity, or anything else implementing the trait).
    pub fn with_strategy(config: LimeConfig, strategy: Box<dyn ReplacementStrategy>) -> Result<Self> {
        config.validate()?;
        Ok(LimeImageExplainer { config, strategy })
    }

    pub fn config(&self) -> &LimeConfig {
        &self.config
    }

    /// Produces an explanation for `image`.
    ///
    /// `labels` picks the labels to explain unless the config requests
    /// the top labels of the unperturbed sample. All randomness (masks,
    /// segmentation seed, pool draws) flows through `rng`, so the same
    /// seed reproduces the same explanation. The original design drew
    /// pool selections from a process-global source instead; routing
    /// them through `rng` closes that reproducibility gap.
    pub fn explain_instance<C, S, F, R>(
        &mut self,
        image: &Image,
        classifier: &C,
        segmenter: &S,
        fitter: &F,
        labels: &[usize],
        rng: &mut R,
    ) -> Result<ImageExplanation>
    where
        C: ClassifierModel + ?Sized,
        S: Segmenter + ?Sized,
        F: SurrogateFitter + ?Sized,
        R: Rng,
    {
        let (explanation, _) = self.explain_inner(image, classifier, segmenter, fitter, labels, rng, false)?;
        Ok(explanation)
    }

    /// Like [`explain_instance`](Self::explain_instance), but also
    /// returns the composed neighborhood images in row order.
    pub fn explain_instance_with_samples<C, S, F, R>(
        &mut self,
        image: &Image,
        classifier: &C,
        segmenter: &S,
        fitter: &F,
        labels: &[usize],
        rng: &mut R,
    ) -> Result<(ImageExplanation, Vec<Image>)>
    where
        C: ClassifierModel + ?Sized,
        S: Segmenter + ?Sized,
        F: SurrogateFitter + ?Sized,
        R: Rng,
    {
        self.explain_inner(image, classifier, segmenter, fitter, labels, rng, true)
    }

    #[allow(clippy::too_many_arguments)]
    fn explain_inner<C, S, F, R>(
        &mut self,
        image: &Image,
        classifier: &C,
        segmenter: &S,
        fitter: &F,
        labels: &[usize],
        rng: &mut R,
        keep_images: bool,
    ) -> Result<(ImageExplanation, Vec<Image>)>
    where
        C: ClassifierModel + ?Sized,
        S: Segmenter + ?Sized,
        F: SurrogateFitter + ?Sized,
        R: Rng,
    {
        let segmentation_seed = rng.gen_range(0..1000u64);
        let segments = segmenter.segment(image, segmentation_seed)?;

        self.strategy.prepare(image, &segments)?;
        let (samples, label_matrix, sample_images) = if keep_images {
            sample_neighborhood_with_images(
                image,
                &segments,
                self.strategy.as_ref(),
                classifier,
                self.config.num_samples,
                self.config.batch_size,
                rng,
            )?
        } else {
            let (samples, label_matrix) = sample_neighborhood(
                image,
                &segments,
                self.strategy.as_ref(),
                classifier,
                self.config.num_samples,
                self.config.batch_size,
                rng,
            )?;
            (samples, label_matrix, Vec::new())
        };
        let distances = self.config.distance_metric.distances_to_baseline(samples.view());
        let neighborhood = Neighborhood {
            samples,
            labels: label_matrix,
            distances,
        };

        let targets: Vec<usize> = match self.config.top_labels {
            Some(k) => argsort_descending(neighborhood.labels.row(0))
                .into_iter()
                .take(k)
                .collect(),
            None => labels.to_vec(),
        };
        if targets.is_empty() {
            return Err(LimeError::InvalidInput(
                "No labels to explain: pass a label list or set top_labels.".to_string(),
            ));
        }
        log::debug!(
            "explaining labels {:?} over a neighborhood of {} samples",
            targets,
            neighborhood.num_samples()
        );

        let mut explanation = ImageExplanation::new(image.clone(), segments);
        if self.config.top_labels.is_some() {
            explanation.top_labels = Some(targets.clone());
        }
        for &label in &targets {
            let request = FitRequest {
                label,
                num_features: self.config.num_features,
                kernel_width: self.config.kernel_width,
                feature_selection: self.config.feature_selection,
                regressor: self.config.regressor,
            };
            let fit = fitter.fit(&neighborhood, &request)?;
            explanation.insert(label, fit);
        }
        Ok((explanation, sample_images))
    }
}
