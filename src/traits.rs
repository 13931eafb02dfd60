// src/traits.rs

//! Contracts for the external collaborators: the black-box classifier,
//! the segmentation function and the surrogate-model fitter. The
//! explainer only ever talks to these through the traits below.

use ndarray::Array2;

use crate::core::{Image, Neighborhood, Result, SegmentMap, SurrogateFit};

/// A black-box classifier queried on batches of images.
///
/// Must return one probability row per input image, in input order, with
/// columns indexed by class id.
pub trait ClassifierModel {
    fn predict_proba(&self, batch: &[Image]) -> Result<Array2<f64>>;
}

impl<F> ClassifierModel for F
where
    F: Fn(&[Image]) -> Result<Array2<f64>>,
{
    fn predict_proba(&self, batch: &[Image]) -> Result<Array2<f64>> {
        self(batch)
    }
}

/// Turns an image into a superpixel label map of the same height/width.
///
/// `random_seed` is drawn by the explainer from its caller-supplied
/// random source, so stochastic segmenters stay reproducible. Validation
/// errors propagate unchanged to the explainer's caller.
pub trait Segmenter {
    fn segment(&self, image: &Image, random_seed: u64) -> Result<SegmentMap>;
}

impl<F> Segmenter for F
where
    F: Fn(&Image, u64) -> Result<SegmentMap>,
{
    fn segment(&self, image: &Image, random_seed: u64) -> Result<SegmentMap> {
        self(image, random_seed)
    }
}

/// Feature-selection policy forwarded to the surrogate fitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureSelection {
    ForwardSelection,
    LassoPath,
    None,
    Auto,
}

/// Regressor family the fitter should use, when the caller wants
/// something other than the fitter's default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegressorKind {
    Ridge,
    LinearRegression,
}

/// One fitting request: which label to explain and how.
#[derive(Debug, Clone)]
pub struct FitRequest {
    /// Column of the neighborhood's probability matrix to regress on.
    pub label: usize,
    /// Maximum number of superpixels in the returned explanation.
    pub num_features: usize,
    /// Width of the exponential kernel the fitter applies to the
    /// distances before weighting.
    pub kernel_width: f64,
    pub feature_selection: FeatureSelection,
    pub regressor: Option<RegressorKind>,
}

/// The external weighted, feature-selected linear regression.
///
/// Called once per requested label, always with the same neighborhood,
/// so per-label explanations are comparable and the classifier is only
/// queried once regardless of how many labels are explained.
pub trait SurrogateFitter {
    fn fit(&self, neighborhood: &Neighborhood, request: &FitRequest) -> Result<SurrogateFit>;
}
