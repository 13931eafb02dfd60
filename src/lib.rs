// src/lib.rs

//! `lime_rs` is a Rust crate for LIME (Local Interpretable
//! Model-agnostic Explanations) on image classifiers: it perturbs an
//! image superpixel by superpixel, queries the black-box classifier on
//! the perturbed neighborhood, and hands the neighborhood to a weighted
//! sparse linear surrogate whose coefficients explain the prediction.
//!
//! The segmentation algorithm, the classifier and the surrogate fitter
//! are external collaborators behind the traits in [`traits`]; this
//! crate owns the perturbation sampling, the four region-replacement
//! strategies, the distance weighting and the explanation record.

// Declare the main modules of the crate
pub mod algorithms;
pub mod core;
pub mod traits;
pub mod utils;

// Re-export key components for easier use by library consumers
pub use crate::algorithms::{
    DistanceMetric, Fudge, LimeConfig, LimeImageExplainer, MixedPool, PatchSimilarity, Pool,
    ReplacementStrategy,
};
pub use crate::core::{
    Image, ImageExplanation, LimeError, MaskOptions, Neighborhood, Result, SegmentMap,
    SurrogateFit,
};
pub use crate::traits::{
    ClassifierModel, FeatureSelection, FitRequest, RegressorKind, Segmenter, SurrogateFitter,
};
