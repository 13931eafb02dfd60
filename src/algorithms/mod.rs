// src/algorithms/mod.rs

pub mod distance;
pub mod lime_image;
pub mod replacement;
pub mod sampler;

pub use distance::DistanceMetric;
pub use lime_image::{LimeConfig, LimeImageExplainer};
pub use replacement::{Fudge, MixedPool, PatchSimilarity, Pool, ReplacementStrategy};
pub use sampler::{sample_neighborhood, sample_neighborhood_with_images};
