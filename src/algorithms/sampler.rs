// src/algorithms/sampler.rs

//! Neighborhood construction: draws the binary on/off matrix, composes
//! one perturbed image per row through the active replacement strategy,
//! and queries the classifier in batches.

use ndarray::Array2;
use rand::Rng;

use crate::algorithms::replacement::ReplacementStrategy;
use crate::core::{Image, LimeError, Result, SegmentMap};
use crate::traits::ClassifierModel;
use crate::utils::num_segments;

/// Draws `num_samples` perturbation rows around `image` and collects the
/// classifier's probabilities for each perturbed image.
///
/// Row 0 is forced to all ones (the unperturbed image). The classifier
/// is invoked once per `batch_size` images, with a mandatory flush of the
/// partial final batch, and row order is preserved end to end: row `i`
/// of the returned sample matrix corresponds to row `i` of the returned
/// probability matrix.
pub fn sample_neighborhood<C, R>(
    image: &Image,
    segments: &SegmentMap,
    strategy: &dyn ReplacementStrategy,
    classifier: &C,
    num_samples: usize,
    batch_size: usize,
    rng: &mut R,
) -> Result<(Array2<f64>, Array2<f64>)>
where
    C: ClassifierModel + ?Sized,
    R: Rng,
{
    let (data, labels, _) = sample_neighborhood_inner(
        image, segments, strategy, classifier, num_samples, batch_size, rng, false,
    )?;
    Ok((data, labels))
}

/// Like [`sample_neighborhood`], but also returns every composed
/// perturbed image in row order, for callers that want to inspect the
/// neighborhood itself.
pub fn sample_neighborhood_with_images<C, R>(
    image: &Image,
    segments: &SegmentMap,
    strategy: &dyn ReplacementStrategy,
    classifier: &C,
    num_samples: usize,
    batch_size: usize,
    rng: &mut R,
) -> Result<(Array2<f64>, Array2<f64>, Vec<Image>)>
where
    C: ClassifierModel + ?Sized,
    R: Rng,
{
    let (data, labels, images) = sample_neighborhood_inner(
        image, segments, strategy, classifier, num_samples, batch_size, rng, true,
    )?;
    Ok((data, labels, images))
}

#[allow(clippy::too_many_arguments)]
fn sample_neighborhood_inner<C, R>(
    image: &Image,
    segments: &SegmentMap,
    strategy: &dyn ReplacementStrategy,
    classifier: &C,
    num_samples: usize,
    batch_size: usize,
    rng: &mut R,
    keep_images: bool,
) -> Result<(Array2<f64>, Array2<f64>, Vec<Image>)>
where
    C: ClassifierModel + ?Sized,
    R: Rng,
{
    if num_samples == 0 {
        return Err(LimeError::InvalidInput(
            "num_samples must be greater than zero.".to_string(),
        ));
    }
    if batch_size == 0 {
        return Err(LimeError::InvalidInput(
            "batch_size must be greater than zero.".to_string(),
        ));
    }
    let (height, width, _) = image.dim();
    if segments.dim() != (height, width) {
        return Err(LimeError::IncompatibleDimensions(format!(
            "Segment map has shape {:?}, but the image is {}x{}.",
            segments.dim(),
            height,
            width
        )));
    }
    let k = num_segments(segments);
    if k == 0 {
        return Err(LimeError::InvalidInput(
            "Segmentation produced no superpixels.".to_string(),
        ));
    }

    let mut data = Array2::<f64>::zeros((num_samples, k));
    for value in data.iter_mut() {
        *value = rng.gen_range(0..2) as f64;
    }
    data.row_mut(0).fill(1.0);

    // One working buffer, rebuilt from the original per row.
    let mut buffer = image.clone();
    let mut batch: Vec<Image> = Vec::with_capacity(batch_size);
    let mut kept_images: Vec<Image> = Vec::new();
    let mut label_rows: Vec<f64> = Vec::new();
    let mut num_classes: Option<usize> = None;
    let mut num_batches = 0usize;

    for i in 0..num_samples {
        buffer.assign(image);
        strategy.fill_row(image, segments, data.row(i), &mut buffer, rng)?;
        batch.push(buffer.clone());
        if keep_images {
            kept_images.push(buffer.clone());
        }
        if batch.len() == batch_size {
            flush_batch(classifier, &mut batch, &mut label_rows, &mut num_classes)?;
            num_batches += 1;
        }
    }
    if !batch.is_empty() {
        flush_batch(classifier, &mut batch, &mut label_rows, &mut num_classes)?;
        num_batches += 1;
    }
    log::debug!(
        "sampled {} rows over {} superpixels in {} classifier batches",
        num_samples,
        k,
        num_batches
    );

    let num_classes = num_classes.ok_or_else(|| {
        LimeError::InternalError("No classifier batch was flushed.".to_string())
    })?;
    let labels = Array2::from_shape_vec((num_samples, num_classes), label_rows).map_err(|_| {
        LimeError::InternalError(
            "Probability rows do not line up with the sampled rows.".to_string(),
        )
    })?;
    Ok((data, labels, kept_images))
}

fn flush_batch<C>(
    classifier: &C,
    batch: &mut Vec<Image>,
    label_rows: &mut Vec<f64>,
    num_classes: &mut Option<usize>,
) -> Result<()>
where
    C: ClassifierModel + ?Sized,
{
    let predictions = classifier.predict_proba(batch)?;
    if predictions.nrows() != batch.len() {
        return Err(LimeError::InternalError(format!(
            "Classifier returned {} probability rows for a batch of {} images.",
            predictions.nrows(),
            batch.len()
        )));
    }
    match *num_classes {
        None => *num_classes = Some(predictions.ncols()),
        Some(classes) if classes != predictions.ncols() => {
            return Err(LimeError::InternalError(format!(
                "Classifier switched from {} to {} classes between batches.",
                classes,
                predictions.ncols()
            )));
        }
        Some(_) => {}
    }
    label_rows.extend(predictions.iter().copied());
    batch.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::replacement::Fudge;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::RefCell;

    // Constant image with two equal superpixels (left/right halves).
    fn fixture() -> (Image, SegmentMap) {
        let mut image = Image::zeros((2, 4, 3));
        image.fill(1.0);
        let segments =
            Array2::from_shape_vec((2, 4), vec![0u32, 0, 1, 1, 0, 0, 1, 1]).unwrap();
        (image, segments)
    }

    // Classifier whose single "probability" is the mean pixel intensity,
    // so each output row is a fingerprint of its input image.
    fn mean_classifier(batch: &[Image]) -> Result<Array2<f64>> {
        let rows: Vec<f64> = batch
            .iter()
            .map(|image| image.mean().unwrap_or(0.0))
            .collect();
        Ok(Array2::from_shape_vec((batch.len(), 1), rows).unwrap())
    }

    fn prepared_fudge(image: &Image, segments: &SegmentMap) -> Fudge {
        let mut strategy = Fudge::constant_color(vec![0.0, 0.0, 0.0]);
        strategy.prepare(image, segments).unwrap();
        strategy
    }

    #[test]
    fn row_zero_is_all_ones_and_shapes_line_up() {
        let (image, segments) = fixture();
        let strategy = prepared_fudge(&image, &segments);
        let mut rng = StdRng::seed_from_u64(7);
        let (data, labels) = sample_neighborhood(
            &image,
            &segments,
            &strategy,
            &mean_classifier,
            10,
            4,
            &mut rng,
        )
        .unwrap();

        assert_eq!(data.dim(), (10, 2));
        assert_eq!(labels.dim(), (10, 1));
        assert!(data.row(0).iter().all(|&v| v == 1.0));
        assert_abs_diff_eq!(labels[[0, 0]], 1.0); // unperturbed image, mean 1.0
    }

    #[test]
    fn probability_rows_stay_aligned_with_sample_rows() {
        let (image, segments) = fixture();
        let strategy = prepared_fudge(&image, &segments);
        let mut rng = StdRng::seed_from_u64(3);
        let (data, labels) = sample_neighborhood(
            &image,
            &segments,
            &strategy,
            &mean_classifier,
            16,
            5,
            &mut rng,
        )
        .unwrap();

        // Equal halves of a constant-1 image, zero fudging: the mean is
        // exactly the fraction of superpixels left on.
        for i in 0..16 {
            let expected = data.row(i).sum() / 2.0;
            assert_abs_diff_eq!(labels[[i, 0]], expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn partial_final_batch_is_flushed() {
        let (image, segments) = fixture();
        let strategy = prepared_fudge(&image, &segments);
        let calls = RefCell::new(Vec::<usize>::new());
        let classifier = |batch: &[Image]| -> Result<Array2<f64>> {
            calls.borrow_mut().push(batch.len());
            mean_classifier(batch)
        };
        let mut rng = StdRng::seed_from_u64(1);
        let (data, labels) =
            sample_neighborhood(&image, &segments, &strategy, &classifier, 8, 3, &mut rng)
                .unwrap();

        assert_eq!(*calls.borrow(), vec![3, 3, 2]);
        assert_eq!(data.nrows(), labels.nrows());
    }

    #[test]
    fn classifier_row_count_mismatch_is_fatal() {
        let (image, segments) = fixture();
        let strategy = prepared_fudge(&image, &segments);
        let classifier = |batch: &[Image]| -> Result<Array2<f64>> {
            // One row short.
            Ok(Array2::zeros((batch.len() - 1, 2)))
        };
        let mut rng = StdRng::seed_from_u64(1);
        let result =
            sample_neighborhood(&image, &segments, &strategy, &classifier, 4, 4, &mut rng);
        assert!(matches!(result, Err(LimeError::InternalError(_))));
    }

    #[test]
    fn zero_sized_inputs_are_rejected() {
        let (image, segments) = fixture();
        let strategy = prepared_fudge(&image, &segments);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            sample_neighborhood(&image, &segments, &strategy, &mean_classifier, 0, 4, &mut rng),
            Err(LimeError::InvalidInput(_))
        ));
        assert!(matches!(
            sample_neighborhood(&image, &segments, &strategy, &mean_classifier, 4, 0, &mut rng),
            Err(LimeError::InvalidInput(_))
        ));
    }

    #[test]
    fn segment_map_shape_must_match_the_image() {
        let (image, _) = fixture();
        let segments = Array2::<u32>::zeros((3, 3));
        let strategy = Fudge::constant_color(vec![0.0, 0.0, 0.0]);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            sample_neighborhood(&image, &segments, &strategy, &mean_classifier, 4, 4, &mut rng),
            Err(LimeError::IncompatibleDimensions(_))
        ));
    }

    #[test]
    fn kept_images_line_up_with_sample_rows() {
        let (image, segments) = fixture();
        let strategy = prepared_fudge(&image, &segments);
        let mut rng = StdRng::seed_from_u64(23);
        let (data, labels, images) = sample_neighborhood_with_images(
            &image,
            &segments,
            &strategy,
            &mean_classifier,
            7,
            3,
            &mut rng,
        )
        .unwrap();

        assert_eq!(images.len(), 7);
        assert_eq!(images[0], image); // row 0 is the unperturbed image
        for (i, perturbed) in images.iter().enumerate() {
            assert_abs_diff_eq!(
                labels[[i, 0]],
                perturbed.mean().unwrap(),
                epsilon = 1e-12
            );
            let expected = data.row(i).sum() / 2.0;
            assert_abs_diff_eq!(perturbed.mean().unwrap(), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn same_seed_reproduces_the_same_neighborhood() {
        let (image, segments) = fixture();
        let strategy = prepared_fudge(&image, &segments);
        let run = || {
            let mut rng = StdRng::seed_from_u64(99);
            sample_neighborhood(&image, &segments, &strategy, &mean_classifier, 12, 5, &mut rng)
                .unwrap()
        };
        let (data_a, labels_a) = run();
        let (data_b, labels_b) = run();
        assert_eq!(data_a, data_b);
        assert_eq!(labels_a, labels_b);
    }
}
