//! Probability-gated sequencing of transforms.

use super::{ImageArray, ImageTransform};
use crate::core::config::validate_probability;
use crate::core::errors::{OCRError, ProcessingStage};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::trace;

/// One entry of a [`Compose`]: a transform and the probability it runs.
#[derive(Debug)]
pub struct Step {
    transform: Box<dyn ImageTransform>,
    p: f64,
}

impl Step {
    /// Creates a step that runs with probability `p`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `p` is outside `[0, 1]`.
    pub fn new(transform: impl ImageTransform + 'static, p: f64) -> Result<Self, OCRError> {
        Self::boxed(Box::new(transform), p)
    }

    /// Like [`Step::new`] for an already boxed transform.
    pub fn boxed(transform: Box<dyn ImageTransform>, p: f64) -> Result<Self, OCRError> {
        validate_probability(transform.name(), p)?;
        Ok(Self { transform, p })
    }

    /// A step that always runs.
    pub fn always(transform: impl ImageTransform + 'static) -> Self {
        Self {
            transform: Box::new(transform),
            p: 1.0,
        }
    }

    /// The gating probability.
    pub fn probability(&self) -> f64 {
        self.p
    }

    /// The wrapped transform.
    pub fn transform(&self) -> &dyn ImageTransform {
        self.transform.as_ref()
    }
}

/// An ordered list of steps, applied in sequence.
///
/// A step with `p >= 1` runs without drawing from the generator; any other
/// step runs when a uniform draw in `[0, 1)` falls below `p`, so `p = 0`
/// never runs. A `Compose` is itself a transform, which is how groups are
/// expressed: the group's gate is the outer step's probability, after which
/// its own steps are evaluated as usual.
#[derive(Debug, Default)]
pub struct Compose {
    steps: Vec<Step>,
}

impl Compose {
    /// Creates a composer from its steps.
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Appends a step.
    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// The steps in application order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs the pipeline with a fresh generator seeded from `seed`.
    pub fn apply_seeded(&self, image: ImageArray, seed: u64) -> Result<ImageArray, OCRError> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.apply(image, &mut rng)
    }
}

impl ImageTransform for Compose {
    fn apply(&self, mut image: ImageArray, rng: &mut dyn RngCore) -> Result<ImageArray, OCRError> {
        for step in &self.steps {
            let runs = step.p >= 1.0 || rng.random::<f64>() < step.p;
            if !runs {
                continue;
            }
            let name = step.transform.name();
            trace!(step = name, shape = ?image.dim(), "applying augmentation");
            image = step.transform.apply(image, rng).map_err(|e| match e {
                // Already attributed by a nested group.
                OCRError::Processing {
                    kind: ProcessingStage::Augmentation,
                    ..
                } => e,
                other => OCRError::augmentation_error(name, other),
            })?;
        }
        Ok(image)
    }

    fn name(&self) -> &str {
        "Compose"
    }
}
