//! CHW <-> HWC boundary around an HWC transform.

use super::{ImageArray, ImageTransform};
use crate::core::errors::{ImageProcessError, OCRError};
use ndarray::{Array3, ArrayD, Ix3};
use rand::RngCore;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Wraps an HWC transform so it can be fed CHW arrays.
///
/// The input is permuted to HWC, materialized in standard layout, passed to
/// the inner transform and permuted back to CHW.
#[derive(Debug)]
pub struct ChannelFirst<T> {
    inner: T,
}

impl<T: ImageTransform> ChannelFirst<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Applies the inner transform to a `[C, H, W]` array.
    pub fn apply(&self, chw: Array3<f32>, rng: &mut dyn RngCore) -> Result<Array3<f32>, OCRError> {
        let hwc: ImageArray = chw.permuted_axes([1, 2, 0]).as_standard_layout().into_owned();
        let out = self.inner.apply(hwc, rng)?;
        Ok(out.permuted_axes([2, 0, 1]).as_standard_layout().into_owned())
    }

    /// Like [`ChannelFirst::apply`] for arrays of unchecked rank.
    ///
    /// # Errors
    ///
    /// Returns an error unless the array has exactly three axes.
    pub fn apply_dyn(&self, chw: ArrayD<f32>, rng: &mut dyn RngCore) -> Result<Array3<f32>, OCRError> {
        let ndim = chw.ndim();
        let chw = chw
            .into_dimensionality::<Ix3>()
            .map_err(|_| ImageProcessError::InvalidRank(ndim))?;
        self.apply(chw, rng)
    }

    /// Runs with a fresh generator seeded from `seed`.
    pub fn apply_seeded(&self, chw: Array3<f32>, seed: u64) -> Result<Array3<f32>, OCRError> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.apply(chw, &mut rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::Compose;
    use ndarray::IxDyn;

    #[test]
    fn test_identity_round_trip() {
        let adapter = ChannelFirst::new(Compose::default());
        let chw = Array3::from_shape_fn((3, 4, 5), |(c, y, x)| (c * 100 + y * 10 + x) as f32);
        let out = adapter.apply_seeded(chw.clone(), 1).unwrap();
        assert_eq!(out, chw);
        assert!(out.is_standard_layout());
    }

    #[test]
    fn test_inner_sees_hwc() {
        #[derive(Debug)]
        struct ShapeProbe;
        impl ImageTransform for ShapeProbe {
            fn apply(&self, image: ImageArray, _rng: &mut dyn RngCore) -> Result<ImageArray, OCRError> {
                assert_eq!(image.dim(), (4, 5, 3));
                assert!(image.is_standard_layout());
                Ok(image)
            }
            fn name(&self) -> &str {
                "ShapeProbe"
            }
        }
        let adapter = ChannelFirst::new(ShapeProbe);
        adapter.apply_seeded(Array3::zeros((3, 4, 5)), 0).unwrap();
    }

    #[test]
    fn test_rank_is_checked() {
        let adapter = ChannelFirst::new(Compose::default());
        let mut rng = StdRng::seed_from_u64(0);
        let err = adapter
            .apply_dyn(ArrayD::zeros(IxDyn(&[4, 5])), &mut rng)
            .unwrap_err();
        assert!(matches!(err, OCRError::Processing { .. }));
    }
}
