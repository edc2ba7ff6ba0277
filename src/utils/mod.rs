//! Utility functions shared across the crate.
//!
//! This module provides image loading and conversion, geometric warps,
//! neighbourhood filters and logging setup.

pub mod filter;
pub mod image;
pub mod warp;

pub use self::image::{array_to_dynamic, gray_to_array, load_image, rgb_to_array};
pub use warp::{
    affine_from_points, remap, resize, resize_to_height, rotation_matrix_2d, warp_affine,
};

/// Installs the global tracing subscriber.
///
/// The filter is read from `RUST_LOG`; when it is unset or invalid the level
/// defaults to `info`.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
