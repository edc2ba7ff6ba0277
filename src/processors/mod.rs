//! Recognition post-processing and shared image-processing types.

pub mod ctc;
pub mod line_split;
pub mod types;

pub use ctc::CtcGreedyDecoder;
pub use line_split::{LineSplitter, otsu_threshold};
pub use types::{BorderMode, ChannelOrder, Interpolation};
