//! Channel detection pipeline
//!
//! Each stage works on a single window of bars re-indexed to positions `0..N-1`:
//!
//! - **Detrend**: least-squares trend of the bar averages, per-position deviations
//! - **Extremes**: peak/valley candidates and their symmetric matches
//! - **Lines**: two boundary lines built from the matched touch points
//! - **Bounds**: strict containment check of every extreme inside the channel
//! - **Advice**: live-price zoning, Buy/Sell/Hold, and the scan-wide verdict

pub mod advice;
pub mod bounds;
pub mod detrend;
pub mod extremes;
pub mod lines;

pub use advice::*;
pub use bounds::*;
pub use detrend::*;
pub use extremes::*;
pub use lines::*;
