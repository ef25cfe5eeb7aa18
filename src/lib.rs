//! Benchmark of keypoint detector / descriptor combinations on an image sequence.
//!
//! Every allowed pair replays the sequence through a two frame sliding window:
//! detect, keep the keypoints inside the region of interest, describe, and match
//! against the previous frame. Match counts and stage timings end up in a flat
//! results file.

pub mod algorithms;
pub mod compatibility;
pub mod config;
pub mod error;
pub mod features;
pub mod frame;
pub mod harness;
pub mod pipeline;
pub mod region;
pub mod results;
pub mod source;
pub mod visualize;
pub mod window;

#[cfg(test)]
mod testing;

pub use compatibility::BlockList;
pub use config::{BenchmarkConfig, PipelineOptions, SequenceConfig};
pub use error::{BenchError, CapabilityError, Result, Stage};
pub use features::{FeatureBackend, NativeBackend};
pub use frame::FrameRecord;
pub use harness::{BenchmarkHarness, SweepSummary};
pub use pipeline::FramePipeline;
pub use region::RegionOfInterest;
pub use results::{ResultsArtifact, SweepResult};
pub use source::{ImageSequence, ImageSource};
pub use window::FixedWindow;
