mod main;
mod scene_detector;
mod segment;

pub use main::{AutoSummary, Detection, MergeResult, SceneEditor, SplitResult};
pub use scene_detector::{FALLBACK_THRESHOLD, parse_scene_output, should_retry_with_fallback};
pub use segment::{Segment, build_segments, filter_segments, total_duration};
