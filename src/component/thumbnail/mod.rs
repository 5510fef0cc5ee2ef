//! 縮圖元件
//!
//! 最佳畫面、格狀預覽圖、時間軸、GIF 預覽與首尾畫面

mod frame_scorer;
mod main;

pub use frame_scorer::{
    CandidateFrame, FrameQuality, LumaScorer, ReferenceScorer, candidate_timestamps, luma_score,
    reference_score, select_best_frame,
};
pub use main::{BatchReport, BestThumbnail, EdgeFrames, PreviewAnchor, PreviewClip, ThumbnailGenerator};
