//! 最佳畫格選擇
//!
//! 在影片 10%–90% 的範圍內平均取樣候選時間點，
//! 以可替換的評分函式逐一評分後取最高分者。

use crate::error::{EditError, EditResult};
use crate::tools::MediaEngine;
use log::{debug, warn};
use serde::Serialize;
use std::path::Path;

/// 取樣範圍起點（影片長度的比例）
const WINDOW_START: f64 = 0.1;
/// 取樣範圍終點
const WINDOW_END: f64 = 0.9;

/// 參考評分：基礎分
const BASE_SCORE: f64 = 50.0;
/// 參考評分：位於正中央時的最高加分
const MIDPOINT_BONUS: f64 = 30.0;
/// 參考評分：落在取樣範圍外的扣分
const OUTSIDE_WINDOW_PENALTY: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateFrame {
    pub timestamp: f64,
    pub score: f64,
}

/// 候選畫格的評分方式
pub trait FrameQuality {
    fn score(&self, timestamp: f64) -> EditResult<f64>;
}

/// 候選時間點：取樣範圍內每個等分區間的中點
///
/// 與「起點 + i × 間隔」的排法不同，這裡取 `起點 + (i + 0.5) × 間隔`，
/// 候選不會落在取樣範圍的邊界上。因此只有一個候選時即為影片正中央 (0.5 × 長度)。
#[must_use]
pub fn candidate_timestamps(duration: f64, count: usize) -> Vec<f64> {
    let count = count.max(1);
    let duration = duration.max(0.0);
    let window_start = duration * WINDOW_START;
    let interval = duration * (WINDOW_END - WINDOW_START) / count as f64;

    (0..count)
        .map(|i| (i as f64 + 0.5).mul_add(interval, window_start))
        .collect()
}

/// 逐一評分候選時間點並回傳分數最高者
///
/// 同分時取最先出現的候選。單一候選評分失敗只會記錄警告，
/// 全部失敗才回傳錯誤。
pub fn select_best_frame<F>(duration: f64, count: usize, mut quality: F) -> EditResult<CandidateFrame>
where
    F: FnMut(f64) -> EditResult<f64>,
{
    let mut best: Option<CandidateFrame> = None;
    let mut last_error = None;

    for timestamp in candidate_timestamps(duration, count) {
        let score = match quality(timestamp) {
            Ok(score) if score.is_finite() => score,
            Ok(score) => {
                warn!("候選畫格 {timestamp:.3}s 分數無效: {score}");
                continue;
            }
            Err(e) => {
                warn!("候選畫格 {timestamp:.3}s 評分失敗: {e}");
                last_error = Some(e);
                continue;
            }
        };

        debug!("候選畫格 {timestamp:.3}s 分數 {score:.2}");
        if best.is_none_or(|current| score > current.score) {
            best = Some(CandidateFrame { timestamp, score });
        }
    }

    best.ok_or_else(|| {
        last_error.unwrap_or_else(|| EditError::engine_output("畫格評分", "沒有可用的候選畫格"))
    })
}

/// 位置加分：越接近影片中央越高，兩端為 0
fn midpoint_bonus(timestamp: f64, duration: f64, max_bonus: f64) -> f64 {
    if duration <= 0.0 {
        return 0.0;
    }
    let half = duration / 2.0;
    let distance = (timestamp - half).abs() / half;
    max_bonus * (1.0 - distance).max(0.0)
}

fn outside_window(timestamp: f64, duration: f64) -> bool {
    timestamp < duration * WINDOW_START || timestamp > duration * WINDOW_END
}

/// 參考評分：基礎分加上位置加分，範圍外扣分，限制在 0–100
#[must_use]
pub fn reference_score(timestamp: f64, duration: f64) -> f64 {
    let mut score = BASE_SCORE + midpoint_bonus(timestamp, duration, MIDPOINT_BONUS);
    if outside_window(timestamp, duration) {
        score -= OUTSIDE_WINDOW_PENALTY;
    }
    score.clamp(0.0, 100.0)
}

/// 亮度評分：對比度 40 分、曝光 40 分、位置 20 分
///
/// `pixels` 為灰階取樣，全黑、全白或平坦的畫面分數偏低。
#[must_use]
pub fn luma_score(pixels: &[u8], timestamp: f64, duration: f64) -> f64 {
    if pixels.is_empty() {
        return 0.0;
    }

    let count = pixels.len() as f64;
    let mean = pixels.iter().map(|&p| f64::from(p)).sum::<f64>() / count;
    let variance = pixels
        .iter()
        .map(|&p| {
            let diff = f64::from(p) - mean;
            diff * diff
        })
        .sum::<f64>()
        / count;

    let contrast = (variance.sqrt() / 64.0).min(1.0);
    let exposure = 1.0 - ((mean - 128.0).abs() / 128.0).min(1.0);
    let mut score = 40.0f64.mul_add(contrast, 40.0 * exposure)
        + midpoint_bonus(timestamp, duration, 20.0);
    if outside_window(timestamp, duration) {
        score -= OUTSIDE_WINDOW_PENALTY;
    }
    score.clamp(0.0, 100.0)
}

/// 只依位置評分，不需讀取畫面
pub struct ReferenceScorer {
    duration: f64,
}

impl ReferenceScorer {
    #[must_use]
    pub const fn new(duration: f64) -> Self {
        Self { duration }
    }
}

impl FrameQuality for ReferenceScorer {
    fn score(&self, timestamp: f64) -> EditResult<f64> {
        Ok(reference_score(timestamp, self.duration))
    }
}

/// 每個候選都向引擎取一張灰階縮圖來評分
pub struct LumaScorer<'a> {
    engine: &'a dyn MediaEngine,
    video: &'a Path,
    duration: f64,
}

impl<'a> LumaScorer<'a> {
    #[must_use]
    pub const fn new(engine: &'a dyn MediaEngine, video: &'a Path, duration: f64) -> Self {
        Self {
            engine,
            video,
            duration,
        }
    }
}

impl FrameQuality for LumaScorer<'_> {
    fn score(&self, timestamp: f64) -> EditResult<f64> {
        let pixels = self.engine.sample_luma(self.video, timestamp)?;
        if pixels.is_empty() {
            return Err(EditError::engine_output("亮度取樣", "沒有取得任何像素"));
        }
        Ok(luma_score(&pixels, timestamp, self.duration))
    }
}
