//! 片段整理
//!
//! 把場景變換點轉為連續片段，並依最短長度過濾

use crate::error::{EditError, EditResult};
use log::warn;
use serde::Serialize;

/// 視為同一時間點的誤差（秒）
const BOUNDARY_EPSILON: f64 = 1e-6;

/// 影片中的一段連續時間範圍 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}

impl Segment {
    #[must_use]
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            duration: (end - start).max(0.0),
        }
    }
}

/// 由場景變換點建立片段列表
///
/// 邊界為 `[0, 變換點..., total_duration]`，每對相鄰邊界產生一個片段。
/// 沒有任何變換點時整部影片視為單一片段。
///
/// 重複的時間點會被去除，落在 `0` 或片尾之外的點會被略過（兩者都會記錄警告）；
/// 負數、非有限值或遞減的序列視為輸入錯誤。
pub fn build_segments(change_points: &[f64], total_duration: f64) -> EditResult<Vec<Segment>> {
    if !total_duration.is_finite() || total_duration <= 0.0 {
        return Err(EditError::InvalidTimestamps(format!(
            "影片長度必須大於 0，實際為 {total_duration}"
        )));
    }

    let mut boundaries = Vec::with_capacity(change_points.len() + 2);
    boundaries.push(0.0);

    let mut previous: Option<f64> = None;
    for &point in change_points {
        if !point.is_finite() || point < 0.0 {
            return Err(EditError::InvalidTimestamps(format!(
                "時間點必須為非負數，實際為 {point}"
            )));
        }

        if let Some(prev) = previous {
            if point < prev - BOUNDARY_EPSILON {
                return Err(EditError::InvalidTimestamps(format!(
                    "時間點未依序遞增: {prev} 之後出現 {point}"
                )));
            }
            if (point - prev).abs() <= BOUNDARY_EPSILON {
                warn!("略過重複的場景變換點 {point:.3}s");
                continue;
            }
        }
        previous = Some(point);

        if point <= BOUNDARY_EPSILON || point >= total_duration - BOUNDARY_EPSILON {
            warn!("略過超出影片範圍的場景變換點 {point:.3}s（長度 {total_duration:.3}s）");
            continue;
        }

        boundaries.push(point);
    }

    boundaries.push(total_duration);

    Ok(boundaries
        .windows(2)
        .map(|w| Segment::new(w[0], w[1]))
        .filter(|seg| seg.duration > 0.0)
        .collect())
}

/// 只保留長度不小於 `min_duration` 的片段
///
/// 過短的片段直接捨棄，不會併入相鄰片段；順序維持不變。
/// 全部被過濾時回傳 `EmptyResult`，呼叫端可降低門檻後重試。
pub fn filter_segments(segments: Vec<Segment>, min_duration: f64) -> EditResult<Vec<Segment>> {
    let original_count = segments.len();

    let kept: Vec<Segment> = segments
        .into_iter()
        .filter(|seg| seg.duration >= min_duration)
        .collect();

    if kept.is_empty() {
        return Err(EditError::EmptyResult {
            stage: "片段長度".to_string(),
            original_count,
            threshold: min_duration,
        });
    }

    Ok(kept)
}

/// 片段總長度
#[must_use]
pub fn total_duration(segments: &[Segment]) -> f64 {
    segments.iter().map(|seg| seg.duration).sum()
}
