//! 靜音區間解析與保留區間計算

use crate::component::scene_split::Segment;
use crate::error::{EditError, EditResult};
use log::{debug, warn};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// 例如: [silencedetect @ 0x55d] silence_start: 12.345
static SILENCE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"silence_start:\s*(-?[0-9]+(?:\.[0-9]+)?)").expect("Invalid regex")
});

/// 例如: [silencedetect @ 0x55d] silence_end: 14.5 | silence_duration: 2.155
static SILENCE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"silence_end:\s*(-?[0-9]+(?:\.[0-9]+)?)(?:\s*\|\s*silence_duration:\s*(-?[0-9]+(?:\.[0-9]+)?))?")
        .expect("Invalid regex")
});

/// 一段靜音
///
/// 影片在靜音中結束時 `end` 與 `duration` 為 `None`。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SilenceInterval {
    pub start: f64,
    pub end: Option<f64>,
    pub duration: Option<f64>,
}

impl SilenceInterval {
    #[must_use]
    pub fn closed(start: f64, end: f64) -> Self {
        Self {
            start,
            end: Some(end),
            duration: Some((end - start).max(0.0)),
        }
    }

    #[must_use]
    pub const fn open(start: f64) -> Self {
        Self {
            start,
            end: None,
            duration: None,
        }
    }
}

/// 解析 silencedetect 的輸出
///
/// 開始與結束標記必須成對出現，只有最後一段允許缺少結束標記。
pub fn parse_silence_output(output: &str) -> EditResult<Vec<SilenceInterval>> {
    let mut intervals = Vec::new();
    let mut pending: Option<f64> = None;

    for line in output.lines() {
        if let Some(caps) = SILENCE_START.captures(line) {
            let start = parse_number(caps.get(1).map(|m| m.as_str()), line)?;
            if let Some(previous) = pending {
                return Err(EditError::engine_output(
                    "靜音偵測",
                    format!("靜音開始於 {previous} 之後未結束又再次開始"),
                ));
            }
            // silencedetect 在片頭可能回報些微負值
            pending = Some(start.max(0.0));
        } else if let Some(caps) = SILENCE_END.captures(line) {
            let end = parse_number(caps.get(1).map(|m| m.as_str()), line)?;
            let Some(start) = pending.take() else {
                return Err(EditError::engine_output(
                    "靜音偵測",
                    format!("靜音結束於 {end} 但沒有對應的開始"),
                ));
            };
            intervals.push(SilenceInterval::closed(start, end.max(start)));
        }
    }

    if let Some(start) = pending {
        debug!("影片在靜音中結束（開始於 {start:.3}s）");
        intervals.push(SilenceInterval::open(start));
    }

    debug!("找到 {} 段靜音", intervals.len());
    Ok(intervals)
}

fn parse_number(value: Option<&str>, line: &str) -> EditResult<f64> {
    value
        .and_then(|v| v.parse::<f64>().ok())
        .ok_or_else(|| EditError::engine_output("靜音偵測", format!("無法解析時間: {line}")))
}

/// 由靜音區間計算要保留的區間
///
/// 每個保留區間的尾端延伸 `padding` 進入靜音，下一段則提早 `padding` 開始，
/// 避免切掉語音的起音與尾音。結果依時間排序且互不重疊，長度不大於 0 的區間會被捨棄。
#[must_use]
pub fn complement_of_silence(
    silences: &[SilenceInterval],
    total_duration: f64,
    padding: f64,
) -> Vec<Segment> {
    let padding = padding.max(0.0);
    let mut keeps = Vec::with_capacity(silences.len() + 1);
    let mut cursor = 0.0_f64;

    for silence in silences {
        if cursor >= total_duration {
            break;
        }

        let effective_end = silence.end.unwrap_or(total_duration).min(total_duration);

        if silence.start > cursor {
            let keep_end = (silence.start + padding).min(effective_end).min(total_duration);
            if keep_end > cursor {
                keeps.push(Segment::new(cursor, keep_end));
            } else {
                warn!("略過長度不大於 0 的保留區間 {cursor:.3}s - {keep_end:.3}s");
            }
        }

        let emitted_end = keeps.last().map_or(0.0, |keep: &Segment| keep.end);
        cursor = if silence.end.is_none() || effective_end >= total_duration {
            total_duration
        } else {
            (effective_end - padding)
                .max(silence.start)
                .max(emitted_end)
                .max(cursor)
        };
    }

    if cursor < total_duration {
        keeps.push(Segment::new(cursor, total_duration));
    }

    keeps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::scene_split::total_duration;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_parse_paired_markers() {
        let output = "\
[silencedetect @ 0x5581] silence_start: 0
[silencedetect @ 0x5581] silence_end: 2 | silence_duration: 2
size=N/A time=00:00:05.00 bitrate=N/A speed= 500x
[silencedetect @ 0x5581] silence_start: 10
[silencedetect @ 0x5581] silence_end: 10.4 | silence_duration: 0.4
";
        let intervals = parse_silence_output(output).unwrap();
        assert_eq!(
            intervals,
            vec![
                SilenceInterval::closed(0.0, 2.0),
                SilenceInterval::closed(10.0, 10.4)
            ]
        );
    }

    #[test]
    fn test_parse_trailing_open_silence() {
        let output = "\
[silencedetect @ 0x1] silence_start: 3.5
[silencedetect @ 0x1] silence_end: 4.5 | silence_duration: 1
[silencedetect @ 0x1] silence_start: 18.25
";
        let intervals = parse_silence_output(output).unwrap();
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[1], SilenceInterval::open(18.25));
    }

    #[test]
    fn test_parse_clamps_negative_start() {
        let output = "\
[silencedetect @ 0x1] silence_start: -0.0213
[silencedetect @ 0x1] silence_end: 1.2 | silence_duration: 1.2213
";
        let intervals = parse_silence_output(output).unwrap();
        assert_close(intervals[0].start, 0.0);
    }

    #[test]
    fn test_parse_rejects_unpaired_markers() {
        let end_first = "[silencedetect @ 0x1] silence_end: 2 | silence_duration: 2\n";
        assert!(parse_silence_output(end_first).is_err());

        let double_start = "\
[silencedetect @ 0x1] silence_start: 1
[silencedetect @ 0x1] silence_start: 2
";
        assert!(parse_silence_output(double_start).is_err());
    }

    #[test]
    fn test_complement_without_silence_keeps_everything() {
        for padding in [0.0, 0.1, 5.0] {
            let keeps = complement_of_silence(&[], 20.0, padding);
            assert_eq!(keeps, vec![Segment::new(0.0, 20.0)]);
        }
    }

    #[test]
    fn test_complement_traced_walk() {
        let silences = [
            SilenceInterval::closed(0.0, 2.0),
            SilenceInterval::closed(10.0, 10.4),
        ];
        let keeps = complement_of_silence(&silences, 20.0, 0.1);

        // 第一段靜音從 0 開始，不產生保留區間，cursor = 2.0 - 0.1
        // 第二段: [1.9, 10.0 + 0.1]，cursor = max(10.4 - 0.1, 10.0, 10.1)
        assert_eq!(keeps.len(), 2);
        assert_close(keeps[0].start, 1.9);
        assert_close(keeps[0].end, 10.1);
        assert_close(keeps[1].start, 10.3);
        assert_close(keeps[1].end, 20.0);
    }

    #[test]
    fn test_complement_total_matches_padding_formula() {
        let silences = [
            SilenceInterval::closed(4.0, 6.0),
            SilenceInterval::closed(12.0, 15.0),
        ];
        let padding = 0.25;
        let keeps = complement_of_silence(&silences, 30.0, padding);

        let silence_total = 2.0 + 3.0;
        let internal_boundaries = 4.0;
        assert_close(
            total_duration(&keeps),
            30.0 - silence_total + padding * internal_boundaries,
        );
    }

    #[test]
    fn test_complement_open_silence_ends_at_duration() {
        let silences = [
            SilenceInterval::closed(2.0, 3.0),
            SilenceInterval::open(17.0),
        ];
        let keeps = complement_of_silence(&silences, 20.0, 0.1);

        assert_eq!(keeps.len(), 2);
        assert_close(keeps[1].start, 2.9);
        assert_close(keeps[1].end, 17.1);
    }

    #[test]
    fn test_complement_short_silence_never_overlaps() {
        // padding 大於靜音長度一半
        let silences = [
            SilenceInterval::closed(5.0, 5.1),
            SilenceInterval::closed(5.15, 5.2),
        ];
        let keeps = complement_of_silence(&silences, 10.0, 0.5);

        assert!(keeps.iter().all(|k| k.duration > 0.0));
        for pair in keeps.windows(2) {
            assert!(pair[0].end <= pair[1].start + 1e-9);
        }
        assert_close(keeps.last().unwrap().end, 10.0);
    }

    #[test]
    fn test_complement_silence_past_duration() {
        let silences = [SilenceInterval::closed(8.0, 12.0)];
        let keeps = complement_of_silence(&silences, 10.0, 0.1);
        assert_eq!(keeps, vec![Segment::new(0.0, 8.1)]);
    }
}
