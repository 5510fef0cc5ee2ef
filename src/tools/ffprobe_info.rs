use crate::error::{EditError, EditResult};
use serde::{Deserialize, Serialize};

/// 影片基本資訊，每次查詢都重新取得，不做快取
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
    pub fps: f64,
}

#[derive(Deserialize)]
struct FfprobeOutput {
    format: Option<FormatInfo>,
    streams: Option<Vec<StreamInfo>>,
}

#[derive(Deserialize)]
struct FormatInfo {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct StreamInfo {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

const OPERATION: &str = "probe";

fn parse_probe_json(json: &str) -> EditResult<FfprobeOutput> {
    serde_json::from_str(json)
        .map_err(|e| EditError::engine_output(OPERATION, format!("無法解析 ffprobe 輸出: {e}")))
}

/// 解析 ffprobe JSON 輸出為影片資訊
pub fn parse_video_info(json: &str) -> EditResult<VideoInfo> {
    let probe = parse_probe_json(json)?;

    // 找到視訊串流
    let video_stream = probe
        .streams
        .as_ref()
        .and_then(|streams| {
            streams
                .iter()
                .find(|s| s.codec_type.as_deref() == Some("video"))
        })
        .ok_or_else(|| EditError::engine_output(OPERATION, "找不到視訊串流"))?;

    let width = video_stream
        .width
        .filter(|&w| w > 0)
        .ok_or_else(|| EditError::engine_output(OPERATION, "無法取得影片寬度"))?;
    let height = video_stream
        .height
        .filter(|&h| h > 0)
        .ok_or_else(|| EditError::engine_output(OPERATION, "無法取得影片高度"))?;

    // 影片長度優先從 format 取得，其次從 stream
    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video_stream.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| EditError::engine_output(OPERATION, "無法取得影片長度"))?;

    // r_frame_rate 可能是 0/0，改用 avg_frame_rate
    let fps = [&video_stream.r_frame_rate, &video_stream.avg_frame_rate]
        .into_iter()
        .flatten()
        .find_map(|r| parse_frame_rate(r))
        .ok_or_else(|| EditError::engine_output(OPERATION, "無法取得影片幀率"))?;

    Ok(VideoInfo {
        width,
        height,
        duration,
        fps,
    })
}

/// 只取影片長度（純音訊檔也可用）
pub fn parse_duration(json: &str) -> EditResult<f64> {
    let probe = parse_probe_json(json)?;

    probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or_else(|| {
            probe
                .streams
                .as_ref()
                .and_then(|streams| streams.iter().find_map(|s| s.duration.as_deref()))
        })
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| EditError::engine_output(OPERATION, "無法取得影片長度"))
}

/// 解析幀率字串（例如 "30/1" 或 "30000/1001"）
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let value = if let Some((num_str, den_str)) = rate.split_once('/') {
        let num: f64 = num_str.parse().ok()?;
        let den: f64 = den_str.parse().ok()?;
        if den <= 0.0 {
            return None;
        }
        num / den
    } else {
        rate.parse().ok()?
    };

    (value.is_finite() && value > 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            { "codec_type": "audio", "duration": "35.010000" },
            { "codec_type": "video", "width": 1920, "height": 1080,
              "r_frame_rate": "30000/1001", "avg_frame_rate": "30000/1001",
              "duration": "35.000000" }
        ],
        "format": { "duration": "35.050000" }
    }"#;

    #[test]
    fn test_parse_video_info() {
        let info = parse_video_info(SAMPLE).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert!((info.duration - 35.05).abs() < 0.001);
        assert!((info.fps - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_video_info_without_video_stream() {
        let json = r#"{ "streams": [ { "codec_type": "audio" } ], "format": { "duration": "3.0" } }"#;
        assert!(matches!(
            parse_video_info(json),
            Err(EditError::EngineOutput { .. })
        ));
    }

    #[test]
    fn test_parse_video_info_falls_back_to_avg_frame_rate() {
        let json = r#"{
            "streams": [ { "codec_type": "video", "width": 640, "height": 360,
                           "r_frame_rate": "0/0", "avg_frame_rate": "25/1" } ],
            "format": { "duration": "10.0" }
        }"#;
        let info = parse_video_info(json).unwrap();
        assert!((info.fps - 25.0).abs() < 0.01);
    }

    #[test]
    fn test_parse_duration_audio_only() {
        let json = r#"{ "streams": [ { "codec_type": "audio", "duration": "12.5" } ] }"#;
        assert!((parse_duration(json).unwrap() - 12.5).abs() < 0.001);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_video_info("not json").is_err());
        assert!(parse_duration("{}").is_err());
    }

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("invalid").is_none());
        assert!(parse_frame_rate("30/0").is_none());
        assert!(parse_frame_rate("0/1").is_none());
    }
}
