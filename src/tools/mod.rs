mod contact_sheet_merger;
mod engine;
mod ffmpeg_command;
mod ffprobe_info;
mod path_validator;
mod progress;
mod scratch;
mod thumbnail_extractor;

pub use contact_sheet_merger::{grid_command, grid_timestamps};
pub use engine::{EngineConfig, FfmpegEngine, MediaEngine, ProcessOutput};
pub use ffmpeg_command::{FfmpegCommand, PreviewRequest, format_seconds};
pub use ffprobe_info::{VideoInfo, parse_duration, parse_video_info};
pub use path_validator::{
    derived_file_name, ensure_directory_exists, output_directory, validate_input_file,
    video_extension, video_stem,
};
pub use progress::step_progress;
pub use scratch::ScratchSpace;
pub use thumbnail_extractor::{
    FrameRequest, FrameScale, TILE_HEIGHT, TILE_WIDTH, format_timecode, frame_command,
};
