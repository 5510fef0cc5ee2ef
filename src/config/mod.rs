pub mod load;
pub mod save;
pub mod types;

pub use save::save_settings;
pub use types::{
    EncodeSettings, EngineSettings, SETTINGS_FILE_NAME, SceneSettings, ScorerKind, Settings,
    SilenceSettings, ThumbnailSettings,
};
