//! 功能元件模組
//!
//! 每個子模組實現一個獨立的剪輯流程，包含主要邏輯和專用工具

pub mod scene_split;
pub mod silence_removal;
pub mod thumbnail;

pub use scene_split::SceneEditor;
pub use silence_removal::SilenceRemover;
pub use thumbnail::ThumbnailGenerator;
