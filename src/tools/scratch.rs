use crate::error::EditResult;
use log::{debug, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// 單次執行專用的暫存資料夾
///
/// 名稱帶有隨機執行代號，同一資料夾同時執行多個流程也不會互相覆蓋。
/// 清理在成功與失敗路徑都會執行，資料夾已不存在時不視為錯誤。
#[derive(Debug)]
pub struct ScratchSpace {
    root: PathBuf,
    run_id: String,
    cleaned: bool,
}

impl ScratchSpace {
    /// 在 `parent` 下建立 `.<stem>_<run-id>` 暫存資料夾
    ///
    /// 根目錄一律轉為絕對路徑，暫存檔路徑寫進清單後不受工作目錄影響。
    pub fn create(parent: &Path, stem: &str) -> EditResult<Self> {
        let run_id = Uuid::new_v4().simple().to_string()[..12].to_string();
        let root = std::path::absolute(parent)?.join(format!(".{stem}_{run_id}"));
        fs::create_dir_all(&root)?;

        debug!("建立暫存資料夾: {}", root.display());

        Ok(Self {
            root,
            run_id,
            cleaned: false,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// `<label>_<index>.<ext>` 暫存檔路徑
    #[must_use]
    pub fn file(&self, label: &str, index: usize, extension: &str) -> PathBuf {
        self.root.join(format!("{label}_{index:03}.{extension}"))
    }

    /// 平行工作用的獨立子命名空間
    pub fn namespace(&self, label: &str) -> EditResult<PathBuf> {
        let path = self.root.join(label);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// 移除暫存資料夾，可重複呼叫
    pub fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;

        match fs::remove_dir_all(&self.root) {
            Ok(()) => debug!("已清理暫存資料夾: {}", self.root.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("無法清理暫存資料夾 {}: {e}", self.root.display()),
        }
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_paths_are_run_scoped() {
        let dir = tempfile::tempdir().unwrap();
        let a = ScratchSpace::create(dir.path(), "clip").unwrap();
        let b = ScratchSpace::create(dir.path(), "clip").unwrap();

        assert_ne!(a.root(), b.root());
        assert_ne!(a.file("trim", 0, "mp4"), b.file("trim", 0, "mp4"));
        assert!(
            a.file("trim", 7, "mp4")
                .ends_with(format!(".clip_{}/trim_007.mp4", a.run_id()))
        );
    }

    #[test]
    fn test_relative_parent_gives_absolute_root() {
        let parent = PathBuf::from(format!("scratch_parent_{}", Uuid::new_v4().simple()));
        let mut scratch = ScratchSpace::create(&parent, "clip").unwrap();

        assert!(scratch.root().is_absolute());
        assert!(scratch.file("segment", 0, "mp4").is_absolute());
        assert!(scratch.root().starts_with(std::path::absolute(&parent).unwrap()));

        scratch.cleanup();
        fs::remove_dir_all(&parent).unwrap();
    }

    #[test]
    fn test_cleanup_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut scratch = ScratchSpace::create(dir.path(), "clip").unwrap();
        let worker = scratch.namespace("storyboard").unwrap();
        fs::write(worker.join("frame.jpg"), b"x").unwrap();
        fs::write(scratch.file("trim", 0, "mp4"), b"x").unwrap();

        let root = scratch.root().to_path_buf();
        scratch.cleanup();
        assert!(!root.exists());
    }

    #[test]
    fn test_cleanup_tolerates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut scratch = ScratchSpace::create(dir.path(), "clip").unwrap();
        fs::remove_dir_all(scratch.root()).unwrap();

        scratch.cleanup();
        scratch.cleanup();
    }

    #[test]
    fn test_drop_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let root = {
            let scratch = ScratchSpace::create(dir.path(), "clip").unwrap();
            scratch.root().to_path_buf()
        };
        assert!(!root.exists());
    }
}
