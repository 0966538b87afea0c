use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Extension category of a recognised image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
    Bmp,
    Webp,
    Tiff,
}

impl ImageKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            "bmp" => Some(ImageKind::Bmp),
            "webp" => Some(ImageKind::Webp),
            "tif" | "tiff" => Some(ImageKind::Tiff),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub path: PathBuf,
    pub kind: ImageKind,
    pub size: u64,
}

impl ImageFile {
    /// `None` when the extension is not a recognised image type.
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Option<Self> {
        let path = path.into();
        let kind = ImageKind::from_path(&path)?;
        Some(Self { path, kind, size })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).with_context(|| format!("reading {}", self.path.display()))
    }
}

/// Image files directly inside `dir`, sorted by file name.
pub fn list_image_files(dir: &Path) -> Result<Vec<ImageFile>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))?;

    let mut images = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        let meta = entry
            .metadata()
            .with_context(|| format!("stat {}", entry.path().display()))?;
        if !meta.is_file() {
            continue;
        }
        if let Some(image) = ImageFile::new(entry.path(), meta.len()) {
            images.push(image);
        }
    }
    images.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(images)
}

/// Sub-directories of `root`, one per subject, sorted by name.
pub fn list_subject_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(root).with_context(|| format!("listing {}", root.display()))?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("listing {}", root.display()))?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_extensions_case_insensitively() {
        assert_eq!(ImageKind::from_path(Path::new("a.JPG")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("a.jpeg")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("a.Tif")), Some(ImageKind::Tiff));
        assert_eq!(ImageKind::from_path(Path::new("a.webp")), Some(ImageKind::Webp));
        assert_eq!(ImageKind::from_path(Path::new("a.gif")), None);
        assert_eq!(ImageKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn lists_only_images_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b_selfie.PNG"), b"12").unwrap();
        std::fs::write(dir.path().join("a_passport.jpg"), b"1234").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested.jpg")).unwrap();

        let images = list_image_files(dir.path()).unwrap();
        let names: Vec<String> = images.iter().map(ImageFile::file_name).collect();
        assert_eq!(names, vec!["a_passport.jpg", "b_selfie.PNG"]);
        assert_eq!(images[0].size, 4);
        assert_eq!(images[1].kind, ImageKind::Png);
    }

    #[test]
    fn lists_subject_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("subject_b")).unwrap();
        std::fs::create_dir(dir.path().join("subject_a")).unwrap();
        std::fs::write(dir.path().join("stray.jpg"), b"x").unwrap();

        let dirs = list_subject_dirs(dir.path()).unwrap();
        let names: Vec<String> = dirs
            .iter()
            .map(|d| d.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["subject_a", "subject_b"]);
    }
}
