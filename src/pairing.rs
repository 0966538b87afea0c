use crate::images::{ImageFile, ImageKind};
use anyhow::{Context, Result};
use std::path::Path;
use thiserror::Error;

/// Filename fragments suggesting an identity document scan.
pub const DOCUMENT_HINTS: [&str; 6] = ["pass", "passport", "doc", "mrz", "bio", "id"];
/// Filename fragments suggesting a live capture.
pub const LIVE_HINTS: [&str; 5] = ["selfie", "face", "live", "photo", "portrait"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePair {
    pub document: ImageFile,
    pub live: ImageFile,
}

impl ImagePair {
    /// Pair two explicitly named files; both must be recognised images.
    pub fn from_paths(
        document: &Path,
        document_size: u64,
        live: &Path,
        live_size: u64,
    ) -> Result<Self> {
        let document = ImageFile::new(document, document_size).with_context(|| {
            format!("{} is not a recognised image type", document.display())
        })?;
        let live = ImageFile::new(live, live_size)
            .with_context(|| format!("{} is not a recognised image type", live.display()))?;
        Ok(Self { document, live })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PairingError {
    #[error("fewer than two usable images")]
    NotEnoughImages,
    #[error("could not choose two distinct images")]
    CannotChoosePair,
}

impl PairingError {
    /// Cause tag used in `skipped:<cause>` statuses.
    pub fn cause(&self) -> &'static str {
        match self {
            PairingError::NotEnoughImages => "not_enough_images",
            PairingError::CannotChoosePair => "cant_choose_pair",
        }
    }
}

fn has_hint(name: &str, hints: &[&str]) -> bool {
    hints.iter().any(|h| name.contains(h))
}

/// Pick the (document, live) pair among one subject's images.
///
/// Name hints first, then position, then byte size. Deterministic for a
/// given input order, and never pairs an image with itself.
pub fn select_pair(images: &[ImageFile]) -> std::result::Result<ImagePair, PairingError> {
    let mut usable: Vec<&ImageFile> = Vec::with_capacity(images.len());
    for image in images {
        if ImageKind::from_path(&image.path).is_some()
            && !usable.iter().any(|u| u.path == image.path)
        {
            usable.push(image);
        }
    }
    if usable.len() < 2 {
        return Err(PairingError::NotEnoughImages);
    }

    let names: Vec<String> = usable.iter().map(|i| i.file_name().to_lowercase()).collect();

    let document = (0..usable.len()).find(|&i| has_hint(&names[i], &DOCUMENT_HINTS));
    let live = (0..usable.len())
        .find(|&i| Some(i) != document && has_hint(&names[i], &LIVE_HINTS));

    // positional fallback: second image, or the first when the second is the document
    let document = document.unwrap_or(0);
    let live = live.unwrap_or(if document != 1 { 1 } else { 0 });

    let (document, live) = if live != document {
        (document, live)
    } else {
        // documents are usually the larger scan
        let mut by_size: Vec<usize> = (0..usable.len()).collect();
        by_size.sort_by(|&a, &b| usable[b].size.cmp(&usable[a].size));
        (by_size[0], by_size[1])
    };

    if document == live || usable[document].path == usable[live].path {
        return Err(PairingError::CannotChoosePair);
    }

    Ok(ImagePair {
        document: usable[document].clone(),
        live: usable[live].clone(),
    })
}
