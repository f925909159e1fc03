use super::SplitKind;
use crate::common::*;

/// The record of an image with its parsed label file, without image pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub split: SplitKind,
    /// The image path relative to the image directory, without extension.
    pub key: PathBuf,
    pub image_file: PathBuf,
    /// The label file, or `None` if the image is unannotated.
    pub label_file: Option<PathBuf>,
    /// Image size in pixels, available if image headers were probed.
    pub size: Option<HW<usize>>,
    /// Bounding boxes in ratio units.
    pub bboxes: Vec<YoloLabel>,
    /// The label file line number of each box.
    pub line_numbers: Vec<usize>,
}

impl FileRecord {
    pub fn is_labeled(&self) -> bool {
        self.label_file.is_some()
    }

    /// Iterate boxes paired with their label file line numbers.
    pub fn numbered_bboxes(&self) -> impl Iterator<Item = (usize, &YoloLabel)> {
        self.line_numbers.iter().cloned().zip(&self.bboxes)
    }
}
