//! Conversion to an image classification dataset.
//!
//! Each single-object image is placed in `<output>/<train|val>/<class>/`,
//! which is the folder layout expected by common classification loaders.

use crate::{
    common::*,
    dataset::{FileDataset, GenericDataset, Scan},
    validation::IssueKind,
};

/// Options of a classification export.
#[derive(Debug, Clone)]
pub struct ClassificationExport {
    pub output_dir: PathBuf,
    /// The fraction of images per class put in the `val` split.
    pub val_split: Ratio,
    /// Move image files instead of copying them.
    pub move_files: bool,
    /// Use the first object of multi-object images instead of skipping them.
    pub force_first: bool,
    pub seed: u64,
}

/// The outcome of a classification export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub num_usable: usize,
    pub num_skipped_empty: usize,
    pub num_skipped_multi: usize,
    /// Label files without an image.
    pub num_missing_images: usize,
    pub num_unreadable_labels: usize,
    pub num_copied: usize,
    /// Image counts per class folder, in the order classes are first seen.
    pub classes: IndexMap<String, ClassSplit>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassSplit {
    pub num_train: usize,
    pub num_val: usize,
}

impl ClassificationExport {
    pub const DEFAULT_VAL_SPLIT: f64 = 0.2;
    pub const DEFAULT_SEED: u64 = 42;

    pub fn new(output_dir: impl Into<PathBuf>, val_split: f64) -> Result<Self> {
        let val_split = Ratio::try_from(val_split)
            .with_context(|| format!("val_split {} must be within [0, 1]", val_split))?;

        Ok(Self {
            output_dir: output_dir.into(),
            val_split,
            move_files: false,
            force_first: false,
            seed: Self::DEFAULT_SEED,
        })
    }

    pub async fn run(&self, scan: &Scan) -> Result<ExportSummary> {
        let dataset = &scan.dataset;
        let classes = dataset.classes();
        let mut summary = ExportSummary {
            num_missing_images: scan
                .issues
                .iter()
                .filter(|issue| issue.kind == IssueKind::OrphanLabel)
                .count(),
            ..Default::default()
        };

        let num_errors = scan.issues.iter().filter(|issue| issue.is_error()).count();
        if num_errors > 0 {
            warn!(
                "the scan reported {} errors, classes are taken from the leading token of label lines",
                num_errors
            );
        }

        // pick one class per image
        let mut samples: IndexMap<String, Vec<PathBuf>> = IndexMap::new();

        for record in dataset.records() {
            let label_file = match &record.label_file {
                Some(label_file) => label_file,
                None => continue,
            };
            let text = match tokio::fs::read_to_string(label_file).await {
                Ok(text) => text,
                Err(err) => {
                    warn!("skip unreadable label file '{}': {}", label_file.display(), err);
                    summary.num_unreadable_labels += 1;
                    continue;
                }
            };
            let tokens: Vec<&str> = LabelFile::class_tokens(&text).collect();

            let token = match tokens.as_slice() {
                [] => {
                    summary.num_skipped_empty += 1;
                    continue;
                }
                [token] => *token,
                [first, ..] => {
                    if !self.force_first {
                        summary.num_skipped_multi += 1;
                        continue;
                    }
                    *first
                }
            };

            let name = match token.parse::<usize>() {
                Ok(class) => classes.name_of(class).into_owned(),
                Err(_) => token.to_string(),
            };
            let folder = name.replace(' ', "_");
            samples
                .entry(folder)
                .or_default()
                .push(record.image_file.clone());
            summary.num_usable += 1;
        }

        info!(
            "usable samples: {} (skipped empty: {}, skipped multi: {}, missing images: {})",
            summary.num_usable,
            summary.num_skipped_empty,
            summary.num_skipped_multi,
            summary.num_missing_images
        );

        // split per class and copy
        let mut rng = StdRng::seed_from_u64(self.seed);

        for (folder, mut images) in samples {
            images.shuffle(&mut rng);
            let num_val = (images.len() as f64 * self.val_split.to_f64()).floor() as usize;
            let (val_images, train_images) = images.split_at(num_val);

            for (split, files) in [("train", train_images), ("val", val_images)] {
                if files.is_empty() {
                    continue;
                }

                let dest_dir = self.output_dir.join(split).join(&folder);
                tokio::fs::create_dir_all(&dest_dir)
                    .await
                    .with_context(|| format!("failed to create '{}'", dest_dir.display()))?;

                for file in files {
                    let dest = unique_destination(&dest_dir, file).await?;
                    self.transfer(file, &dest).await?;
                    summary.num_copied += 1;
                }
            }

            debug!(
                "{}: train {}, val {}",
                folder,
                train_images.len(),
                val_images.len()
            );
            summary.classes.insert(
                folder,
                ClassSplit {
                    num_train: train_images.len(),
                    num_val: val_images.len(),
                },
            );
        }

        info!(
            "{} {} files to '{}'",
            if self.move_files { "moved" } else { "copied" },
            summary.num_copied,
            self.output_dir.display()
        );

        Ok(summary)
    }

    async fn transfer(&self, src: &Path, dest: &Path) -> Result<()> {
        if self.move_files {
            // rename fails across file systems
            if tokio::fs::rename(src, dest).await.is_ok() {
                return Ok(());
            }
            tokio::fs::copy(src, dest).await.with_context(|| {
                format!("failed to move '{}' to '{}'", src.display(), dest.display())
            })?;
            tokio::fs::remove_file(src).await?;
        } else {
            tokio::fs::copy(src, dest).await.with_context(|| {
                format!("failed to copy '{}' to '{}'", src.display(), dest.display())
            })?;
        }
        Ok(())
    }
}

/// Pick a destination in `dest_dir` not taken yet, appending `_1`, `_2`, ...
/// to the file stem on collision.
async fn unique_destination(dest_dir: &Path, file: &Path) -> Result<PathBuf> {
    let file_name = file
        .file_name()
        .ok_or_else(|| format_err!("'{}' is not a file path", file.display()))?;
    let stem = file
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();
    let ext = file.extension().map(|ext| ext.to_string_lossy());

    let mut dest = dest_dir.join(file_name);
    let mut index = 1;
    while tokio::fs::metadata(&dest).await.is_ok() {
        let name = match &ext {
            Some(ext) => format!("{}_{}.{}", stem, index, ext),
            None => format!("{}_{}", stem, index),
        };
        dest = dest_dir.join(name);
        index += 1;
    }

    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_bad_val_split() {
        assert!(ClassificationExport::new("out", 1.5).is_err());
        assert!(ClassificationExport::new("out", -0.1).is_err());

        let export = ClassificationExport::new("out", 0.2).unwrap();
        assert_eq!(export.seed, 42);
        assert!(!export.move_files);
        assert!(!export.force_first);
    }

    #[tokio::test]
    async fn unique_destination_appends_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let src = Path::new("train/images/img_001.jpg");

        let dest = unique_destination(dir.path(), src).await.unwrap();
        assert_eq!(dest, dir.path().join("img_001.jpg"));

        std::fs::write(&dest, b"").unwrap();
        std::fs::write(dir.path().join("img_001_1.jpg"), b"").unwrap();
        let dest = unique_destination(dir.path(), src).await.unwrap();
        assert_eq!(dest, dir.path().join("img_001_2.jpg"));
    }
}
