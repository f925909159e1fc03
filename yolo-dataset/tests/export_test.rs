use anyhow::Result;
use bbox::Ratio;
use noisy_float::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};
use yolo_dataset::{
    classify::{ClassSplit, ClassificationExport},
    config::DatasetConfig,
    dataset::{DatasetLayout, SanitizedDataset, YoloDataset},
};

lazy_static::lazy_static! {
    static ref DATASET_DIR: PathBuf = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fish_dataset");
}

fn count_files(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[tokio::test]
async fn sanitize_and_export_labels() -> Result<()> {
    let dataset = YoloDataset::load(&DatasetConfig::new(&*DATASET_DIR)).await?;
    let sanitized = SanitizedDataset::new(dataset, r64(0.01), Ratio::zero())?;

    let dir = tempfile::tempdir()?;
    let count = sanitized.export_labels(dir.path()).await?;
    assert_eq!(count, 5);

    let out = dir.path();
    assert_eq!(
        fs::read_to_string(out.join("train/labels/img_001.txt"))?,
        "0 0.512000 0.334000 0.120000 0.080000\n"
    );
    assert_eq!(fs::read_to_string(out.join("train/labels/img_003.txt"))?, "");
    assert!(out.join("valid/labels/img_004.txt").is_file());
    assert!(!out.join("test/labels/img_006.txt").exists());
    assert_eq!(
        fs::read_to_string(out.join("classes.txt"))?,
        "acanthaluteres vittiger\nabudefduf vaigiensis\n"
    );

    // the source dataset is untouched
    assert!(!DATASET_DIR.join("classes.txt").exists());
    Ok(())
}

#[tokio::test]
async fn export_classification_dataset() -> Result<()> {
    let scan = YoloDataset::scan(&DatasetConfig::new(&*DATASET_DIR)).await?;
    let dir = tempfile::tempdir()?;
    let out = dir.path();

    let export = ClassificationExport::new(out, 0.5)?;
    let summary = export.run(&scan).await?;

    assert_eq!(summary.num_usable, 3);
    assert_eq!(summary.num_skipped_empty, 1);
    assert_eq!(summary.num_skipped_multi, 1);
    assert_eq!(summary.num_missing_images, 0);
    assert_eq!(summary.num_copied, 3);
    assert_eq!(
        summary.classes["acanthaluteres_vittiger"],
        ClassSplit {
            num_train: 1,
            num_val: 1
        }
    );
    assert_eq!(
        summary.classes["abudefduf_vaigiensis"],
        ClassSplit {
            num_train: 1,
            num_val: 0
        }
    );

    assert_eq!(count_files(&out.join("train/acanthaluteres_vittiger")), 1);
    assert_eq!(count_files(&out.join("val/acanthaluteres_vittiger")), 1);
    assert_eq!(count_files(&out.join("train/abudefduf_vaigiensis")), 1);
    assert!(!out.join("val/abudefduf_vaigiensis").exists());

    // source images are copied, not moved
    assert!(DATASET_DIR.join("train/images/img_001.jpg").is_file());
    Ok(())
}

#[tokio::test]
async fn export_classification_force_first() -> Result<()> {
    let scan = YoloDataset::scan(&DatasetConfig::new(&*DATASET_DIR)).await?;
    let dir = tempfile::tempdir()?;

    let export = ClassificationExport {
        force_first: true,
        ..ClassificationExport::new(dir.path(), 0.0)?
    };
    let summary = export.run(&scan).await?;

    assert_eq!(summary.num_usable, 4);
    assert_eq!(summary.num_skipped_multi, 0);
    assert_eq!(summary.classes["acanthaluteres_vittiger"].num_train, 3);
    assert_eq!(summary.classes["acanthaluteres_vittiger"].num_val, 0);

    // exporting again into the same directory renames on collision
    let summary = export.run(&scan).await?;
    assert_eq!(summary.num_copied, 4);
    let dest_dir = dir.path().join("train/acanthaluteres_vittiger");
    assert_eq!(count_files(&dest_dir), 6);
    assert!(dest_dir.join("img_001_1.jpg").is_file());
    Ok(())
}

#[tokio::test]
async fn export_classification_move_files() -> Result<()> {
    // work on a copy of the labeled valid split
    let src = tempfile::tempdir()?;
    let images_dir = src.path().join("images");
    let labels_dir = src.path().join("labels");
    fs::create_dir_all(&images_dir)?;
    fs::create_dir_all(&labels_dir)?;
    fs::copy(
        DATASET_DIR.join("valid/images/img_004.jpg"),
        images_dir.join("img_004.jpg"),
    )?;
    fs::copy(
        DATASET_DIR.join("valid/labels/img_004.txt"),
        labels_dir.join("img_004.txt"),
    )?;
    fs::write(labels_dir.join("img_404.txt"), "0 0.5 0.5 0.1 0.1\n")?;

    let layout = DatasetLayout::from_dirs(&images_dir, &labels_dir)?;
    let config = DatasetConfig {
        classes_file: Some(DATASET_DIR.join("data.yaml")),
        ..DatasetConfig::new(src.path())
    };
    let scan = YoloDataset::scan_layout(layout, &config).await?;

    let out = tempfile::tempdir()?;
    let export = ClassificationExport {
        move_files: true,
        ..ClassificationExport::new(out.path(), 0.2)?
    };
    let summary = export.run(&scan).await?;

    assert_eq!(summary.num_copied, 1);
    assert_eq!(summary.num_missing_images, 1);
    assert!(!images_dir.join("img_004.jpg").exists());
    assert!(out
        .path()
        .join("train/abudefduf_vaigiensis/img_004.jpg")
        .is_file());
    Ok(())
}

#[tokio::test]
async fn export_classification_keeps_malformed_labels() -> Result<()> {
    let src = tempfile::tempdir()?;
    let images_dir = src.path().join("images");
    let labels_dir = src.path().join("labels");
    fs::create_dir_all(&images_dir)?;
    fs::create_dir_all(&labels_dir)?;
    fs::write(images_dir.join("a.jpg"), b"")?;
    fs::write(images_dir.join("b.jpg"), b"")?;
    fs::write(labels_dir.join("a.txt"), "0 0.5 0.5 0.1 0.1 0.2 0.2\n")?;
    fs::write(labels_dir.join("b.txt"), "0 1.2 0.3 0.1 0.1\n")?;

    let layout = DatasetLayout::from_dirs(&images_dir, &labels_dir)?;
    let config = DatasetConfig {
        classes_file: Some(DATASET_DIR.join("data.yaml")),
        ..DatasetConfig::new(src.path())
    };
    let scan = YoloDataset::scan_layout(layout, &config).await?;
    assert_eq!(scan.issues.iter().filter(|issue| issue.is_error()).count(), 2);

    let out = tempfile::tempdir()?;
    let summary = ClassificationExport::new(out.path(), 0.2)?
        .run(&scan)
        .await?;

    assert_eq!(summary.num_usable, 2);
    assert_eq!(summary.num_skipped_empty, 0);
    assert_eq!(summary.num_copied, 2);
    assert_eq!(
        count_files(&out.path().join("train/acanthaluteres_vittiger")),
        2
    );
    Ok(())
}
