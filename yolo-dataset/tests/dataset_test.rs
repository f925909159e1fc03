use anyhow::Result;
use approx::assert_abs_diff_eq;
use std::{
    fs,
    path::{Path, PathBuf},
};
use yolo_dataset::{
    config::{Config, DatasetConfig, ValidationConfig},
    dataset::{DatasetLayout, FileDataset, GenericDataset, SplitKind, YoloDataset},
    validation::{validate, IssueKind, Severity},
};

lazy_static::lazy_static! {
    static ref DATASET_DIR: PathBuf = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fish_dataset");
}

#[tokio::test]
async fn scan_fish_dataset() -> Result<()> {
    let scan = YoloDataset::scan(&DatasetConfig::new(&*DATASET_DIR)).await?;
    assert!(scan.issues.is_empty(), "{:?}", scan.issues);

    let dataset = &scan.dataset;
    let kinds: Vec<_> = dataset.layout.splits.iter().map(|split| &split.kind).collect();
    assert_eq!(kinds, [&SplitKind::Train, &SplitKind::Valid, &SplitKind::Test]);
    assert_eq!(dataset.records().len(), 6);

    let classes = dataset.classes();
    assert_eq!(classes.len(), 2);
    assert_eq!(classes.name_of(1), "abudefduf vaigiensis");

    let provenance = dataset.provenance.as_ref().unwrap();
    assert_eq!(provenance.image_count, Some(6));
    assert_eq!(provenance.platform.as_deref(), Some("roboflow.com"));

    // img_001.jpg pairs with img_001.txt holding one box
    let record = dataset
        .records()
        .iter()
        .find(|record| record.key == Path::new("img_001"))
        .unwrap();
    assert_eq!(record.split, SplitKind::Train);
    assert_eq!(
        record.label_file.as_deref(),
        Some(DATASET_DIR.join("train/labels/img_001.txt").as_path())
    );
    assert_eq!(record.bboxes.len(), 1);
    assert_eq!(record.bboxes[0].class, 0);
    let [cx, cy, w, h] = record.bboxes[0].cxcywh();
    assert_abs_diff_eq!(cx, 0.512, epsilon = 1e-9);
    assert_abs_diff_eq!(cy, 0.334, epsilon = 1e-9);
    assert_abs_diff_eq!(w, 0.120, epsilon = 1e-9);
    assert_abs_diff_eq!(h, 0.080, epsilon = 1e-9);

    let unlabeled: Vec<_> = dataset
        .records()
        .iter()
        .filter(|record| !record.is_labeled())
        .map(|record| record.key.clone())
        .collect();
    assert_eq!(unlabeled, [PathBuf::from("img_006")]);

    Ok(())
}

#[tokio::test]
async fn validate_fish_dataset() -> Result<()> {
    let scan = YoloDataset::scan(&DatasetConfig::new(&*DATASET_DIR)).await?;

    let report = validate(&scan, &ValidationConfig::default());
    assert!(report.is_ok(), "{:?}", report.issues);
    assert_eq!(report.num_warnings(), 1);
    assert_eq!(report.issues[0].kind, IssueKind::MissingLabel);
    assert_eq!(
        report.issues[0].path,
        Some(DATASET_DIR.join("test/images/img_006.jpg"))
    );

    let train = &report.stats.splits[&SplitKind::Train];
    assert_eq!(train.num_images, 3);
    assert_eq!(train.num_empty_labels, 1);
    assert_eq!(train.num_boxes, 3);

    let total = report.stats.total();
    assert_eq!(total.num_images, 6);
    assert_eq!(total.num_unlabeled, 1);
    assert_eq!(total.class_counts[&0], 3);
    assert_eq!(total.class_counts[&1], 2);

    // unannotated images are rejected on demand
    let config = ValidationConfig {
        allow_unlabeled: false,
        ..Default::default()
    };
    let report = validate(&scan, &config);
    assert_eq!(report.num_errors(), 1);

    // the configured count overrides the README
    let config = ValidationConfig {
        expected_image_count: Some(10563),
        ..Default::default()
    };
    let report = validate(&scan, &config);
    assert!(!report.is_ok());
    assert!(report.errors().any(|issue| issue.kind
        == IssueKind::ImageCountMismatch {
            expected: 10563,
            found: 6
        }));

    Ok(())
}

#[tokio::test]
async fn load_from_config_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config_file = dir.path().join("toolkit.json5");
    fs::write(
        &config_file,
        format!(
            "{{ dataset: {{ dir: {:?} }}, validation: {{ allow_unlabeled: true }} }}",
            DATASET_DIR.display().to_string()
        ),
    )?;

    let config = Config::open(&config_file)?;
    let dataset = YoloDataset::load(&config.dataset).await?;
    assert_eq!(dataset.records().len(), 6);
    Ok(())
}

#[tokio::test]
async fn probe_unreadable_images() -> Result<()> {
    let config = DatasetConfig {
        probe_images: true,
        ..DatasetConfig::new(&*DATASET_DIR)
    };
    let scan = YoloDataset::scan(&config).await?;

    // the fixture images are empty files
    assert_eq!(scan.issues.len(), 6);
    assert!(scan
        .issues
        .iter()
        .all(|issue| matches!(issue.kind, IssueKind::UnreadableImage(_))));
    assert!(YoloDataset::load(&config).await.is_err());
    Ok(())
}

#[tokio::test]
async fn validate_broken_dataset() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    let images_dir = root.join("images");
    let labels_dir = root.join("labels");
    fs::create_dir_all(images_dir.join("sub"))?;
    fs::create_dir_all(&labels_dir)?;
    fs::write(root.join("classes.txt"), "fish\n")?;

    for name in ["a.jpg", "b.jpg", "c.jpg", "d.jpg", "d.png", "sub/a.jpg"] {
        fs::write(images_dir.join(name), b"")?;
    }
    let labels = [
        ("a.txt", "1 0.5 0.5 0.2 0.2\n"),
        ("b.txt", "0 0.5 0.5 0.2 0.2\n0 0.5 0.5 0.2 0.2\n"),
        ("c.txt", "0 0.95 0.5 0.2 0.2\n"),
        ("orphan.txt", "0 0.5 0.5 0.2 0.2\n"),
    ];
    for (name, text) in labels {
        fs::write(labels_dir.join(name), text)?;
    }

    let scan = YoloDataset::scan(&DatasetConfig::new(root)).await?;
    assert_eq!(scan.dataset.layout.splits[0].kind, SplitKind::All);
    let report = validate(&scan, &ValidationConfig::default());

    let find = |expect: &dyn Fn(&IssueKind) -> bool| {
        report
            .issues
            .iter()
            .find(|issue| expect(&issue.kind))
            .cloned()
            .unwrap_or_else(|| panic!("issue not found in {:?}", report.issues))
    };

    let issue = find(&|kind| {
        matches!(
            kind,
            IssueKind::ClassOutOfRange {
                class: 1,
                num_classes: 1
            }
        )
    });
    assert_eq!(issue.severity, Severity::Error);
    assert_eq!(issue.path, Some(labels_dir.join("a.txt")));
    assert_eq!(issue.line, Some(1));

    let issue = find(&|kind| matches!(kind, IssueKind::DuplicateBox { .. }));
    assert_eq!(issue.severity, Severity::Warning);
    assert_eq!(issue.line, Some(2));

    let issue = find(&|kind| matches!(kind, IssueKind::BoxExceedsImage));
    assert_eq!(issue.path, Some(labels_dir.join("c.txt")));

    let issue = find(&|kind| matches!(kind, IssueKind::DuplicateStem { .. }));
    assert_eq!(issue.severity, Severity::Error);
    assert_eq!(issue.path, Some(images_dir.join("d.png")));

    let issue = find(&|kind| matches!(kind, IssueKind::DuplicateFileName { .. }));
    assert_eq!(issue.path, Some(images_dir.join("sub/a.jpg")));

    let issue = find(&|kind| matches!(kind, IssueKind::OrphanLabel));
    assert_eq!(issue.path, Some(labels_dir.join("orphan.txt")));

    assert_eq!(report.num_errors(), 3);
    assert_eq!(
        report
            .issues
            .iter()
            .filter(|issue| issue.kind == IssueKind::MissingLabel)
            .count(),
        2
    );
    Ok(())
}

#[tokio::test]
async fn scan_explicit_dirs() -> Result<()> {
    let layout = DatasetLayout::from_dirs(
        DATASET_DIR.join("train/images"),
        DATASET_DIR.join("train/labels"),
    )?;
    let config = DatasetConfig {
        classes_file: Some(DATASET_DIR.join("data.yaml")),
        ..DatasetConfig::new(&*DATASET_DIR)
    };
    let scan = YoloDataset::scan_layout(layout, &config).await?;
    assert_eq!(scan.dataset.records().len(), 3);
    assert_eq!(scan.dataset.classes().len(), 2);
    Ok(())
}

#[tokio::test]
async fn validate_degenerate_and_unreadable() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    fs::create_dir_all(root.join("train/images"))?;
    fs::create_dir_all(root.join("train/labels"))?;
    fs::create_dir_all(root.join("valid/images"))?;
    fs::write(root.join("classes.txt"), "fish\n")?;

    fs::write(root.join("train/images/a.jpg"), b"")?;
    fs::write(root.join("train/images/b.jpg"), b"")?;
    fs::write(root.join("train/labels/a.txt"), "0 0.5 0.5 0.0 0.2\n")?;
    fs::write(root.join("train/labels/b.txt"), b"\xff\xfe0 0.5 0.5 0.1 0.1\n")?;

    let scan = YoloDataset::scan(&DatasetConfig::new(root)).await?;
    let report = validate(&scan, &ValidationConfig::default());

    let issue = report
        .issues
        .iter()
        .find(|issue| issue.kind == IssueKind::DegenerateBox)
        .unwrap();
    assert_eq!(issue.severity, Severity::Warning);
    assert_eq!(issue.path, Some(root.join("train/labels/a.txt")));
    assert_eq!(issue.line, Some(1));

    let issue = report
        .issues
        .iter()
        .find(|issue| matches!(issue.kind, IssueKind::UnreadableLabel(_)))
        .unwrap();
    assert_eq!(issue.severity, Severity::Error);
    assert_eq!(issue.path, Some(root.join("train/labels/b.txt")));

    let issue = report
        .issues
        .iter()
        .find(|issue| issue.kind == IssueKind::EmptySplit(SplitKind::Valid))
        .unwrap();
    assert_eq!(issue.severity, Severity::Warning);
    assert_eq!(issue.path, Some(root.join("valid/images")));

    assert_eq!(report.num_errors(), 1);
    Ok(())
}

#[tokio::test]
async fn scan_reports_name_count_mismatch() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    fs::create_dir_all(root.join("train/images"))?;
    fs::create_dir_all(root.join("train/labels"))?;
    fs::write(root.join("data.yaml"), "nc: 3\nnames: [fish, shark]\n")?;
    fs::write(root.join("train/images/a.jpg"), b"")?;
    fs::write(root.join("train/labels/a.txt"), "1 0.5 0.5 0.1 0.1\n")?;

    let scan = YoloDataset::scan(&DatasetConfig::new(root)).await?;
    assert_eq!(scan.issues.len(), 1);
    let issue = &scan.issues[0];
    assert_eq!(issue.severity, Severity::Error);
    assert!(matches!(issue.kind, IssueKind::NameCountMismatch(_)));
    assert_eq!(issue.path, Some(root.join("data.yaml")));

    // the listed names are still used
    assert_eq!(scan.dataset.classes().len(), 2);
    assert!(YoloDataset::load(&DatasetConfig::new(root)).await.is_err());
    Ok(())
}

#[tokio::test]
async fn scan_numeric_class_names() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    fs::create_dir_all(root.join("images"))?;
    fs::create_dir_all(root.join("labels"))?;
    fs::write(root.join("data.yaml"), "nc: 2\nnames: [0, 1]\n")?;
    fs::write(root.join("images/a.jpg"), b"")?;
    fs::write(root.join("labels/a.txt"), "\u{feff}1 0.5 0.5 0.1 0.1\n")?;

    let scan = YoloDataset::scan(&DatasetConfig::new(root)).await?;
    assert!(scan.issues.is_empty(), "{:?}", scan.issues);
    assert_eq!(scan.dataset.classes().name_of(1), "1");
    assert_eq!(scan.dataset.records()[0].bboxes[0].class, 1);
    Ok(())
}
