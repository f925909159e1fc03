//! Dataset format checks.

use crate::{
    common::*,
    config::ValidationConfig,
    dataset::{FileDataset, FileRecord, Scan, SplitKind},
    stats::DatasetStats,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// The kind of a problem found in a dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum IssueKind {
    /// An image has no label file.
    MissingLabel,
    /// A label file has no image.
    OrphanLabel,
    /// Two images share a stem in one split, for example `a.jpg` and `a.png`.
    DuplicateStem { other: PathBuf },
    /// Two images in different folders of one split share a file name.
    DuplicateFileName { other: PathBuf },
    UnreadableLabel(String),
    MalformedLabel(String),
    UnreadableImage(String),
    ClassOutOfRange { class: usize, num_classes: usize },
    /// The box fields are valid but the box reaches out of the image.
    BoxExceedsImage,
    /// The box has zero width or height.
    DegenerateBox,
    /// The box almost coincides with an earlier box of the same class.
    DuplicateBox { iou: R64 },
    ImageCountMismatch { expected: usize, found: usize },
    EmptySplit(SplitKind),
    /// `nc` in `data.yaml` disagrees with the listed names.
    NameCountMismatch(String),
}

impl Display for IssueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingLabel => write!(f, "image has no label file"),
            Self::OrphanLabel => write!(f, "label file has no matching image"),
            Self::DuplicateStem { other } => {
                write!(f, "image shares its name with '{}'", other.display())
            }
            Self::DuplicateFileName { other } => {
                write!(f, "file name is also used by '{}'", other.display())
            }
            Self::UnreadableLabel(msg) => write!(f, "unable to read label file: {}", msg),
            Self::MalformedLabel(msg) => write!(f, "malformed label: {}", msg),
            Self::UnreadableImage(msg) => write!(f, "unable to read image: {}", msg),
            Self::ClassOutOfRange { class, num_classes } => write!(
                f,
                "class index {} is out of range, expect less than {}",
                class, num_classes
            ),
            Self::BoxExceedsImage => write!(f, "box extends beyond the image"),
            Self::DegenerateBox => write!(f, "box has zero width or height"),
            Self::DuplicateBox { iou } => {
                write!(f, "box duplicates another box with IoU {:.3}", iou)
            }
            Self::ImageCountMismatch { expected, found } => write!(
                f,
                "expect {} images, but found {}",
                expected, found
            ),
            Self::EmptySplit(split) => write!(f, "{} split has no images", split),
            Self::NameCountMismatch(msg) => write!(f, "{}", msg),
        }
    }
}

/// A problem found in a dataset, with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub path: Option<PathBuf>,
    /// The 1-based line number in the label file.
    pub line: Option<usize>,
}

impl Issue {
    pub fn error(kind: IssueKind) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            path: None,
            line: None,
        }
    }

    pub fn warning(kind: IssueKind) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            path: None,
            line: None,
        }
    }

    pub fn with_path(self, path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..self
        }
    }

    pub fn with_line(self, line: usize) -> Self {
        Self {
            line: Some(line),
            ..self
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Display for Issue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.severity)?;
        match (&self.path, self.line) {
            (Some(path), Some(line)) => write!(f, "{}:{}: ", path.display(), line)?,
            (Some(path), None) => write!(f, "{}: ", path.display())?,
            _ => {}
        }
        write!(f, "{}", self.kind)
    }
}

/// The outcome of [validate].
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
    pub stats: DatasetStats,
}

impl ValidationReport {
    /// True if no error-severity issue was found.
    pub fn is_ok(&self) -> bool {
        self.num_errors() == 0
    }

    pub fn num_errors(&self) -> usize {
        self.issues.iter().filter(|issue| issue.is_error()).count()
    }

    pub fn num_warnings(&self) -> usize {
        self.issues.len() - self.num_errors()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|issue| issue.is_error())
    }
}

/// Run the dataset-wide checks on a scanned dataset.
///
/// The issues collected while scanning come first in the report.
pub fn validate(scan: &Scan, config: &ValidationConfig) -> ValidationReport {
    let dataset = &scan.dataset;
    let records = dataset.records();
    let num_classes = dataset.classes.len();
    let stats = DatasetStats::from_records(records);

    let mut issues = scan.issues.clone();

    // per-image checks
    for record in records {
        if !record.is_labeled() {
            let kind = IssueKind::MissingLabel;
            let issue = if config.allow_unlabeled {
                Issue::warning(kind)
            } else {
                Issue::error(kind)
            };
            issues.push(issue.with_path(&record.image_file));
            continue;
        }
        check_boxes(record, num_classes, config, &mut issues);
    }

    // duplicated file names in one split
    records
        .iter()
        .filter_map(|record| Some(((&record.split, record.image_file.file_name()?), record)))
        .into_group_map()
        .into_iter()
        .filter(|(_, group)| group.len() > 1)
        .sorted_by(|(_, lhs), (_, rhs)| lhs[0].image_file.cmp(&rhs[0].image_file))
        .for_each(|(_, group)| {
            let first = &group[0].image_file;
            group[1..].iter().for_each(|record| {
                issues.push(
                    Issue::error(IssueKind::DuplicateFileName {
                        other: first.clone(),
                    })
                    .with_path(&record.image_file),
                );
            });
        });

    // empty splits
    dataset
        .layout
        .splits
        .iter()
        .filter(|split| {
            stats
                .splits
                .get(&split.kind)
                .map_or(true, |stats| stats.num_images == 0)
        })
        .for_each(|split| {
            issues.push(
                Issue::warning(IssueKind::EmptySplit(split.kind.clone()))
                    .with_path(&split.images_dir),
            );
        });

    // documented image count
    let expected = config.expected_image_count.or_else(|| {
        dataset
            .provenance
            .as_ref()
            .and_then(|provenance| provenance.image_count)
    });
    if let Some(expected) = expected {
        let found = stats.num_images();
        if expected != found {
            issues.push(Issue::error(IssueKind::ImageCountMismatch { expected, found }));
        }
    }

    let report = ValidationReport { issues, stats };
    info!(
        "validation found {} errors and {} warnings",
        report.num_errors(),
        report.num_warnings()
    );
    report
}

fn check_boxes(
    record: &FileRecord,
    num_classes: usize,
    config: &ValidationConfig,
    issues: &mut Vec<Issue>,
) {
    let label_file = match &record.label_file {
        Some(path) => path,
        None => return,
    };
    let located = |kind: IssueKind, line: usize, severity: Severity| Issue {
        severity,
        kind,
        path: Some(label_file.clone()),
        line: Some(line),
    };

    for (line, bbox) in record.numbered_bboxes() {
        if bbox.class >= num_classes {
            issues.push(located(
                IssueKind::ClassOutOfRange {
                    class: bbox.class,
                    num_classes,
                },
                line,
                Severity::Error,
            ));
        }
        if !bbox.rect.is_within_unit() {
            issues.push(located(IssueKind::BoxExceedsImage, line, Severity::Warning));
        }
        if bbox.rect.h() <= 0.0 || bbox.rect.w() <= 0.0 {
            issues.push(located(IssueKind::DegenerateBox, line, Severity::Warning));
        }
    }

    if let Some(min_iou) = config.duplicate_iou {
        let min_iou = min_iou.to_r64();
        let bboxes: Vec<_> = record
            .numbered_bboxes()
            .filter(|(_, bbox)| bbox.rect.h() > 0.0 && bbox.rect.w() > 0.0)
            .collect();

        for (index, (line, bbox)) in bboxes.iter().enumerate() {
            let duplicate = bboxes[..index]
                .iter()
                .filter(|(_, prev)| prev.class == bbox.class)
                .map(|(_, prev)| prev.rect.iou_with(&bbox.rect, r64(0.0)))
                .find(|&iou| iou >= min_iou);

            if let Some(iou) = duplicate {
                issues.push(located(
                    IssueKind::DuplicateBox { iou },
                    *line,
                    Severity::Warning,
                ));
            }
        }
    }
}
