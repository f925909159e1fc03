use super::DataYaml;
use crate::{common::*, provenance::README_FILE_NAMES};

/// Split directory names probed when no `data.yaml` is present.
pub const SPLIT_DIR_NAMES: &[&str] = &["train", "valid", "val", "test"];

const IMAGES_DIR_NAME: &str = "images";
const LABELS_DIR_NAME: &str = "labels";

/// A named partition of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SplitKind {
    Train,
    Valid,
    Test,
    /// The whole dataset when it is not partitioned.
    All,
    Other(String),
}

impl SplitKind {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "train" => Self::Train,
            "valid" | "val" | "validation" => Self::Valid,
            "test" => Self::Test,
            "all" => Self::All,
            _ => Self::Other(name.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Train => "train",
            Self::Valid => "valid",
            Self::Test => "test",
            Self::All => "all",
            Self::Other(name) => name,
        }
    }
}

impl Display for SplitKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The image and label directories of a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitDirs {
    pub kind: SplitKind,
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
}

impl SplitDirs {
    pub fn new(kind: SplitKind, images_dir: PathBuf) -> Self {
        let labels_dir = labels_dir_for(&images_dir);
        Self {
            kind,
            images_dir,
            labels_dir,
        }
    }
}

/// The on-disk layout of an exported dataset.
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    pub root: PathBuf,
    pub splits: Vec<SplitDirs>,
    pub data_yaml: Option<PathBuf>,
    pub classes_file: Option<PathBuf>,
    /// The export README describing the dataset provenance.
    pub readme: Option<PathBuf>,
}

impl DatasetLayout {
    /// Discover the layout under a dataset root directory.
    ///
    /// The split directories listed in `data.yaml` take precedence. Without
    /// them, `<split>/images`, `images/<split>` and a flat `images`
    /// directory are probed in order.
    pub fn discover<P>(root: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let root = root.as_ref();
        ensure!(
            root.is_dir(),
            "dataset directory '{}' does not exist",
            root.display()
        );

        let data_yaml = ["data.yaml", "data.yml"]
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.is_file());
        let classes_file = Some(root.join("classes.txt")).filter(|path| path.is_file());
        let readme = README_FILE_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.is_file());

        let mut splits = match &data_yaml {
            Some(path) => DataYaml::load(path)?.split_dirs(path),
            None => vec![],
        };
        if splits.is_empty() {
            splits = probe_split_dirs(root);
        }
        ensure!(
            !splits.is_empty(),
            "no image directories found in '{}'",
            root.display()
        );

        Ok(Self {
            root: root.to_owned(),
            splits,
            data_yaml,
            classes_file,
            readme,
        })
    }

    /// Build a single-split layout from explicit image and label directories.
    pub fn from_dirs<P1, P2>(images_dir: P1, labels_dir: P2) -> Result<Self>
    where
        P1: AsRef<Path>,
        P2: AsRef<Path>,
    {
        let images_dir = images_dir.as_ref();
        let labels_dir = labels_dir.as_ref();
        ensure!(
            images_dir.is_dir(),
            "image directory '{}' does not exist",
            images_dir.display()
        );
        ensure!(
            labels_dir.is_dir(),
            "label directory '{}' does not exist",
            labels_dir.display()
        );

        let root = images_dir.parent().unwrap_or(images_dir).to_owned();

        Ok(Self {
            root,
            splits: vec![SplitDirs {
                kind: SplitKind::All,
                images_dir: images_dir.to_owned(),
                labels_dir: labels_dir.to_owned(),
            }],
            data_yaml: None,
            classes_file: None,
            readme: None,
        })
    }
}

/// Locate the label directory of an image directory.
///
/// The last `images` path component is replaced by `labels`. Without such a
/// component, labels are expected next to the images.
pub fn labels_dir_for(images_dir: &Path) -> PathBuf {
    let components: Vec<_> = images_dir.components().collect();
    let position = components
        .iter()
        .rposition(|component| component.as_os_str() == IMAGES_DIR_NAME);

    match position {
        Some(position) => components
            .iter()
            .enumerate()
            .map(|(index, component)| {
                if index == position {
                    Path::new(LABELS_DIR_NAME)
                } else {
                    Path::new(component.as_os_str())
                }
            })
            .collect(),
        None => images_dir.to_owned(),
    }
}

fn probe_split_dirs(root: &Path) -> Vec<SplitDirs> {
    // <root>/<split>/images
    let splits: Vec<_> = SPLIT_DIR_NAMES
        .iter()
        .map(|name| (name, root.join(name).join(IMAGES_DIR_NAME)))
        .filter(|(_, images_dir)| images_dir.is_dir())
        .map(|(name, images_dir)| SplitDirs {
            kind: SplitKind::from_name(name),
            images_dir,
            labels_dir: root.join(name).join(LABELS_DIR_NAME),
        })
        .collect();
    if !splits.is_empty() {
        return splits;
    }

    // <root>/images/<split>
    let splits: Vec<_> = SPLIT_DIR_NAMES
        .iter()
        .map(|name| (name, root.join(IMAGES_DIR_NAME).join(name)))
        .filter(|(_, images_dir)| images_dir.is_dir())
        .map(|(name, images_dir)| SplitDirs {
            kind: SplitKind::from_name(name),
            images_dir,
            labels_dir: root.join(LABELS_DIR_NAME).join(name),
        })
        .collect();
    if !splits.is_empty() {
        return splits;
    }

    // <root>/images
    let images_dir = root.join(IMAGES_DIR_NAME);
    if images_dir.is_dir() {
        vec![SplitDirs {
            kind: SplitKind::All,
            images_dir,
            labels_dir: root.join(LABELS_DIR_NAME),
        }]
    } else {
        vec![]
    }
}
