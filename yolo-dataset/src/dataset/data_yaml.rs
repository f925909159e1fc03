use super::{SplitDirs, SplitKind};
use crate::common::*;
use serde::{de::Error as _, Deserializer};
use serde_yaml::Value;

/// The `data.yaml` file written along a YOLO dataset export.
#[derive(Debug, Clone, Deserialize)]
pub struct DataYaml {
    /// Optional dataset root that split paths are relative to.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub train: Option<SplitEntry>,
    #[serde(default)]
    pub val: Option<SplitEntry>,
    #[serde(default)]
    pub test: Option<SplitEntry>,
    /// The number of classes.
    #[serde(default)]
    pub nc: Option<usize>,
    #[serde(default)]
    pub names: Option<DataYamlNames>,
    /// Project information added by the Roboflow exporter.
    #[serde(default)]
    pub roboflow: Option<RoboflowInfo>,
}

/// One or several image directories of a split.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SplitEntry {
    One(PathBuf),
    Many(Vec<PathBuf>),
}

impl SplitEntry {
    pub fn paths(&self) -> &[PathBuf] {
        match self {
            Self::One(path) => std::slice::from_ref(path),
            Self::Many(paths) => paths,
        }
    }
}

/// Class names listed either in index order or by index.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DataYamlNames {
    Sequence(Vec<ClassName>),
    Mapping(BTreeMap<usize, ClassName>),
}

/// A class name in `data.yaml`. Unquoted numbers and booleans are taken
/// as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassName(pub String);

impl<'de> Deserialize<'de> for ClassName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = match Value::deserialize(deserializer)? {
            Value::String(name) => name,
            Value::Number(number) => number.to_string(),
            Value::Bool(value) => value.to_string(),
            value => {
                return Err(D::Error::custom(format!(
                    "invalid class name {:?}, expect a string",
                    value
                )))
            }
        };
        Ok(Self(name))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoboflowInfo {
    pub workspace: Option<String>,
    pub project: Option<String>,
    pub version: Option<u64>,
    pub license: Option<String>,
    pub url: Option<String>,
}

impl DataYaml {
    pub fn from_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        Self::from_str(&text).with_context(|| format!("failed to parse '{}'", path.display()))
    }

    /// The number of listed class names.
    pub fn num_names(&self) -> Option<usize> {
        match &self.names {
            Some(DataYamlNames::Sequence(names)) => Some(names.len()),
            Some(DataYamlNames::Mapping(names)) => {
                Some(names.keys().next_back().map_or(0, |&max| max + 1))
            }
            None => None,
        }
    }

    /// Get the class list, or `None` if no names are listed.
    pub fn class_list(&self) -> Result<Option<ClassList>> {
        self.check_class_count()?;
        self.listed_classes()
    }

    /// Get the listed class names without checking `nc`.
    pub fn listed_classes(&self) -> Result<Option<ClassList>> {
        let classes = match &self.names {
            Some(DataYamlNames::Sequence(names)) => {
                ClassList::from_names(names.iter().map(|name| name.0.clone()))?
            }
            Some(DataYamlNames::Mapping(names)) => {
                let names: BTreeMap<_, _> = names
                    .iter()
                    .map(|(&index, name)| (index, name.0.clone()))
                    .collect();
                ClassList::from_index_map(&names)?
            }
            None => return Ok(None),
        };
        Ok(Some(classes))
    }

    /// Check that `nc` agrees with the listed names if both are given.
    pub fn check_class_count(&self) -> Result<()> {
        if let (Some(nc), Some(num_names)) = (self.nc, self.num_names()) {
            ensure!(
                nc == num_names,
                "nc is {}, but {} class names are listed",
                nc,
                num_names
            );
        }
        Ok(())
    }

    /// Resolve the split directories that exist on disk.
    ///
    /// `yaml_file` is the location of this `data.yaml`. Unresolvable entries
    /// are skipped with a warning.
    pub fn split_dirs(&self, yaml_file: &Path) -> Vec<SplitDirs> {
        let yaml_dir = yaml_file.parent().unwrap_or_else(|| Path::new(""));
        let base_dir = match &self.path {
            Some(path) => yaml_dir.join(path),
            None => yaml_dir.to_owned(),
        };

        let entries = [
            (SplitKind::Train, &self.train),
            (SplitKind::Valid, &self.val),
            (SplitKind::Test, &self.test),
        ];

        entries
            .into_iter()
            .filter_map(|(kind, entry)| Some((kind, entry.as_ref()?)))
            .flat_map(|(kind, entry)| {
                entry
                    .paths()
                    .iter()
                    .map(move |path| (kind.clone(), path))
            })
            .filter_map(|(kind, path)| match resolve_split_path(&base_dir, path) {
                Some(images_dir) => Some(SplitDirs::new(kind, images_dir)),
                None => {
                    warn!(
                        "{} split directory '{}' listed in '{}' does not exist",
                        kind,
                        path.display(),
                        yaml_file.display()
                    );
                    None
                }
            })
            .collect()
    }
}

/// Resolve a split path against the dataset base directory.
///
/// Exporters often write paths like `../train/images` that are relative to
/// a sibling directory of the dataset. If the literal path does not exist,
/// the leading `..` and `.` components are dropped.
pub fn resolve_split_path(base_dir: &Path, path: &Path) -> Option<PathBuf> {
    let literal = base_dir.join(path);
    if literal.is_dir() {
        return Some(literal);
    }

    let stripped: PathBuf = path
        .components()
        .skip_while(|component| matches!(component, Component::ParentDir | Component::CurDir))
        .collect();
    let candidate = base_dir.join(stripped);
    candidate.is_dir().then(|| candidate)
}
