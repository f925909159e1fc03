//! Toolkit configuration format.

use crate::{common::*, dataset::IMAGE_EXTENSIONS};

pub use dataset::*;
pub use sanitize::*;
pub use validation::*;

/// The main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub sanitize: SanitizeConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }

    /// Create a configuration with default options for a dataset directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset: DatasetConfig::new(dir),
            validation: ValidationConfig::default(),
            sanitize: SanitizeConfig::default(),
        }
    }
}

mod dataset {
    use super::*;

    /// Dataset location options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DatasetConfig {
        /// The root directory of the exported dataset.
        pub dir: PathBuf,
        /// Optional `classes.txt` or `data.yaml` overriding the class list.
        #[serde(default)]
        pub classes_file: Option<PathBuf>,
        /// File extensions recognized as images.
        #[serde(default = "default_image_extensions")]
        pub image_extensions: Vec<String>,
        /// If set, read image headers to obtain image sizes.
        #[serde(default)]
        pub probe_images: bool,
    }

    impl DatasetConfig {
        pub fn new(dir: impl Into<PathBuf>) -> Self {
            Self {
                dir: dir.into(),
                classes_file: None,
                image_extensions: default_image_extensions(),
                probe_images: false,
            }
        }
    }

    fn default_image_extensions() -> Vec<String> {
        IMAGE_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
    }
}

mod validation {
    use super::*;

    /// Dataset validation options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ValidationConfig {
        /// The documented number of images. The README count is used if unset.
        pub expected_image_count: Option<usize>,
        /// Accept images without label files.
        pub allow_unlabeled: bool,
        /// Report same-class boxes overlapping at least this IoU in one image.
        pub duplicate_iou: Option<Ratio>,
    }

    impl Default for ValidationConfig {
        fn default() -> Self {
            Self {
                expected_image_count: None,
                allow_unlabeled: true,
                duplicate_iou: Some(Ratio::try_from(0.95).unwrap()),
            }
        }
    }
}

mod sanitize {
    use super::*;

    /// Label sanitizing options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct SanitizeConfig {
        /// The factor that tolerates out-of-image boundary bounding boxes.
        pub out_of_bound_tolerance: R64,
        /// The minimum bounding box size in ratio unit.
        pub min_bbox_size: Ratio,
    }

    impl Default for SanitizeConfig {
        fn default() -> Self {
            Self {
                out_of_bound_tolerance: r64(0.01),
                min_bbox_size: Ratio::zero(),
            }
        }
    }
}
