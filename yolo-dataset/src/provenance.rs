//! Export metadata from the README written by the annotation platform.

use crate::common::*;

/// README file names probed in order.
pub const README_FILE_NAMES: &[&str] = &["README.dataset.txt", "README.roboflow.txt", "README.txt"];

static EXPORT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)exported via (\S+?)\.? on (.+?)\s*$").unwrap());
static IMAGE_COUNT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)includes ([\d,]+) images").unwrap());
static FORMAT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)annotated in (.+?) format").unwrap());

/// What the export README tells about the dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub source: Option<PathBuf>,
    pub title: Option<String>,
    pub platform: Option<String>,
    pub export_date: Option<String>,
    /// The documented number of images.
    pub image_count: Option<usize>,
    pub annotation_format: Option<String>,
    pub preprocessing: Vec<String>,
    pub augmentations: Vec<String>,
}

impl Provenance {
    pub fn parse(text: &str) -> Self {
        let title = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .filter(|line| !line.chars().all(|c| c == '='))
            .map(ToOwned::to_owned);

        let (platform, export_date) = match EXPORT_REGEX.captures(text) {
            Some(captures) => (
                Some(captures[1].to_owned()),
                Some(captures[2].to_owned()),
            ),
            None => (None, None),
        };

        let image_count = IMAGE_COUNT_REGEX
            .captures(text)
            .and_then(|captures| captures[1].replace(',', "").parse().ok());

        let annotation_format = FORMAT_REGEX
            .captures(text)
            .map(|captures| captures[1].trim().to_owned());

        Self {
            source: None,
            title,
            platform,
            export_date,
            image_count,
            annotation_format,
            preprocessing: bullets_after(text, "pre-processing"),
            augmentations: bullets_after(text, "augmentation"),
        }
    }

    pub fn load_file<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        Ok(Self {
            source: Some(path.to_owned()),
            ..Self::parse(&text)
        })
    }

    /// Load the first README found in the dataset directory.
    pub fn load<P>(root: P) -> Result<Option<Self>>
    where
        P: AsRef<Path>,
    {
        let root = root.as_ref();
        README_FILE_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.is_file())
            .map(Self::load_file)
            .transpose()
    }
}

/// Collect the bullet items following the first line mentioning `header`.
fn bullets_after(text: &str, header: &str) -> Vec<String> {
    let header = header.to_ascii_lowercase();
    text.lines()
        .skip_while(|line| !line.to_ascii_lowercase().contains(&header))
        .skip(1)
        .map(str::trim)
        .skip_while(|line| line.is_empty())
        .map_while(|line| {
            line.strip_prefix("* ")
                .or_else(|| line.strip_prefix("- "))
                .map(|item| item.trim().to_owned())
        })
        .collect()
}
