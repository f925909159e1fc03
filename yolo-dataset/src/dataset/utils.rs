use super::DataYaml;
use crate::common::*;

/// Image file extensions recognized by default, in lower case.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

pub const LABEL_EXTENSION: &str = "txt";

/// Recursively list files under `dir` with one of the extensions.
///
/// Extensions are matched case-insensitively. The result is sorted.
pub fn list_files<S>(dir: &Path, extensions: &[S]) -> Result<Vec<PathBuf>>
where
    S: AsRef<str>,
{
    if !dir.is_dir() {
        return Ok(vec![]);
    }

    let pattern = format!(
        "{}/**/*",
        glob::Pattern::escape(
            dir.to_str()
                .ok_or_else(|| format_err!("non-UTF-8 path '{}'", dir.display()))?
        )
    );

    let mut files: Vec<PathBuf> = glob::glob(&pattern)?
        .map(|entry| -> Result<_> {
            let path = entry?;
            let matched = path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| {
                        extensions
                            .iter()
                            .any(|expect| expect.as_ref().eq_ignore_ascii_case(ext))
                    })
                    .unwrap_or(false);
            Ok(matched.then(|| path))
        })
        .filter_map(|result| result.transpose())
        .try_collect()?;
    files.sort();

    Ok(files)
}

/// Load a class list from a `classes.txt` or `data.yaml` file.
pub fn load_class_list(path: impl AsRef<Path>) -> Result<ClassList> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match ext.as_deref() {
        Some("txt") => ClassList::load_txt(path),
        Some("yaml") | Some("yml") => DataYaml::load(path)?
            .class_list()?
            .ok_or_else(|| format_err!("no class names listed in '{}'", path.display())),
        _ => bail!(
            "unsupported classes file '{}', expect a .txt or .yaml file",
            path.display()
        ),
    }
}

/// Read the image size from the file header.
pub fn probe_image_size(path: impl AsRef<Path>) -> Result<HW<usize>> {
    let path = path.as_ref();
    let imagesize::ImageSize { height, width } = imagesize::size(path)
        .map_err(|err| format_err!("failed to read image '{}': {:?}", path.display(), err))?;
    HW::try_from_hw([height, width])
}
