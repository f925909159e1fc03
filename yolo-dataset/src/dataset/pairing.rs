use crate::common::*;

/// The result of matching image files with label files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pairing {
    /// Every image in listing order, keyed by its relative path without
    /// extension, with the matched label file if any.
    pub images: Vec<PairedImage>,
    /// Label files without a matching image.
    pub orphan_labels: Vec<PathBuf>,
    /// Images dropped because an earlier image has the same key, paired
    /// with the kept image.
    pub duplicate_stems: Vec<(PathBuf, PathBuf)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedImage {
    pub key: PathBuf,
    pub image_file: PathBuf,
    pub label_file: Option<PathBuf>,
}

impl Pairing {
    pub fn num_pairs(&self) -> usize {
        self.images
            .iter()
            .filter(|image| image.label_file.is_some())
            .count()
    }

    pub fn unlabeled_images(&self) -> impl Iterator<Item = &Path> {
        self.images
            .iter()
            .filter(|image| image.label_file.is_none())
            .map(|image| image.image_file.as_path())
    }
}

/// Match image files to label files by relative path without extension.
///
/// Labels with no exact match fall back to the unique image with the same
/// file stem, which covers images stored in nested folders.
pub fn pair_files(
    images_dir: &Path,
    image_files: Vec<PathBuf>,
    labels_dir: &Path,
    label_files: Vec<PathBuf>,
) -> Pairing {
    let mut duplicate_stems = vec![];
    let mut images: IndexMap<PathBuf, PairedImage> = IndexMap::new();

    for image_file in image_files {
        let key = relative_key(images_dir, &image_file);
        match images.get(&key) {
            Some(kept) => {
                duplicate_stems.push((kept.image_file.clone(), image_file));
            }
            None => {
                let image = PairedImage {
                    key: key.clone(),
                    image_file,
                    label_file: None,
                };
                images.insert(key, image);
            }
        }
    }

    // exact matches
    let mut unmatched = vec![];
    for label_file in label_files {
        let key = relative_key(labels_dir, &label_file);
        match images.get_mut(&key) {
            Some(image) if image.label_file.is_none() => {
                image.label_file = Some(label_file);
            }
            _ => unmatched.push(label_file),
        }
    }

    // stem matches
    let mut stem_index: HashMap<&std::ffi::OsStr, Vec<usize>> = HashMap::new();
    images
        .values()
        .enumerate()
        .filter(|(_, image)| image.label_file.is_none())
        .filter_map(|(index, image)| Some((image.image_file.file_stem()?, index)))
        .for_each(|(stem, index)| stem_index.entry(stem).or_default().push(index));

    let mut assignments: Vec<(usize, PathBuf)> = vec![];
    let mut orphan_labels = vec![];

    for label_file in unmatched {
        let candidate = label_file
            .file_stem()
            .and_then(|stem| stem_index.get(stem))
            .and_then(|indexes| match indexes.as_slice() {
                &[index] => Some(index),
                _ => None,
            })
            .filter(|index| !assignments.iter().any(|(taken, _)| taken == index));

        match candidate {
            Some(index) => assignments.push((index, label_file)),
            None => orphan_labels.push(label_file),
        }
    }

    for (index, label_file) in assignments {
        if let Some((_, image)) = images.get_index_mut(index) {
            image.label_file = Some(label_file);
        }
    }

    Pairing {
        images: images.into_iter().map(|(_, image)| image).collect(),
        orphan_labels,
        duplicate_stems,
    }
}

/// The path relative to `dir` with the extension removed.
pub fn relative_key(dir: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(dir).unwrap_or(path).with_extension("")
}
