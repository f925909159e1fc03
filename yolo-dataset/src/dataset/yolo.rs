use super::*;
use crate::{
    common::*,
    config::DatasetConfig,
    provenance::Provenance,
    validation::{Issue, IssueKind},
};

/// The YOLO dataset exported as image and label file trees.
#[derive(Debug, Clone)]
pub struct YoloDataset {
    pub layout: DatasetLayout,
    pub classes: ClassList,
    pub provenance: Option<Provenance>,
    pub records: Vec<Arc<FileRecord>>,
}

/// A scanned dataset together with the problems found on the way.
#[derive(Debug, Clone)]
pub struct Scan {
    pub dataset: YoloDataset,
    pub issues: Vec<Issue>,
}

impl GenericDataset for YoloDataset {
    fn classes(&self) -> &ClassList {
        &self.classes
    }
}

impl FileDataset for YoloDataset {
    fn records(&self) -> &[Arc<FileRecord>] {
        &self.records
    }
}

impl YoloDataset {
    /// Load the dataset and fail if the scan reports any error.
    pub async fn load(config: &DatasetConfig) -> Result<Self> {
        let Scan { dataset, issues } = Self::scan(config).await?;

        let mut errors = issues.iter().filter(|issue| issue.is_error());
        if let Some(first) = errors.next() {
            bail!(
                "found {} errors in dataset '{}', the first one is: {}",
                errors.count() + 1,
                config.dir.display(),
                first
            );
        }
        issues.iter().for_each(|issue| warn!("{}", issue));

        Ok(dataset)
    }

    /// Scan the dataset under the configured directory.
    ///
    /// Data problems are collected as issues. Only failures to access the
    /// dataset itself are returned as errors.
    pub async fn scan(config: &DatasetConfig) -> Result<Scan> {
        let layout = DatasetLayout::discover(&config.dir)?;
        Self::scan_layout(layout, config).await
    }

    /// Scan the dataset in a known layout. `config.dir` is ignored.
    pub async fn scan_layout(layout: DatasetLayout, config: &DatasetConfig) -> Result<Scan> {
        let mut issues = vec![];

        // load data.yaml
        let data_yaml = match &layout.data_yaml {
            Some(path) => {
                let yaml = DataYaml::load(path)?;
                if let Err(err) = yaml.check_class_count() {
                    issues.push(
                        Issue::error(IssueKind::NameCountMismatch(err.to_string()))
                            .with_path(path),
                    );
                }
                Some(yaml)
            }
            None => None,
        };

        // load README
        let provenance = layout
            .readme
            .as_ref()
            .and_then(|path| match Provenance::load_file(path) {
                Ok(provenance) => Some(provenance),
                Err(err) => {
                    warn!("ignore README '{}': {:#}", path.display(), err);
                    None
                }
            });

        // scan splits
        let mut records = vec![];

        for split in &layout.splits {
            let pairing = {
                let images_dir = split.images_dir.clone();
                let labels_dir = split.labels_dir.clone();
                let extensions = config.image_extensions.clone();

                tokio::task::spawn_blocking(move || -> Result<_> {
                    let image_files = list_files(&images_dir, extensions.as_slice())?;
                    let label_files = list_files(&labels_dir, &[LABEL_EXTENSION])?;
                    Ok(pair_files(&images_dir, image_files, &labels_dir, label_files))
                })
                .await??
            };

            info!(
                "found {} images and {} paired label files in {} split",
                pairing.images.len(),
                pairing.num_pairs(),
                split.kind
            );

            let Pairing {
                images,
                orphan_labels,
                duplicate_stems,
            } = pairing;

            issues.extend(
                orphan_labels
                    .into_iter()
                    .map(|path| Issue::warning(IssueKind::OrphanLabel).with_path(path)),
            );
            issues.extend(duplicate_stems.into_iter().map(|(kept, duplicate)| {
                Issue::error(IssueKind::DuplicateStem { other: kept }).with_path(duplicate)
            }));

            let split_kind = split.kind.clone();
            let probe_images = config.probe_images;

            let loaded: Vec<_> = stream::iter(images)
                .par_map(None, move |image| {
                    let split_kind = split_kind.clone();
                    move || load_record(split_kind, image, probe_images)
                })
                .collect()
                .await;

            loaded.into_iter().for_each(|(record, record_issues)| {
                records.push(Arc::new(record));
                issues.extend(record_issues);
            });
        }

        let classes = resolve_classes(config, &layout, data_yaml.as_ref(), &records)?;
        debug!("dataset has {} classes", classes.len());

        let dataset = YoloDataset {
            layout,
            classes,
            provenance,
            records,
        };

        Ok(Scan { dataset, issues })
    }
}

/// Resolve the class list from the configured file, `data.yaml`,
/// `classes.txt`, or else the class indexes in use.
fn resolve_classes(
    config: &DatasetConfig,
    layout: &DatasetLayout,
    data_yaml: Option<&DataYaml>,
    records: &[Arc<FileRecord>],
) -> Result<ClassList> {
    if let Some(path) = &config.classes_file {
        return load_class_list(path);
    }

    if let Some(classes) = data_yaml.map(|yaml| yaml.listed_classes()).transpose()?.flatten() {
        return Ok(classes);
    }

    if let Some(path) = &layout.classes_file {
        return ClassList::load_txt(path);
    }

    let num_classes = records
        .iter()
        .flat_map(|record| &record.bboxes)
        .map(|bbox| bbox.class + 1)
        .max()
        .unwrap_or(0);
    warn!(
        "no class list found in '{}', name {} classes by index",
        layout.root.display(),
        num_classes
    );
    Ok(ClassList::numeric(num_classes))
}

/// Build the record of an image. Problems are returned along with it.
///
/// A label file with any malformed line yields a record without boxes.
fn load_record(
    split: SplitKind,
    image: PairedImage,
    probe_image: bool,
) -> (FileRecord, Vec<Issue>) {
    let PairedImage {
        key,
        image_file,
        label_file,
    } = image;
    let mut issues = vec![];

    let size = if probe_image {
        match probe_image_size(&image_file) {
            Ok(size) => Some(size),
            Err(err) => {
                issues.push(
                    Issue::error(IssueKind::UnreadableImage(format!("{:#}", err)))
                        .with_path(&image_file),
                );
                None
            }
        }
    } else {
        None
    };

    let mut bboxes = vec![];
    let mut line_numbers = vec![];

    if let Some(label_file) = &label_file {
        match std::fs::read_to_string(label_file) {
            Ok(text) => {
                let mut malformed = false;

                for (line, result) in LabelFile::parse_lines(&text) {
                    match result {
                        Ok(bbox) => {
                            bboxes.push(bbox);
                            line_numbers.push(line);
                        }
                        Err(err) => {
                            malformed = true;
                            issues.push(
                                Issue::error(IssueKind::MalformedLabel(format!("{:#}", err)))
                                    .with_path(label_file)
                                    .with_line(line),
                            );
                        }
                    }
                }

                if malformed {
                    bboxes.clear();
                    line_numbers.clear();
                }
            }
            Err(err) => {
                let kind = IssueKind::UnreadableLabel(err.to_string());
                issues.push(Issue::error(kind).with_path(label_file));
            }
        }
    }

    let record = FileRecord {
        split,
        key,
        image_file,
        label_file,
        size,
        bboxes,
        line_numbers,
    };

    (record, issues)
}
