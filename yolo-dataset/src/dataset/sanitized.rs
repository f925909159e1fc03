use super::*;
use crate::common::*;

/// The dataset that repairs or filters out bad boxes.
#[derive(Debug)]
pub struct SanitizedDataset<D>
where
    D: FileDataset,
{
    dataset: D,
    records: Vec<Arc<FileRecord>>,
}

impl<D> SanitizedDataset<D>
where
    D: FileDataset,
{
    pub fn new(dataset: D, out_of_bound_tolerance: R64, min_bbox_size: Ratio) -> Result<Self> {
        let min_bbox_size = min_bbox_size.to_r64();
        ensure!(
            out_of_bound_tolerance >= 0.0,
            "out_of_bound_tolerance must be non-negative"
        );

        let zero = r64(0.0);
        let one = r64(1.0);
        let range = (-out_of_bound_tolerance)..=(one + out_of_bound_tolerance);
        let mut filtered_bbox_count = 0;

        let records: Vec<_> = dataset
            .records()
            .iter()
            .map(|record| -> Result<_> {
                let bboxes: Vec<_> = record
                    .numbered_bboxes()
                    .map(|(line, bbox)| -> Result<_> {
                        let tlbr: TLBR<R64> = bbox.rect.into();

                        // out of bound check with tolerance
                        ensure!(
                            range.contains(&tlbr.t())
                                && range.contains(&tlbr.b())
                                && range.contains(&tlbr.l())
                                && range.contains(&tlbr.r()),
                            "bbox {:?} at line {} is out of bound with out_of_bound_tolerance {}",
                            bbox.cxcywh(),
                            line,
                            out_of_bound_tolerance
                        );

                        // crop out out of bound parts
                        let sanitized = tlbr.clamp(zero, one);
                        debug_assert!(sanitized.is_within_unit());

                        // kick of small bboxes
                        if sanitized.h() <= min_bbox_size || sanitized.w() <= min_bbox_size {
                            return Ok(None);
                        }

                        let sanitized_bbox = YoloLabel {
                            rect: sanitized.to_cycxhw(),
                            class: bbox.class,
                        };
                        Ok(Some((line, sanitized_bbox)))
                    })
                    .filter_map(|result| result.transpose())
                    .try_collect()
                    .with_context(|| {
                        let path = record.label_file.as_ref().unwrap_or(&record.image_file);
                        format!("invalid labels in '{}'", path.display())
                    })?;

                filtered_bbox_count += record.bboxes.len() - bboxes.len();
                let (line_numbers, bboxes) = bboxes.into_iter().unzip();

                Ok(Arc::new(FileRecord {
                    bboxes,
                    line_numbers,
                    ..record.as_ref().clone()
                }))
            })
            .try_collect()?;

        if filtered_bbox_count > 0 {
            warn!(
                "filtered out {} bad objects in the data set",
                filtered_bbox_count
            );
        }

        Ok(Self { dataset, records })
    }

    pub fn into_inner(self) -> D {
        self.dataset
    }

    /// Write one label file per labeled record under `out_dir`, with a
    /// `classes.txt` at the top.
    ///
    /// Files go to `<out_dir>/<split>/labels/<key>.txt`, or to
    /// `<out_dir>/labels/<key>.txt` for an unsplit dataset. Returns the
    /// number of written label files.
    pub async fn export_labels<P>(&self, out_dir: P) -> Result<usize>
    where
        P: AsRef<Path>,
    {
        let out_dir = out_dir.as_ref();
        tokio::fs::create_dir_all(out_dir).await?;

        let classes_text: String = self
            .classes()
            .iter()
            .map(|name| format!("{}\n", name))
            .collect();
        tokio::fs::write(out_dir.join("classes.txt"), classes_text).await?;

        let root = Arc::new(out_dir.to_owned());
        let count = stream::iter(self.records.clone())
            .filter(|record| futures::future::ready(record.is_labeled()))
            .map(Ok)
            .try_par_then(None, move |record| {
                let root = root.clone();

                async move {
                    let labels_dir = match record.split {
                        SplitKind::All => root.join("labels"),
                        ref split => root.join(split.as_str()).join("labels"),
                    };
                    // keys may contain dots, append the extension
                    let mut file_name = record.key.clone().into_os_string();
                    file_name.push(".");
                    file_name.push(LABEL_EXTENSION);
                    let path = labels_dir.join(file_name);
                    if let Some(parent) = path.parent() {
                        tokio::fs::create_dir_all(parent).await?;
                    }

                    let label_file = LabelFile {
                        labels: record.bboxes.clone(),
                    };
                    tokio::fs::write(&path, label_file.to_text())
                        .await
                        .with_context(|| format!("failed to write '{}'", path.display()))?;
                    Fallible::Ok(())
                }
            })
            .try_fold(0usize, |count, ()| async move { Fallible::Ok(count + 1) })
            .await?;

        info!("wrote {} label files to '{}'", count, out_dir.display());
        Ok(count)
    }
}

impl<D> GenericDataset for SanitizedDataset<D>
where
    D: FileDataset,
{
    fn classes(&self) -> &ClassList {
        self.dataset.classes()
    }
}

impl<D> FileDataset for SanitizedDataset<D>
where
    D: FileDataset,
{
    fn records(&self) -> &[Arc<FileRecord>] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Records {
        classes: ClassList,
        records: Vec<Arc<FileRecord>>,
    }

    impl GenericDataset for Records {
        fn classes(&self) -> &ClassList {
            &self.classes
        }
    }

    impl FileDataset for Records {
        fn records(&self) -> &[Arc<FileRecord>] {
            &self.records
        }
    }

    fn dataset(bboxes: Vec<YoloLabel>) -> Records {
        let line_numbers = (1..=bboxes.len()).collect();
        Records {
            classes: ClassList::from_names(["fish", "shark"]).unwrap(),
            records: vec![Arc::new(FileRecord {
                split: SplitKind::Train,
                key: PathBuf::from("reef/img_001"),
                image_file: PathBuf::from("train/images/reef/img_001.jpg"),
                label_file: Some(PathBuf::from("train/labels/reef/img_001.txt")),
                size: None,
                bboxes,
                line_numbers,
            })],
        }
    }

    #[test]
    fn clamp_and_filter_boxes() {
        let bboxes = vec![
            // reaches 0.005 beyond the right edge
            YoloLabel::new(0, 0.955, 0.5, 0.1, 0.2).unwrap(),
            // too small
            YoloLabel::new(1, 0.5, 0.5, 0.0005, 0.2).unwrap(),
            YoloLabel::new(1, 0.3, 0.3, 0.2, 0.2).unwrap(),
        ];
        let sanitized =
            SanitizedDataset::new(dataset(bboxes), r64(0.01), Ratio::try_from(0.001).unwrap())
                .unwrap();

        let record = &sanitized.records()[0];
        assert_eq!(record.bboxes.len(), 2);
        assert_eq!(record.line_numbers, vec![1, 3]);
        assert!(record.bboxes[0].rect.is_within_unit());
        assert!((record.bboxes[0].rect.r().raw() - 1.0).abs() < 1e-9);
        assert_eq!(sanitized.classes().len(), 2);
    }

    #[test]
    fn reject_boxes_beyond_tolerance() {
        let bboxes = vec![YoloLabel::new(0, 0.98, 0.5, 0.1, 0.2).unwrap()];
        assert!(SanitizedDataset::new(dataset(bboxes), r64(0.01), Ratio::zero()).is_err());
        assert!(SanitizedDataset::new(dataset(vec![]), r64(-0.1), Ratio::zero()).is_err());
    }

    #[tokio::test]
    async fn export_sanitized_labels() {
        let bboxes = vec![YoloLabel::new(0, 0.512, 0.334, 0.12, 0.08).unwrap()];
        let sanitized = SanitizedDataset::new(dataset(bboxes), r64(0.0), Ratio::zero()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let count = sanitized.export_labels(dir.path()).await.unwrap();
        assert_eq!(count, 1);

        let text =
            std::fs::read_to_string(dir.path().join("train/labels/reef/img_001.txt")).unwrap();
        assert_eq!(text, "0 0.512000 0.334000 0.120000 0.080000\n");
        let classes = std::fs::read_to_string(dir.path().join("classes.txt")).unwrap();
        assert_eq!(classes, "fish\nshark\n");
    }
}
