//! Per-split dataset statistics.

use crate::{common::*, dataset::FileRecord, dataset::SplitKind};

/// Counters of a dataset split.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitStats {
    pub num_images: usize,
    pub num_labeled: usize,
    pub num_unlabeled: usize,
    /// Label files that exist but list no objects.
    pub num_empty_labels: usize,
    pub num_boxes: usize,
    /// Number of boxes per class index.
    pub class_counts: BTreeMap<usize, usize>,
    sum_w: f64,
    sum_h: f64,
}

impl SplitStats {
    pub fn add_record(&mut self, record: &FileRecord) {
        self.num_images += 1;

        if !record.is_labeled() {
            self.num_unlabeled += 1;
            return;
        }
        self.num_labeled += 1;
        if record.bboxes.is_empty() {
            self.num_empty_labels += 1;
        }

        record.bboxes.iter().for_each(|bbox| {
            self.num_boxes += 1;
            *self.class_counts.entry(bbox.class).or_default() += 1;
            self.sum_w += bbox.rect.w().raw();
            self.sum_h += bbox.rect.h().raw();
        });
    }

    /// Mean box width in ratio units, or `None` without boxes.
    pub fn mean_box_w(&self) -> Option<f64> {
        (self.num_boxes > 0).then(|| self.sum_w / self.num_boxes as f64)
    }

    /// Mean box height in ratio units, or `None` without boxes.
    pub fn mean_box_h(&self) -> Option<f64> {
        (self.num_boxes > 0).then(|| self.sum_h / self.num_boxes as f64)
    }

    fn merge(&mut self, other: &Self) {
        self.num_images += other.num_images;
        self.num_labeled += other.num_labeled;
        self.num_unlabeled += other.num_unlabeled;
        self.num_empty_labels += other.num_empty_labels;
        self.num_boxes += other.num_boxes;
        other.class_counts.iter().for_each(|(&class, &count)| {
            *self.class_counts.entry(class).or_default() += count;
        });
        self.sum_w += other.sum_w;
        self.sum_h += other.sum_h;
    }
}

/// Statistics of every split, in the order splits are first seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetStats {
    pub splits: IndexMap<SplitKind, SplitStats>,
}

impl DatasetStats {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Arc<FileRecord>>,
    {
        let mut splits: IndexMap<SplitKind, SplitStats> = IndexMap::new();
        records.into_iter().for_each(|record| {
            splits
                .entry(record.split.clone())
                .or_default()
                .add_record(record);
        });
        Self { splits }
    }

    /// The sum over all splits.
    pub fn total(&self) -> SplitStats {
        self.splits
            .values()
            .fold(SplitStats::default(), |mut total, stats| {
                total.merge(stats);
                total
            })
    }

    pub fn num_images(&self) -> usize {
        self.splits.values().map(|stats| stats.num_images).sum()
    }
}
