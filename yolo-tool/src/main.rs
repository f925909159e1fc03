use anyhow::{bail, format_err, Context, Result};
use bbox::Ratio;
use clap::Parser;
use log::LevelFilter;
use noisy_float::prelude::*;
use prettytable::{cell, row, Table};
use std::{
    env,
    path::{Path, PathBuf},
};
use yolo_dataset::{
    classify::ClassificationExport,
    config::Config,
    dataset::{DatasetLayout, FileDataset, GenericDataset, SanitizedDataset, YoloDataset},
    stats::SplitStats,
    validation::validate,
};

#[derive(Debug, Clone, Parser)]
/// Inspect, validate and convert YOLO datasets.
enum Opts {
    /// Show the layout, classes and statistics of a dataset.
    Info {
        /// dataset directory
        dataset_dir: PathBuf,
        /// classes.txt or data.yaml overriding the class list
        #[clap(long)]
        classes: Option<PathBuf>,
        /// JSON5 configuration file
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Check the dataset format and exit with failure on errors.
    Validate {
        /// dataset directory
        dataset_dir: PathBuf,
        /// classes.txt or data.yaml overriding the class list
        #[clap(long)]
        classes: Option<PathBuf>,
        /// JSON5 configuration file
        #[clap(long)]
        config: Option<PathBuf>,
        /// documented number of images
        #[clap(long)]
        expected_count: Option<usize>,
        /// read image headers
        #[clap(long)]
        probe_images: bool,
        /// treat images without label files as errors
        #[clap(long)]
        deny_unlabeled: bool,
    },
    /// Write label files with boxes clamped into the image.
    Sanitize {
        /// dataset directory
        dataset_dir: PathBuf,
        /// output directory
        output_dir: PathBuf,
        /// classes.txt or data.yaml overriding the class list
        #[clap(long)]
        classes: Option<PathBuf>,
        /// JSON5 configuration file
        #[clap(long)]
        config: Option<PathBuf>,
        /// tolerated box overflow in ratio units
        #[clap(long)]
        tolerance: Option<f64>,
        /// boxes not larger than this size in ratio units are dropped
        #[clap(long)]
        min_bbox_size: Option<f64>,
    },
    /// Convert single-object images to class folders.
    ToClassification {
        /// image directory
        #[clap(long)]
        images_dir: PathBuf,
        /// label directory
        #[clap(long)]
        labels_dir: PathBuf,
        /// output directory, which will contain train and val folders
        #[clap(long)]
        output_dir: PathBuf,
        /// classes.txt or data.yaml mapping class indexes to names
        #[clap(long)]
        classes: Option<PathBuf>,
        /// fraction of images per class reserved for validation
        #[clap(long, default_value = "0.2")]
        val_split: f64,
        /// move files instead of copying
        #[clap(long = "move")]
        move_files: bool,
        /// take the first object of multi-object images instead of skipping them
        #[clap(long)]
        force_first: bool,
        #[clap(long, default_value = "42")]
        seed: u64,
    },
}

#[tokio::main]
pub async fn main() -> Result<()> {
    // setup logger
    {
        let mut builder = pretty_env_logger::formatted_builder();
        match env::var("RUST_LOG") {
            Ok(filters) => builder.parse_filters(&filters),
            Err(_) => builder.filter_level(LevelFilter::Info),
        };
        builder.init();
    }

    match Opts::parse() {
        Opts::Info {
            dataset_dir,
            classes,
            config,
        } => {
            let config = load_config(dataset_dir, config, classes)?;
            info(&config).await?;
        }
        Opts::Validate {
            dataset_dir,
            classes,
            config,
            expected_count,
            probe_images,
            deny_unlabeled,
        } => {
            let mut config = load_config(dataset_dir, config, classes)?;
            if let Some(count) = expected_count {
                config.validation.expected_image_count = Some(count);
            }
            if probe_images {
                config.dataset.probe_images = true;
            }
            if deny_unlabeled {
                config.validation.allow_unlabeled = false;
            }
            validate_dataset(&config).await?;
        }
        Opts::Sanitize {
            dataset_dir,
            output_dir,
            classes,
            config,
            tolerance,
            min_bbox_size,
        } => {
            let mut config = load_config(dataset_dir, config, classes)?;
            if let Some(tolerance) = tolerance {
                config.sanitize.out_of_bound_tolerance = R64::try_new(tolerance)
                    .ok_or_else(|| format_err!("invalid tolerance {}", tolerance))?;
            }
            if let Some(size) = min_bbox_size {
                config.sanitize.min_bbox_size = Ratio::try_from(size)
                    .with_context(|| format!("invalid min_bbox_size {}", size))?;
            }
            sanitize(&config, output_dir).await?;
        }
        Opts::ToClassification {
            images_dir,
            labels_dir,
            output_dir,
            classes,
            val_split,
            move_files,
            force_first,
            seed,
        } => {
            let export = ClassificationExport {
                move_files,
                force_first,
                seed,
                ..ClassificationExport::new(output_dir, val_split)?
            };
            to_classification(images_dir, labels_dir, classes, &export).await?;
        }
    }

    Ok(())
}

fn load_config(
    dataset_dir: PathBuf,
    config_file: Option<PathBuf>,
    classes_file: Option<PathBuf>,
) -> Result<Config> {
    let mut config = match config_file {
        Some(path) => {
            let mut config = Config::open(&path)
                .with_context(|| format!("failed to load config file '{}'", path.display()))?;
            config.dataset.dir = dataset_dir;
            config
        }
        None => Config::new(dataset_dir),
    };
    if classes_file.is_some() {
        config.dataset.classes_file = classes_file;
    }
    Ok(config)
}

async fn info(config: &Config) -> Result<()> {
    let scan = YoloDataset::scan(&config.dataset).await?;
    let dataset = &scan.dataset;
    let stats = yolo_dataset::stats::DatasetStats::from_records(dataset.records());

    // print layout
    {
        let mut table = Table::new();
        table.add_row(row!["split", "images dir", "labels dir"]);
        dataset.layout.splits.iter().for_each(|split| {
            table.add_row(row![
                split.kind,
                split.images_dir.display(),
                split.labels_dir.display()
            ]);
        });
        table.printstd();
    }

    // print classes
    {
        let total = stats.total();
        let mut table = Table::new();
        table.add_row(row!["index", "name", "boxes"]);
        dataset.classes().iter().enumerate().for_each(|(index, name)| {
            let count = total.class_counts.get(&index).cloned().unwrap_or(0);
            table.add_row(row![index, name, count]);
        });
        table.printstd();
    }

    // print provenance
    if let Some(provenance) = &dataset.provenance {
        let mut table = Table::new();
        let fields = [
            ("title", provenance.title.clone()),
            ("platform", provenance.platform.clone()),
            ("export date", provenance.export_date.clone()),
            ("image count", provenance.image_count.map(|count| count.to_string())),
            ("format", provenance.annotation_format.clone()),
        ];
        fields
            .into_iter()
            .filter_map(|(key, value)| Some((key, value?)))
            .for_each(|(key, value)| {
                table.add_row(row![key, value]);
            });
        if !provenance.preprocessing.is_empty() {
            table.add_row(row!["pre-processing", provenance.preprocessing.join("\n")]);
        }
        if !provenance.augmentations.is_empty() {
            table.add_row(row!["augmentations", provenance.augmentations.join("\n")]);
        }
        table.printstd();
    }

    // print statistics
    {
        let mut table = Table::new();
        table.add_row(row![
            "split",
            "images",
            "labeled",
            "unlabeled",
            "empty labels",
            "boxes",
            "mean box w",
            "mean box h"
        ]);
        stats.splits.iter().for_each(|(split, split_stats)| {
            table.add_row(stats_row(&split.to_string(), split_stats));
        });
        table.add_row(stats_row("total", &stats.total()));
        table.printstd();
    }

    if !scan.issues.is_empty() {
        println!(
            "{} issues found while scanning, run 'validate' for details",
            scan.issues.len()
        );
    }

    Ok(())
}

fn stats_row(name: &str, stats: &SplitStats) -> prettytable::Row {
    let format_mean = |mean: Option<f64>| match mean {
        Some(mean) => format!("{:.4}", mean),
        None => "-".to_string(),
    };

    row![
        name,
        stats.num_images,
        stats.num_labeled,
        stats.num_unlabeled,
        stats.num_empty_labels,
        stats.num_boxes,
        format_mean(stats.mean_box_w()),
        format_mean(stats.mean_box_h())
    ]
}

async fn validate_dataset(config: &Config) -> Result<()> {
    let scan = YoloDataset::scan(&config.dataset).await?;
    let report = validate(&scan, &config.validation);

    if !report.issues.is_empty() {
        let mut table = Table::new();
        table.add_row(row!["severity", "path", "line", "issue"]);
        report.issues.iter().for_each(|issue| {
            table.add_row(row![
                issue.severity,
                issue
                    .path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_default(),
                issue.line.map(|line| line.to_string()).unwrap_or_default(),
                issue.kind
            ]);
        });
        table.printstd();
    }

    println!(
        "{} images, {} errors, {} warnings",
        report.stats.num_images(),
        report.num_errors(),
        report.num_warnings()
    );

    if !report.is_ok() {
        bail!(
            "dataset '{}' failed validation",
            config.dataset.dir.display()
        );
    }
    Ok(())
}

async fn sanitize(config: &Config, output_dir: impl AsRef<Path>) -> Result<()> {
    let dataset = YoloDataset::load(&config.dataset).await?;
    let dataset = SanitizedDataset::new(
        dataset,
        config.sanitize.out_of_bound_tolerance,
        config.sanitize.min_bbox_size,
    )?;
    let count = dataset.export_labels(output_dir.as_ref()).await?;
    println!(
        "wrote {} label files to '{}'",
        count,
        output_dir.as_ref().display()
    );
    Ok(())
}

async fn to_classification(
    images_dir: PathBuf,
    labels_dir: PathBuf,
    classes_file: Option<PathBuf>,
    export: &ClassificationExport,
) -> Result<()> {
    let layout = DatasetLayout::from_dirs(&images_dir, &labels_dir)?;
    let mut config = Config::new(&layout.root);
    config.dataset.classes_file = classes_file;

    let scan = YoloDataset::scan_layout(layout, &config.dataset).await?;
    let summary = export.run(&scan).await?;

    // print class distribution
    {
        let mut table = Table::new();
        table.add_row(row!["class", "total", "train", "val"]);
        summary.classes.iter().for_each(|(name, split)| {
            table.add_row(row![
                name,
                split.num_train + split.num_val,
                split.num_train,
                split.num_val
            ]);
        });
        table.printstd();
    }

    println!(
        "usable samples: {} (skipped empty: {}, skipped multi: {}, missing images: {})",
        summary.num_usable,
        summary.num_skipped_empty,
        summary.num_skipped_multi,
        summary.num_missing_images
    );
    println!(
        "total files {}: {}",
        if export.move_files { "moved" } else { "copied" },
        summary.num_copied
    );

    Ok(())
}
