//! Toolkit for YOLO detection datasets exported by annotation platforms.
//!
//! The crate discovers the directory layout of an export, pairs images
//! with label files, parses and validates the labels, and derives
//! statistics, sanitized label sets and classification datasets from it.

mod common;
pub mod classify;
pub mod config;
pub mod dataset;
pub mod provenance;
pub mod stats;
pub mod validation;
