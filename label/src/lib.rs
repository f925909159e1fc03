//! YOLO label records, label files and class lists.

mod common;

pub mod class_list;
pub use class_list::*;

pub mod yolo;
pub use yolo::*;

use bbox::{CyCxHW, Rect};
use noisy_float::prelude::*;

/// A labeled bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label<R, C>
where
    R: Rect,
{
    pub rect: R,
    pub class: C,
}

/// A box from a YOLO label file, in unit coordinates with a class index.
pub type YoloLabel = Label<CyCxHW<R64>, usize>;
