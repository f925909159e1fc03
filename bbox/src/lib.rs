//! Safe bounding box types and functions.
//!
//! Boxes annotated in YOLO label files live in the unit square, where the
//! image height and width both measure `1.0`. The [Ratio] type guards that
//! range, while [CyCxHW] and [TLBR] carry the box geometry in either unit.

mod common;

pub use cycxhw::*;
pub mod cycxhw;

pub use hw::*;
pub mod hw;

pub use ratio::*;
pub mod ratio;

pub use rect::*;
pub mod rect;

pub use tlbr::*;
pub mod tlbr;

pub mod prelude {
    pub use crate::rect::{Rect, RectFloat, RectNum};
}
