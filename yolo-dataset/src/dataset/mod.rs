//! Dataset discovery and loading.

mod data_yaml;
mod dataset_;
mod layout;
mod pairing;
mod record;
mod sanitized;
mod utils;
mod yolo;

pub use data_yaml::*;
pub use dataset_::*;
pub use layout::*;
pub use pairing::*;
pub use record::*;
pub use sanitized::*;
pub use utils::*;
pub use yolo::*;
