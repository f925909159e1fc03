pub use anyhow::{ensure, format_err, Context as _, Result};
pub use bbox::{prelude::*, CyCxHW, Ratio};
pub use indexmap::IndexSet;
pub use itertools::Itertools as _;
pub use noisy_float::prelude::*;
pub use std::{
    borrow::Cow,
    collections::BTreeMap,
    fs,
    path::Path,
};
