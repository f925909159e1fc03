pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use bbox::{prelude::*, Ratio, HW, TLBR};
pub use futures::stream::{self, StreamExt as _, TryStreamExt as _};
pub use indexmap::IndexMap;
pub use itertools::Itertools as _;
pub use label::{ClassList, LabelFile, YoloLabel};
pub use log::{debug, info, warn};
pub use noisy_float::prelude::*;
pub use once_cell::sync::Lazy;
pub use par_stream::prelude::*;
pub use rand::{prelude::*, rngs::StdRng};
pub use regex::Regex;
pub use serde::{Deserialize, Serialize};
pub use std::{
    collections::{BTreeMap, HashMap},
    fmt::{self, Debug, Display, Formatter},
    path::{Component, Path, PathBuf},
    sync::Arc,
};

pub type Fallible<T> = Result<T, Error>;
