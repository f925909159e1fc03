pub use anyhow::{ensure, format_err, Error, Result};
pub use noisy_float::prelude::*;
pub use num_traits::{Float, Num, NumCast, One, ToPrimitive, Zero};
pub use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
pub use std::{
    fmt::{self, Display, Formatter},
    ops::Mul,
};
