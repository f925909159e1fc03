use super::*;
use crate::common::*;

/// The generic dataset trait.
pub trait GenericDataset
where
    Self: Debug + Send,
{
    /// The list of class names of the dataset.
    fn classes(&self) -> &ClassList;
}

/// The dataset with a list of image and label paths.
pub trait FileDataset
where
    Self: GenericDataset,
{
    /// Get the list of records in the dataset.
    fn records(&self) -> &[Arc<FileRecord>];
}
