use crate::common::*;

/// The dataset-wide list of class names, ordered by class index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassList {
    names: IndexSet<String>,
}

impl ClassList {
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names
            .into_iter()
            .map(|name| name.into().trim().to_owned())
            .collect();
        ensure!(
            names.iter().all(|name| !name.is_empty()),
            "class names must not be empty"
        );

        let num_names = names.len();
        let names: IndexSet<_> = names.into_iter().collect();
        ensure!(num_names == names.len(), "duplicated class names found");
        ensure!(!names.is_empty(), "no classes found");

        Ok(Self { names })
    }

    /// Build the list from an index to name mapping.
    ///
    /// Indexes missing from the mapping are named `class_<index>`.
    pub fn from_index_map(map: &BTreeMap<usize, String>) -> Result<Self> {
        let num_classes = match map.keys().next_back() {
            Some(&max_index) => max_index + 1,
            None => 0,
        };
        let names = (0..num_classes).map(|index| match map.get(&index) {
            Some(name) => name.to_owned(),
            None => format!("class_{}", index),
        });
        Self::from_names(names)
    }

    /// Parse a `classes.txt` file content, one name per line.
    pub fn from_txt_str(text: &str) -> Result<Self> {
        Self::from_names(text.lines().map(str::trim).filter(|line| !line.is_empty()))
    }

    pub fn load_txt<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read classes file '{}'", path.display()))?;
        Self::from_txt_str(&text)
            .with_context(|| format!("invalid classes file '{}'", path.display()))
    }

    /// Name classes by their indexes, `"0"` to `"<num_classes - 1>"`.
    pub fn numeric(num_classes: usize) -> Self {
        Self {
            names: (0..num_classes).map(|index| index.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, class: usize) -> bool {
        class < self.names.len()
    }

    /// Get the class name, or the index itself if the class is not listed.
    pub fn name_of(&self, class: usize) -> Cow<'_, str> {
        match self.names.get_index(class) {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(class.to_string()),
        }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get_index_of(name)
    }

    pub fn names(&self) -> &IndexSet<String> {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
