//! The YOLO label file codec.
//!
//! A label file is plain text with one object per line:
//!
//! ```text
//! class_id center_x center_y width height
//! ```
//!
//! The class index is a non-negative integer. The remaining fields are
//! normalized by the image width or height and must lie in `[0, 1]`.
//! An empty file means the image contains no objects.

use crate::{common::*, YoloLabel};

const NUM_FIELDS: usize = 5;

impl YoloLabel {
    /// Build a label from the fields of a label line.
    pub fn new(class: usize, cx: f64, cy: f64, w: f64, h: f64) -> Result<Self> {
        let check = |value: f64, name: &str| -> Result<R64> {
            let ratio = Ratio::try_from(value)
                .with_context(|| format!("{} {} is out of range", name, value))?;
            Ok(ratio.to_r64())
        };

        let cx = check(cx, "center_x")?;
        let cy = check(cy, "center_y")?;
        let w = check(w, "width")?;
        let h = check(h, "height")?;

        Ok(Self {
            rect: CyCxHW::try_from_cxcywh(cx, cy, w, h)?,
            class,
        })
    }

    /// The `[center_x, center_y, width, height]` fields in label file order.
    pub fn cxcywh(&self) -> [f64; 4] {
        [
            self.rect.cx().raw(),
            self.rect.cy().raw(),
            self.rect.w().raw(),
            self.rect.h().raw(),
        ]
    }
}

/// Parse one line of a label file.
///
/// Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<YoloLabel>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    // one extra token is enough to tell polygons from boxes
    let tokens: Vec<&str> = line.split_whitespace().take(NUM_FIELDS + 1).collect();
    ensure!(
        tokens.len() >= NUM_FIELDS,
        "expect {} fields, but found {}",
        NUM_FIELDS,
        tokens.len()
    );
    ensure!(
        tokens.len() == NUM_FIELDS,
        "expect {} fields, but found more; segmentation polygons are not supported",
        NUM_FIELDS
    );

    let class: usize = tokens[0].parse().map_err(|_| {
        format_err!(
            "invalid class index '{}', expect a non-negative integer",
            tokens[0]
        )
    })?;
    let cx = parse_field(tokens[1], "center_x")?;
    let cy = parse_field(tokens[2], "center_y")?;
    let w = parse_field(tokens[3], "width")?;
    let h = parse_field(tokens[4], "height")?;

    Ok(Some(YoloLabel::new(class, cx, cy, w, h)?))
}

/// Format a label as a label file line without the line break.
pub fn format_line(label: &YoloLabel) -> String {
    let [cx, cy, w, h] = label.cxcywh();
    format!("{} {:.6} {:.6} {:.6} {:.6}", label.class, cx, cy, w, h)
}

fn parse_field(token: &str, name: &str) -> Result<f64> {
    token
        .parse()
        .map_err(|_| format_err!("invalid {} '{}', expect a floating-point number", name, token))
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// The content of a label file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelFile {
    pub labels: Vec<YoloLabel>,
}

impl LabelFile {
    /// Parse every non-blank line, paired with its 1-based line number.
    pub fn parse_lines(text: &str) -> impl Iterator<Item = (usize, Result<YoloLabel>)> + '_ {
        strip_bom(text)
            .lines()
            .enumerate()
            .filter_map(|(index, line)| Some((index + 1, parse_line(line).transpose()?)))
    }

    /// The leading token of every non-blank line, without checking the
    /// remaining fields.
    pub fn class_tokens(text: &str) -> impl Iterator<Item = &str> + '_ {
        strip_bom(text)
            .lines()
            .filter_map(|line| line.split_whitespace().next())
    }

    pub fn parse_str(text: &str) -> Result<Self> {
        let labels: Vec<_> = Self::parse_lines(text)
            .map(|(line_num, result)| result.with_context(|| format!("at line {}", line_num)))
            .try_collect()?;
        Ok(Self { labels })
    }

    pub fn load<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read label file '{}'", path.display()))?;
        Self::parse_str(&text)
            .with_context(|| format!("failed to parse label file '{}'", path.display()))
    }

    pub fn to_text(&self) -> String {
        self.labels
            .iter()
            .map(|label| format!("{}\n", format_line(label)))
            .collect()
    }

    pub fn save<P>(&self, path: P) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        fs::write(path, self.to_text())
            .with_context(|| format!("failed to write label file '{}'", path.display()))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
