//! Label files for two-class image folders (`name,label` per line).

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::error::LabelError;

/// Ordered `(substring, label)` rules; the first match wins.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScheme {
    pub rules: Vec<(String, u32)>,
}

impl Default for LabelScheme {
    /// `dog` → 1, then `cat` → 0.
    fn default() -> Self {
        LabelScheme { rules: vec![("dog".to_string(), 1), ("cat".to_string(), 0)] }
    }
}

impl LabelScheme {
    pub fn label_for(&self, name: &str) -> Option<u32> {
        self.rules
            .iter()
            .find(|(pattern, _)| name.contains(pattern.as_str()))
            .map(|(_, label)| *label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEntry {
    pub name: String,
    pub label: u32,
}

impl LabelEntry {
    pub fn to_line(&self) -> String {
        format!("{},{}", self.name, self.label)
    }
}

/// Labels every name in order, failing on the first unrecognised one.
pub fn label_entries<I, S>(names: I, scheme: &LabelScheme) -> Result<Vec<LabelEntry>, LabelError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| {
            let name = name.as_ref();
            scheme
                .label_for(name)
                .map(|label| LabelEntry { name: name.to_string(), label })
                .ok_or_else(|| LabelError::Unrecognized(name.to_string()))
        })
        .collect()
}

/// Writes the label file for every entry of `root` (in file-name order).
/// Nothing is written unless every name is recognised.
pub fn write_label_file(root: &Path, out: &Path, scheme: &LabelScheme) -> Result<usize, LabelError> {
    let mut names = fs::read_dir(root)?
        .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<Result<Vec<_>, _>>()?;
    names.sort();

    let entries = label_entries(&names, scheme)?;

    let mut file = std::io::BufWriter::new(fs::File::create(out)?);
    for entry in &entries {
        writeln!(file, "{}", entry.to_line())?;
    }
    file.flush()?;
    info!("path_label is written in {}", out.display());
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_source_order() {
        let entries = label_entries(["dog1.png", "cat1.png"], &LabelScheme::default()).unwrap();
        let lines: Vec<String> = entries.iter().map(LabelEntry::to_line).collect();
        assert_eq!(lines, vec!["dog1.png,1", "cat1.png,0"]);
    }

    #[test]
    fn first_rule_wins() {
        assert_eq!(LabelScheme::default().label_for("catdog.png"), Some(1));
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = label_entries(["dog1.png", "bird.png"], &LabelScheme::default()).unwrap_err();
        assert!(matches!(err, LabelError::Unrecognized(ref n) if n == "bird.png"));
    }
}
