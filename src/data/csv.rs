//! Tabular classification datasets.
//!
//! Format: UTF-8, comma-separated, features first and an integer class
//! index in the last column. A first row containing any non-numeric cell is
//! treated as a header and skipped.

use std::path::Path;

use crate::error::DataError;

/// Features and class indices, row-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub inputs: Vec<Vec<f64>>,
    pub classes: Vec<usize>,
    pub num_classes: usize,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn num_features(&self) -> usize {
        self.inputs.first().map(|r| r.len()).unwrap_or(0)
    }

    /// Splits off the last `fraction` of rows as a validation set.
    pub fn split(mut self, fraction: f64) -> (Dataset, Dataset) {
        let n_val = ((self.len() as f64) * fraction.clamp(0.0, 1.0)).round() as usize;
        let at = self.len() - n_val;
        let val = Dataset {
            inputs: self.inputs.split_off(at),
            classes: self.classes.split_off(at),
            num_classes: self.num_classes,
        };
        (self, val)
    }
}

pub fn load_csv(path: &Path) -> Result<Dataset, DataError> {
    let text = std::fs::read_to_string(path)?;
    parse_csv(&text)
}

/// Parses CSV text. `num_classes` is one more than the largest class index.
pub fn parse_csv(text: &str) -> Result<Dataset, DataError> {
    let mut lines = text.lines().enumerate().peekable();

    if let Some((_, first)) = lines.peek() {
        if is_header(first) {
            lines.next();
        }
    }

    let mut inputs: Vec<Vec<f64>> = Vec::new();
    let mut classes: Vec<usize> = Vec::new();

    for (idx, line) in lines {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        let Some((label, features)) = cells.split_last() else {
            continue;
        };
        if features.is_empty() {
            return Err(DataError::Parse {
                line: line_no,
                message: format!("expected features and a class index, got {} column", cells.len()),
            });
        }
        let class: usize = label.parse().map_err(|_| DataError::Parse {
            line: line_no,
            message: format!("class index '{}' is not a non-negative integer", label),
        })?;
        let feats = features
            .iter()
            .map(|c| {
                c.parse::<f64>().map_err(|_| DataError::Parse {
                    line: line_no,
                    message: format!("'{}' is not a valid number", c),
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        if let Some(first) = inputs.first() {
            if first.len() != feats.len() {
                return Err(DataError::Parse {
                    line: line_no,
                    message: format!("feature count {} does not match first row's {}", feats.len(), first.len()),
                });
            }
        }
        inputs.push(feats);
        classes.push(class);
    }

    if inputs.is_empty() {
        return Err(DataError::Empty);
    }
    let num_classes = classes.iter().max().map(|m| m + 1).unwrap_or(0);
    Ok(Dataset { inputs, classes, num_classes })
}

/// Returns `true` if the row looks like a header (any cell non-numeric).
fn is_header(line: &str) -> bool {
    line.split(',').any(|c| {
        let t = c.trim();
        !t.is_empty() && t.parse::<f64>().is_err()
    })
}

/// `n` samples of 2D "two blobs" data with deterministic spread.
/// Class 0 is centred at (0.3, 0.3), class 1 at (0.7, 0.7).
pub fn builtin_blobs(n: usize) -> Dataset {
    let centers = [(0.3f64, 0.3f64), (0.7f64, 0.7f64)];
    let mut inputs = Vec::with_capacity(n);
    let mut classes = Vec::with_capacity(n);
    for i in 0..n {
        let class = i % 2;
        let (cx, cy) = centers[class];
        let angle = i as f64 * 2.399;
        let r = 0.12 * (i as f64 * 0.31).sin().abs();
        inputs.push(vec![
            (cx + r * angle.cos()).clamp(0.0, 1.0),
            (cy + r * angle.sin()).clamp(0.0, 1.0),
        ]);
        classes.push(class);
    }
    Dataset { inputs, classes, num_classes: 2 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_skipped_and_classes_counted() {
        let ds = parse_csv("x,y,label\n0.1,0.2,0\n0.3,0.4,2\n").unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.num_classes, 3);
        assert_eq!(ds.inputs[1], vec![0.3, 0.4]);
    }

    #[test]
    fn bad_class_reports_line() {
        let err = parse_csv("0.1,0.2,0\n0.3,0.4,x\n").unwrap_err();
        assert!(matches!(err, DataError::Parse { line: 2, .. }));
    }

    #[test]
    fn split_keeps_tail_for_validation() {
        let (train, val) = builtin_blobs(10).split(0.2);
        assert_eq!(train.len(), 8);
        assert_eq!(val.len(), 2);
        assert_eq!(val.classes, vec![0, 1]);
    }
}
