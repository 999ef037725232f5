//! Batch image conversion: PNG sources to fixed-size RGB JPEGs.
//!
//! A job either names a single file or a directory. In directory mode only
//! entries with `.png` in their name are considered, and entries whose
//! destination already exists are skipped, so re-running a job only fills
//! the gaps.

pub mod job;
pub mod transform;

pub use job::{DecoderOptions, ImageJob};
pub use transform::{decode_partial_png, decode_with_repair, encode_jpeg, to_rgb_resized};

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::ConvertError;

const SOURCE_MARKER: &str = ".png";
const TARGET_MARKER: &str = ".jpg";

/// What a conversion run did.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConvertReport {
    /// Files written, in processing order.
    pub written: Vec<PathBuf>,
    /// Files that would have been written by a dry run.
    pub planned: Vec<PathBuf>,
    /// Directory entries left alone (no `.png`, or destination present).
    pub skipped: usize,
}

/// Destination path for a source file name: `dest_dir/name` with `.png`
/// replaced by `.jpg`.
pub fn destination_for(dest_dir: &Path, file_name: &str) -> PathBuf {
    dest_dir.join(file_name.replace(SOURCE_MARKER, TARGET_MARKER))
}

/// Runs `job`. A decode failure that survives the repair attempt stops the
/// run; files written before it are kept.
pub fn convert(job: &ImageJob) -> Result<ConvertReport, ConvertError> {
    if !job.src.exists() {
        return Err(ConvertError::MissingSource(job.src.clone()));
    }
    ensure_dir(&job.dest)?;

    let mut report = ConvertReport::default();
    if job.src.is_file() {
        let name = file_name(&job.src);
        let out = destination_for(&job.dest, &name);
        convert_file(job, &job.src, &out, &mut report)?;
    } else {
        for src in sorted_entries(&job.src)? {
            let name = file_name(&src);
            let out = destination_for(&job.dest, &name);
            if !name.contains(SOURCE_MARKER) || out.exists() || !src.is_file() {
                debug!(src = %src.display(), "skipping");
                report.skipped += 1;
                continue;
            }
            convert_file(job, &src, &out, &mut report)?;
        }
    }

    info!(
        written = report.written.len(),
        planned = report.planned.len(),
        skipped = report.skipped,
        "conversion finished"
    );
    Ok(report)
}

fn convert_file(job: &ImageJob, src: &Path, out: &Path, report: &mut ConvertReport) -> Result<(), ConvertError> {
    let bytes = fs::read(src).map_err(|source| ConvertError::Io { path: src.to_path_buf(), source })?;
    let img = decode_with_repair(&bytes, &job.decoder)
        .map_err(|source| ConvertError::Decode { path: src.to_path_buf(), source })?;
    let resized = to_rgb_resized(&img, job.width, job.height, job.filter);

    if job.dry_run {
        info!(src = %src.display(), dest = %out.display(), "dry run: would write");
        report.planned.push(out.to_path_buf());
        return Ok(());
    }

    // Encode fully before touching the destination.
    let encoded = encode_jpeg(&resized, job.quality)
        .map_err(|source| ConvertError::Encode { path: out.to_path_buf(), source })?;
    fs::write(out, encoded).map_err(|source| ConvertError::Io { path: out.to_path_buf(), source })?;
    info!(src = %src.display(), dest = %out.display(), "converted");
    report.written.push(out.to_path_buf());
    Ok(())
}

fn ensure_dir(dir: &Path) -> Result<(), ConvertError> {
    fs::create_dir_all(dir).map_err(|source| ConvertError::Io { path: dir.to_path_buf(), source })
}

/// Directory entries ordered by file name.
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    let io_err = |source| ConvertError::Io { path: dir.to_path_buf(), source };
    let mut entries = fs::read_dir(dir)
        .map_err(io_err)?
        .map(|e| e.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_replaces_png_marker() {
        let out = destination_for(Path::new("/out"), "00000831.png");
        assert_eq!(out, PathBuf::from("/out/00000831.jpg"));
        let out = destination_for(Path::new("/out"), "a.png.bak");
        assert_eq!(out, PathBuf::from("/out/a.jpg.bak"));
    }
}
