use std::path::{Path, PathBuf};

use image::imageops::FilterType;

pub const DEFAULT_WIDTH: u32 = 960;
pub const DEFAULT_HEIGHT: u32 = 540;
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Decoder behaviour, fixed when a job is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// On a failed decode, make one repair attempt: load the rows a cut-off
    /// PNG still holds, or append a JPEG end-of-image marker (`FF D9`) to
    /// any other stream and decode again.
    pub repair_truncated: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions { repair_truncated: true }
    }
}

/// One converter invocation: where to read, where to write, and how.
#[derive(Debug, Clone)]
pub struct ImageJob {
    pub src: PathBuf,
    pub dest: PathBuf,
    pub width: u32,
    pub height: u32,
    pub filter: FilterType,
    pub quality: u8,
    pub decoder: DecoderOptions,
    /// Decode and resize but write nothing.
    pub dry_run: bool,
}

impl ImageJob {
    /// A job with the default 960×540 bilinear resize and truncated-image repair.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dest: Q) -> ImageJob {
        ImageJob {
            src: src.as_ref().to_path_buf(),
            dest: dest.as_ref().to_path_buf(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            filter: FilterType::Triangle,
            quality: DEFAULT_JPEG_QUALITY,
            decoder: DecoderOptions::default(),
            dry_run: false,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> ImageJob {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_quality(mut self, quality: u8) -> ImageJob {
        self.quality = quality.clamp(1, 100);
        self
    }

    pub fn with_decoder(mut self, decoder: DecoderOptions) -> ImageJob {
        self.decoder = decoder;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> ImageJob {
        self.dry_run = dry_run;
        self
    }
}
