//! File conversion staged through a scoped temporary file.
//!
//! The converted bytes are written to a fresh temporary file first. Only
//! once the whole source has been converted and synced is the destination
//! opened and filled, so a failed conversion never touches it.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bitflags::bitflags;
use tempfile::NamedTempFile;
use tracing::{debug, trace, warn};

use crate::pipeline::{Conversion, Pipeline};
use crate::{Charset, Result};

bitflags! {
    /// How the destination file is opened
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenMode: u8 {
        /// Open for reading
        const READ = 1;
        /// Open for writing
        const WRITE = 1 << 1;
        /// Append instead of overwriting
        const APPEND = 1 << 2;
        /// Create the file if it does not exist
        const CREATE = 1 << 3;
        /// Truncate an existing file
        const TRUNCATE = 1 << 4;
        /// Fail if the file already exists
        const CREATE_NEW = 1 << 5;

        /// `O_RDWR | O_CREAT | O_TRUNC`
        const CREATE_OR_TRUNCATE = Self::READ.bits()
            | Self::WRITE.bits()
            | Self::CREATE.bits()
            | Self::TRUNCATE.bits();
    }
}

impl Default for OpenMode {
    fn default() -> Self {
        OpenMode::CREATE_OR_TRUNCATE
    }
}

impl OpenMode {
    /// Translate to [`OpenOptions`].
    ///
    /// Invalid combinations, e.g. `TRUNCATE` without `WRITE`, are reported
    /// by the open call itself.
    pub fn to_open_options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options
            .read(self.contains(OpenMode::READ))
            .write(self.contains(OpenMode::WRITE))
            .append(self.contains(OpenMode::APPEND))
            .create(self.contains(OpenMode::CREATE))
            .truncate(self.contains(OpenMode::TRUNCATE))
            .create_new(self.contains(OpenMode::CREATE_NEW));
        options
    }
}

/// Converts files, staging output in a temporary file
#[derive(Debug, Clone)]
pub struct FileConverter<'r> {
    pipeline: Pipeline<'r>,
    temp_dir: Option<PathBuf>,
}

impl Default for FileConverter<'static> {
    fn default() -> Self {
        FileConverter::new(Pipeline::default())
    }
}

impl<'r> FileConverter<'r> {
    /// Create a converter streaming through `pipeline`
    pub fn new(pipeline: Pipeline<'r>) -> Self {
        Self {
            pipeline,
            temp_dir: None,
        }
    }

    /// Stage temporary files in `dir` instead of the system temp directory
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// The pipeline conversions run through
    pub fn pipeline(&self) -> &Pipeline<'r> {
        &self.pipeline
    }

    /// Convert the file at `src_path` from `src_charset` into `dest_path` in
    /// `dest_charset`, opening the destination with `mode`.
    ///
    /// Returns the number of bytes written to the destination.
    ///
    /// # Errors
    ///
    /// Charset errors are reported before any file is opened. I/O errors
    /// while reading the source or converting leave the destination as it
    /// was.
    pub fn convert_file(
        &self,
        src_path: impl AsRef<Path>,
        dest_path: impl AsRef<Path>,
        mode: OpenMode,
        src_charset: &str,
        dest_charset: &str,
    ) -> Result<u64> {
        let (src_path, dest_path) = (src_path.as_ref(), dest_path.as_ref());
        let conversion = self.pipeline.plan(src_charset, dest_charset)?;
        let src = File::open(src_path)?;
        let written = self.stage(conversion, src, dest_path, mode)?;
        debug!(src = %src_path.display(), dest = %dest_path.display(), written, "converted file");
        Ok(written)
    }

    /// Encode a UTF-8 file into `dest_charset`
    pub fn encode_file(
        &self,
        src_path: impl AsRef<Path>,
        dest_path: impl AsRef<Path>,
        mode: OpenMode,
        dest_charset: &str,
    ) -> Result<u64> {
        self.convert_file(src_path, dest_path, mode, Charset::UTF8.name(), dest_charset)
    }

    /// Decode a file in `src_charset` into UTF-8
    pub fn decode_file(
        &self,
        src_path: impl AsRef<Path>,
        dest_path: impl AsRef<Path>,
        mode: OpenMode,
        src_charset: &str,
    ) -> Result<u64> {
        self.convert_file(src_path, dest_path, mode, src_charset, Charset::UTF8.name())
    }

    /// Convert an arbitrary reader into `dest_path`, with the same staging
    /// as [`FileConverter::convert_file`].
    pub fn convert_reader_to_file<R: Read>(
        &self,
        src: R,
        dest_path: impl AsRef<Path>,
        mode: OpenMode,
        src_charset: &str,
        dest_charset: &str,
    ) -> Result<u64> {
        let conversion = self.pipeline.plan(src_charset, dest_charset)?;
        self.stage(conversion, src, dest_path.as_ref(), mode)
    }

    /// Decode the file at `path` from `charset` into UTF-8 bytes in memory
    pub fn decode_file_to_vec(&self, path: impl AsRef<Path>, charset: &str) -> Result<Vec<u8>> {
        let conversion = self.pipeline.plan(charset, Charset::UTF8.name())?;
        let mut out = Vec::new();
        conversion.run(File::open(path)?, &mut out)?;
        Ok(out)
    }

    /// Encode the UTF-8 file at `path` into `charset` in memory
    pub fn encode_file_to_vec(&self, path: impl AsRef<Path>, charset: &str) -> Result<Vec<u8>> {
        let conversion = self.pipeline.plan(Charset::UTF8.name(), charset)?;
        let mut out = Vec::new();
        conversion.run(File::open(path)?, &mut out)?;
        Ok(out)
    }

    fn stage<R: Read>(&self, conversion: Conversion, src: R, dest_path: &Path, mode: OpenMode) -> Result<u64> {
        let mut staging = match &self.temp_dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };
        trace!(staging = %staging.path().display(), "created staging file");

        let result = copy_through(conversion, src, staging.as_file_mut(), dest_path, mode);
        discard(staging);
        result
    }
}

fn copy_through<R: Read>(
    conversion: Conversion,
    src: R,
    staging: &mut File,
    dest_path: &Path,
    mode: OpenMode,
) -> Result<u64> {
    conversion.run(src, &mut *staging)?;
    staging.sync_all()?;
    staging.seek(SeekFrom::Start(0))?;

    let mut dest = mode.to_open_options().open(dest_path)?;
    let written = io::copy(staging, &mut dest)?;
    dest.flush()?;
    Ok(written)
}

/// Delete the staging file; failure is logged, never returned
fn discard(staging: NamedTempFile) {
    let path = staging.path().to_owned();
    if let Err(err) = staging.close() {
        warn!(staging = %path.display(), error = %err, "failed to remove staging file");
    }
}
