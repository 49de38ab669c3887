use std::borrow::Cow;
use std::fs;
use std::path::PathBuf;

use crate::shared::error::PipelineError;

/// An encoded image handed to the pipeline.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageSource {
    /// A file on disk, read in full before decoding.
    Path(PathBuf),
    /// An encoded buffer already in memory (PNG, JPEG, ...).
    Bytes(Vec<u8>),
}

impl ImageSource {
    pub fn read_bytes(&self) -> Result<Cow<'_, [u8]>, PipelineError> {
        match self {
            ImageSource::Path(path) => fs::read(path)
                .map(Cow::Owned)
                .map_err(|source| PipelineError::Io {
                    path: path.clone(),
                    source,
                }),
            ImageSource::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
        }
    }

    /// Short label for log lines.
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}
