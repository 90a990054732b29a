use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use log::debug;
use walkdir::WalkDir;

use super::buffer::PixelBuffer;
use crate::RenderError;

/// Where an image comes from before it is decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
    /// A bundled sample, looked up by name in a [`SampleCatalog`].
    Sample(String),
}

impl ImageSource {
    /// Decode the source into a pixel buffer.
    pub fn acquire(&self, catalog: &SampleCatalog) -> Result<PixelBuffer, RenderError> {
        match self {
            ImageSource::Path(path) => decode_path(path),
            ImageSource::Bytes(bytes) => decode_bytes(bytes),
            ImageSource::Sample(name) => decode_path(catalog.resolve(name)?),
        }
    }

    /// Replace a sample reference with the file it names.
    pub fn resolve(self, catalog: &SampleCatalog) -> Result<ImageSource, RenderError> {
        match self {
            ImageSource::Sample(name) => Ok(ImageSource::Path(catalog.resolve(&name)?.into())),
            other => Ok(other),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

pub fn decode_bytes(bytes: &[u8]) -> Result<PixelBuffer, RenderError> {
    let image = image::load_from_memory(bytes)?;
    let buffer = PixelBuffer::from_image(&image);
    if buffer.is_empty() {
        return Err(RenderError::EmptyImage);
    }

    debug!("decoded {}x{} image from {} bytes", buffer.width(), buffer.height(), bytes.len());
    Ok(buffer)
}

pub fn decode_path(path: &Path) -> Result<PixelBuffer, RenderError> {
    let bytes =
        fs::read(path).map_err(|source| RenderError::Io { path: path.to_path_buf(), source })?;
    decode_bytes(&bytes)
}

/// Named sample images.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SampleCatalog {
    entries: BTreeMap<String, PathBuf>,
}

impl SampleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every image file directly inside `dir`, named by file stem.
    pub fn scan<P: AsRef<Path>>(dir: P) -> Result<Self, RenderError> {
        let dir = dir.as_ref();
        let mut catalog = Self::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|err| RenderError::Io {
                path: dir.to_path_buf(),
                source: err.into(),
            })?;
            if !entry.file_type().is_file() || ImageFormat::from_path(entry.path()).is_err() {
                continue;
            }

            let Some(stem) = entry.path().file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            catalog.insert(stem, entry.path());
        }

        debug!("found {} sample images in {}", catalog.len(), dir.display());
        Ok(catalog)
    }

    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.entries.insert(name.into(), path.into());
    }

    pub fn resolve(&self, name: &str) -> Result<&Path, RenderError> {
        self.entries
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| RenderError::UnknownSample(name.to_owned()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> + '_ {
        self.entries.iter().map(|(name, path)| (name.as_str(), path.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = decode_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, RenderError::Decode(_)));
        assert!(err.is_decode());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = decode_path(Path::new("/nonexistent/glyph-render/input.png")).unwrap_err();
        assert!(matches!(err, RenderError::Io { .. }));
    }

    #[test]
    fn unknown_sample_is_reported() {
        let catalog = SampleCatalog::new();
        let err = ImageSource::Sample("portrait".into()).acquire(&catalog).unwrap_err();
        assert!(matches!(err, RenderError::UnknownSample(name) if name == "portrait"));
    }

    #[test]
    fn resolve_maps_samples_to_paths() {
        let mut catalog = SampleCatalog::new();
        catalog.insert("portrait", "/samples/portrait.jpg");

        let source = ImageSource::Sample("portrait".into()).resolve(&catalog).unwrap();
        assert_eq!(source, ImageSource::Path("/samples/portrait.jpg".into()));

        let bytes = ImageSource::Bytes(vec![1, 2, 3]);
        assert_eq!(bytes.clone().resolve(&catalog).unwrap(), bytes);
    }
}
