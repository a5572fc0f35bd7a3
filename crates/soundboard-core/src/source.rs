//! Clips, recordings, and the sources playback can be started from.

use std::fmt;
use std::path::{Path, PathBuf};

const FILE_SCHEME: &str = "file://";

/// Opaque reference to an audio file shipped in the assets directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetHandle(&'static str);

impl AssetHandle {
    pub const fn new(file_name: &'static str) -> Self {
        Self(file_name)
    }

    /// File name of the asset inside the assets directory.
    pub fn file_name(&self) -> &'static str {
        self.0
    }

    /// Resolve this asset against an assets directory.
    pub fn resolve(&self, assets_dir: &Path) -> PathBuf {
        assets_dir.join(self.0)
    }
}

impl fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A bundled clip, playable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clip {
    pub name: &'static str,
    pub handle: AssetHandle,
}

impl Clip {
    pub const fn new(name: &'static str, file_name: &'static str) -> Self {
        Self {
            name,
            handle: AssetHandle::new(file_name),
        }
    }

    pub fn source(&self) -> ClipSource {
        ClipSource::Bundled(self.handle)
    }
}

/// A clip captured from the microphone during this session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub uri: String,
}

impl Recording {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    pub fn source(&self) -> ClipSource {
        ClipSource::Recorded(self.uri.clone())
    }
}

/// Anything that can be turned into playable audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipSource {
    /// A clip from the bundled catalog
    Bundled(AssetHandle),
    /// A locator returned by a finished capture
    Recorded(String),
}

impl fmt::Display for ClipSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipSource::Bundled(handle) => write!(f, "asset:{}", handle),
            ClipSource::Recorded(uri) => f.write_str(uri),
        }
    }
}

/// Build a `file://` locator for a path on local storage.
///
/// The locator only carries a path between the recorder and the player and
/// is read back by [`locator_path`]. It is not a URL: nothing is
/// percent-encoded, and non-UTF-8 path components are replaced lossily.
pub fn file_locator(path: &Path) -> String {
    format!("{}{}", FILE_SCHEME, path.display())
}

/// Turn a locator back into a path. Bare paths are accepted as-is.
pub fn locator_path(uri: &str) -> Option<PathBuf> {
    let path = uri.strip_prefix(FILE_SCHEME).unwrap_or(uri);
    if path.is_empty() {
        return None;
    }
    Some(PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_keeps_spaces_verbatim() {
        let path = Path::new("/home/me/My Recordings/recording-1.wav");
        let uri = file_locator(path);
        assert_eq!(uri, "file:///home/me/My Recordings/recording-1.wav");
        assert_eq!(locator_path(&uri).as_deref(), Some(path));
    }

    #[test]
    fn test_locator_round_trip() {
        let path = Path::new("/tmp/recordings/recording-1.wav");
        let uri = file_locator(path);
        assert_eq!(uri, "file:///tmp/recordings/recording-1.wav");
        assert_eq!(locator_path(&uri).as_deref(), Some(path));
    }

    #[test]
    fn test_locator_path_accepts_bare_paths() {
        assert_eq!(
            locator_path("/tmp/rec1.m4a"),
            Some(PathBuf::from("/tmp/rec1.m4a"))
        );
    }

    #[test]
    fn test_locator_path_rejects_empty() {
        assert_eq!(locator_path(""), None);
        assert_eq!(locator_path("file://"), None);
    }

    #[test]
    fn test_sources_keep_their_representation() {
        let clip = Clip::new("amen", "amen.mp3");
        assert_eq!(clip.source(), ClipSource::Bundled(AssetHandle::new("amen.mp3")));

        let recording = Recording::new("file:///tmp/rec1.m4a");
        assert_eq!(
            recording.source(),
            ClipSource::Recorded("file:///tmp/rec1.m4a".to_string())
        );
    }

    #[test]
    fn test_asset_resolve() {
        let handle = AssetHandle::new("amen.mp3");
        assert_eq!(
            handle.resolve(Path::new("/opt/assets")),
            PathBuf::from("/opt/assets/amen.mp3")
        );
    }
}
