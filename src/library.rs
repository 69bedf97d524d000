use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "webm", "m4a", "wav"];

pub trait LibraryStore: Send {
    fn root(&self) -> &Path;
    /// File names of every audio file in the library directory, sorted.
    fn list(&self) -> Result<Vec<String>>;
    fn remove(&self, name: &str) -> Result<()>;
}

/// A flat directory of audio files.
#[derive(Debug, Clone)]
pub struct DirectoryLibrary {
    root: PathBuf,
}

impl DirectoryLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl LibraryStore for DirectoryLibrary {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            warn!(root = %self.root.display(), "library directory missing, treating as empty");
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() || !is_audio(entry.path()) {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        names.sort();
        debug!(count = names.len(), "library listed");
        Ok(names)
    }

    fn remove(&self, name: &str) -> Result<()> {
        if !is_plain_file_name(name) {
            anyhow::bail!("refusing to delete {name:?}: not a plain file name");
        }
        let path = self.path_for(name);
        fs::remove_file(&path).with_context(|| format!("failed to delete {}", path.display()))
    }
}

pub fn is_audio(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    AUDIO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}

/// True when `name` is exactly one path component. Backslashes only count as
/// separators on Windows.
pub fn is_plain_file_name(name: &str) -> bool {
    if cfg!(windows) && name.contains('\\') {
        return false;
    }
    Path::new(name).file_name() == Some(OsStr::new(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn list_filters_by_extension_and_sorts() {
        let dir = tempdir().expect("tempdir");
        for name in ["b.webm", "a.MP3", "notes.txt", "c.flac", "d.wav", "e.m4a"] {
            fs::write(dir.path().join(name), b"x").expect("fixture");
        }
        fs::create_dir(dir.path().join("nested.mp3")).expect("dir");

        let library = DirectoryLibrary::new(dir.path());
        let names = library.list().expect("list");
        assert_eq!(names, vec!["a.MP3", "b.webm", "d.wav", "e.m4a"]);
    }

    #[test]
    fn missing_directory_lists_empty() {
        let dir = tempdir().expect("tempdir");
        let library = DirectoryLibrary::new(dir.path().join("absent"));
        assert!(library.list().expect("list").is_empty());
    }

    #[test]
    fn remove_deletes_file() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("song.mp3"), b"x").expect("fixture");
        let library = DirectoryLibrary::new(dir.path());

        library.remove("song.mp3").expect("remove");
        assert!(library.list().expect("list").is_empty());
    }

    #[test]
    fn remove_missing_file_fails() {
        let dir = tempdir().expect("tempdir");
        let library = DirectoryLibrary::new(dir.path());
        assert!(library.remove("ghost.mp3").is_err());
    }

    #[test]
    fn remove_rejects_paths() {
        let dir = tempdir().expect("tempdir");
        let library = DirectoryLibrary::new(dir.path());
        assert!(library.remove("../escape.mp3").is_err());
        assert!(library.remove("").is_err());
    }

    #[test]
    fn plain_file_names_are_single_components() {
        assert!(is_plain_file_name("song.mp3"));
        assert!(is_plain_file_name(".hidden.mp3"));
        assert!(!is_plain_file_name(""));
        assert!(!is_plain_file_name("."));
        assert!(!is_plain_file_name(".."));
        assert!(!is_plain_file_name("dir/song.mp3"));
        assert!(!is_plain_file_name("song.mp3/"));
        assert_eq!(is_plain_file_name(r"AC\DC - Thunder.mp3"), !cfg!(windows));
    }

    #[cfg(unix)]
    #[test]
    fn backslash_names_list_and_remove_on_unix() {
        let dir = tempdir().expect("tempdir");
        let name = r"AC\DC - Thunder.mp3";
        fs::write(dir.path().join(name), b"x").expect("fixture");
        let library = DirectoryLibrary::new(dir.path());

        assert_eq!(library.list().expect("list"), vec![name.to_string()]);
        library.remove(name).expect("remove");
        assert!(library.list().expect("list").is_empty());
    }
}
