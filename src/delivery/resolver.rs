//! Path resolution with symlink-aware containment checks.
//!
//! Caller-supplied paths are joined below a [`StaticRoot`] in two steps:
//!
//! 1. Lexical normalization collapses `.` and `..`; a `..` that would climb
//!    above the root is rejected without touching the filesystem.
//! 2. Existing targets are canonicalized (resolving symlinks) and the
//!    canonical path must still start with the canonical root.
//!
//! Step 2 closes the symlink escape: a link inside the root that points
//! elsewhere canonicalizes outside the root and is refused.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, bail};
use tracing::warn;

use super::error::{DeliveryError, Result};
use crate::constants::OCTET_STREAM;

/// Which directory below the root a raw path is joined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootScope {
    /// `root/<download_folder>/<raw>` (ordinary attachment downloads).
    Download,
    /// `root/<raw>` (patch bundles and media playback).
    Direct,
}

/// Configured static directory. Read-only after construction.
#[derive(Debug, Clone)]
pub struct StaticRoot {
    base: PathBuf,
    download_folder: PathBuf,
}

/// A file guaranteed to live below the static root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    path: PathBuf,
    file_name: String,
    mime: Cow<'static, str>,
    len: u64,
}

impl StaticRoot {
    /// Canonicalize `base` and validate the download sub-folder.
    ///
    /// # Errors
    ///
    /// Returns an error if `base` is not an existing directory or the
    /// download folder is absolute or climbs out of `base`.
    pub fn new(base: impl AsRef<Path>, download_folder: impl AsRef<Path>) -> anyhow::Result<Self> {
        let base = base.as_ref();
        let base = base
            .canonicalize()
            .with_context(|| format!("Static root does not exist: {}", base.display()))?;
        if !base.is_dir() {
            bail!("Static root is not a directory: {}", base.display());
        }

        let mut folder = PathBuf::new();
        for component in download_folder.as_ref().components() {
            match component {
                Component::Normal(part) => folder.push(part),
                Component::CurDir => {},
                _ => bail!(
                    "Download folder must be a plain relative path: {}",
                    download_folder.as_ref().display()
                ),
            }
        }

        Ok(Self {
            base,
            download_folder: folder,
        })
    }

    /// The canonical root directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The download sub-folder, relative to [`base`](Self::base).
    pub fn download_folder(&self) -> &Path {
        &self.download_folder
    }

    /// Resolve `raw` below the directory selected by `scope`.
    ///
    /// # Errors
    ///
    /// - [`DeliveryError::Forbidden`] if the path escapes the root, lexically
    ///   or through a symlink, or contains a NUL byte
    /// - [`DeliveryError::NotFound`] if the target is missing or not a file
    pub fn resolve(&self, scope: RootScope, raw: &str) -> Result<ResolvedPath> {
        if raw.contains('\0') {
            warn!(path = %raw.escape_debug(), "Rejected path containing NUL byte");
            return Err(DeliveryError::forbidden(raw));
        }

        let candidate = self.join_lexically(scope, raw).inspect_err(|_| {
            warn!(path = %raw, "Path traversal attempt blocked");
        })?;

        let canonical = candidate
            .canonicalize()
            .map_err(|_| DeliveryError::not_found(&candidate))?;

        if !canonical.starts_with(&self.base) {
            warn!(
                path = %raw,
                target = %canonical.display(),
                "Symlink escape attempt blocked"
            );
            return Err(DeliveryError::forbidden(raw));
        }

        let meta = std::fs::metadata(&canonical).map_err(|_| DeliveryError::not_found(&canonical))?;
        if !meta.is_file() {
            return Err(DeliveryError::not_found(canonical));
        }

        let file_name = canonical
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = guess_content_type(&canonical);

        Ok(ResolvedPath {
            path: canonical,
            file_name,
            mime,
            len: meta.len(),
        })
    }

    /// Join without touching the filesystem, refusing to climb above `base`.
    fn join_lexically(&self, scope: RootScope, raw: &str) -> Result<PathBuf> {
        let mut joined = self.base.clone();
        let mut depth = 0usize;

        if scope == RootScope::Download {
            joined.push(&self.download_folder);
            depth = self.download_folder.components().count();
        }

        let relative = raw.trim_start_matches(['/', '\\']);
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => {
                    joined.push(part);
                    depth += 1;
                },
                Component::CurDir => {},
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(DeliveryError::forbidden(raw));
                    }
                    joined.pop();
                    depth -= 1;
                },
                Component::RootDir | Component::Prefix(_) => {
                    return Err(DeliveryError::forbidden(raw));
                },
            }
        }

        Ok(joined)
    }
}

impl ResolvedPath {
    /// Absolute canonical path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Basename, used for `Content-Disposition`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Resolved MIME type.
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// File size observed at resolution time.
    pub fn file_size(&self) -> u64 {
        self.len
    }
}

/// Guess content type from file extension using the `mime_guess` crate.
///
/// Returns `Cow<'static, str>` to avoid allocations for common media types.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use depot::delivery::guess_content_type;
///
/// assert_eq!(guess_content_type(Path::new("song.mp3")), "audio/mpeg");
/// assert_eq!(guess_content_type(Path::new("clip.mp4")), "video/mp4");
/// assert_eq!(guess_content_type(Path::new("blob.unknownext")), "application/octet-stream");
/// ```
pub fn guess_content_type(path: &Path) -> Cow<'static, str> {
    mime_guess::from_path(path)
        .first()
        .map_or(Cow::Borrowed(OCTET_STREAM), |mime| {
            match mime.essence_str() {
                "audio/mpeg" => Cow::Borrowed("audio/mpeg"),
                "audio/ogg" => Cow::Borrowed("audio/ogg"),
                "audio/wav" => Cow::Borrowed("audio/wav"),
                "audio/flac" => Cow::Borrowed("audio/flac"),
                "video/mp4" => Cow::Borrowed("video/mp4"),
                "video/webm" => Cow::Borrowed("video/webm"),
                "application/zip" => Cow::Borrowed("application/zip"),
                "application/pdf" => Cow::Borrowed("application/pdf"),
                other => Cow::Owned(other.to_string()),
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DeliveryErrorKind;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn fixture() -> (TempDir, StaticRoot) {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("downloads/docs")).unwrap();
        fs::create_dir_all(dir.path().join("media")).unwrap();
        fs::write(dir.path().join("downloads/docs/report.pdf"), b"%PDF").unwrap();
        fs::write(dir.path().join("media/track.mp3"), b"ID3....").unwrap();
        fs::write(dir.path().join("patch.zip"), b"PK").unwrap();
        let root = StaticRoot::new(dir.path(), "downloads").unwrap();
        (dir, root)
    }

    #[test]
    fn test_resolve_download_scope() {
        let (_dir, root) = fixture();
        let resolved = root.resolve(RootScope::Download, "docs/report.pdf").unwrap();
        assert!(resolved.path().starts_with(root.base()));
        assert!(resolved.path().ends_with("downloads/docs/report.pdf"));
        assert_eq!(resolved.file_name(), "report.pdf");
        assert_eq!(resolved.mime(), "application/pdf");
        assert_eq!(resolved.file_size(), 4);
    }

    #[test]
    fn test_resolve_direct_scope() {
        let (_dir, root) = fixture();
        let resolved = root.resolve(RootScope::Direct, "patch.zip").unwrap();
        assert!(resolved.path().ends_with("patch.zip"));
        assert_eq!(resolved.mime(), "application/zip");

        // Patch scope does not see the download folder implicitly.
        let err = root.resolve(RootScope::Direct, "docs/report.pdf").unwrap_err();
        assert_eq!(err.kind(), DeliveryErrorKind::NotFound);
    }

    #[test]
    fn test_leading_slash_stays_relative() {
        let (_dir, root) = fixture();
        let resolved = root.resolve(RootScope::Direct, "/media/track.mp3").unwrap();
        assert_eq!(resolved.mime(), "audio/mpeg");
    }

    #[test]
    fn test_dot_segments_inside_root_are_collapsed() {
        let (_dir, root) = fixture();
        let resolved = root
            .resolve(RootScope::Direct, "media/./../media/track.mp3")
            .unwrap();
        assert_eq!(resolved.file_name(), "track.mp3");
    }

    #[test]
    fn test_traversal_is_forbidden_whether_or_not_target_exists() {
        let (_dir, root) = fixture();
        for raw in ["../../etc/passwd", "../../../../definitely/not/here", "docs/../../../x"] {
            let err = root.resolve(RootScope::Download, raw).unwrap_err();
            assert_eq!(err.kind(), DeliveryErrorKind::Forbidden, "raw path: {raw}");
        }
        let err = root.resolve(RootScope::Direct, "../outside.txt").unwrap_err();
        assert_eq!(err.kind(), DeliveryErrorKind::Forbidden);
    }

    #[test]
    fn test_nul_byte_is_forbidden() {
        let (_dir, root) = fixture();
        let err = root.resolve(RootScope::Direct, "patch.zip\0.txt").unwrap_err();
        assert_eq!(err.kind(), DeliveryErrorKind::Forbidden);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let (_dir, root) = fixture();
        let err = root.resolve(RootScope::Download, "docs/missing.pdf").unwrap_err();
        assert_eq!(err.kind(), DeliveryErrorKind::NotFound);
    }

    #[test]
    fn test_directory_is_not_found() {
        let (_dir, root) = fixture();
        let err = root.resolve(RootScope::Direct, "media").unwrap_err();
        assert_eq!(err.kind(), DeliveryErrorKind::NotFound);
    }

    #[test]
    fn test_download_folder_must_stay_inside_root() {
        let dir = tempdir().unwrap();
        assert!(StaticRoot::new(dir.path(), "../elsewhere").is_err());
        assert!(StaticRoot::new(dir.path(), "/abs").is_err());
        assert!(StaticRoot::new(dir.path().join("missing"), "downloads").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_is_forbidden() {
        use std::os::unix::fs::symlink;

        let (dir, root) = fixture();
        let outside = tempdir().unwrap();
        fs::write(outside.path().join("secret.txt"), b"secret").unwrap();
        symlink(
            outside.path().join("secret.txt"),
            dir.path().join("media/leak.txt"),
        )
        .unwrap();

        let err = root.resolve(RootScope::Direct, "media/leak.txt").unwrap_err();
        assert_eq!(err.kind(), DeliveryErrorKind::Forbidden);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_within_root_is_allowed() {
        use std::os::unix::fs::symlink;

        let (dir, root) = fixture();
        symlink(
            dir.path().join("media/track.mp3"),
            dir.path().join("media/alias.mp3"),
        )
        .unwrap();

        let resolved = root.resolve(RootScope::Direct, "media/alias.mp3").unwrap();
        assert!(resolved.path().ends_with("media/track.mp3"));
    }

    #[test]
    fn test_guess_content_type_fallback() {
        assert_eq!(guess_content_type(Path::new("file.zzzunknown")), OCTET_STREAM);
        assert_eq!(guess_content_type(Path::new("no_extension")), OCTET_STREAM);
        assert_eq!(guess_content_type(Path::new("movie.webm")), "video/webm");
    }
}
