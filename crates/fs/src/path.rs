//! Path normalisation.
//!
//! Every path handed to the updater is absolute. Two spellings of the same
//! path (`/a//b/./c/`, `/a/b/c`) must map to the same interned id, so all
//! paths pass through [`normalize`] before they are used as keys.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Normalises an absolute path.
///
/// Duplicate separators, `.` components and trailing slashes are removed and
/// `..` is resolved lexically. Relative paths, paths that climb above the
/// root and paths containing NUL bytes are rejected with
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use qmlsync_fs::normalize_path;
/// assert_eq!(normalize_path("/qml//QtQuick/./Controls/").unwrap(), Path::new("/qml/QtQuick/Controls"));
/// assert_eq!(normalize_path("/qml/QtQuick/../Other").unwrap(), Path::new("/qml/Other"));
/// assert!(normalize_path("relative/path").is_err());
/// assert!(normalize_path("/../etc").is_err());
/// ```
pub fn normalize(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let mut components = original.components();
    if components.next() != Some(Component::RootDir) {
        exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
    }
    let mut parts = Vec::new();
    for component in components {
        match component {
            Component::Normal(s) => {
                // NUL bytes survive Path::components() but truncate in syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
                parts.push(s);
            },
            Component::CurDir => {},
            Component::ParentDir => {
                if parts.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
            },
            Component::RootDir | Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(original.to_path_buf())),
        }
    }
    let mut normalized = PathBuf::from("/");
    normalized.extend(parts);
    Ok(normalized)
}

/// Splits a normalised path into its directory and file name.
///
/// Returns `None` for the root directory and for file names that are not
/// valid UTF-8 (they can never be interned).
pub fn split(path: &Path) -> Option<(&Path, &str)> {
    Some((path.parent()?, file_name(path)?))
}

/// File name component of a path as a string slice.
pub fn file_name(path: &Path) -> Option<&str> {
    path.file_name()?.to_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/qml/QtQuick", "/qml/QtQuick")]
    #[case("/qml//QtQuick", "/qml/QtQuick")]
    #[case("/qml/./QtQuick/.", "/qml/QtQuick")]
    #[case("/qml/QtQuick/", "/qml/QtQuick")]
    #[case("/qml/QtQuick///", "/qml/QtQuick")]
    #[case("/qml/Other/../QtQuick", "/qml/QtQuick")]
    #[case("/", "/")]
    #[case("//", "/")]
    fn test_normalize(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("")]
    #[case("qml/QtQuick")]
    #[case("./qml")]
    #[case("/..")]
    #[case("/qml/../../etc")]
    #[case("/qml\0/QtQuick")]
    fn test_normalize_rejects(#[case] input: &str) {
        let err = normalize(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[test]
    fn test_split() {
        let path = Path::new("/qml/QtQuick/qmldir");
        assert_eq!(split(path), Some((Path::new("/qml/QtQuick"), "qmldir")));
        assert_eq!(split(Path::new("/qmldir")), Some((Path::new("/"), "qmldir")));
        assert_eq!(split(Path::new("/")), None);
    }
}
