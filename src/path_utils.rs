use std::{
    cmp::Ordering,
    ffi::OsStr,
    path::{Path, PathBuf},
};

/// Suffix used by rotation tools for compressed files
pub const COMPRESSED_EXTENSION: &str = "gz";

/// Add extension to existing PathBuf
///
/// ## Example
///
/// ```rust
/// use std::path::PathBuf;
/// let original_path = "/var/log/mail.log.1".into();
/// let compressed_path = logtail::path_utils::append_extension(original_path, "gz");
/// assert_eq!(compressed_path, PathBuf::from("/var/log/mail.log.1.gz"));
/// ```
pub fn append_extension(path: PathBuf, ext: impl AsRef<OsStr>) -> PathBuf {
    let mut os_string: std::ffi::OsString = path.into();
    os_string.push(".");
    os_string.push(ext.as_ref());
    os_string.into()
}

/// Check whether `path` names a gzip-compressed file (judged by the `.gz` suffix only)
pub fn is_compressed(path: impl AsRef<Path>) -> bool {
    path.as_ref().extension() == Some(OsStr::new(COMPRESSED_EXTENSION))
}

/// Name of the file with any `.gz` suffix stripped
///
/// This is the name recorded in checkpoints, so that `app.log.1` and `app.log.1.gz` are the same logical file.
///
/// ```rust
/// use std::path::PathBuf;
/// use logtail::path_utils::logical_name;
/// assert_eq!(logical_name("/var/log/app.log.1.gz"), PathBuf::from("/var/log/app.log.1"));
/// assert_eq!(logical_name("/var/log/app.log.1"), PathBuf::from("/var/log/app.log.1"));
/// ```
pub fn logical_name(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if is_compressed(path) {
        path.with_extension("")
    } else {
        path.to_path_buf()
    }
}

/// Check whether `candidate` is `current` with `.gz` appended, i.e. the same file compressed in place
pub fn is_compressed_form_of(candidate: &Path, current: &Path) -> bool {
    is_compressed(candidate)
        && candidate == append_extension(current.to_path_buf(), COMPRESSED_EXTENSION)
}

/// Byte-wise lexical ordering of full file names, which is assumed to match rotation order
pub fn compare_names(a: &Path, b: &Path) -> Ordering {
    a.as_os_str().cmp(b.as_os_str())
}
