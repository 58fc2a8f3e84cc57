use std::{io, os::unix::prelude::MetadataExt, path::Path};

/// Identity of a file on disk, stable across renames and distinct for a file recreated under the same name
///
/// Built from device id and inode number, so a truncated-and-recreated `sys.log` compares unequal to the one
/// that was read before, even though the path did not change.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    pub dev: u64,
    pub inode: u64,
}

impl FileIdentity {
    /// Ask the filesystem for metadata and return identity of fs object specified by `path`
    pub fn of_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        Ok(Self {
            dev: metadata.dev(),
            inode: metadata.ino(),
        })
    }
}
