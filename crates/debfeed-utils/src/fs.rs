use std::{
    fs::{self, OpenOptions, Permissions},
    io::Write,
    os::unix::fs::{symlink, OpenOptionsExt, PermissionsExt},
    path::Path,
};

use crate::error::{FileSystemError, FileSystemResult, FsOp};

pub trait FileSystemProvider {
    /// Removes the specified file or directory safely.
    ///
    /// If the path does not exist, this function returns `Ok(())` without error. If the path
    /// points to a directory, it and all of its contents are removed recursively, equivalent to
    /// [`std::fs::remove_dir_all`]. If the path points to a file or a symlink (dangling or
    /// not), it is removed with [`std::fs::remove_file`].
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError::Io`] if the removal fails for any reason other than the path
    /// not existing.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use debfeed_utils::error::FileSystemResult;
    /// use debfeed_utils::fs::{FileSystemProvider, StandardFileSystemProvider};
    ///
    /// fn main() -> FileSystemResult<()> {
    ///     let fs = StandardFileSystemProvider;
    ///     fs.safe_remove("/etc/apt/sources.list.d/acme.list")?;
    ///     Ok(())
    /// }
    /// ```
    fn safe_remove<P: AsRef<Path>>(&self, path: P) -> FileSystemResult<()>;

    /// Creates a directory structure if it doesn't exist.
    ///
    /// If the directory already exists, this function does nothing. If the path exists but is
    /// not a directory, this function returns an error.
    ///
    /// # Errors
    ///
    /// * [`FileSystemError::Io`] if the directory could not be created.
    /// * [`FileSystemError::NotADirectory`] if the path exists but is not a directory.
    fn ensure_dir_exists<P: AsRef<Path>>(&self, path: P) -> FileSystemResult<()>;

    /// Writes `contents` to `path`, replacing any previous content.
    ///
    /// When `mode` is given, the permission bits are applied before any byte is written, so a
    /// pre-existing file with wider permissions never holds the new contents.
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError::Io`] if the file cannot be opened, chmod'ed or written.
    fn write_file<P: AsRef<Path>>(
        &self,
        path: P,
        contents: &[u8],
        mode: Option<u32>,
    ) -> FileSystemResult<()>;

    /// Points `link` at `target`, replacing whatever currently lives at `link`.
    ///
    /// Directories at `link` are not replaced; that is reported as an error.
    ///
    /// # Errors
    ///
    /// * [`FileSystemError::Io`] if the existing entry cannot be removed.
    /// * [`FileSystemError::Symlink`] if the link cannot be created.
    fn force_symlink<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        target: P,
        link: Q,
    ) -> FileSystemResult<()>;
}

#[derive(Default, Clone)]
pub struct StandardFileSystemProvider;

impl FileSystemProvider for StandardFileSystemProvider {
    fn safe_remove<P: AsRef<Path>>(&self, path: P) -> FileSystemResult<()> {
        let path = path.as_ref();

        // `exists` follows symlinks, so a dangling link would be skipped
        if !path.exists() && !path.is_symlink() {
            return Ok(());
        }

        let result = if path.is_dir() && !path.is_symlink() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };

        result.map_err(|source| FileSystemError::Io {
            op: FsOp::Remove,
            path: path.to_path_buf(),
            source,
        })
    }

    fn ensure_dir_exists<P: AsRef<Path>>(&self, path: P) -> FileSystemResult<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path).map_err(|source| FileSystemError::Io {
                op: FsOp::CreateDir,
                path: path.to_path_buf(),
                source,
            })?;
        } else if !path.is_dir() {
            return Err(FileSystemError::NotADirectory(path.to_path_buf()));
        }

        Ok(())
    }

    fn write_file<P: AsRef<Path>>(
        &self,
        path: P,
        contents: &[u8],
        mode: Option<u32>,
    ) -> FileSystemResult<()> {
        let path = path.as_ref();
        let file_error = |op, source| {
            FileSystemError::Io {
                op,
                path: path.to_path_buf(),
                source,
            }
        };

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        if let Some(mode) = mode {
            options.mode(mode);
        }

        let mut file = options.open(path).map_err(|err| file_error(FsOp::Open, err))?;
        if let Some(mode) = mode {
            file.set_permissions(Permissions::from_mode(mode))
                .map_err(|err| file_error(FsOp::Chmod, err))?;
        }
        file.write_all(contents)
            .map_err(|err| file_error(FsOp::Write, err))?;
        file.flush().map_err(|err| file_error(FsOp::Write, err))
    }

    fn force_symlink<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        target: P,
        link: Q,
    ) -> FileSystemResult<()> {
        let target = target.as_ref();
        let link = link.as_ref();

        if link.is_symlink() || link.is_file() {
            fs::remove_file(link).map_err(|source| FileSystemError::Io {
                op: FsOp::Remove,
                path: link.to_path_buf(),
                source,
            })?;
        }

        symlink(target, link).map_err(|source| FileSystemError::Symlink {
            link: link.to_path_buf(),
            target: target.to_path_buf(),
            source,
        })
    }
}

/// Creates a directory structure if it doesn't exist.
///
/// See [`FileSystemProvider::ensure_dir_exists`] for detailed documentation.
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    StandardFileSystemProvider.ensure_dir_exists(path)
}

/// Removes the specified file or directory safely.
///
/// See [`FileSystemProvider::safe_remove`] for detailed documentation.
pub fn safe_remove<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    StandardFileSystemProvider.safe_remove(path)
}

/// Writes a file, optionally restricting its permission bits.
///
/// See [`FileSystemProvider::write_file`] for detailed documentation.
pub fn write_file<P: AsRef<Path>>(
    path: P,
    contents: &[u8],
    mode: Option<u32>,
) -> FileSystemResult<()> {
    StandardFileSystemProvider.write_file(path, contents, mode)
}

/// Replaces `link` with a symlink to `target`.
///
/// See [`FileSystemProvider::force_symlink`] for detailed documentation.
pub fn force_symlink<P: AsRef<Path>, Q: AsRef<Path>>(target: P, link: Q) -> FileSystemResult<()> {
    StandardFileSystemProvider.force_symlink(target, link)
}
