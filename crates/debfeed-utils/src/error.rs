use std::{error::Error, fmt, io, path::PathBuf};

#[derive(Debug)]
pub enum PathError {
    Empty,
    CurrentDir(io::Error),
    UnsetVariable { name: String, path: String },
    UnterminatedVariable { path: String },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Empty => write!(f, "empty path"),
            PathError::CurrentDir(err) => {
                write!(f, "cannot determine the working directory: {err}")
            }
            PathError::UnsetVariable { name, path } => {
                write!(f, "`${name}` in `{path}` is not set")
            }
            PathError::UnterminatedVariable { path } => write!(f, "missing `}}` in `{path}`"),
        }
    }
}

impl Error for PathError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PathError::CurrentDir(err) => Some(err),
            _ => None,
        }
    }
}

/// Filesystem operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsOp {
    Open,
    Chmod,
    Write,
    Remove,
    CreateDir,
}

impl fmt::Display for FsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            FsOp::Open => "open",
            FsOp::Chmod => "chmod",
            FsOp::Write => "write",
            FsOp::Remove => "remove",
            FsOp::CreateDir => "create directory",
        };
        f.write_str(op)
    }
}

#[derive(Debug)]
pub enum FileSystemError {
    Io {
        op: FsOp,
        path: PathBuf,
        source: io::Error,
    },
    Symlink {
        link: PathBuf,
        target: PathBuf,
        source: io::Error,
    },
    NotADirectory(PathBuf),
}

impl fmt::Display for FileSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileSystemError::Io { op, path, source } => {
                write!(f, "cannot {op} `{}`: {source}", path.display())
            }
            FileSystemError::Symlink {
                link,
                target,
                source,
            } => {
                write!(
                    f,
                    "cannot link `{}` to `{}`: {source}",
                    link.display(),
                    target.display()
                )
            }
            FileSystemError::NotADirectory(path) => {
                write!(f, "`{}` exists and is not a directory", path.display())
            }
        }
    }
}

impl Error for FileSystemError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FileSystemError::Io { source, .. } | FileSystemError::Symlink { source, .. } => {
                Some(source)
            }
            FileSystemError::NotADirectory(_) => None,
        }
    }
}

pub type FileSystemResult<T> = std::result::Result<T, FileSystemError>;
pub type PathResult<T> = std::result::Result<T, PathError>;
