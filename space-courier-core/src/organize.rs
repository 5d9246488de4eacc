//! Buckets downloaded files into numbered sub-folders of bounded size, so
//! that each folder fits one media group.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Ordinal of a bucket folder (`0`, `1`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketId(pub usize);

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maps a running item count to the bucket the next item belongs in.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    capacity: usize,
}

impl Paginator {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Paginator {
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bucket for the item placed after `current_count` items.
    pub fn next_bucket(&self, current_count: usize) -> BucketId {
        BucketId(current_count / self.capacity)
    }

    /// Creates (if needed) the folder for the next item and returns it with
    /// the advanced running index. Not safe for concurrent callers.
    pub fn place(&self, base: &Path, running_index: usize) -> Result<(PathBuf, usize)> {
        let folder = base.join(self.next_bucket(running_index).to_string());
        std::fs::create_dir_all(&folder).map_err(|e| Error::io(&folder, e))?;
        Ok((folder, running_index + 1))
    }
}

/// Bucket folders under `base`, in ordinal order. Non-numeric entries are ignored.
pub fn bucket_folders(base: &Path) -> Result<Vec<(BucketId, PathBuf)>> {
    let mut buckets = Vec::new();
    let entries = std::fs::read_dir(base).map_err(|e| Error::io(base, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(base, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(id) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.parse::<usize>().ok())
        {
            buckets.push((BucketId(id), path));
        }
    }
    buckets.sort_by_key(|(id, _)| *id);
    Ok(buckets)
}

/// Regular files directly inside `folder`, sorted by name.
pub fn files_in(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder).map_err(|e| Error::io(folder, e))? {
        let path = entry.map_err(|e| Error::io(folder, e))?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
