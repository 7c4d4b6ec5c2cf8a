//! Directory-backed staging store.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::name::{self, ParsedName};
use super::{StagedAsset, StagingScan, StagingStore};
use crate::config::NameTimezone;
use crate::record::Record;

/// Subdirectory receiving in-flight writes. Directories are never upload candidates.
pub const PARTIAL_DIR: &str = ".partial";

/// Counts reported by `imgmig status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    pub staged: usize,
    pub transferred: usize,
    pub unrecognized: usize,
    /// Leftovers of interrupted writes.
    pub partial: usize,
}

/// Staging store rooted at one directory (`images/` by default).
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
    tz: NameTimezone,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>, tz: NameTimezone) -> Self {
        Self {
            root: root.into(),
            tz,
        }
    }

    /// Create the directory if needed.
    pub fn open(root: impl Into<PathBuf>, tz: NameTimezone) -> io::Result<Self> {
        let store = Self::new(root, tz);
        fs::create_dir_all(&store.root)?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn staged_path(&self, record: &Record) -> PathBuf {
        self.root.join(name::staged_name(record, self.tz))
    }

    pub fn transferred_path(&self, record: &Record) -> PathBuf {
        self.root
            .join(name::transferred_name(&name::staged_name(record, self.tz)))
    }

    fn partial_path(&self, staged_name: &str) -> PathBuf {
        self.root.join(PARTIAL_DIR).join(staged_name)
    }

    /// Plain-file names in the root, sorted.
    fn file_names(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(n) => names.push(n),
                Err(raw) => tracing::debug!("skipping non-UTF-8 staging entry {:?}", raw),
            }
        }
        names.sort();
        Ok(names)
    }

    /// Counts per state, for status reporting.
    pub fn inventory(&self) -> io::Result<Inventory> {
        let mut inv = Inventory::default();
        for n in self.file_names()? {
            if name::is_transferred(&n) {
                inv.transferred += 1;
            } else if name::parse_name(&n).is_some() {
                inv.staged += 1;
            } else {
                inv.unrecognized += 1;
            }
        }
        let partial = self.root.join(PARTIAL_DIR);
        if partial.is_dir() {
            inv.partial = fs::read_dir(&partial)?.count();
        }
        Ok(inv)
    }
}

impl StagingStore for DirStore {
    fn resolve_existing(&self, record: &Record) -> io::Result<Option<PathBuf>> {
        let staged = self.staged_path(record);
        if staged.try_exists()? {
            return Ok(Some(staged));
        }
        let transferred = self.transferred_path(record);
        if transferred.try_exists()? {
            return Ok(Some(transferred));
        }
        Ok(None)
    }

    fn write(&self, record: &Record, bytes: &[u8]) -> io::Result<PathBuf> {
        let staged_name = name::staged_name(record, self.tz);
        let final_path = self.root.join(&staged_name);
        let temp_path = self.partial_path(&staged_name);
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let finished = File::create(&temp_path).and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()?;
            drop(file);
            fs::rename(&temp_path, &final_path)
        });
        if let Err(e) = finished {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    tracing::warn!("could not remove {}: {}", temp_path.display(), cleanup);
                }
            }
            return Err(e);
        }
        Ok(final_path)
    }

    fn list_untransferred(&self) -> io::Result<StagingScan> {
        let mut scan = StagingScan::default();
        // Sorted then reversed: newest date prefix first.
        for n in self.file_names()?.into_iter().rev() {
            if name::is_transferred(&n) {
                continue;
            }
            match name::parse_name(&n) {
                Some(ParsedName { date, id, filename }) => scan.assets.push(StagedAsset {
                    path: self.root.join(&n),
                    date,
                    id,
                    filename,
                }),
                None => scan.unrecognized.push(n),
            }
        }
        Ok(scan)
    }

    fn mark_transferred(&self, path: &Path) -> io::Result<PathBuf> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "staged path has no file name"))?;
        if name::is_transferred(file_name) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is already marked transferred", path.display()),
            ));
        }
        let target = path.with_file_name(name::transferred_name(file_name));
        if target.try_exists()? {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", target.display()),
            ));
        }
        fs::rename(path, &target)?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(id: &str, day: u32) -> Record {
        Record::new(
            id,
            format!("https://cdn.example.com/img/{}.jpg", id),
            Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap(),
        )
    }

    fn store() -> (tempfile::TempDir, DirStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::open(dir.path().join("images"), NameTimezone::Utc).unwrap();
        (dir, store)
    }

    #[test]
    fn absent_record_resolves_to_none() {
        let (_dir, store) = store();
        assert_eq!(store.resolve_existing(&record("a", 1)).unwrap(), None);
    }

    #[test]
    fn write_then_resolve_staged() {
        let (_dir, store) = store();
        let r = record("a", 1);
        let path = store.write(&r, b"jpeg-bytes").unwrap();
        assert_eq!(path, store.staged_path(&r));
        assert_eq!(fs::read(&path).unwrap(), b"jpeg-bytes");
        assert_eq!(store.resolve_existing(&r).unwrap(), Some(path));
        let partial = store.root().join(PARTIAL_DIR);
        assert_eq!(fs::read_dir(partial).unwrap().count(), 0);
    }

    #[test]
    fn failed_write_leaves_no_partial_file() {
        let (_dir, store) = store();
        let r = record("a", 1);
        let blocker = store.staged_path(&r);
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("occupied"), b"").unwrap();

        assert!(store.write(&r, b"jpeg-bytes").is_err());
        let partial = store.root().join(PARTIAL_DIR);
        assert_eq!(fs::read_dir(partial).unwrap().count(), 0);
        assert_eq!(store.inventory().unwrap().partial, 0);
    }

    #[test]
    fn transferred_copy_also_resolves() {
        let (_dir, store) = store();
        let r = record("a", 1);
        let staged = store.write(&r, b"x").unwrap();
        let moved = store.mark_transferred(&staged).unwrap();
        assert_eq!(moved, store.transferred_path(&r));
        assert!(!staged.exists());
        assert_eq!(store.resolve_existing(&r).unwrap(), Some(moved));
    }

    #[test]
    fn mark_transferred_refuses_second_call() {
        let (_dir, store) = store();
        let staged = store.write(&record("a", 1), b"x").unwrap();
        let moved = store.mark_transferred(&staged).unwrap();
        let err = store.mark_transferred(&moved).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert!(moved.exists());
    }

    #[test]
    fn listing_skips_transferred_dirs_and_reverses_name_order() {
        let (_dir, store) = store();
        let older = store.write(&record("old", 1), b"1").unwrap();
        let newer = store.write(&record("new", 2), b"2").unwrap();
        let done = store.write(&record("done", 3), b"3").unwrap();
        store.mark_transferred(&done).unwrap();
        fs::create_dir(store.root().join("2024-04-01-00-00-00-0@@dir@@x.jpg")).unwrap();

        let scan = store.list_untransferred().unwrap();
        let ids: Vec<&str> = scan.assets.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(scan.assets[0].path, newer);
        assert_eq!(scan.assets[1].path, older);
        assert_eq!(scan.assets[1].filename, "old.jpg");
        assert_eq!(scan.assets[1].date, "2024-04-01-12-00-00-0");
        assert!(scan.unrecognized.is_empty());
    }

    #[test]
    fn unrelated_files_are_reported_not_listed() {
        let (_dir, store) = store();
        fs::write(store.root().join("README.txt"), b"notes").unwrap();
        store.write(&record("a", 1), b"x").unwrap();
        let scan = store.list_untransferred().unwrap();
        assert_eq!(scan.assets.len(), 1);
        assert_eq!(scan.unrecognized, vec!["README.txt".to_string()]);
    }

    #[test]
    fn inventory_counts_each_state() {
        let (_dir, store) = store();
        store.write(&record("a", 1), b"x").unwrap();
        let b = store.write(&record("b", 2), b"x").unwrap();
        store.mark_transferred(&b).unwrap();
        fs::write(store.root().join("stray"), b"").unwrap();
        fs::write(store.root().join(PARTIAL_DIR).join("half"), b"").unwrap();
        assert_eq!(
            store.inventory().unwrap(),
            Inventory {
                staged: 1,
                transferred: 1,
                unrecognized: 1,
                partial: 1,
            }
        );
    }
}
