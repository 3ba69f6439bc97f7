use crate::error::{ReportError, ReportResult};
use log::{debug, warn};
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write-once zip of named text entries, backed by a unique temp file.
///
/// Dropping an unsealed archive deletes the backing file.
pub struct ReportArchive {
    // Declared before `path` so the writer is dropped before the file is removed.
    writer: ZipWriter<File>,
    path: TempPath,
    file_name: String,
    entries: Vec<String>,
    seen: HashSet<String>,
}

impl ReportArchive {
    pub fn create(dir: &Path, file_name: String) -> ReportResult<Self> {
        let stem = file_name.trim_end_matches(".zip");
        let (file, path) = tempfile::Builder::new()
            .prefix(&format!("{}_", stem))
            .suffix(".zip")
            .tempfile_in(dir)?
            .into_parts();

        debug!("Created report archive at {:?}", path);

        Ok(Self {
            writer: ZipWriter::new(file),
            path,
            file_name,
            entries: Vec::new(),
            seen: HashSet::new(),
        })
    }

    pub fn append(&mut self, name: &str, contents: &str) -> ReportResult<()> {
        if !self.seen.insert(name.to_string()) {
            return Err(ReportError::DuplicateEntry(name.to_string()));
        }

        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        self.writer.start_file(name, options)?;
        self.writer.write_all(contents.as_bytes())?;
        self.entries.push(name.to_string());
        Ok(())
    }

    pub fn seal(mut self) -> ReportResult<SealedArchive> {
        let file = self.writer.finish()?;
        file.sync_all()?;

        Ok(SealedArchive {
            path: self.path,
            file_name: self.file_name,
            entries: self.entries,
        })
    }
}

/// A finished archive ready for transfer.
///
/// Owns its backing file: dropping it deletes the file unless it was persisted.
#[derive(Debug)]
pub struct SealedArchive {
    path: TempPath,
    file_name: String,
    entries: Vec<String>,
}

impl SealedArchive {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Suggested download name, e.g. `PiReports_2024-01-01T03-00-00.zip`
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Copy the archive into `dir` under its suggested name and release the temp file.
    pub async fn persist_to(self, dir: &Path) -> ReportResult<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let destination = dir.join(&self.file_name);
        tokio::fs::copy(&self.path, &destination).await?;
        Ok(destination)
    }

    /// Keep the archive around for `delay`, then delete it.
    pub fn retire_after(self, delay: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            sleep(delay).await;
            let path = self.path.to_path_buf();
            if let Err(e) = self.path.close() {
                warn!("Failed to remove report archive {:?}: {}", path, e);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn read_entry(path: &Path, name: &str) -> String {
        let mut zip = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut contents = String::new();
        zip.by_name(name).unwrap().read_to_string(&mut contents).unwrap();
        contents
    }

    #[test]
    fn test_entries_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = ReportArchive::create(dir.path(), "PiReports_t.zip".to_string()).unwrap();
        archive.append("a_t.txt", "alpha").unwrap();
        archive.append("b_t_ERROR.txt", "beta").unwrap();

        let sealed = archive.seal().unwrap();
        assert_eq!(sealed.file_name(), "PiReports_t.zip");
        assert_eq!(sealed.entries(), ["a_t.txt", "b_t_ERROR.txt"]);
        assert_eq!(read_entry(sealed.path(), "b_t_ERROR.txt"), "beta");
    }

    #[test]
    fn test_duplicate_entry_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = ReportArchive::create(dir.path(), "PiReports_t.zip".to_string()).unwrap();
        archive.append("a.txt", "1").unwrap();

        assert!(matches!(
            archive.append("a.txt", "2"),
            Err(ReportError::DuplicateEntry(name)) if name == "a.txt"
        ));
    }

    #[test]
    fn test_concurrent_archives_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = ReportArchive::create(dir.path(), "PiReports_t.zip".to_string()).unwrap();
        let second = ReportArchive::create(dir.path(), "PiReports_t.zip".to_string()).unwrap();

        assert_ne!(first.seal().unwrap().path(), second.seal().unwrap().path());
    }

    #[test]
    fn test_dropping_sealed_archive_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sealed = ReportArchive::create(dir.path(), "PiReports_t.zip".to_string())
            .unwrap()
            .seal()
            .unwrap();
        let path = sealed.path().to_path_buf();
        assert!(path.exists());

        drop(sealed);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_persist_to_copies_under_suggested_name() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let mut archive = ReportArchive::create(dir.path(), "PiReports_t.zip".to_string()).unwrap();
        archive.append("log_t.txt", "hello").unwrap();
        let sealed = archive.seal().unwrap();
        let temp_path = sealed.path().to_path_buf();

        let saved = sealed.persist_to(out.path()).await.unwrap();

        assert_eq!(saved, out.path().join("PiReports_t.zip"));
        assert_eq!(read_entry(&saved, "log_t.txt"), "hello");
        assert!(!temp_path.exists());
    }

    #[tokio::test]
    async fn test_retire_after_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sealed = ReportArchive::create(dir.path(), "PiReports_t.zip".to_string())
            .unwrap()
            .seal()
            .unwrap();
        let path = sealed.path().to_path_buf();

        sealed.retire_after(Duration::from_millis(10)).await.unwrap();
        assert!(!path.exists());
    }
}
