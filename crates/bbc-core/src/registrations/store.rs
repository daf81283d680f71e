//! Flat-file CSV store for registrations.

use super::record::{Registration, CSV_HEADER};
use crate::error::StoreError;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Outcome of [`RegistrationStore::append_unique`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    Saved,
    DuplicateEmail,
}

fn has_email(rows: &[Registration], email: &str) -> bool {
    let needle = email.to_lowercase();
    rows.iter().any(|r| r.email.to_lowercase() == needle)
}

/// Appends and reads registrations in one CSV file.
///
/// All file access goes through one mutex, so a reader never sees a
/// partially written row from this process.
pub struct RegistrationStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl RegistrationStore {
    pub fn open_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// True when the file is missing or zero bytes long.
    pub fn is_empty_file(&self) -> bool {
        fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true)
    }

    /// Creates the data directory and a header-only CSV if absent.
    /// Returns `true` when the file was created.
    pub fn init(&self) -> Result<bool, StoreError> {
        let _guard = self.guard();
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        if self.path.exists() {
            return Ok(false);
        }
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(CSV_HEADER)?;
        writer.flush()?;
        tracing::info!(target: "bbc::store", path = %self.path.display(), "Registrations CSV initialized");
        Ok(true)
    }

    /// Appends unless a row with the same email (case-insensitive) exists.
    /// The check and the write happen under one lock. If the existing rows
    /// cannot be read, the registration is accepted.
    pub fn append_unique(&self, registration: &Registration) -> Result<Appended, StoreError> {
        let _guard = self.guard();
        match self.read_rows() {
            Ok(rows) if has_email(&rows, &registration.email) => return Ok(Appended::DuplicateEmail),
            Ok(_) => {}
            Err(e) => tracing::warn!(
                target: "bbc::store",
                email = %registration.email,
                error = %e,
                "Duplicate email check failed, accepting registration"
            ),
        }
        self.write_row(registration)?;
        Ok(Appended::Saved)
    }

    fn write_row(&self, registration: &Registration) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let needs_header = self.is_empty_file();
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            writer.write_record(CSV_HEADER)?;
            tracing::info!(target: "bbc::store", "New registrations CSV created");
        }
        writer.serialize(registration)?;
        writer.flush()?;
        tracing::info!(target: "bbc::store", id = %registration.id, "Registration saved");
        Ok(())
    }

    /// All rows in file order. A missing file reads as empty.
    pub fn load_all(&self) -> Result<Vec<Registration>, StoreError> {
        let _guard = self.guard();
        self.read_rows()
    }

    fn read_rows(&self) -> Result<Vec<Registration>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;
        let mut out = Vec::new();
        for row in reader.deserialize::<Registration>() {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        Ok(self.load_all()?.len())
    }

    /// Raw file contents for export.
    pub fn read_raw(&self) -> Result<Vec<u8>, StoreError> {
        let _guard = self.guard();
        Ok(fs::read(&self.path)?)
    }
}
