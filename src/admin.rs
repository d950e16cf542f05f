//! The three administrative operations: backup, delete and load.

use std::io::Read;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use rusqlite::backup::Progress;
use tracing::info;

use crate::error::Result;
use crate::filter::FilterSet;
use crate::merge::RowMerger;
use crate::password::PasswordHasher;
use crate::persist::{Account, Persistor, copy_database, open_existing};
use crate::record::RecordSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    /// Filled on dry runs only.
    pub matched: Vec<Account>,
    pub deleted: usize,
    /// The value the `user` sequence was reset to, if it was.
    pub sequence: Option<i64>,
    pub repacked: bool,
    pub dry_run: bool,
}

pub fn delete_accounts(
    persistor: &Persistor<'_>,
    filters: &FilterSet,
    dry_run: bool,
) -> Result<DeleteReport> {
    let predicate = filters.predicate()?;
    info!(%predicate, combinations = filters.combination_count(), dry_run, "deleting accounts");
    if dry_run {
        let matched = persistor.matching_accounts(&predicate, filters.combinations()?)?;
        return Ok(DeleteReport {
            matched,
            deleted: 0,
            sequence: None,
            repacked: false,
            dry_run,
        });
    }
    let (deleted, sequence) = persistor.delete_matching(&predicate, filters.combinations()?)?;
    let repacked = deleted > 0;
    if repacked {
        persistor.repack()?;
    }
    Ok(DeleteReport {
        matched: Vec::new(),
        deleted,
        sequence,
        repacked,
        dry_run,
    })
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub template_nickname: String,
    pub default_domain: Option<String>,
    pub default_password: Option<String>,
    pub dry_run: bool,
    /// Called with the running count of rows processed.
    pub progress: Option<fn(usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub dry_run: bool,
}

pub fn load_accounts<R: Read, H: PasswordHasher>(
    persistor: &Persistor<'_>,
    input: R,
    options: &LoadOptions,
    hasher: H,
) -> Result<LoadReport> {
    let template = persistor.template_row(&options.template_nickname)?;
    let merger = RowMerger::new(
        &template,
        hasher,
        options.default_domain.clone(),
        options.default_password.as_deref(),
    )?;
    let source = RecordSource::new(input)?;
    info!(
        template = %options.template_nickname,
        fields = ?source.headers(),
        dry_run = options.dry_run,
        "loading accounts"
    );
    let loaded = persistor.insert_rows(
        &template,
        merger.rows(source),
        options.dry_run,
        options.progress,
    )?;
    Ok(LoadReport {
        loaded,
        dry_run: options.dry_run,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// `<dir>/<stem>-backup<.ext>` next to the source.
pub fn backup_destination(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match source.extension() {
        Some(ext) => format!("{stem}-backup.{}", ext.to_string_lossy()),
        None => format!("{stem}-backup"),
    };
    source.with_file_name(name)
}

/// Repacks the source database and copies it page by page to the destination.
pub fn backup_database(
    source: &Path,
    destination: Option<&Path>,
    pages: i32,
    progress: Option<fn(Progress)>,
) -> Result<BackupReport> {
    let destination = destination
        .map(Path::to_path_buf)
        .unwrap_or_else(|| backup_destination(source));

    let connection = open_existing(source)?;
    Persistor::new(&connection).repack()?;
    info!(source = %source.display(), "repacked source");

    let mut target = Connection::open(&destination)?;
    copy_database(&connection, &mut target, pages, progress)?;
    info!(destination = %destination.display(), "backed up");
    Ok(BackupReport {
        source: source.to_path_buf(),
        destination,
    })
}
