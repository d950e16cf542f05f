// used for persistence
use rusqlite::backup::{Backup, Progress};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params, params_from_iter};
use std::path::Path;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Result, ShelfkeeperError};
use crate::filter::Combinations;
use crate::merge::TemplateRow;

pub const USER_TABLE: &str = "user";
pub const USER_KEY: &str = "id";

/// The parts of an account shown when listing matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub nickname: Option<String>,
    pub email: Option<String>,
}

// ------------- Persistence -------------
pub struct Persistor<'db> {
    pub db: &'db Connection,
}
impl<'db> Persistor<'db> {
    pub fn new<'connection>(connection: &'connection Connection) -> Persistor<'connection> {
        Persistor { db: connection }
    }

    /// Reads the template account, without its auto-increment key.
    pub fn template_row(&self, nickname: &str) -> Result<TemplateRow> {
        let mut statement = self.db.prepare(
            "
            select *
                from user
                where nickname = ?
        ",
        )?;
        let columns: Vec<String> = statement
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let values = statement
            .query_row(params![nickname], |row| {
                (0..columns.len())
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<Value>>>()
            })
            .optional()?;
        match values {
            Some(values) => {
                debug!(nickname, columns = columns.len(), "read template account");
                Ok(TemplateRow::from_account(columns, values, USER_KEY))
            }
            None => Err(ShelfkeeperError::TemplateNotFound(nickname.to_string())),
        }
    }

    /// Accounts matching the predicate under any combination, each listed once.
    pub fn matching_accounts(
        &self,
        predicate: &str,
        combinations: Combinations<'_>,
    ) -> Result<Vec<Account>> {
        let sql = format!("select id, nickname, email from user where {predicate} order by id");
        let mut statement = self.db.prepare(&sql)?;
        let mut seen = HashSet::new();
        let mut accounts = Vec::new();
        for combination in combinations {
            debug!(sql = %sql, values = ?combination, "query");
            let rows = statement.query_map(params_from_iter(combination.iter()), |row| {
                Ok(Account {
                    id: row.get(0)?,
                    nickname: row.get(1)?,
                    email: row.get(2)?,
                })
            })?;
            for account in rows {
                let account = account?;
                if seen.insert(account.id) {
                    accounts.push(account);
                }
            }
        }
        Ok(accounts)
    }

    /// Runs the delete once per combination inside one transaction. When rows
    /// were removed the `user` sequence is reset to the surviving maximum id,
    /// which assumes nothing else writes to the table meanwhile.
    pub fn delete_matching(
        &self,
        predicate: &str,
        combinations: Combinations<'_>,
    ) -> Result<(usize, Option<i64>)> {
        let tx = self.db.unchecked_transaction()?;
        let sql = format!("delete from user where {predicate}");
        let mut deleted = 0;
        {
            let mut statement = tx.prepare(&sql)?;
            for combination in combinations {
                debug!(sql = %sql, values = ?combination, "execute");
                deleted += statement.execute(params_from_iter(combination.iter()))?;
            }
        }
        let mut sequence = None;
        if deleted > 0 {
            let max_id = max_id(&tx)?.unwrap_or(0);
            if has_sequence_table(&tx)? {
                let updated = tx.execute(
                    "
                    update sqlite_sequence
                        set seq = ?
                        where name = ?
                ",
                    params![max_id, USER_TABLE],
                )?;
                // no row for `user` means its sequence was never started
                if updated == 1 {
                    sequence = Some(max_id);
                }
            }
        }
        tx.commit()?;
        info!(deleted, ?sequence, "deletion committed");
        Ok((deleted, sequence))
    }

    /// Inserts every merged row with `insert or ignore`, so rows clashing with
    /// existing accounts are skipped. A dry run rolls everything back.
    /// `progress` is called after each row with the number of rows processed.
    pub fn insert_rows<I>(
        &self,
        template: &TemplateRow,
        rows: I,
        dry_run: bool,
        progress: Option<fn(usize)>,
    ) -> Result<usize>
    where
        I: IntoIterator<Item = Result<Vec<Value>>>,
    {
        let tx = self.db.unchecked_transaction()?;
        let sql = template.insert_statement(USER_TABLE);
        let mut inserted = 0;
        {
            let mut statement = tx.prepare(&sql)?;
            for (processed, values) in rows.into_iter().enumerate() {
                let values = values?;
                debug!(sql = %sql, values = ?values, "execute");
                inserted += statement.execute(params_from_iter(values.iter()))?;
                if let Some(progress) = progress {
                    progress(processed + 1);
                }
            }
        }
        if dry_run {
            tx.rollback()?;
            info!(inserted, "dry run rolled back");
        } else {
            tx.commit()?;
            info!(inserted, "load committed");
        }
        Ok(inserted)
    }

    pub fn count_accounts(&self) -> Result<i64> {
        Ok(self.db.query_row("select count(*) from user", [], |r| r.get(0))?)
    }

    pub fn max_id(&self) -> Result<Option<i64>> {
        max_id(self.db)
    }

    /// Current value of the `user` entry in `sqlite_sequence`, if there is one.
    pub fn sequence(&self) -> Result<Option<i64>> {
        if !has_sequence_table(self.db)? {
            return Ok(None);
        }
        Ok(self
            .db
            .query_row(
                "
                select seq
                    from sqlite_sequence
                    where name = ?
            ",
                params![USER_TABLE],
                |r| r.get(0),
            )
            .optional()?)
    }

    pub fn repack(&self) -> Result<()> {
        debug!("vacuum");
        self.db.execute_batch("vacuum")?;
        Ok(())
    }
}

fn max_id(connection: &Connection) -> Result<Option<i64>> {
    Ok(connection.query_row("select max(id) from user", [], |r| r.get(0))?)
}

fn has_sequence_table(connection: &Connection) -> Result<bool> {
    Ok(connection
        .query_row(
            "
            select 1
                from sqlite_master
                where type = 'table' and name = 'sqlite_sequence'
        ",
            [],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

/// Opens a database that must already exist; a missing file is an error
/// instead of a fresh empty database.
pub fn open_existing(path: &Path) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let connection = Connection::open_with_flags(path, flags)?;
    debug!(path = %path.display(), "opened database");
    Ok(connection)
}

/// Copies `source` into `destination` with the online backup API, `pages`
/// pages per step.
pub fn copy_database(
    source: &Connection,
    destination: &mut Connection,
    pages: i32,
    progress: Option<fn(Progress)>,
) -> Result<()> {
    let backup = Backup::new(source, destination)?;
    backup.run_to_completion(pages, Duration::ZERO, progress)?;
    Ok(())
}
