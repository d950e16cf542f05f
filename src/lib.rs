//! Shelfkeeper – administration of the user accounts in a Calibre-Web database.
//!
//! Calibre-Web keeps its accounts in the `user` table of a single SQLite file.
//! Shelfkeeper offers three operations on that file:
//! * **backup** – repack the database (`VACUUM`) and copy it with SQLite's
//!   online backup API.
//! * **delete** – remove every account matching any combination of the given
//!   `nickname` / `email` patterns (SQL `LIKE` syntax, `%` and `_`).
//! * **load** – create accounts from a tab or comma separated file, using an
//!   existing "template" account for every column the file leaves out.
//!
//! ## Modules
//! * [`filter`] – Filter sets, their `LIKE` predicate and the lazy cross
//!   product of pattern tuples bound to it.
//! * [`record`] – Reading input records from delimited text.
//! * [`merge`] – Template rows and the merger producing insertable rows.
//! * [`password`] – Password hashes in the format the web application verifies.
//! * [`persist`] – SQLite access: template lookup, transactional delete and insert.
//! * [`admin`] – The operations themselves, as used by the `shelfkeeper` binary.
//! * [`settings`] – Layered configuration.
//!
//! ## Quick Start
//! ```
//! use rusqlite::Connection;
//! use shelfkeeper::admin::delete_accounts;
//! use shelfkeeper::filter::{Column, FilterSet};
//! use shelfkeeper::persist::Persistor;
//! let conn = Connection::open_in_memory().unwrap();
//! conn.execute_batch(
//!     "create table user (id integer primary key autoincrement, nickname text, email text, password text);
//!      insert into user (nickname, email) values ('alice', 'alice@example.com'), ('bob', 'bob@aol.com');",
//! ).unwrap();
//! let persistor = Persistor::new(&conn);
//! let filters = FilterSet::new().with(Column::Email, ["%@aol.com"]);
//! let report = delete_accounts(&persistor, &filters, false).unwrap();
//! assert_eq!(report.deleted, 1);
//! ```
//!
//! All operations assume exclusive use of the database file while they run.

pub mod admin;
pub mod error;
pub mod filter;
pub mod merge;
pub mod password;
pub mod persist;
pub mod record;
pub mod settings;

pub use error::{Result, ShelfkeeperError};
