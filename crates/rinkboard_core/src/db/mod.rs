//! SQLite storage for rinkboard folders and drawings.
//!
//! # Responsibility
//! - Hand out connections that are ready for the entity store: pragmas set,
//!   schema at [`migrations::latest_version`].
//! - Classify SQLite failures the services care about, notably a folder
//!   delete blocked by drawings that still reference it.
//!
//! # Invariants
//! - `drawings.folder_uuid` is a real foreign key; a connection without
//!   enforcement is refused rather than returned.
//! - A file written by a newer build is never opened or downgraded.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Storage-level failure.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was migrated by a newer build.
    SchemaTooNew { found: u32, supported: u32 },
    /// The SQLite build ignored `PRAGMA foreign_keys = ON`.
    ForeignKeysUnavailable,
}

impl DbError {
    /// True when a statement was rejected by a foreign key, e.g. deleting a
    /// folder that still owns drawings.
    pub fn is_foreign_key_violation(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(failure, _)) => {
                failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
            }
            _ => false,
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "rinkboard database is at schema {found}, this build supports up to {supported}"
            ),
            Self::ForeignKeysUnavailable => {
                write!(f, "sqlite build does not enforce foreign keys")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } | Self::ForeignKeysUnavailable => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
