#![allow(proc_macro_derive_resolution_fallback)]

#[macro_use]
extern crate diesel;

use diesel::prelude::*;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::debug;
use thiserror::Error;

use crate::lexicon::MemoryLexicon;
use crate::models::{LexiconEntry, LexiconRow, StrongsId};

pub type DbConnection = SqliteConnection;

/// Migrations compiled into the binary, so a fresh SQLite file (or an
/// in-memory database) can be brought up to date without a checkout.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Number of lexicon rows written per statement.
const LEXICON_CHUNK_SIZE: usize = 250;

#[derive(Clone, Error, Debug)]
pub enum DbError {
    #[error("Could not connect to '{}'. Root cause: {:?}.", url, cause)]
    Connection { url: String, cause: String },

    #[error("A row violated a table constraint. Root cause: {:?}.", cause)]
    Constraint { cause: String },

    #[error("There was a database error. Root cause: {:?}.", cause)]
    Other { cause: String },

    #[error("There was a database migration error. Root cause: {:?}.", cause)]
    Migration { cause: String },

    #[error("'{}' is not a valid Strong's identifier.", code)]
    InvalidStrongsId { code: String },
}

impl From<diesel::result::Error> for DbError {
    fn from(e: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match e {
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info)
            | Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info)
            | Error::DatabaseError(DatabaseErrorKind::NotNullViolation, info)
            | Error::DatabaseError(DatabaseErrorKind::CheckViolation, info) => {
                DbError::Constraint {
                    cause: info.message().to_string(),
                }
            }
            e => DbError::Other {
                cause: e.to_string(),
            },
        }
    }
}

/// Establishes a non-pooled SQLite connection with foreign keys enforced.
pub fn establish_connection(db_url: &str) -> Result<SqliteConnection, DbError> {
    let mut conn = SqliteConnection::establish(db_url).map_err(|e| DbError::Connection {
        url: db_url.to_string(),
        cause: e.to_string(),
    })?;
    diesel::sql_query("PRAGMA foreign_keys = ON").execute(&mut conn)?;

    Ok(conn)
}

/// Run any pending Diesel migrations.
pub fn run_migrations(conn: &mut SqliteConnection) -> Result<(), DbError> {
    conn.run_pending_migrations(MIGRATIONS)
        .map(|applied| debug!("Applied {} migration(s)", applied.len()))
        .map_err(|e| DbError::Migration {
            cause: e.to_string(),
        })
}

/// Loads the whole lexicon table into memory for the duration of a run.
pub fn prefetch_lexicon(conn: &mut SqliteConnection) -> Result<MemoryLexicon, DbError> {
    use crate::schema::lexicon;

    let rows: Vec<LexiconRow> = lexicon::table.load(conn).map_err(|e| DbError::Other {
        cause: format!("Could not preload lexicon data from database. Cause: {e}"),
    })?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let strongs_id = StrongsId::normalize(&row.strongs_id)?;
            Some(LexiconEntry {
                strongs_id,
                headword: row.headword,
                transliteration: row.transliteration,
                gloss: row.gloss,
            })
        })
        .collect())
}

/// Replaces the lexicon table with the given entries in one transaction.
///
/// Later entries with the same canonical identifier win.
pub fn replace_lexicon(
    conn: &mut SqliteConnection,
    entries: &[LexiconEntry],
) -> Result<usize, DbError> {
    use crate::schema::lexicon;

    conn.transaction::<_, DbError, _>(|c| {
        diesel::delete(lexicon::table).execute(c)?;

        let rows: Vec<LexiconRow> = entries.iter().map(LexiconRow::from).collect();
        for chunk in rows.chunks(LEXICON_CHUNK_SIZE) {
            diesel::replace_into(lexicon::table)
                .values(chunk)
                .execute(c)?;
        }

        Ok(lexicon::table.count().get_result::<i64>(c)? as usize)
    })
}

pub mod lexicon;
pub mod loader;
pub mod models;
mod schema;
pub mod store;

pub use lexicon::{Lexicon, Resolution};
pub use loader::{LoadSummary, LoaderConfig, RelationalLoader};
pub use store::{InsertOutcome, SqliteStore, Store};
