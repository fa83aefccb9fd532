//! SQLite backend for the bid auction engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
