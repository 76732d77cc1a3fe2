//! SQLite database module for the donation engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
