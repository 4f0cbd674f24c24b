// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table.
//!
//! Each module exposes synchronous `*_in` helpers that run on a borrowed
//! connection (so they compose inside one transaction) and async wrappers
//! that dispatch them onto the database thread.

pub mod conversations;
pub mod leads;
pub mod messages;
pub mod tenants;

use std::str::FromStr;

use rusqlite::Row;
use rusqlite::types::Type;

/// ISO 8601 UTC timestamp with millisecond precision, as SQL.
pub(crate) const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Read a text column and parse it into a strum-backed enum.
pub(crate) fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
