// src/repositories/postgres/mod.rs

use crate::Error;

pub mod plans;
pub mod coupons;

pub use plans::PostgresPlanRepository;
pub use coupons::PostgresCouponRepository;

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Maps a unique-constraint failure to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_or_database(err: sqlx::Error, what: impl Into<String>) -> Error {
    let is_unique = err
        .as_database_error()
        .and_then(|db_err| db_err.code())
        .map(|code| code == UNIQUE_VIOLATION)
        .unwrap_or(false);

    if is_unique {
        Error::Conflict(what.into())
    } else {
        Error::Database(err)
    }
}
