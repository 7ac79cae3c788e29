// src/lib.rs

pub mod db;
pub mod query;
pub mod repositories;
pub mod services;
pub mod http;
pub mod test_utils;

pub use db::Database;
pub use charge_common::error::Error;
pub use charge_common::models;
