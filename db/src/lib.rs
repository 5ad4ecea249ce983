pub mod dtos;
pub mod entities;

#[cfg(feature = "seed")]
pub mod seed;

use sqlx::migrate::Migrator;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");
