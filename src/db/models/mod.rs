//! Database-adjacent domain models, split into separate files per entity.
//! This module re-exports individual model modules so `use crate::db::models::*;`
//! reaches every type.

pub mod event;
pub mod notification;

pub use self::event::*;
pub use self::notification::*;
