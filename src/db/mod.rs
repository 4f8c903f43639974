//! Database layer: domain models, CRUD repositories, and the unit of work
//! that threads a transaction through them for a single use case.

pub mod models;
pub mod repository;
pub mod unit_of_work;

pub use unit_of_work::{Repositories, UnitOfWork};
