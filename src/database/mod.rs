pub mod companies;
pub mod jobs;
pub mod manager;
pub mod models;
pub mod patch;
pub mod users;

pub use manager::{DatabaseError, DatabaseManager};
pub use patch::{Patch, UpdateBuilder};
