// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition, verification flows and job applications.
pub mod auth;
pub mod jobs;
pub mod users;
