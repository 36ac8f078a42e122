// handlers/protected/mod.rs - Handlers behind the bearer-token middleware
//
// Every handler here receives `Extension<AuthUser>`; row ownership is
// checked per resource.
pub mod companies;
pub mod jobs;
pub mod users;
