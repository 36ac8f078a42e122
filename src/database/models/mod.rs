pub mod company;
pub mod job;
pub mod user;

pub use company::{Company, CompanyPatch, NewCompany};
pub use job::{Job, JobPatch, JobStatus, NewJob};
pub use user::{Gender, NewUser, User, UserChanges, UserPatch, UserSummary};
