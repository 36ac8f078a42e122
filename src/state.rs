use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{Cloudinary, FirebaseIdentity, IdentityProvider, ImageHost};

/// External collaborators shared by handlers. The database pool lives in
/// `DatabaseManager`.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub images: Arc<dyn ImageHost>,
}

impl AppState {
    pub fn new(identity: Arc<dyn IdentityProvider>, images: Arc<dyn ImageHost>) -> Self {
        Self { identity, images }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(FirebaseIdentity::new(&config.firebase)),
            Arc::new(Cloudinary::new(&config.cloudinary)),
        )
    }
}
