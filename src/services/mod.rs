pub mod identity;
pub mod images;
pub mod otp;

pub use identity::{FirebaseIdentity, IdentityError, IdentityProvider, VerifiedIdentity};
pub use images::{Cloudinary, ImageHost, ImageHostError, UploadOptions, UploadedImage};
