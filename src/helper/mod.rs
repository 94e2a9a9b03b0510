pub mod admin_helpers;
pub mod auth_helpers;
pub mod comment_helpers;
pub mod media_helpers;
pub mod post_helpers;
pub mod public_helpers;
pub mod publish_helpers;
pub mod sanitization_helpers;
pub mod tag_helpers;
