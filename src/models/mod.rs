pub mod auth_jwt_claims;
pub mod authenticated_user;
pub mod domain;

pub use auth_jwt_claims::*;
pub use authenticated_user::AuthenticatedUser;
pub use domain::*;
