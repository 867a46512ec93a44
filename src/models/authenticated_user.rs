use actix_web::{dev::Payload, Error, FromRequest, HttpMessage, HttpRequest};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

use crate::models::VerifiedClaims;

/// Caller identity attached to the request by the token authenticator.
///
/// Extraction never fails. A request that did not pass through the
/// authenticator yields the default value, whose `user_id` is `0`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub email: Option<String>,
}

impl AuthenticatedUser {
    pub fn is_authenticated(&self) -> bool {
        self.user_id != 0
    }
}

impl From<VerifiedClaims> for AuthenticatedUser {
    fn from(claims: VerifiedClaims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = req
            .extensions()
            .get::<AuthenticatedUser>()
            .cloned()
            .unwrap_or_default();
        ready(Ok(user))
    }
}
