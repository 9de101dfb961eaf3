use rocket::{
    http::Status,
    request::{self, FromRequest, Outcome, Request},
};

use crate::config::AuthorizationConfig;

/// Request guard for the publishing endpoints. Expects
/// `Authorization: Bearer <access_token>`.
pub struct Operator;

pub const AUTHORIZATION: &str = "Authorization";
const BEARER_PREFIX: &str = "Bearer ";

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Operator {
    type Error = &'static str;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let Some(token) = req
            .headers()
            .get_one(AUTHORIZATION)
            .and_then(|header| header.strip_prefix(BEARER_PREFIX))
        else {
            return Outcome::Error((Status::Unauthorized, "Missing access token"));
        };

        match req.rocket().state::<AuthorizationConfig>() {
            Some(config) if config.access_token == token => Outcome::Success(Operator),
            Some(_) => Outcome::Error((Status::Unauthorized, "Incorrect access token")),
            None => Outcome::Forward(Status::InternalServerError),
        }
    }
}
