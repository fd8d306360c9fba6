use rocket::response::Responder;
use rocket::serde::Serialize;
use rocket_okapi::gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::{JsonSchema, Map};
use rocket_okapi::response::OpenApiResponderInner;
use sea_orm::DbErr;
use std::fmt::{Debug, Display, Formatter};

use log::error;

#[derive(Serialize, JsonSchema, Debug, Clone, PartialEq, Eq, Responder)]
pub enum GenericError {
    /// The golf-data feed could not be reached or answered with something unusable.
    #[response(status = 502)]
    Feed(String),
    /// The feed is reporting a different event than the one being synced.
    #[response(status = 409)]
    TournamentMismatch(String),
    #[response(status = 404)]
    NotFound(&'static str),
    #[response(status = 500)]
    Database(String),
    #[response(status = 429)]
    RateLimited(String),
    #[response(status = 409)]
    Conflict(&'static str),
    #[response(status = 403)]
    Forbidden(&'static str),
    #[response(status = 400)]
    BadRequest(&'static str),
    #[response(status = 500)]
    Config(String),
}

impl GenericError {
    pub fn mismatch(feed_name: &str, local_name: &str) -> Self {
        Self::TournamentMismatch(format!(
            "API is returning data for '{feed_name}', not '{local_name}'"
        ))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Feed(m)
            | Self::TournamentMismatch(m)
            | Self::Database(m)
            | Self::RateLimited(m)
            | Self::Config(m) => m,
            Self::NotFound(m) | Self::Conflict(m) | Self::Forbidden(m) | Self::BadRequest(m) => m,
        }
    }
}

impl Display for GenericError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for GenericError {}

impl From<DbErr> for GenericError {
    fn from(e: DbErr) -> Self {
        error!("Database error: {:#?}", e);
        GenericError::Database(format!("Database error: {e}"))
    }
}

impl OpenApiResponderInner for GenericError {
    fn responses(_: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        use rocket_okapi::okapi::openapi3::{RefOr, Response as OpenApiResponse};

        let mut responses = Map::new();
        responses.insert(
            "400".to_string(),
            RefOr::Object(OpenApiResponse {
                description: "\
                # [400 Bad Request](https://developer.mozilla.org/en-US/docs/Web/HTTP/Status/400)\n\
                The request was malformed, for example an unknown tier or entry number. \
                "
                .to_string(),
                ..Default::default()
            }),
        );
        responses.insert(
            "403".to_string(),
            RefOr::Object(OpenApiResponse {
                description: "\
                # [403 Forbidden](https://developer.mozilla.org/en-US/docs/Web/HTTP/Status/403)\n\
                Missing or wrong admin key, or the picks for this tournament are locked. \
                "
                .to_string(),
                ..Default::default()
            }),
        );
        responses.insert(
            "404".to_string(),
            RefOr::Object(OpenApiResponse {
                description: "\
                # [404 Not Found](https://developer.mozilla.org/en-US/docs/Web/HTTP/Status/404)\n\
                The tournament, golfer or field row does not exist.\
                "
                .to_string(),
                ..Default::default()
            }),
        );
        responses.insert(
            "409".to_string(),
            RefOr::Object(OpenApiResponse {
                description: "\
                # [409 Conflict](https://developer.mozilla.org/en-US/docs/Web/HTTP/Status/409)\n\
                The feed reports another event than the tournament asked for, or the \
                tournament is in a state that does not allow the change. \
                "
                .to_string(),
                ..Default::default()
            }),
        );
        responses.insert(
            "429".to_string(),
            RefOr::Object(OpenApiResponse {
                description: "\
                # [429 Too Many Requests](https://developer.mozilla.org/en-US/docs/Web/HTTP/Status/429)\n\
                Scores for this tournament were refreshed moments ago. \
                "
                .to_string(),
                ..Default::default()
            }),
        );
        responses.insert(
            "500".to_string(),
            RefOr::Object(OpenApiResponse {
                description: "\
                # [500 Internal Server Error](https://developer.mozilla.org/en-US/docs/Web/HTTP/Status/500)\n\
                This response is given when something went wrong on the server. \
                "
                .to_string(),
                ..Default::default()
            }),
        );
        responses.insert(
            "502".to_string(),
            RefOr::Object(OpenApiResponse {
                description: "\
                # [502 Bad Gateway](https://developer.mozilla.org/en-US/docs/Web/HTTP/Status/502)\n\
                The golf-data feed failed or returned a payload that could not be read. \
                "
                .to_string(),
                ..Default::default()
            }),
        );
        Ok(Responses {
            responses,
            ..Default::default()
        })
    }
}
