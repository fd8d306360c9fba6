use log::warn;
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest};
use rocket::Request;
use rocket_okapi::request::OpenApiFromRequest;

use service::{AppContext, GenericError};

pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

/// Passes only when the request carries the configured admin key. With no key
/// configured every admin route is closed.
#[derive(OpenApiFromRequest, Debug)]
pub struct AdminKey;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminKey {
    type Error = GenericError;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let Some(ctx) = request.rocket().state::<AppContext>() else {
            return Outcome::Error((
                Status::InternalServerError,
                GenericError::Config("Application context not managed".to_string()),
            ));
        };
        let given = request.headers().get_one(ADMIN_KEY_HEADER);
        match (ctx.settings.admin_key.as_deref(), given) {
            (Some(expected), Some(given)) if expected == given => Outcome::Success(AdminKey),
            _ => {
                warn!("Rejected admin request to {}", request.uri());
                Outcome::Error((
                    Status::Forbidden,
                    GenericError::Forbidden("Administrator key required"),
                ))
            }
        }
    }
}
