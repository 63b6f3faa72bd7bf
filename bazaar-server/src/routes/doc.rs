use crate::routes::dm;
use crate::routes::health;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "bazaar-server",
    description = "bazaar marketplace direct-messaging API",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(dm::api_docs());
    root
}
