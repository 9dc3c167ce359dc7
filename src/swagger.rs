use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::PrizeKind;
use crate::handlers;
use crate::models::*;
use crate::utils::INIT_DATA_HEADER;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "telegram_init_data",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(INIT_DATA_HEADER))),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::roulette::user_data,
        handlers::roulette::spin_roulette,
        handlers::roulette::get_history,
        handlers::roulette::clear_history,
        handlers::roulette::get_unlocks,
        handlers::roulette::list_prizes,
    ),
    components(
        schemas(
            UserRequest,
            UserStatusResponse,
            SpinResponse,
            HistoryEntry,
            ClearHistoryResponse,
            UnlocksResponse,
            CheatKey,
            Grant,
            PrizeResponse,
            PrizeKind,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "roulette", description = "Daily roulette API"),
    ),
    info(
        title = "Roulette Backend API",
        version = "1.0.0",
        description = "Daily roulette reward REST API documentation",
    ),
    servers(
        (url = "/api", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
