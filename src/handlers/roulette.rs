use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::RouletteService;
use crate::utils::TelegramIdentity;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// 取请求体中的 userId；请求带有已签名身份时两者必须一致
fn authorized_user_id(req: &HttpRequest, request: &UserRequest) -> AppResult<String> {
    let user_id = request.user_id()?;
    if let Some(identity) = req.extensions().get::<TelegramIdentity>()
        && identity.user_id != user_id
    {
        log::warn!(
            "Signed user {} attempted to act as user {user_id}",
            identity.user_id
        );
        return Err(AppError::NotAuthenticated);
    }
    Ok(user_id)
}

#[utoipa::path(
    post,
    path = "/user-data",
    tag = "roulette",
    request_body = UserRequest,
    security(
        ("telegram_init_data" = [])
    ),
    responses(
        (status = 200, description = "获取用户状态成功", body = UserStatusResponse),
        (status = 400, description = "请求参数错误"),
        (status = 403, description = "签名校验失败或 userId 与签名用户不符")
    )
)]
/// 获取用户余额与抽奖资格，首次访问自动建档
pub async fn user_data(
    req: HttpRequest,
    service: web::Data<RouletteService>,
    request: web::Json<UserRequest>,
) -> Result<HttpResponse> {
    let user_id = match authorized_user_id(&req, &request) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.get_status(&user_id, Utc::now()).await {
        Ok(status) => Ok(HttpResponse::Ok().json(status)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/spin-roulette",
    tag = "roulette",
    request_body = UserRequest,
    security(
        ("telegram_init_data" = [])
    ),
    responses(
        (status = 200, description = "抽奖成功", body = SpinResponse),
        (status = 400, description = "冷却中或请求参数错误"),
        (status = 403, description = "签名校验失败或 userId 与签名用户不符")
    )
)]
/// 抽奖，每 24 小时一次
pub async fn spin_roulette(
    req: HttpRequest,
    service: web::Data<RouletteService>,
    request: web::Json<UserRequest>,
) -> Result<HttpResponse> {
    let user_id = match authorized_user_id(&req, &request) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    let mut rng = StdRng::from_entropy();
    match service.spin(&user_id, Utc::now(), &mut rng).await {
        Ok(result) => Ok(HttpResponse::Ok().json(result)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/get-history",
    tag = "roulette",
    request_body = UserRequest,
    security(
        ("telegram_init_data" = [])
    ),
    responses(
        (status = 200, description = "最近 10 条抽奖记录（倒序），出错时为空数组", body = [HistoryEntry]),
        (status = 403, description = "签名校验失败或 userId 与签名用户不符")
    )
)]
/// 抽奖历史，任何错误都返回空列表
pub async fn get_history(
    req: HttpRequest,
    service: web::Data<RouletteService>,
    request: Option<web::Json<UserRequest>>,
) -> Result<HttpResponse> {
    let Some(user_id) = request.and_then(|r| authorized_user_id(&req, &r).ok()) else {
        return Ok(HttpResponse::Ok().json(Vec::<HistoryEntry>::new()));
    };
    let history = service.get_history(&user_id).await.unwrap_or_else(|e| {
        log::warn!("Failed to load history for user {user_id}: {e}");
        Vec::new()
    });
    Ok(HttpResponse::Ok().json(history))
}

#[utoipa::path(
    post,
    path = "/clear-history",
    tag = "roulette",
    request_body = UserRequest,
    security(
        ("telegram_init_data" = [])
    ),
    responses(
        (status = 200, description = "清空成功", body = ClearHistoryResponse),
        (status = 400, description = "请求参数错误"),
        (status = 403, description = "签名校验失败或 userId 与签名用户不符"),
        (status = 404, description = "用户不存在")
    )
)]
/// 清空抽奖历史（余额、冷却与解锁不受影响）
pub async fn clear_history(
    req: HttpRequest,
    service: web::Data<RouletteService>,
    request: web::Json<UserRequest>,
) -> Result<HttpResponse> {
    let user_id = match authorized_user_id(&req, &request) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.clear_history(&user_id).await {
        Ok(resp) => Ok(HttpResponse::Ok().json(resp)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/unlocks",
    tag = "roulette",
    request_body = UserRequest,
    security(
        ("telegram_init_data" = [])
    ),
    responses(
        (status = 200, description = "已解锁内容", body = UnlocksResponse),
        (status = 400, description = "请求参数错误"),
        (status = 403, description = "签名校验失败或 userId 与签名用户不符"),
        (status = 404, description = "用户不存在")
    )
)]
pub async fn get_unlocks(
    req: HttpRequest,
    service: web::Data<RouletteService>,
    request: web::Json<UserRequest>,
) -> Result<HttpResponse> {
    let user_id = match authorized_user_id(&req, &request) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.get_unlocks(&user_id, Utc::now()).await {
        Ok(unlocks) => Ok(HttpResponse::Ok().json(unlocks)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/prizes",
    tag = "roulette",
    responses(
        (status = 200, description = "奖品列表及概率", body = [PrizeResponse])
    )
)]
/// 当前奖品表（公开）
pub async fn list_prizes(service: web::Data<RouletteService>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.list_prizes()))
}

pub fn roulette_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/user-data", web::post().to(user_data))
        .route("/spin-roulette", web::post().to(spin_roulette))
        .route("/get-history", web::post().to(get_history))
        .route("/clear-history", web::post().to(clear_history))
        .route("/unlocks", web::post().to(get_unlocks))
        .route("/prizes", web::get().to(list_prizes));
}
