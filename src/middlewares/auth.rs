use crate::error::AppError;
use crate::utils::{INIT_DATA_HEADER, InitDataVerifier};
use actix_web::http::Method;
use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use chrono::Utc;
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};

// 需要签名的路径配置
struct ProtectedPaths {
    prefix: &'static str,
    // 前缀下仍然公开的 GET 路径
    public_get_paths: Vec<&'static str>,
}

impl ProtectedPaths {
    fn new() -> Self {
        Self {
            prefix: "/api/",
            public_get_paths: vec!["/api/prizes"],
        }
    }

    fn requires_signature(&self, method: &Method, path: &str) -> bool {
        if !path.starts_with(self.prefix) {
            return false;
        }
        !(method == Method::GET && self.public_get_paths.contains(&path))
    }
}

/// Telegram WebApp initData 校验中间件
///
/// 校验失败直接返回 403，请求不会到达业务层。
pub struct AuthMiddleware {
    verifier: InitDataVerifier,
}

impl AuthMiddleware {
    pub fn new(verifier: InitDataVerifier) -> Self {
        Self { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            verifier: self.verifier.clone(),
            protected_paths: ProtectedPaths::new(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    verifier: InitDataVerifier,
    protected_paths: ProtectedPaths,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // 放行所有 CORS 预检请求
        if req.method() == Method::OPTIONS {
            return Box::pin(self.service.call(req));
        }

        if !self.verifier.is_required()
            || !self
                .protected_paths
                .requires_signature(req.method(), req.path())
        {
            return Box::pin(self.service.call(req));
        }

        let identity = req
            .headers()
            .get(INIT_DATA_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|init_data| self.verifier.authenticate(init_data, Utc::now()));

        match identity {
            Some(Ok(identity)) => {
                // 交给 handler 与请求体中的 userId 比对
                req.extensions_mut().insert(identity);
                Box::pin(self.service.call(req))
            }
            Some(Err(e)) => {
                log::warn!("Rejected request to {}: {e}", req.path());
                Box::pin(async move { Err(AppError::NotAuthenticated.into()) })
            }
            None => {
                log::warn!("Rejected request to {} without init data", req.path());
                Box::pin(async move { Err(AppError::NotAuthenticated.into()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::TelegramIdentity;
    use crate::utils::init_data::tests::{MAX_AGE, TOKEN, signed_init_data};
    use actix_web::http::StatusCode;
    use actix_web::test::{TestRequest, call_service, init_service, read_body};
    use actix_web::{App, HttpRequest, HttpResponse, web};

    fn verifier() -> InitDataVerifier {
        InitDataVerifier::new(TOKEN, true, MAX_AGE)
    }

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    // 回显中间件写入的身份
    async fn whoami(req: HttpRequest) -> HttpResponse {
        let user_id = req
            .extensions()
            .get::<TelegramIdentity>()
            .map(|identity| identity.user_id.clone())
            .unwrap_or_default();
        HttpResponse::Ok().body(user_id)
    }

    macro_rules! app {
        ($verifier:expr) => {
            init_service(
                App::new()
                    .wrap(AuthMiddleware::new($verifier))
                    .route("/api/spin-roulette", web::post().to(whoami))
                    .route("/api/prizes", web::get().to(ok))
                    .route("/health", web::get().to(ok)),
            )
            .await
        };
    }

    macro_rules! assert_forbidden {
        ($app:expr, $req:expr) => {
            match $app.call($req).await {
                Err(e) => {
                    assert_eq!(e.as_response_error().status_code(), StatusCode::FORBIDDEN)
                }
                Ok(res) => panic!("expected rejection, got {}", res.status()),
            }
        };
    }

    #[actix_web::test]
    async fn test_missing_or_bad_signature_is_forbidden() {
        let app = app!(verifier());

        let req = TestRequest::post().uri("/api/spin-roulette").to_request();
        assert_forbidden!(app, req);

        let req = TestRequest::post()
            .uri("/api/spin-roulette")
            .insert_header((INIT_DATA_HEADER, "auth_date=1&user=alice&hash=00ff"))
            .to_request();
        assert_forbidden!(app, req);
    }

    #[actix_web::test]
    async fn test_stale_init_data_is_forbidden() {
        let verifier = verifier();
        let stale = Utc::now().timestamp() - MAX_AGE - 60;
        let header = signed_init_data(&verifier, 1, stale);
        let app = app!(verifier);

        let req = TestRequest::post()
            .uri("/api/spin-roulette")
            .insert_header((INIT_DATA_HEADER, header))
            .to_request();
        assert_forbidden!(app, req);
    }

    #[actix_web::test]
    async fn test_valid_signature_passes_identity_on() {
        let verifier = verifier();
        let header = signed_init_data(&verifier, 77, Utc::now().timestamp());
        let app = app!(verifier);

        let req = TestRequest::post()
            .uri("/api/spin-roulette")
            .insert_header((INIT_DATA_HEADER, header))
            .to_request();
        let res = call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(read_body(res).await, "77");
    }

    #[actix_web::test]
    async fn test_public_paths_and_disabled_gate() {
        let app = app!(verifier());
        let req = TestRequest::get().uri("/api/prizes").to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::OK);
        let req = TestRequest::get().uri("/health").to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::OK);

        // 关闭校验时不附带身份
        let app = app!(InitDataVerifier::new("", false, MAX_AGE));
        let req = TestRequest::post().uri("/api/spin-roulette").to_request();
        let res = call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(read_body(res).await, "");
    }

    #[test]
    fn test_protected_paths() {
        let paths = ProtectedPaths::new();
        assert!(paths.requires_signature(&Method::POST, "/api/user-data"));
        assert!(paths.requires_signature(&Method::POST, "/api/prizes"));
        assert!(!paths.requires_signature(&Method::GET, "/api/prizes"));
        assert!(!paths.requires_signature(&Method::GET, "/swagger-ui/"));
    }
}
