use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{self, HeaderName, HeaderValue};
use actix_web::Error;
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;

pub const DEFAULT_CSP: &str =
    "default-src 'self'; img-src 'self' data:; object-src 'none'; base-uri 'none'; frame-ancestors 'none'; form-action 'self'";

/// Response headers applied to every route. API responses additionally get
/// `Cache-Control: no-store` since they carry per-user data.
#[derive(Clone)]
pub struct SecurityHeaders {
    pub enable_hsts: bool,
    csp: HeaderValue,
    api_prefix: &'static str,
}

impl Default for SecurityHeaders {
    fn default() -> Self {
        Self { enable_hsts: false, csp: HeaderValue::from_static(DEFAULT_CSP), api_prefix: "/api/" }
    }
}

impl SecurityHeaders {
    pub fn new(enable_hsts: bool) -> Self {
        Self { enable_hsts, ..Self::default() }
    }

    pub fn with_csp(mut self, policy: &'static str) -> Self {
        self.csp = HeaderValue::from_static(policy);
        self
    }

    fn defaults(&self, path: &str) -> Vec<(HeaderName, HeaderValue)> {
        let mut v = vec![
            (header::CONTENT_SECURITY_POLICY, self.csp.clone()),
            (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
            (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
            (header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
        ];
        if self.enable_hsts {
            v.push((header::STRICT_TRANSPORT_SECURITY, HeaderValue::from_static("max-age=63072000; includeSubDomains")));
        }
        if path.starts_with(self.api_prefix) {
            v.push((header::CACHE_CONTROL, HeaderValue::from_static("no-store")));
        }
        v
    }
}

impl<S, B> Transform<S, ServiceRequest> for SecurityHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SecurityHeadersMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SecurityHeadersMiddleware { service: Rc::new(service), cfg: self.clone() }))
    }
}

pub struct SecurityHeadersMiddleware<S> {
    service: Rc<S>,
    cfg: SecurityHeaders,
}

impl<S, B> Service<ServiceRequest> for SecurityHeadersMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let extra = self.cfg.defaults(req.path());
        let svc = self.service.clone();
        Box::pin(async move {
            let mut res = svc.call(req).await?;
            let headers = res.headers_mut();
            for (name, value) in extra {
                // handlers may set their own (SSE sets no-cache)
                if !headers.contains_key(&name) {
                    headers.insert(name, value);
                }
            }
            Ok(res)
        })
    }
}
