//! Admin key middleware for the donation server.
//! This middleware can be placed on any route or scope.
//!
//! It checks the `X-Api-Key` header of the incoming request against the configured admin key. A missing key gets a
//! 401 Unauthorized response, and a wrong one gets 403 Forbidden.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorForbidden, ErrorUnauthorized},
    Error,
};
use donation_engine::helpers::constant_time_eq;
use dpg_common::Secret;
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;

pub const API_KEY_HEADER: &str = "X-Api-Key";

pub struct ApiKeyMiddlewareFactory {
    key: Secret<String>,
}

impl ApiKeyMiddlewareFactory {
    pub fn new(key: Secret<String>) -> Self {
        ApiKeyMiddlewareFactory { key }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = ApiKeyMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ApiKeyMiddlewareService { key: self.key.clone(), service: Rc::new(service) })
    }
}

pub struct ApiKeyMiddlewareService<S> {
    key: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ApiKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let key = self.key.clone();
        Box::pin(async move {
            let presented = req.headers().get(API_KEY_HEADER).and_then(|v| v.to_str().ok()).map(str::trim);
            let verdict = match presented {
                None | Some("") => {
                    debug!("🔐️ No admin key on request to {}", req.path());
                    Err(ErrorUnauthorized("An admin key is required."))
                },
                Some(k) if !key.reveal().is_empty() && constant_time_eq(k.as_bytes(), key.reveal().as_bytes()) => {
                    trace!("🔐️ Admin key accepted for {}", req.path());
                    Ok(())
                },
                Some(_) => {
                    warn!("🔐️ Invalid admin key presented for {}. Denying access.", req.path());
                    Err(ErrorForbidden("Invalid admin key."))
                },
            };
            verdict?;
            service.call(req).await
        })
    }
}
