use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::GatewayConfig,
    data_objects::{GatewayOrder, GatewayRefund, NewGatewayOrder, NewGatewayRefund},
    GatewayApiError,
};

#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn key_id(&self) -> &str {
        &self.config.key_id
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, GatewayApiError> {
        let url = self.url(path);
        trace!("🌐️ Sending REST query: {method} {url}");
        let mut req =
            self.client.request(method, url).basic_auth(&self.config.key_id, Some(self.config.key_secret.reveal()));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayApiError::Timeout(e.to_string())
            } else {
                GatewayApiError::RestResponseError(e.to_string())
            }
        })?;
        if response.status().is_success() {
            trace!("🌐️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayApiError::RestResponseError(e.to_string()))?;
            Err(GatewayApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_url.trim_end_matches('/'))
    }

    pub async fn create_order(&self, order: NewGatewayOrder) -> Result<GatewayOrder, GatewayApiError> {
        debug!("🌐️ Creating order for {} {} ({})", order.amount, order.currency, order.receipt);
        let result = self.rest_query::<GatewayOrder, _>(Method::POST, "/orders", Some(order)).await?;
        info!("🌐️ Created order {}", result.id);
        Ok(result)
    }

    pub async fn fetch_order(&self, order_id: &str) -> Result<GatewayOrder, GatewayApiError> {
        let path = format!("/orders/{order_id}");
        debug!("🌐️ Fetching order {order_id}");
        self.rest_query::<GatewayOrder, ()>(Method::GET, &path, None).await
    }

    pub async fn refund_payment(
        &self,
        payment_id: &str,
        refund: NewGatewayRefund,
    ) -> Result<GatewayRefund, GatewayApiError> {
        let path = format!("/payments/{payment_id}/refund");
        debug!("🌐️ Refunding {} of payment {payment_id}", refund.amount);
        let result = self.rest_query::<GatewayRefund, _>(Method::POST, &path, Some(refund)).await?;
        info!("🌐️ Payment {payment_id} refunded as {}", result.id);
        Ok(result)
    }
}
