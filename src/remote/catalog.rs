//! Adapter between the domain product shape and the remote platform's
//! product resource.
//!
//! All four operations delegate transport and signing to [`SignedClient`];
//! failures propagate unchanged. The adapter never touches local state.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::{RemoteError, SignedClient};
use crate::models::{Product, ProductChanges};

/// Outbound product payload. Absent fields are omitted from the JSON body
/// entirely, which is what gives updates their partial semantics: an
/// omitted field leaves the remote value untouched.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RemoteProductPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regular_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_visibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<RemoteImage>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RemoteImage {
    pub src: String,
}

impl RemoteProductPayload {
    /// Full payload for a first remote create: published, visible, with
    /// the description defaulting to an empty string.
    pub fn for_create(product: &Product) -> Self {
        Self {
            name: Some(product.name.clone()),
            description: Some(product.description.clone().unwrap_or_default()),
            regular_price: Some(product.price.clone()),
            status: Some("publish".to_string()),
            catalog_visibility: Some("visible".to_string()),
            images: product
                .image_url
                .as_ref()
                .map(|src| vec![RemoteImage { src: src.clone() }]),
        }
    }

    /// Partial payload carrying only the supplied fields.
    pub fn for_update(changes: &ProductChanges) -> Self {
        Self {
            name: changes.name.clone(),
            description: changes.description.clone(),
            regular_price: changes.price.clone(),
            status: None,
            catalog_visibility: None,
            images: changes
                .image_url
                .as_ref()
                .map(|src| vec![RemoteImage { src: src.clone() }]),
        }
    }

    fn to_body(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Remote product state as echoed back by the platform. Only the fields
/// the sync layer cares about are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteProduct {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub regular_price: String,
    #[serde(default)]
    pub status: String,
}

pub struct RemoteCatalog {
    client: SignedClient,
}

impl RemoteCatalog {
    pub fn new(client: SignedClient) -> Self {
        Self { client }
    }

    /// Creates the product remotely; the returned state carries the
    /// remote-assigned id.
    pub async fn create_product(&self, product: &Product) -> Result<RemoteProduct, RemoteError> {
        let payload = RemoteProductPayload::for_create(product);
        let value = self
            .client
            .request(Method::POST, "/products", &[], Some(&payload.to_body()))
            .await?;
        parse_remote_product(value)
    }

    /// Pushes only the supplied fields to an existing remote product.
    pub async fn update_product(
        &self,
        remote_id: i64,
        changes: &ProductChanges,
    ) -> Result<RemoteProduct, RemoteError> {
        let payload = RemoteProductPayload::for_update(changes);
        let value = self
            .client
            .request(
                Method::PUT,
                &format!("/products/{}", remote_id),
                &[],
                Some(&payload.to_body()),
            )
            .await?;
        parse_remote_product(value)
    }

    /// Hard-deletes the remote product (no trash). The caller treats a
    /// failure here as best-effort.
    pub async fn delete_product(&self, remote_id: i64) -> Result<(), RemoteError> {
        let query = [("force".to_string(), "true".to_string())];
        self.client
            .request(
                Method::DELETE,
                &format!("/products/{}", remote_id),
                &query,
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn fetch_product(&self, remote_id: i64) -> Result<RemoteProduct, RemoteError> {
        let value = self
            .client
            .request(Method::GET, &format!("/products/{}", remote_id), &[], None)
            .await?;
        parse_remote_product(value)
    }
}

fn parse_remote_product(value: Value) -> Result<RemoteProduct, RemoteError> {
    serde_json::from_value(value).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}
