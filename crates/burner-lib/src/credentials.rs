//! Monitoring endpoint credentials for the benchmark engine

use crate::error::{CredentialError, Result};
use crate::models::Credentials;
use async_trait::async_trait;
use k8s_openapi::api::authentication::v1::{TokenRequest, TokenRequestSpec};
use k8s_openapi::api::core::v1::ServiceAccount;
use kube::api::{Api, PostParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::Client;
use tracing::debug;
use url::Url;

/// Supplies the monitoring endpoint URL and a bearer token
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn monitoring_endpoint(&self) -> Result<Credentials>;
}

/// Fixed endpoint and token, e.g. from settings
pub struct StaticCredentialProvider {
    credentials: Credentials,
}

impl StaticCredentialProvider {
    pub fn new(endpoint: &str, token: impl Into<String>) -> Result<Self> {
        let endpoint = validate_endpoint(endpoint)?;
        Ok(Self {
            credentials: Credentials {
                endpoint,
                token: token.into(),
            },
        })
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn monitoring_endpoint(&self) -> Result<Credentials> {
        Ok(self.credentials.clone())
    }
}

/// Where the cluster monitoring stack exposes its query endpoint
#[derive(Debug, Clone)]
pub struct MonitoringTarget {
    pub namespace: String,
    pub route: String,
    pub service_account: String,
    pub token_ttl_secs: i64,
}

impl Default for MonitoringTarget {
    fn default() -> Self {
        Self {
            namespace: "openshift-monitoring".to_string(),
            route: "prometheus-k8s".to_string(),
            service_account: "prometheus-k8s".to_string(),
            token_ttl_secs: 3600,
        }
    }
}

/// Resolves the Prometheus route host and mints a service account token
pub struct RouteCredentialProvider {
    client: Client,
    target: MonitoringTarget,
}

impl RouteCredentialProvider {
    pub fn new(client: Client, target: MonitoringTarget) -> Self {
        Self { client, target }
    }

    async fn route_host(&self) -> std::result::Result<String, CredentialError> {
        let endpoint_err = |reason: String| CredentialError::Endpoint {
            namespace: self.target.namespace.clone(),
            name: self.target.route.clone(),
            reason,
        };

        let gvk = GroupVersionKind::gvk("route.openshift.io", "v1", "Route");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "routes");
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), &self.target.namespace, &resource);

        let route = api
            .get(&self.target.route)
            .await
            .map_err(|e| endpoint_err(e.to_string()))?;

        route
            .data
            .get("spec")
            .and_then(|spec| spec.get("host"))
            .and_then(|host| host.as_str())
            .map(|host| host.trim_matches('"').to_string())
            .filter(|host| !host.is_empty())
            .ok_or_else(|| endpoint_err("route has no spec.host".to_string()))
    }

    async fn service_account_token(&self) -> std::result::Result<String, CredentialError> {
        let token_err = |reason: String| CredentialError::Token {
            namespace: self.target.namespace.clone(),
            name: self.target.service_account.clone(),
            reason,
        };

        let api: Api<ServiceAccount> =
            Api::namespaced(self.client.clone(), &self.target.namespace);
        let request = TokenRequest {
            spec: TokenRequestSpec {
                expiration_seconds: Some(self.target.token_ttl_secs),
                ..Default::default()
            },
            ..Default::default()
        };
        let body = serde_json::to_vec(&request).map_err(|e| token_err(e.to_string()))?;

        let issued: TokenRequest = api
            .create_subresource("token", &self.target.service_account, &PostParams::default(), body)
            .await
            .map_err(|e| token_err(e.to_string()))?;

        issued
            .status
            .map(|status| status.token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| token_err("token request returned no token".to_string()))
    }
}

#[async_trait]
impl CredentialProvider for RouteCredentialProvider {
    async fn monitoring_endpoint(&self) -> Result<Credentials> {
        let host = self.route_host().await?;
        let token = self.service_account_token().await?;
        let endpoint = validate_endpoint(&endpoint_from_host(&host))?;
        debug!(endpoint = %endpoint, "Resolved monitoring endpoint");
        Ok(Credentials { endpoint, token })
    }
}

/// `https://` URL for a route host, tolerating hosts that already carry a scheme
pub fn endpoint_from_host(host: &str) -> String {
    let host = host.trim();
    if host.starts_with("https://") || host.starts_with("http://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// Check that `endpoint` is an absolute http(s) URL
pub fn validate_endpoint(endpoint: &str) -> std::result::Result<String, CredentialError> {
    let invalid = |reason: String| CredentialError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };
    let url = Url::parse(endpoint.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(endpoint.trim().to_string()),
        _ => Err(invalid("expected an http(s) URL with a host".to_string())),
    }
}
