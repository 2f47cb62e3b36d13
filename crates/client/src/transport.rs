use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use rebill_core::config::ServiceConfig;

/// Opaque session token issued by `/acceso/validar`; required header on every
/// subsequent request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket(pub String);

impl Ticket {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Failures where no HTTP response was received at all. Replies with a
/// non-success status still come back as `ServiceReply`, so callers can
/// inspect whatever body the service produced; a `TransportError` by
/// construction carries none.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport send failed: {0}")]
    Send(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Validate,
    GetProposals,
    AmendEndorsement,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Validate => "/acceso/validar",
            Self::GetProposals => "/emision/v2/getPropuestas/",
            Self::AmendEndorsement => "/emision/modificarEndosoProrrogaAutomatica/",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceRequest {
    pub endpoint: Endpoint,
    pub ticket: Option<Ticket>,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceReply {
    pub status: u16,
    pub body: String,
}

impl ServiceReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait ServiceTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn send(&self, request: ServiceRequest) -> Result<ServiceReply, TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// HTTPS transport over reqwest. The back office expects the custom
/// map-of-entries XML as `text/xml` and answers with a JSON envelope.
pub struct HttpTransport {
    base_url: String,
    timeout: Duration,
    client: RwLock<Option<reqwest::Client>>,
}

impl HttpTransport {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            client: RwLock::new(None),
        }
    }

    fn current_client(&self) -> Result<reqwest::Client, TransportError> {
        self.client
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or(TransportError::NotConnected)
    }
}

#[async_trait]
impl ServiceTransport for HttpTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        *self.client.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(client);
        Ok(())
    }

    async fn send(&self, request: ServiceRequest) -> Result<ServiceReply, TransportError> {
        let client = self.current_client()?;
        let url = format!("{}{}", self.base_url, request.endpoint.path());

        let mut builder = client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .header(reqwest::header::ACCEPT, "application/json, text/plain, */*")
            .header("plataforma", "portalpas");
        if let Some(ticket) = &request.ticket {
            builder = builder.header("ticket", ticket.as_str());
        }

        let response = builder
            .body(request.body)
            .send()
            .await
            .map_err(|error| TransportError::Send(error.to_string()))?;
        let status = response.status().as_u16();
        let body =
            response.text().await.map_err(|error| TransportError::Send(error.to_string()))?;
        Ok(ServiceReply { status, body })
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        *self.client.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }
}
