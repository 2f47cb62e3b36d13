use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use rebill_core::{AuthenticationError, Credentials};

use crate::transport::{Endpoint, ServiceReply, ServiceRequest, ServiceTransport, Ticket, TransportError};
use crate::wire::{self, Envelope, LoginObject};

/// Error surface of [`Connection::send_authenticated`]. `NotAuthenticated`
/// aborts the calling operation; `Transport` is for the caller to absorb or
/// report per its own failure policy.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("connection is not authenticated")]
    NotAuthenticated,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Default)]
struct ConnectionState {
    ticket: Option<Ticket>,
    authenticated: bool,
    correlation_id: Option<String>,
}

/// One transport connection and one session ticket, shared read-only by all
/// concurrent negotiation tasks. Only `login` and `logout` mutate the state,
/// and the facade never calls `logout` while negotiations are in flight.
pub struct Connection {
    transport: Arc<dyn ServiceTransport>,
    credentials: Credentials,
    state: Mutex<ConnectionState>,
}

impl Connection {
    pub fn new(transport: Arc<dyn ServiceTransport>, credentials: Credentials) -> Self {
        Self { transport, credentials, state: Mutex::new(ConnectionState::default()) }
    }

    /// Authenticates against `/acceso/validar` and stores the issued ticket.
    /// On any failure the transport is disconnected before the error
    /// propagates, so a failed login never leaks an open connection.
    pub async fn login(&self) -> Result<(), AuthenticationError> {
        self.transport
            .connect()
            .await
            .map_err(|error| AuthenticationError::Transport(error.to_string()))?;

        let request = ServiceRequest {
            endpoint: Endpoint::Validate,
            ticket: None,
            body: wire::login_body(&self.credentials),
        };
        let reply = match self.transport.send(request).await {
            Ok(reply) => reply,
            Err(error) => {
                self.close_transport().await;
                return Err(AuthenticationError::Transport(error.to_string()));
            }
        };

        if !reply.is_success() {
            self.close_transport().await;
            return Err(AuthenticationError::Rejected { status: reply.status });
        }

        let ticket = match parse_ticket(&reply) {
            Some(ticket) => ticket,
            None => {
                self.close_transport().await;
                return Err(AuthenticationError::MissingTicket);
            }
        };

        let correlation_id = Uuid::new_v4().to_string();
        {
            let mut state = self.lock_state();
            state.ticket = Some(ticket);
            state.authenticated = true;
            state.correlation_id = Some(correlation_id.clone());
        }
        info!(
            correlation_id = %correlation_id,
            username = %self.credentials.username,
            "session authenticated"
        );
        Ok(())
    }

    /// Idempotent: closes the transport if open, clears the ticket, marks the
    /// session unauthenticated. Safe to call repeatedly and before any login.
    pub async fn logout(&self) {
        let correlation_id = {
            let mut state = self.lock_state();
            state.ticket = None;
            state.authenticated = false;
            state.correlation_id.take()
        };
        self.close_transport().await;
        if let Some(correlation_id) = correlation_id {
            info!(correlation_id = %correlation_id, "session closed");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock_state().authenticated
    }

    pub fn ticket(&self) -> Option<Ticket> {
        self.lock_state().ticket.clone()
    }

    pub fn correlation_id(&self) -> Option<String> {
        self.lock_state().correlation_id.clone()
    }

    /// Sends a ticket-bearing request. Never issued while unauthenticated.
    pub async fn send_authenticated(
        &self,
        endpoint: Endpoint,
        body: String,
    ) -> Result<ServiceReply, RequestError> {
        let ticket = {
            let state = self.lock_state();
            if !state.authenticated {
                return Err(RequestError::NotAuthenticated);
            }
            state.ticket.clone().ok_or(RequestError::NotAuthenticated)?
        };
        let reply = self
            .transport
            .send(ServiceRequest { endpoint, ticket: Some(ticket), body })
            .await?;
        Ok(reply)
    }

    async fn close_transport(&self) {
        if let Err(error) = self.transport.disconnect().await {
            warn!(error = %error, "transport disconnect failed");
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn parse_ticket(reply: &ServiceReply) -> Option<Ticket> {
    let envelope: Envelope<LoginObject> = serde_json::from_str(&reply.body).ok()?;
    envelope.object.ticket.filter(|ticket| !ticket.is_empty()).map(Ticket)
}
