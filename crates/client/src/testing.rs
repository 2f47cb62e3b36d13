//! Shared test doubles for the client crate.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::transport::{ServiceReply, ServiceRequest, ServiceTransport, TransportError};

/// Transport that answers from a prepared script, recording every request.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    state: Mutex<ScriptedState>,
}

#[derive(Default)]
struct ScriptedState {
    replies: VecDeque<Result<ServiceReply, TransportError>>,
    requests: Vec<ServiceRequest>,
    disconnect_calls: usize,
}

impl ScriptedTransport {
    pub(crate) fn with_replies(replies: Vec<Result<ServiceReply, TransportError>>) -> Self {
        Self { state: Mutex::new(ScriptedState { replies: replies.into(), ..Default::default() }) }
    }

    pub(crate) async fn requests(&self) -> Vec<ServiceRequest> {
        self.state.lock().await.requests.clone()
    }

    pub(crate) async fn request_count(&self) -> usize {
        self.state.lock().await.requests.len()
    }

    pub(crate) async fn disconnect_calls(&self) -> usize {
        self.state.lock().await.disconnect_calls
    }
}

#[async_trait]
impl ServiceTransport for ScriptedTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(&self, request: ServiceRequest) -> Result<ServiceReply, TransportError> {
        let mut state = self.state.lock().await;
        state.requests.push(request);
        state.replies.pop_front().unwrap_or(Err(TransportError::Send("script exhausted".to_owned())))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.state.lock().await.disconnect_calls += 1;
        Ok(())
    }
}

pub(crate) fn login_reply(ticket: &str) -> Result<ServiceReply, TransportError> {
    Ok(ServiceReply { status: 200, body: format!(r#"{{"object":{{"ticket":"{ticket}"}}}}"#) })
}

pub(crate) fn accepted_reply() -> Result<ServiceReply, TransportError> {
    Ok(ServiceReply {
        status: 200,
        body: r#"{"object":{"xml":"<mensaje>Operacion exitosa</mensaje>"}}"#.to_owned(),
    })
}

pub(crate) fn surcharge_reply() -> Result<ServiceReply, TransportError> {
    Ok(ServiceReply {
        status: 200,
        body: r#"{"object":{"xml":"recargo que excede el porcentaje permitido"}}"#.to_owned(),
    })
}
