//! Synchronous-looking entry point for non-concurrent callers.
//!
//! A `Session` owns one long-lived current-thread tokio runtime, so every
//! network call and negotiation task multiplexes on a single event loop, and
//! the blocking adapter is confined to this outermost boundary.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use rebill_core::config::AppConfig;
use rebill_core::{
    AccountCode, AuthenticationError, Credentials, NegotiationParameters, ProposalGroup,
    SessionError,
};

use crate::batch::{self, BatchEntry};
use crate::connection::Connection;
use crate::fetcher;
use crate::negotiator::{NegotiationConfig, NegotiationHooks, Negotiator, NoopHooks};
use crate::transport::{HttpTransport, ServiceTransport};

pub struct Session {
    runtime: tokio::runtime::Runtime,
    connection: Arc<Connection>,
    negotiator: Arc<Negotiator>,
    codes: Vec<AccountCode>,
    parameters: NegotiationParameters,
    cancel: CancellationToken,
    started: bool,
}

impl Session {
    /// Builds a session over the real HTTPS transport.
    pub fn new(
        config: &AppConfig,
        credentials: Credentials,
        codes: Vec<AccountCode>,
    ) -> Result<Self, SessionError> {
        let transport: Arc<dyn ServiceTransport> = Arc::new(HttpTransport::new(&config.service));
        Self::with_transport(config, transport, credentials, codes)
    }

    /// Builds a session over any transport; the seam the tests use.
    pub fn with_transport(
        config: &AppConfig,
        transport: Arc<dyn ServiceTransport>,
        credentials: Credentials,
        codes: Vec<AccountCode>,
    ) -> Result<Self, SessionError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| SessionError::Internal(format!("runtime construction: {error}")))?;
        Ok(Self {
            runtime,
            connection: Arc::new(Connection::new(transport, credentials)),
            negotiator: Arc::new(Negotiator::new(NegotiationConfig::from(&config.negotiation))),
            codes,
            parameters: NegotiationParameters {
                discount_percent: config.negotiation.discount_percent,
                interval_step: config.negotiation.interval_step,
            },
            cancel: CancellationToken::new(),
            started: false,
        })
    }

    /// Logs in and marks the session started.
    pub fn start(&mut self) -> Result<(), AuthenticationError> {
        self.runtime.block_on(self.connection.login())?;
        self.started = true;
        Ok(())
    }

    /// Logs out and releases the connection. Idempotent; safe to call without
    /// a prior `start`, and never called while negotiations are in flight
    /// because the batch entry points hold `&mut self` until they return.
    pub fn stop(&mut self) {
        self.runtime.block_on(self.connection.logout());
        self.started = false;
    }

    pub fn is_authenticated(&self) -> bool {
        self.connection.is_authenticated()
    }

    /// Token observed by every in-flight negotiation; cancel it from another
    /// thread to wind the batch down at the next suspension point.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn fetch_proposals(&mut self) -> Result<Vec<ProposalGroup>, SessionError> {
        if !self.started {
            return Err(SessionError::NotStarted);
        }
        self.runtime.block_on(fetcher::fetch_proposals(&self.connection, &self.codes))
    }

    /// Negotiates every proposal in `groups` concurrently with the session's
    /// configured parameters and no hooks.
    pub fn negotiate_all(
        &mut self,
        groups: Vec<ProposalGroup>,
    ) -> Result<Vec<BatchEntry>, SessionError> {
        let parameters = self.parameters.clone();
        self.negotiate_all_with(groups, Some(parameters), Arc::new(NoopHooks))
    }

    /// Full surface for collaborators: explicit initial parameters (or none,
    /// leaving the attempt hook as the only source) plus hooks.
    pub fn negotiate_all_with(
        &mut self,
        groups: Vec<ProposalGroup>,
        parameters: Option<NegotiationParameters>,
        hooks: Arc<dyn NegotiationHooks>,
    ) -> Result<Vec<BatchEntry>, SessionError> {
        if !self.started {
            return Err(SessionError::NotStarted);
        }
        let entries = self.runtime.block_on(batch::negotiate_all(
            Arc::clone(&self.connection),
            Arc::clone(&self.negotiator),
            groups,
            parameters,
            hooks,
            self.cancel.child_token(),
        ));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rebill_core::config::AppConfig;
    use rebill_core::{AccountCode, Credentials, SessionError};

    use super::Session;
    use crate::testing::{accepted_reply, login_reply, ScriptedTransport};
    use crate::transport::ServiceReply;

    fn session_over(transport: Arc<ScriptedTransport>) -> Session {
        Session::with_transport(
            &AppConfig::default(),
            transport,
            Credentials::new("prod", "pw"),
            vec![AccountCode("1122".to_owned())],
        )
        .expect("session should build")
    }

    #[test]
    fn operations_before_start_are_refused() {
        let mut session = session_over(Arc::new(ScriptedTransport::default()));
        assert_eq!(session.fetch_proposals().unwrap_err(), SessionError::NotStarted);
        assert_eq!(session.negotiate_all(Vec::new()).unwrap_err(), SessionError::NotStarted);
    }

    #[test]
    fn stop_twice_is_fine_and_leaves_the_session_unauthenticated() {
        let transport = Arc::new(ScriptedTransport::with_replies(vec![login_reply("tk")]));
        let mut session = session_over(transport);

        session.start().expect("start should succeed");
        assert!(session.is_authenticated());

        session.stop();
        session.stop();
        assert!(!session.is_authenticated());
        assert_eq!(session.fetch_proposals().unwrap_err(), SessionError::NotStarted);
    }

    #[test]
    fn full_flow_fetches_then_negotiates_over_one_connection() {
        let transport = Arc::new(ScriptedTransport::with_replies(vec![
            login_reply("tk"),
            Ok(ServiceReply {
                status: 200,
                body: r#"{"object":{"results":[
                    {"propuesta":"1001","cantidadCuota":1,"premio":10000,
                     "numeroSeccion":3,"renovacion":"1"}
                ]}}"#
                    .to_owned(),
            }),
            accepted_reply(),
        ]));
        let mut session = session_over(transport);

        session.start().expect("start should succeed");
        let groups = session.fetch_proposals().expect("fetch should succeed");
        assert_eq!(groups.len(), 1);

        let entries = session.negotiate_all(groups).expect("negotiate should run");
        assert_eq!(entries.len(), 1);
        assert!(entries[0].as_ref().expect("accepted").accepted);
        session.stop();
    }
}
