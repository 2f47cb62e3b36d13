//! Per-proposal renegotiation state machine.
//!
//! A negotiation starts by lowering the premium to the rounding-safe minimum,
//! then resubmits the proposal until the service stops answering with the
//! surcharge rejection or the attempt budget runs out. Business rejections and
//! exhaustion are reported inside the returned `NegotiationResult`; only
//! precondition violations (unauthenticated session, malformed proposal)
//! surface as errors.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rebill_core::config::NegotiationSettings;
use rebill_core::{
    minimum_premium, AttemptContext, Classification, NegotiationParameters, NegotiationResult,
    Proposal, ResponseClassifier, SessionError, SurchargePhraseClassifier,
};

use crate::connection::{Connection, RequestError};
use crate::transport::Endpoint;
use crate::wire::{self, Envelope, EndorsementObject};

/// Bounds on a single proposal's retry loop. `max_attempts` caps the number
/// of resubmissions; the timeouts close the unbounded-wall-clock hole a bare
/// attempt cap leaves open.
#[derive(Clone, Debug)]
pub struct NegotiationConfig {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub overall_deadline: Option<Duration>,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 500,
            attempt_timeout: Duration::from_secs(30),
            overall_deadline: Some(Duration::from_secs(600)),
        }
    }
}

impl From<&NegotiationSettings> for NegotiationConfig {
    fn from(settings: &NegotiationSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            attempt_timeout: Duration::from_secs(settings.attempt_timeout_secs),
            overall_deadline: settings.overall_deadline_secs.map(Duration::from_secs),
        }
    }
}

/// Hooks a collaborator (UI, reporting) may register on a negotiation. Both
/// run on the session's event loop and may suspend.
#[async_trait]
pub trait NegotiationHooks: Send + Sync {
    /// Invoked before each submission. Returning `Some` replaces the
    /// negotiation parameters for this and later attempts.
    async fn on_attempt(&self, _context: &AttemptContext) -> Option<NegotiationParameters> {
        None
    }

    /// Invoked once per accepted proposal.
    async fn on_success(&self, _context: &AttemptContext) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHooks;

impl NegotiationHooks for NoopHooks {}

pub struct Negotiator {
    classifier: Arc<dyn ResponseClassifier>,
    config: NegotiationConfig,
}

impl Negotiator {
    pub fn new(config: NegotiationConfig) -> Self {
        Self { classifier: Arc::new(SurchargePhraseClassifier), config }
    }

    pub fn with_classifier(config: NegotiationConfig, classifier: Arc<dyn ResponseClassifier>) -> Self {
        Self { classifier, config }
    }

    /// Runs one proposal to a terminal outcome. The proposal inside the
    /// result always reflects the most recently attempted premium.
    pub async fn negotiate(
        &self,
        connection: &Connection,
        mut proposal: Proposal,
        initial_parameters: Option<NegotiationParameters>,
        hooks: &dyn NegotiationHooks,
        cancel: &CancellationToken,
    ) -> Result<NegotiationResult, SessionError> {
        proposal.validate()?;
        if !connection.is_authenticated() {
            return Err(SessionError::NotStarted);
        }

        let mut parameters = initial_parameters;
        let discount =
            parameters.as_ref().map(|p| p.discount_percent).unwrap_or_default();
        proposal.premium =
            minimum_premium(proposal.premium as f64, discount, proposal.installment_count)
                .map_err(|error| SessionError::MalformedProposal(error.to_string()))?;
        debug!(proposal = %proposal.id, premium = proposal.premium, "starting premium computed");

        let deadline = self.config.overall_deadline.map(|limit| Instant::now() + limit);
        let step = i64::from(proposal.installment_count) * 100;
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Ok(NegotiationResult::failed(proposal, attempt, "negotiation cancelled"));
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Ok(NegotiationResult::failed(
                        proposal,
                        attempt,
                        "negotiation deadline exceeded",
                    ));
                }
            }

            let context = AttemptContext {
                proposal: proposal.clone(),
                parameters: parameters.clone(),
                attempt,
            };
            if let Some(updated) = hooks.on_attempt(&context).await {
                parameters = Some(updated);
            } else if parameters.is_none() {
                return Ok(NegotiationResult::failed(
                    proposal,
                    attempt,
                    "no negotiation data available for this proposal",
                ));
            }

            let body = wire::amend_body(&proposal);
            let submission = connection.send_authenticated(Endpoint::AmendEndorsement, body);
            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    return Ok(NegotiationResult::failed(
                        proposal,
                        attempt,
                        "negotiation cancelled",
                    ));
                }
                outcome = tokio::time::timeout(self.config.attempt_timeout, submission) => outcome,
            };

            let reply = match outcome {
                Ok(Ok(reply)) => reply,
                Ok(Err(RequestError::NotAuthenticated)) => return Err(SessionError::NotStarted),
                Ok(Err(RequestError::Transport(error))) => {
                    // No response was received, so there is no body to
                    // classify; report the network failure instead of
                    // guessing.
                    warn!(proposal = %proposal.id, error = %error, "submission failed");
                    return Ok(NegotiationResult::failed(
                        proposal,
                        attempt,
                        format!("network failure while submitting: {error}"),
                    ));
                }
                Err(_elapsed) => {
                    return Ok(NegotiationResult::failed(
                        proposal,
                        attempt,
                        "submission timed out",
                    ));
                }
            };

            let verdict = match serde_json::from_str::<Envelope<EndorsementObject>>(&reply.body) {
                Ok(envelope) => match envelope.object.xml {
                    Some(xml) => self.classifier.classify(&xml),
                    None => {
                        return Ok(NegotiationResult::failed(
                            proposal,
                            attempt,
                            "service reply carried no result payload",
                        ));
                    }
                },
                Err(_) if !reply.is_success() => {
                    return Ok(NegotiationResult::failed(
                        proposal,
                        attempt,
                        format!("service rejected the submission with status {}", reply.status),
                    ));
                }
                Err(error) => {
                    return Ok(NegotiationResult::failed(
                        proposal,
                        attempt,
                        format!("unreadable service reply: {error}"),
                    ));
                }
            };

            match verdict {
                Classification::SurchargeRejected => {
                    attempt += 1;
                    proposal.premium += step;
                    debug!(
                        proposal = %proposal.id,
                        attempt,
                        premium = proposal.premium,
                        "surcharge rejected, raising premium"
                    );
                    if attempt >= self.config.max_attempts {
                        return Ok(NegotiationResult::failed(
                            proposal,
                            attempt,
                            format!(
                                "surcharge still rejected after {} attempts",
                                self.config.max_attempts
                            ),
                        ));
                    }
                }
                Classification::Accepted => {
                    info!(
                        proposal = %proposal.id,
                        attempt,
                        premium = proposal.premium,
                        "proposal accepted"
                    );
                    let context = AttemptContext {
                        proposal: proposal.clone(),
                        parameters: parameters.clone(),
                        attempt,
                    };
                    hooks.on_success(&context).await;
                    return Ok(NegotiationResult::accepted(proposal, attempt));
                }
            }
        }
    }
}
