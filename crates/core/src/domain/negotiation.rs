use serde::{Deserialize, Serialize};

use crate::domain::proposal::Proposal;

/// Discount and interval data applied while renegotiating. The attempt hook
/// may replace these between submissions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NegotiationParameters {
    pub discount_percent: f64,
    pub interval_step: i64,
}

impl Default for NegotiationParameters {
    fn default() -> Self {
        Self { discount_percent: 0.0, interval_step: 300 }
    }
}

/// Snapshot handed to the attempt and success hooks. Carries a clone of the
/// proposal, never the live record the negotiator is mutating.
#[derive(Clone, Debug, PartialEq)]
pub struct AttemptContext {
    pub proposal: Proposal,
    pub parameters: Option<NegotiationParameters>,
    pub attempt: u32,
}

/// Terminal outcome of one proposal's negotiation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NegotiationResult {
    pub accepted: bool,
    pub proposal: Proposal,
    pub attempts_used: u32,
    pub error: Option<String>,
}

impl NegotiationResult {
    pub fn accepted(proposal: Proposal, attempts_used: u32) -> Self {
        Self { accepted: true, proposal, attempts_used, error: None }
    }

    pub fn failed(proposal: Proposal, attempts_used: u32, error: impl Into<String>) -> Self {
        Self { accepted: false, proposal, attempts_used, error: Some(error.into()) }
    }
}

#[cfg(test)]
mod tests {
    use super::{NegotiationParameters, NegotiationResult};
    use crate::domain::proposal::{Proposal, ProposalId};

    fn proposal() -> Proposal {
        Proposal {
            id: ProposalId("77".to_owned()),
            renewal: "1".to_owned(),
            section_number: 3,
            policy_number: "100".to_owned(),
            insured_name: "GOMEZ ANA".to_owned(),
            vehicle: "FIAT CRONOS".to_owned(),
            plate: "AC987ZX".to_owned(),
            billing_period: "MENSUAL".to_owned(),
            installment_count: 2,
            premium: 5_000,
            premium_previous: 4_800,
            sum_insured: None,
            sum_insured_previous: None,
            coverage: "B".to_owned(),
            endorsement_id: -1,
            issue_policy: true,
        }
    }

    #[test]
    fn default_parameters_match_documented_fallbacks() {
        let parameters = NegotiationParameters::default();
        assert_eq!(parameters.discount_percent, 0.0);
        assert_eq!(parameters.interval_step, 300);
    }

    #[test]
    fn failure_result_keeps_the_last_premium_and_reason() {
        let mut attempted = proposal();
        attempted.premium = 5_200;
        let result = NegotiationResult::failed(attempted, 500, "retries exhausted");
        assert!(!result.accepted);
        assert_eq!(result.proposal.premium, 5_200);
        assert_eq!(result.attempts_used, 500);
        assert_eq!(result.error.as_deref(), Some("retries exhausted"));
    }
}
