use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::SessionError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountCode(pub String);

impl std::fmt::Display for AccountCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub String);

impl std::fmt::Display for ProposalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A pending automatic-renewal endorsement awaiting resubmission.
///
/// `premium` is the only field mutated during negotiation; it always holds
/// the most recently attempted value, also when the negotiation fails.
/// Premiums are whole pesos: the negotiation only ever produces multiples of
/// 100 and the service accepts them as integer strings. The sum-insured
/// fields keep their fractional service values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub renewal: String,
    pub section_number: u32,
    pub policy_number: String,
    pub insured_name: String,
    pub vehicle: String,
    pub plate: String,
    pub billing_period: String,
    pub installment_count: u32,
    pub premium: i64,
    pub premium_previous: i64,
    pub sum_insured: Option<Decimal>,
    pub sum_insured_previous: Option<Decimal>,
    pub coverage: String,
    pub endorsement_id: i64,
    pub issue_policy: bool,
}

impl Proposal {
    /// Boundary validation: anything failing here is fatal to this one
    /// proposal only, never to sibling negotiations.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.id.0.trim().is_empty() {
            return Err(SessionError::MalformedProposal("empty proposal id".to_owned()));
        }
        if self.installment_count == 0 {
            return Err(SessionError::MalformedProposal(format!(
                "proposal {} has no installment count",
                self.id
            )));
        }
        if self.premium <= 0 {
            return Err(SessionError::MalformedProposal(format!(
                "proposal {} has non-positive premium {}",
                self.id, self.premium
            )));
        }
        Ok(())
    }
}

/// Proposals fetched for one account code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProposalGroup {
    pub account_code: AccountCode,
    pub fetched_at: DateTime<Utc>,
    pub proposals: Vec<Proposal>,
}
