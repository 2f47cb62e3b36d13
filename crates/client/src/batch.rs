use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use rebill_core::{NegotiationParameters, NegotiationResult, ProposalGroup, SessionError};

use crate::connection::Connection;
use crate::negotiator::{NegotiationHooks, Negotiator};

/// One entry per input proposal: either a terminal negotiation outcome or the
/// precondition error that kept that proposal from negotiating at all.
pub type BatchEntry = Result<NegotiationResult, SessionError>;

/// Fans out one negotiation task per proposal over the shared connection and
/// waits for every one of them.
///
/// The result sequence preserves the flattening order (group order, then
/// in-group order) regardless of completion order, and a failing entry never
/// cancels or delays its siblings.
pub async fn negotiate_all(
    connection: Arc<Connection>,
    negotiator: Arc<Negotiator>,
    groups: Vec<ProposalGroup>,
    parameters: Option<NegotiationParameters>,
    hooks: Arc<dyn NegotiationHooks>,
    cancel: CancellationToken,
) -> Vec<BatchEntry> {
    let proposals: Vec<_> =
        groups.into_iter().flat_map(|group| group.proposals.into_iter()).collect();
    let total = proposals.len();
    info!(proposals = total, "starting negotiation batch");

    let mut handles = Vec::with_capacity(total);
    for proposal in proposals {
        let connection = Arc::clone(&connection);
        let negotiator = Arc::clone(&negotiator);
        let parameters = parameters.clone();
        let hooks = Arc::clone(&hooks);
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            negotiator
                .negotiate(&connection, proposal, parameters, hooks.as_ref(), &cancel)
                .await
        }));
    }

    let mut entries = Vec::with_capacity(total);
    for handle in handles {
        let entry = match handle.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                warn!(error = %join_error, "negotiation task died");
                Err(SessionError::Internal(format!("negotiation task died: {join_error}")))
            }
        };
        entries.push(entry);
    }

    let accepted = entries
        .iter()
        .filter(|entry| matches!(entry, Ok(result) if result.accepted))
        .count();
    info!(proposals = total, accepted, "negotiation batch finished");
    entries
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use tokio_util::sync::CancellationToken;

    use rebill_core::{
        AccountCode, Credentials, NegotiationParameters, Proposal, ProposalGroup, ProposalId,
        SessionError,
    };

    use super::negotiate_all;
    use crate::connection::Connection;
    use crate::negotiator::{NegotiationConfig, Negotiator, NoopHooks};
    use crate::testing::{accepted_reply, login_reply, ScriptedTransport};

    fn proposal(id: &str, installments: u32) -> Proposal {
        Proposal {
            id: ProposalId(id.to_owned()),
            renewal: "1".to_owned(),
            section_number: 3,
            policy_number: "411222".to_owned(),
            insured_name: "PEREZ JUAN".to_owned(),
            vehicle: "FORD KA 1.5".to_owned(),
            plate: "AB123CD".to_owned(),
            billing_period: "MENSUAL".to_owned(),
            installment_count: installments,
            premium: 10_000,
            premium_previous: 9_500,
            sum_insured: None,
            sum_insured_previous: None,
            coverage: "C".to_owned(),
            endorsement_id: -1,
            issue_policy: true,
        }
    }

    fn group(code: &str, proposals: Vec<Proposal>) -> ProposalGroup {
        ProposalGroup {
            account_code: AccountCode(code.to_owned()),
            fetched_at: Utc::now(),
            proposals,
        }
    }

    #[tokio::test]
    async fn malformed_entries_do_not_disturb_their_siblings() {
        // 10 proposals, 3 of them malformed (installment_count == 0) at fixed
        // positions; every well-formed one is accepted on first submission.
        let mut replies = vec![login_reply("tk")];
        replies.extend(std::iter::repeat_with(accepted_reply).take(7));
        let transport = Arc::new(ScriptedTransport::with_replies(replies));
        let connection = Arc::new(Connection::new(transport, Credentials::new("prod", "pw")));
        connection.login().await.expect("login should succeed");

        let malformed_positions = [1_usize, 4, 8];
        let mut proposals = Vec::new();
        for index in 0..10_usize {
            let installments = if malformed_positions.contains(&index) { 0 } else { 1 };
            proposals.push(proposal(&format!("p{index}"), installments));
        }
        let groups = vec![
            group("A", proposals[..5].to_vec()),
            group("B", proposals[5..].to_vec()),
        ];

        let negotiator = Arc::new(Negotiator::new(NegotiationConfig::default()));
        let entries = negotiate_all(
            connection,
            negotiator,
            groups,
            Some(NegotiationParameters::default()),
            Arc::new(NoopHooks),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(entries.len(), 10);
        for (index, entry) in entries.iter().enumerate() {
            if malformed_positions.contains(&index) {
                assert!(
                    matches!(entry, Err(SessionError::MalformedProposal(_))),
                    "entry {index} should be a malformed-proposal error"
                );
            } else {
                let result = entry.as_ref().expect("well-formed entry should negotiate");
                assert!(result.accepted, "entry {index} should be accepted");
                assert_eq!(result.proposal.id.0, format!("p{index}"));
            }
        }
    }

    #[tokio::test]
    async fn flattening_preserves_group_order_then_in_group_order() {
        let mut replies = vec![login_reply("tk")];
        replies.extend(std::iter::repeat_with(accepted_reply).take(4));
        let transport = Arc::new(ScriptedTransport::with_replies(replies));
        let connection = Arc::new(Connection::new(transport, Credentials::new("prod", "pw")));
        connection.login().await.expect("login should succeed");

        let groups = vec![
            group("A", vec![proposal("a0", 1), proposal("a1", 1)]),
            group("B", vec![proposal("b0", 1), proposal("b1", 1)]),
        ];

        let negotiator = Arc::new(Negotiator::new(NegotiationConfig::default()));
        let entries = negotiate_all(
            connection,
            negotiator,
            groups,
            Some(NegotiationParameters::default()),
            Arc::new(NoopHooks),
            CancellationToken::new(),
        )
        .await;

        let ids: Vec<_> = entries
            .iter()
            .map(|entry| entry.as_ref().expect("accepted").proposal.id.0.clone())
            .collect();
        assert_eq!(ids, vec!["a0", "a1", "b0", "b1"]);
    }

    #[tokio::test]
    async fn empty_groups_produce_an_empty_result() {
        let transport = Arc::new(ScriptedTransport::with_replies(vec![login_reply("tk")]));
        let connection = Arc::new(Connection::new(transport, Credentials::new("prod", "pw")));
        connection.login().await.expect("login should succeed");

        let negotiator = Arc::new(Negotiator::new(NegotiationConfig::default()));
        let entries = negotiate_all(
            connection,
            negotiator,
            vec![group("A", Vec::new())],
            Some(NegotiationParameters::default()),
            Arc::new(NoopHooks),
            CancellationToken::new(),
        )
        .await;
        assert!(entries.is_empty());
    }
}
