use chrono::Utc;
use tracing::{info, warn};

use rebill_core::{AccountCode, Proposal, ProposalGroup, SessionError};

use crate::connection::{Connection, RequestError};
use crate::transport::Endpoint;
use crate::wire::{self, Envelope, ProposalsObject};

/// Retrieves pending proposals for each account code, one code at a time.
///
/// Fetch is sequential by design: it precedes negotiation and competes for
/// the same single ticket. A failing code is logged and skipped, so the
/// returned groups may be fewer than the requested codes; only an
/// unauthenticated connection aborts the whole fetch.
pub async fn fetch_proposals(
    connection: &Connection,
    codes: &[AccountCode],
) -> Result<Vec<ProposalGroup>, SessionError> {
    let mut groups = Vec::new();

    for code in codes {
        let body = wire::proposals_body(code);
        let reply = match connection.send_authenticated(Endpoint::GetProposals, body).await {
            Ok(reply) => reply,
            Err(RequestError::NotAuthenticated) => return Err(SessionError::NotStarted),
            Err(RequestError::Transport(error)) => {
                warn!(account_code = %code, error = %error, "proposal fetch failed; skipping code");
                continue;
            }
        };

        if !reply.is_success() {
            warn!(
                account_code = %code,
                status = reply.status,
                "proposal fetch rejected by service; skipping code"
            );
            continue;
        }

        let envelope: Envelope<ProposalsObject> = match serde_json::from_str(&reply.body) {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(
                    account_code = %code,
                    error = %error,
                    "proposal fetch returned an unreadable body; skipping code"
                );
                continue;
            }
        };

        let mut proposals = Vec::new();
        for record in envelope.object.results {
            match Proposal::try_from(record) {
                Ok(proposal) => proposals.push(proposal),
                Err(error) => {
                    warn!(account_code = %code, error = %error, "skipping malformed record");
                }
            }
        }

        info!(account_code = %code, proposals = proposals.len(), "fetched proposal group");
        groups.push(ProposalGroup { account_code: code.clone(), fetched_at: Utc::now(), proposals });
    }

    Ok(groups)
}
