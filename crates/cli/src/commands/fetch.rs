use anyhow::{Context, Result};

use rebill_client::Session;
use rebill_core::config::AppConfig;
use rebill_core::ProposalGroup;

use super::CommandResult;

pub fn run(config: &AppConfig, codes: &[String], json: bool) -> CommandResult {
    match execute(config, codes, json) {
        Ok(output) => CommandResult::success(output),
        Err(error) => CommandResult::failure(&error),
    }
}

fn execute(config: &AppConfig, codes: &[String], json: bool) -> Result<String> {
    let credentials = super::credentials_from_env()?;
    let codes = super::account_codes(codes)?;

    let mut session =
        Session::new(config, credentials, codes).context("could not build the session")?;
    session.start().context("login failed")?;
    let groups = session.fetch_proposals().context("proposal fetch failed")?;
    session.stop();

    if json {
        return serde_json::to_string_pretty(&groups).context("could not serialize proposals");
    }
    Ok(render(&groups))
}

fn render(groups: &[ProposalGroup]) -> String {
    if groups.is_empty() {
        return "no proposals found".to_owned();
    }
    let mut lines = Vec::new();
    let mut total = 0_usize;
    for group in groups {
        lines.push(format!(
            "account {} ({} proposals, fetched {})",
            group.account_code,
            group.proposals.len(),
            group.fetched_at.format("%Y-%m-%d %H:%M:%S")
        ));
        for proposal in &group.proposals {
            total += 1;
            lines.push(format!(
                "  {}  {:<24} {:<10} premium {:>10}  x{}",
                proposal.id,
                proposal.insured_name,
                proposal.plate,
                proposal.premium,
                proposal.installment_count
            ));
        }
    }
    lines.push(format!("{total} proposals pending renegotiation"));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use rebill_core::{AccountCode, Proposal, ProposalGroup, ProposalId};

    use super::render;

    #[test]
    fn render_lists_each_group_and_totals() {
        let group = ProposalGroup {
            account_code: AccountCode("1122".to_owned()),
            fetched_at: Utc::now(),
            proposals: vec![Proposal {
                id: ProposalId("900123".to_owned()),
                renewal: "1".to_owned(),
                section_number: 3,
                policy_number: "411222".to_owned(),
                insured_name: "PEREZ JUAN".to_owned(),
                vehicle: "FORD KA 1.5".to_owned(),
                plate: "AB123CD".to_owned(),
                billing_period: "MENSUAL".to_owned(),
                installment_count: 4,
                premium: 12_000,
                premium_previous: 11_000,
                sum_insured: None,
                sum_insured_previous: None,
                coverage: "C".to_owned(),
                endorsement_id: -1,
                issue_policy: true,
            }],
        };
        let output = render(&[group]);
        assert!(output.contains("account 1122 (1 proposals"));
        assert!(output.contains("900123"));
        assert!(output.contains("1 proposals pending renegotiation"));
    }

    #[test]
    fn render_handles_an_empty_fetch() {
        assert_eq!(render(&[]), "no proposals found");
    }
}
