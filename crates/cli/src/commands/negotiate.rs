use anyhow::{Context, Result};

use rebill_client::{BatchEntry, Session};
use rebill_core::config::AppConfig;

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
    let entries = session.negotiate_all(groups).context("negotiation batch failed")?;
    session.stop();

    if json {
        let serializable: Vec<_> = entries
            .iter()
            .map(|entry| match entry {
                Ok(result) => serde_json::json!({"outcome": "negotiated", "result": result}),
                Err(error) => {
                    serde_json::json!({"outcome": "error", "message": error.to_string()})
                }
            })
            .collect();
        return serde_json::to_string_pretty(&serializable)
            .context("could not serialize outcomes");
    }
    Ok(render(&entries))
}

fn render(entries: &[BatchEntry]) -> String {
    if entries.is_empty() {
        return "nothing to negotiate".to_owned();
    }
    let mut lines = Vec::new();
    let mut accepted = 0_usize;
    let mut failed = 0_usize;
    let mut errored = 0_usize;
    for entry in entries {
        match entry {
            Ok(result) if result.accepted => {
                accepted += 1;
                lines.push(format!(
                    "ACCEPTED  {}  premium {:>10}  after {} retries",
                    result.proposal.id, result.proposal.premium, result.attempts_used
                ));
            }
            Ok(result) => {
                failed += 1;
                lines.push(format!(
                    "FAILED    {}  premium {:>10}  {}",
                    result.proposal.id,
                    result.proposal.premium,
                    result.error.as_deref().unwrap_or("no reason given")
                ));
            }
            Err(error) => {
                errored += 1;
                lines.push(format!("ERROR     {error}"));
            }
        }
    }
    lines.push(format!(
        "{accepted} accepted, {failed} failed, {errored} errors out of {} proposals",
        entries.len()
    ));
    lines.join("\n")
}
