use std::env;

use rebill_core::config::AppConfig;

use super::CommandResult;

pub fn run(config: &AppConfig) -> CommandResult {
    CommandResult::success(render(config))
}

fn render(config: &AppConfig) -> String {
    let deadline = match config.negotiation.overall_deadline_secs {
        Some(secs) => format!("{secs}s"),
        None => "none".to_owned(),
    };
    format!(
        "service.base_url             = {}\n\
         service.timeout_secs         = {}\n\
         negotiation.discount_percent = {}\n\
         negotiation.interval_step    = {}\n\
         negotiation.max_attempts     = {}\n\
         negotiation.attempt_timeout  = {}s\n\
         negotiation.overall_deadline = {}\n\
         logging.level                = {}\n\
         logging.format               = {:?}\n\
         credentials.username         = {}\n\
         credentials.password         = {}",
        config.service.base_url,
        config.service.timeout_secs,
        config.negotiation.discount_percent,
        config.negotiation.interval_step,
        config.negotiation.max_attempts,
        config.negotiation.attempt_timeout_secs,
        deadline,
        config.logging.level,
        config.logging.format,
        env_presence("REBILL_USERNAME"),
        env_presence("REBILL_PASSWORD"),
    )
}

fn env_presence(key: &str) -> &'static str {
    if env::var(key).is_ok_and(|value| !value.is_empty()) {
        "<set>"
    } else {
        "<unset>"
    }
}

#[cfg(test)]
mod tests {
    use rebill_core::config::AppConfig;

    use super::render;

    #[test]
    fn render_shows_effective_values_and_redacts_credentials() {
        let output = render(&AppConfig::default());
        assert!(output.contains("negotiation.max_attempts     = 500"));
        assert!(output.contains("service.base_url             = https://sis.rus.com.ar"));
        assert!(!output.contains("REBILL_PASSWORD="));
        assert!(output.contains("credentials.password"));
    }
}
