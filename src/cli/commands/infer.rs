//! Implementation of the `intent infer` command.
//!
//! Runs the workflow for one request and, unless `--json` or
//! `--auto-approve` is given, hosts the review loop on stdin.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use console::style;
use serde::Serialize;
use tokio::io::{stdin, AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};

use crate::adapters::inference::{
    AnthropicConfig, AnthropicInferenceClient, OfflineInferenceClient, RetryingInferenceClient,
};
use crate::adapters::prober::HttpUrlProber;
use crate::adapters::store::InMemoryConversationStore;
use crate::cli::display::{create_spinner, render_specification, render_validation};
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::InferArgs;
use crate::domain::models::{Config, InferenceProvider, Specification, WorkflowState};
use crate::domain::ports::InferenceClient;
use crate::infrastructure::retry::RetryPolicy;
use crate::services::{ConversationService, TurnOutcome, WorkflowEngine};

const REVIEW_HELP: &str =
    "[a]pprove [notes] | [r]eject <reason> | [q]uit | anything else is feedback";

/// Final result of `intent infer`, printed as a table or as JSON.
#[derive(Debug, Serialize)]
pub struct InferOutput {
    /// Conversation the result belongs to.
    pub conversation_id: String,
    /// Resting state name, e.g. `approved`.
    pub state: String,
    /// Validation rounds spent on the last request.
    pub iteration_count: u32,
    /// True when the run stopped at the review gate.
    pub needs_human_input: bool,
    /// Latest specification.
    pub specification: Specification,
    /// Handoff document, present once approved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handoff: Option<serde_json::Value>,
}

impl InferOutput {
    fn from_outcome(outcome: &TurnOutcome, handoff: Option<serde_json::Value>) -> Self {
        Self {
            conversation_id: outcome.conversation_id.clone(),
            state: outcome.state.name().to_string(),
            iteration_count: outcome.iteration_count,
            needs_human_input: outcome.needs_human_input,
            specification: outcome.specification.clone(),
            handoff,
        }
    }
}

impl CommandOutput for InferOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![render_specification(&self.specification)];
        match self.state.as_str() {
            "approved" => lines.push(style("Specification approved.").green().bold().to_string()),
            "abandoned" => lines.push(style("Conversation abandoned.").yellow().to_string()),
            state => lines.push(format!("State: {state}")),
        }
        if let Some(handoff) = &self.handoff {
            lines.push(serde_json::to_string_pretty(handoff).unwrap_or_default());
        }
        lines.join("\n\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Reviewer input parsed from one line of stdin.
#[derive(Debug, PartialEq, Eq)]
enum ReviewInput {
    Approve(Option<String>),
    Reject(Option<String>),
    Feedback(String),
    Quit,
}

fn parse_review_input(line: &str) -> ReviewInput {
    let line = line.trim();
    let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = Some(rest.trim().to_string()).filter(|r| !r.is_empty());
    match head.to_lowercase().as_str() {
        "a" | "approve" | "y" | "yes" => ReviewInput::Approve(rest),
        "r" | "reject" | "n" | "no" => ReviewInput::Reject(rest),
        "q" | "quit" | "exit" => ReviewInput::Quit,
        _ => ReviewInput::Feedback(line.to_string()),
    }
}

fn build_client(config: &Config, offline: bool) -> Result<Arc<dyn InferenceClient>> {
    if offline || config.inference.provider == InferenceProvider::Offline {
        info!("using offline inference heuristics");
        return Ok(Arc::new(OfflineInferenceClient::new()));
    }
    let settings = AnthropicConfig::from_settings(&config.inference).context(
        "No API key configured. Set ANTHROPIC_API_KEY or inference.api_key, or pass --offline",
    )?;
    let client = AnthropicInferenceClient::new(settings)
        .context("Failed to create Anthropic client")?;
    Ok(Arc::new(RetryingInferenceClient::new(
        Arc::new(client),
        RetryPolicy::from_config(&config.retry),
    )))
}

fn build_service(config: &Config, args: &InferArgs) -> Result<ConversationService> {
    let client = build_client(config, args.offline)?;
    let prober = HttpUrlProber::new(&config.prober).context("Failed to create URL prober")?;
    let engine = Arc::new(WorkflowEngine::new(client, Arc::new(prober)));
    let max_iterations = args.max_iterations.unwrap_or(config.workflow.max_iterations);
    Ok(ConversationService::new(
        engine,
        Arc::new(InMemoryConversationStore::new()),
        max_iterations,
    ))
}

async fn finish(
    service: &ConversationService,
    outcome: &TurnOutcome,
    json_mode: bool,
) -> Result<()> {
    let handoff = if outcome.state == WorkflowState::Approved {
        let json = service.handoff(&outcome.conversation_id).await?;
        Some(serde_json::from_str(&json).context("Failed to parse handoff document")?)
    } else {
        None
    };
    output(&InferOutput::from_outcome(outcome, handoff), json_mode);
    Ok(())
}

async fn read_review_line(
    lines: &mut Lines<BufReader<Stdin>>,
    idle_timeout: Duration,
) -> Result<Option<String>> {
    match tokio::time::timeout(idle_timeout, lines.next_line()).await {
        Ok(line) => Ok(line.context("Failed to read from stdin")?),
        Err(_) => Ok(None),
    }
}

/// Run the `infer` command.
pub async fn execute(args: InferArgs, config: Config, json_mode: bool) -> Result<()> {
    let service = build_service(&config, &args)?;
    let idle_timeout = Duration::from_secs(config.workflow.conversation_ttl_secs.max(1));
    let interactive = !json_mode && !args.auto_approve;

    let spinner = (!json_mode).then(|| create_spinner("Inferring specification..."));
    let started = service.start(&args.query).await;
    if let Some(spinner) = &spinner {
        spinner.finish_and_clear();
    }
    let mut outcome = started?;
    let mut lines = BufReader::new(stdin()).lines();

    loop {
        let state = outcome.state.clone();
        match state {
            WorkflowState::Approved | WorkflowState::Abandoned => {
                return finish(&service, &outcome, json_mode).await;
            }
            WorkflowState::AwaitingReview { kind } => {
                if args.auto_approve {
                    info!(kind = ?kind, "auto-approving specification");
                    outcome = service
                        .submit_decision(&outcome.conversation_id, true, None)
                        .await?;
                    continue;
                }
                if !interactive {
                    return finish(&service, &outcome, json_mode).await;
                }

                println!("{}\n", render_specification(&outcome.specification));
                if let Some(validation) = &outcome.validation {
                    println!("{}\n", render_validation(validation));
                }
                println!("{}", style(REVIEW_HELP).dim());

                let Some(line) = read_review_line(&mut lines, idle_timeout).await? else {
                    warn!("no reviewer input, abandoning conversation");
                    let expired = service.expire_idle(idle_timeout).await?;
                    if expired.is_empty() {
                        service.abandon(&outcome.conversation_id).await?;
                    }
                    println!("{}", style("No input received, conversation closed.").yellow());
                    return Ok(());
                };

                let spinner = create_spinner("Updating specification...");
                let next = match parse_review_input(&line) {
                    ReviewInput::Approve(notes) => {
                        service
                            .submit_decision(&outcome.conversation_id, true, notes)
                            .await
                    }
                    ReviewInput::Reject(reason) => {
                        service
                            .submit_decision(&outcome.conversation_id, false, reason)
                            .await
                    }
                    ReviewInput::Feedback(text) => {
                        service
                            .submit_feedback(&outcome.conversation_id, &text)
                            .await
                    }
                    ReviewInput::Quit => {
                        spinner.finish_and_clear();
                        let abandoned = service.abandon(&outcome.conversation_id).await?;
                        outcome = TurnOutcome::try_from(&abandoned)?;
                        continue;
                    }
                };
                spinner.finish_and_clear();
                outcome = next?;
            }
            other => bail!("workflow stopped in unexpected state: {}", other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_review_input() {
        assert_eq!(parse_review_input("a"), ReviewInput::Approve(None));
        assert_eq!(
            parse_review_input("approve looks good"),
            ReviewInput::Approve(Some("looks good".to_string()))
        );
        assert_eq!(
            parse_review_input("r wrong site"),
            ReviewInput::Reject(Some("wrong site".to_string()))
        );
        assert_eq!(parse_review_input("  q "), ReviewInput::Quit);
        assert_eq!(
            parse_review_input("also extract rating"),
            ReviewInput::Feedback("also extract rating".to_string())
        );
    }

    #[test]
    fn test_offline_client_selected_without_key() {
        let mut config = Config::default();
        config.inference.provider = InferenceProvider::Offline;
        let client = build_client(&config, false).unwrap();
        assert_eq!(client.name(), OfflineInferenceClient::new().name());
    }
}
