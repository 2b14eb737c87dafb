//! Command-line chat whose prompts and replies are screened by Llama Guard.
//!
//! Endpoints come from the environment (`LLAMA_GUARD_BASE_URL`,
//! `LLAMA_GUARD_MODEL_NAME`, `LLM_BASE_URL`, `MODEL_NAME`, plus optional API keys
//! and `GUARD_FAILURE_POLICY`).

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use guard_adapters::chat_completions::ChatCompletionsAdapter;
use guard_agent::{SecuredAgent, TracingVerdictObserver};
use guard_config::GuardSettings;
use guard_policy::ModerationGate;
use guard_primitives::{ChatMessage, Conversation};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "secured-chat", version, about)]
struct Cli {
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = guard_telemetry::DEFAULT_DIRECTIVE)]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one secured turn against the upstream model.
    Ask {
        /// The user's prompt.
        prompt: String,
    },
    /// Moderate a conversation and print the verdict as JSON.
    Check {
        /// Role whose last message is judged; defaults to the last message's role.
        #[arg(long)]
        role: Option<String>,
        /// Messages in order, each written as `role:content`.
        #[arg(required = true, value_name = "ROLE:CONTENT")]
        messages: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    guard_telemetry::init_tracing(&cli.log)?;

    match cli.command {
        Command::Ask { prompt } => ask(&prompt).await,
        Command::Check { role, messages } => check(role, &messages).await,
    }
}

async fn ask(prompt: &str) -> Result<ExitCode> {
    let settings = GuardSettings::from_env()?;
    let gate = ModerationGate::from_config(settings.classifier().adapter_config()?)?;
    let model = ChatCompletionsAdapter::new(settings.llm().adapter_config()?)?;

    let agent = SecuredAgent::new(Arc::new(model), Arc::new(gate))
        .with_failure_policy(settings.failure_policy())
        .with_observer(Arc::new(TracingVerdictObserver));
    info!(policy = %agent.failure_policy(), "secured agent ready");

    let reply = agent.respond(prompt).await?;
    println!("{}", reply.text());
    Ok(if reply.is_blocked() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

async fn check(role: Option<String>, raw: &[String]) -> Result<ExitCode> {
    let conversation = parse_conversation(raw)?;
    let subject_role = role.unwrap_or_else(|| conversation.last().role().to_owned());

    let classifier = GuardSettings::classifier_from_env()?;
    let gate = ModerationGate::from_config(classifier.adapter_config()?)?;
    let verdict = gate.evaluate(&conversation, &subject_role).await?;

    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(if verdict.is_safe() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn parse_conversation(raw: &[String]) -> Result<Conversation> {
    let messages = raw
        .iter()
        .map(|entry| {
            let (role, content) = entry
                .split_once(':')
                .ok_or_else(|| anyhow!("expected `role:content`, got `{entry}`"))?;
            ChatMessage::new(role.trim(), content.trim_start())
                .with_context(|| format!("invalid message `{entry}`"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Conversation::new(messages)?)
}
