//! Sequential task runner.

use crate::agents::{LanguageModel, LlmError, tasks::TaskTemplate};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Answer produced for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutput {
    /// Role of the agent that produced the answer.
    pub agent_role: String,
    /// Rendered task description.
    pub description: String,
    /// Model answer.
    pub raw: String,
}

/// Runs tasks one after another against a single language model.
pub struct Crew<M> {
    model: M,
    tasks: Vec<TaskTemplate>,
}

impl<M: LanguageModel> Crew<M> {
    /// Crew over explicit tasks.
    pub fn new(model: M, tasks: Vec<TaskTemplate>) -> Self {
        Self { model, tasks }
    }

    /// Crew running the four standard tasks.
    pub fn standard(model: M) -> Self {
        Self::new(model, TaskTemplate::standard())
    }

    /// Tasks in execution order.
    pub fn tasks(&self) -> &[TaskTemplate] {
        &self.tasks
    }

    /// Run every task for `query`.
    ///
    /// `report` is included in every prompt when supplied. Each task after the first receives the
    /// previous answer as context. Requests of one agent are spaced to honour its `max_rpm`, and a
    /// task is retried up to the agent's `max_iter` while the model answers with empty text.
    pub async fn kickoff(
        &self,
        query: &str,
        report: Option<&str>,
    ) -> Result<Vec<TaskOutput>, LlmError> {
        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(self.tasks.len());
        let mut last_call: HashMap<&str, Instant> = HashMap::new();

        for task in &self.tasks {
            let agent = &task.agent;
            let description = task.render_description(query);
            let system = agent.system_instruction(query);
            let prompt = build_prompt(
                &description,
                &task.expected_output,
                report,
                outputs.last().map(|output| output.raw.as_str()),
            );

            let attempts = agent.max_iter.max(1);
            let mut answer = None;
            for attempt in 1..=attempts {
                if let Some(previous) = last_call.get(agent.role.as_str()) {
                    tokio::time::sleep_until(*previous + min_interval(agent.max_rpm)).await;
                }
                last_call.insert(agent.role.as_str(), Instant::now());

                let text = self.model.complete(&system, &prompt).await?;
                if !text.trim().is_empty() {
                    answer = Some(text);
                    break;
                }
                tracing::warn!(agent = %agent.role, attempt, "Model returned empty answer");
            }

            let raw = answer.ok_or_else(|| LlmError::EmptyResponse {
                role: agent.role.clone(),
                attempts,
            })?;

            if agent.verbose {
                tracing::info!(agent = %agent.role, chars = raw.len(), "Task completed");
            } else {
                tracing::debug!(agent = %agent.role, chars = raw.len(), "Task completed");
            }

            outputs.push(TaskOutput {
                agent_role: agent.role.clone(),
                description,
                raw,
            });
        }

        Ok(outputs)
    }
}

fn min_interval(max_rpm: u32) -> Duration {
    if max_rpm == 0 {
        Duration::ZERO
    } else {
        Duration::from_secs(60) / max_rpm
    }
}

fn build_prompt(
    description: &str,
    expected_output: &str,
    report: Option<&str>,
    context: Option<&str>,
) -> String {
    let mut prompt = format!("Current Task: {description}\n\nExpected output: {expected_output}");
    if let Some(report) = report.filter(|text| !text.trim().is_empty()) {
        prompt.push_str("\n\nBlood test report:\n");
        prompt.push_str(report);
    }
    if let Some(context) = context {
        prompt.push_str("\n\nContext from the previous task:\n");
        prompt.push_str(context);
    }
    prompt
}
