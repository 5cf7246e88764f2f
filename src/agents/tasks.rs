//! Task templates assigned to agents.

use crate::agents::profiles::AgentProfile;
use serde::Serialize;

/// Work item for one agent. `description` may contain a `{query}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskTemplate {
    /// What the agent must do.
    pub description: String,
    /// Shape of the expected answer.
    pub expected_output: String,
    /// Agent carrying out the task.
    pub agent: AgentProfile,
}

impl TaskTemplate {
    /// Build a task for `agent`.
    pub fn new(
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent: AgentProfile,
    ) -> Self {
        Self {
            description: description.into(),
            expected_output: expected_output.into(),
            agent,
        }
    }

    /// Answer the user's medical query.
    pub fn help_patients() -> Self {
        Self::new(
            "Understand and address the user's medical query: {query}. Analyze the problem \
             carefully, provide a clear explanation, and offer evidence-based guidance. Ensure that \
             advice is safe, practical, and encourages users to seek professional consultation when \
             necessary.",
            "A detailed, user-friendly response including:\n\
             - Summary of the query in simple terms\n\
             - Possible explanations and considerations (non-diagnostic)\n\
             - General safe recommendations\n\
             - Clear disclaimer that professional consultation is required for treatment decisions",
            AgentProfile::doctor(),
        )
    }

    /// Nutrition insights for the report or query.
    pub fn nutrition_analysis() -> Self {
        Self::new(
            "Analyze the provided blood report or user query ({query}) to identify potential \
             nutritional insights. Provide evidence-based dietary recommendations tailored to the \
             findings, while ensuring safety and practicality. Focus on nutrition, hydration, and \
             lifestyle habits rather than prescribing treatments.",
            "A structured nutrition report including:\n\
             - Key findings related to nutrition from the input\n\
             - Foods to include for better health\n\
             - Foods to limit or avoid\n\
             - Guidance on supplements (only if necessary)\n\
             - Practical tips for maintaining a balanced diet",
            AgentProfile::nutritionist(),
        )
    }

    /// Personalised exercise plan.
    pub fn exercise_planning() -> Self {
        Self::new(
            "Develop a safe and effective exercise plan based on the user's query ({query}) and any \
             health information provided. Recommendations should be personalized, consider medical \
             limitations, and encourage sustainable habits. Ensure the plan balances strength, \
             mobility, endurance, and rest.",
            "A personalized exercise plan including:\n\
             - Warm-up and stretching guidance\n\
             - Recommended types of exercises (strength, cardio, flexibility)\n\
             - Suggested weekly routine with safe intensity levels\n\
             - Rest and recovery advice\n\
             - Safety precautions and when to consult a professional",
            AgentProfile::exercise_specialist(),
        )
    }

    /// Check whether the uploaded document is a medical report.
    pub fn verification() -> Self {
        Self::new(
            "Carefully review the uploaded document to determine whether it is a medical report, \
             such as a blood test, or another type of file. If it is medical, highlight key \
             sections and confirm its validity. If not, provide a clear explanation.",
            "A verification report including:\n\
             - Whether the document is a medical report or not\n\
             - Key observations (if medical)\n\
             - Any inconsistencies or issues\n\
             - A professional and concise conclusion",
            AgentProfile::verifier(),
        )
    }

    /// The four standard tasks in execution order.
    pub fn standard() -> Vec<Self> {
        vec![
            Self::help_patients(),
            Self::nutrition_analysis(),
            Self::exercise_planning(),
            Self::verification(),
        ]
    }

    /// Task description with `{query}` substituted.
    pub fn render_description(&self, query: &str) -> String {
        self.description.replace("{query}", query)
    }
}
