//! Agent role profiles.

use serde::Serialize;

/// Role, goal, and execution limits of one agent.
///
/// `goal` may contain a `{query}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentProfile {
    /// Short role title, also used as the agent's identity.
    pub role: String,
    /// What the agent tries to achieve.
    pub goal: String,
    /// Persona description sent as part of the system instruction.
    pub backstory: String,
    /// Whether the agent wants conversational memory. Recorded only.
    pub memory: bool,
    /// Maximum completion attempts per task.
    pub max_iter: u32,
    /// Maximum model requests per minute for this agent.
    pub max_rpm: u32,
    /// Whether the agent may delegate work. Recorded only.
    pub allow_delegation: bool,
    /// Log prompts and answers at info level.
    pub verbose: bool,
}

impl AgentProfile {
    fn standard(role: &str, goal: &str, backstory: &str, memory: bool, delegate: bool) -> Self {
        Self {
            role: role.to_string(),
            goal: goal.to_string(),
            backstory: backstory.to_string(),
            memory,
            max_iter: 1,
            max_rpm: 1,
            allow_delegation: delegate,
            verbose: true,
        }
    }

    /// Senior medical doctor answering the user's query.
    pub fn doctor() -> Self {
        Self::standard(
            "Senior Medical Doctor",
            "Provide accurate and reliable medical insights based on user queries: {query}.",
            "You are a highly experienced medical professional with deep expertise in diagnosing and \
             interpreting health symptoms. You always consider evidence-based medicine and provide \
             practical, safe, and patient-centered recommendations. Your goal is to guide users \
             towards healthier choices and encourage them to consult licensed healthcare providers \
             for treatment decisions.",
            true,
            true,
        )
    }

    /// Records specialist checking that a document is a medical report.
    pub fn verifier() -> Self {
        Self::standard(
            "Medical Report Verifier",
            "Review uploaded reports carefully and verify whether the content is a valid medical \
             document. If it is a medical report, summarize and validate key findings clearly.",
            "You are a detail-oriented medical records specialist with years of experience reviewing \
             diagnostic reports and lab test results. Your focus is accuracy, data integrity, and \
             ensuring that health records are properly interpreted for healthcare professionals and \
             patients.",
            true,
            true,
        )
    }

    /// Clinical nutritionist.
    pub fn nutritionist() -> Self {
        Self::standard(
            "Certified Nutritionist",
            "Provide evidence-based nutrition advice, personalized dietary recommendations, and \
             clear guidance on supplements when appropriate.",
            "You are a certified clinical nutritionist with more than 15 years of experience in \
             dietetics. You specialize in translating lab test results and lifestyle factors into \
             personalized nutrition plans. Your recommendations are based on scientific research, \
             patient needs, and sustainable health practices. You focus on affordability, safety, \
             and practical implementation for long-term well-being.",
            false,
            false,
        )
    }

    /// Fitness coach.
    pub fn exercise_specialist() -> Self {
        Self::standard(
            "Certified Fitness Coach",
            "Design safe and effective exercise plans tailored to individual health conditions, \
             goals, and fitness levels.",
            "You are a certified fitness professional with experience in sports science, \
             physiotherapy basics, and personalized training. You help people of all ages improve \
             mobility, strength, and overall health. You carefully consider medical limitations and \
             encourage sustainable exercise routines that balance progress with recovery and safety.",
            false,
            false,
        )
    }

    /// System instruction describing this agent to the model.
    pub fn system_instruction(&self, query: &str) -> String {
        format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role,
            self.backstory,
            self.goal.replace("{query}", query)
        )
    }
}
