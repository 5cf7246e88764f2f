//! Report pipeline: templated summary, nutrition and exercise sections, and the
//! query-specific filter used by the request handler.

use crate::markers::{self, summarize_values};
use serde::Serialize;

/// Analysis text returned when the report could not be read.
pub const NO_ANALYSIS_AVAILABLE: &str = "No analysis available";
/// `file_processed` value returned when the report could not be read.
pub const NOT_PROCESSED: &str = "N/A";
/// Prefix carried by text-extraction failure messages.
pub const EXTRACTION_ERROR_PREFIX: &str = "Error";

const SUMMARY_HEADER: &str = "📊 Report Summary:";
const NUTRITION_HEADER: &str = "🧑‍⚕️ Nutrition Insights:";
const EXERCISE_HEADER: &str = "🏋️ Exercise Plan:";
const QUERY_RESULT_HEADER: &str = "📋 Query-Specific Result:";

const NUTRITION_TRIGGERS: [(&str, &str); 4] = [
    (
        "Hemoglobin",
        "Ensure iron/B12/folate intake if hemoglobin is low.",
    ),
    (
        "Vitamin D",
        "Low Vitamin D → sunlight exposure and supplements if prescribed.",
    ),
    (
        "Cholesterol",
        "High cholesterol → reduce saturated fats, increase fiber.",
    ),
    (
        "Glucose",
        "Abnormal glucose → limit sugars, eat balanced carbs.",
    ),
];
const NO_NUTRITION_MARKERS: &str = "No specific nutrition markers found in the report.";

const BASELINE_EXERCISE: [&str; 4] = [
    "Include at least 30 minutes of walking or light cardio daily.",
    "2–3 strength training sessions per week.",
    "2–3 flexibility sessions (stretching or yoga).",
    "Rest 1–2 days per week.",
];
const EXERCISE_TRIGGERS: [(&str, &str); 2] = [
    (
        "Cholesterol",
        "Prioritize aerobic exercise for cholesterol management.",
    ),
    (
        "Vitamin D",
        "Add outdoor exercise for natural Vitamin D exposure.",
    ),
];

/// Result of running the report pipeline over extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportAnalysis {
    /// Query the analysis was produced for.
    pub query: String,
    /// Path of the processed file, or [`NOT_PROCESSED`].
    pub file_processed: String,
    /// Rendered analysis text.
    pub analysis: String,
}

/// Which path produced an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisBranch {
    /// Only reading lines matching the query were returned.
    QuerySpecific,
    /// The full templated report was returned.
    FullPipeline,
}

/// Analysis text and the branch that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedAnalysis {
    /// Branch taken.
    pub branch: AnalysisBranch,
    /// Rendered analysis text.
    pub analysis: String,
}

/// Whether extracted text is blank or carries the extraction failure prefix.
pub fn is_unreadable(report_text: &str) -> bool {
    report_text.trim().is_empty() || report_text.starts_with(EXTRACTION_ERROR_PREFIX)
}

/// Run the full pipeline over extracted report text.
pub fn process_report(query: &str, file_path: &str, report_text: &str) -> ReportAnalysis {
    if is_unreadable(report_text) {
        return ReportAnalysis {
            query: query.to_string(),
            file_processed: NOT_PROCESSED.to_string(),
            analysis: NO_ANALYSIS_AVAILABLE.to_string(),
        };
    }

    let summary = render_summary(&summarize_values(report_text));
    let nutrition = nutrition_insights(report_text);
    let exercise = exercise_plan(report_text);

    ReportAnalysis {
        query: query.to_string(),
        file_processed: file_path.to_string(),
        analysis: format!("{summary}\n\n{nutrition}\n\n{exercise}"),
    }
}

/// Render reading lines under the report summary header.
pub fn render_summary(lines: &[String]) -> String {
    let mut summary = String::from(SUMMARY_HEADER);
    for line in lines {
        summary.push_str("\n- ");
        summary.push_str(line);
    }
    summary
}

/// Keyword-triggered nutrition guidance for the raw report text.
pub fn nutrition_insights(report_text: &str) -> String {
    let mut findings: Vec<&str> = NUTRITION_TRIGGERS
        .iter()
        .filter(|(keyword, _)| report_text.contains(keyword))
        .map(|(_, finding)| *finding)
        .collect();
    if findings.is_empty() {
        findings.push(NO_NUTRITION_MARKERS);
    }
    bulleted(NUTRITION_HEADER, &findings)
}

/// Baseline exercise plan plus keyword-triggered additions.
pub fn exercise_plan(report_text: &str) -> String {
    let recommendations: Vec<&str> = BASELINE_EXERCISE
        .iter()
        .copied()
        .chain(
            EXERCISE_TRIGGERS
                .iter()
                .filter(|(keyword, _)| report_text.contains(keyword))
                .map(|(_, recommendation)| *recommendation),
        )
        .collect();
    bulleted(EXERCISE_HEADER, &recommendations)
}

/// Reading lines relevant to the query.
///
/// The query must name one of the standard markers; any line containing any whitespace
/// separated query token (case-insensitive) is kept.
pub fn filter_for_query(query: &str, lines: &[String]) -> Vec<String> {
    let query = query.to_lowercase();
    let names_marker = markers::standard_markers()
        .iter()
        .any(|definition| query.contains(&definition.name.to_lowercase()));
    if !names_marker {
        return Vec::new();
    }

    let tokens: Vec<&str> = query.split_whitespace().collect();
    lines
        .iter()
        .filter(|line| {
            let line = line.to_lowercase();
            tokens.iter().any(|token| line.contains(token))
        })
        .cloned()
        .collect()
}

/// Render filtered reading lines under the query-specific header.
pub fn render_query_result(lines: &[String]) -> String {
    bulleted(QUERY_RESULT_HEADER, lines)
}

/// Choose between the query-specific answer and the full pipeline for readable text.
pub fn compose_analysis(query: &str, file_path: &str, report_text: &str) -> ComposedAnalysis {
    let filtered = filter_for_query(query, &summarize_values(report_text));
    if filtered.is_empty() {
        ComposedAnalysis {
            branch: AnalysisBranch::FullPipeline,
            analysis: process_report(query, file_path, report_text).analysis,
        }
    } else {
        ComposedAnalysis {
            branch: AnalysisBranch::QuerySpecific,
            analysis: render_query_result(&filtered),
        }
    }
}

fn bulleted<S: AsRef<str>>(header: &str, items: &[S]) -> String {
    let joined = items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n- ");
    format!("{header}\n- {joined}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_reports_have_no_analysis() {
        for text in ["", "   \n", "Error reading PDF: file is encrypted"] {
            let result = process_report("query", "uploads/a.pdf", text);
            assert_eq!(result.analysis, NO_ANALYSIS_AVAILABLE);
            assert_eq!(result.file_processed, NOT_PROCESSED);
            assert_eq!(result.query, "query");
        }
    }

    #[test]
    fn full_report_has_three_sections() {
        let text = "Hemoglobin: 13.5\nCholesterol: 250";
        let result = process_report("Summarise", "uploads/r.pdf", text);
        assert_eq!(result.file_processed, "uploads/r.pdf");

        let expected = "📊 Report Summary:\n\
- Hemoglobin: 13.5 → Normal (Normal range: 12-16)\n\
- Cholesterol: 250.0 → High (Normal range: 0-200)\n\
\n\
🧑‍⚕️ Nutrition Insights:\n\
- Ensure iron/B12/folate intake if hemoglobin is low.\n\
- High cholesterol → reduce saturated fats, increase fiber.\n\
\n\
🏋️ Exercise Plan:\n\
- Include at least 30 minutes of walking or light cardio daily.\n\
- 2–3 strength training sessions per week.\n\
- 2–3 flexibility sessions (stretching or yoga).\n\
- Rest 1–2 days per week.\n\
- Prioritize aerobic exercise for cholesterol management.";
        assert_eq!(result.analysis, expected);
    }

    #[test]
    fn unparseable_values_appear_inline() {
        let result = process_report("Summarise", "uploads/r.pdf", "Hemoglobin: 13.5.\nGlucose: 90");
        assert!(result.analysis.starts_with(
            "📊 Report Summary:\n\
- Hemoglobin: Value found but could not parse.\n\
- Glucose: 90.0 → Normal (Normal range: 70-100)\n"
        ));

        let composed = compose_analysis("hemoglobin", "uploads/r.pdf", "Hemoglobin: 13.5.");
        assert_eq!(composed.branch, AnalysisBranch::QuerySpecific);
        assert_eq!(
            composed.analysis,
            "📋 Query-Specific Result:\n- Hemoglobin: Value found but could not parse."
        );
    }

    #[test]
    fn sections_fall_back_without_keywords() {
        let result = process_report("q", "f.pdf", "Sodium: 140");
        assert!(result.analysis.contains("- No numeric lab values detected."));
        assert!(result.analysis.contains(NO_NUTRITION_MARKERS));
        assert_eq!(exercise_plan("Sodium: 140").matches("\n- ").count(), 4);
    }

    #[test]
    fn keyword_sections_are_case_sensitive() {
        // Sections react to the raw text even when no value was captured.
        let nutrition = nutrition_insights("vitamin d was not measured; Vitamin D pending");
        assert!(nutrition.contains("sunlight exposure"));
        assert!(!nutrition_insights("glucose").contains("limit sugars"));
        assert!(exercise_plan("Vitamin D").contains("outdoor exercise"));
    }

    #[test]
    fn query_filter_requires_a_marker_name() {
        let lines = vec!["Cholesterol: 250.0 → High (Normal range: 0-200)".to_string()];
        assert!(filter_for_query("summarise my report", &lines).is_empty());
        assert_eq!(filter_for_query("Cholesterol", &lines), lines);
    }

    #[test]
    fn query_filter_matches_tokens_loosely() {
        let lines = vec![
            "Hemoglobin: 10.2 → Low (Normal range: 12-16)".to_string(),
            "Glucose: 95.0 → Normal (Normal range: 70-100)".to_string(),
        ];
        let filtered = filter_for_query("is my glucose ok", &lines);
        assert_eq!(filtered, vec![lines[1].clone()]);

        // "low" is a token too, so the hemoglobin line also qualifies.
        let filtered = filter_for_query("why is glucose low", &lines);
        assert_eq!(filtered, lines);
    }

    #[test]
    fn composed_analysis_prefers_query_specific_lines() {
        let composed = compose_analysis("cholesterol", "f.pdf", "Cholesterol: 250");
        assert_eq!(composed.branch, AnalysisBranch::QuerySpecific);
        assert_eq!(
            composed.analysis,
            "📋 Query-Specific Result:\n- Cholesterol: 250.0 → High (Normal range: 0-200)"
        );

        let composed = compose_analysis("summarise", "f.pdf", "Cholesterol: 250");
        assert_eq!(composed.branch, AnalysisBranch::FullPipeline);
        assert!(composed.analysis.starts_with(SUMMARY_HEADER));
    }
}
