//! Lab marker detection and reference-range classification.
//!
//! Each [`MarkerDefinition`] pairs a marker name with a detection pattern whose first capture
//! group holds the numeric value. Patterns are matched case-insensitively and the first match
//! wins. Overlapping names (for example "Vitamin D2" next to "Vitamin D3") are not
//! disambiguated.

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

/// Line returned by [`summarize_values`] when no marker is mentioned in the text.
pub const NO_VALUES_DETECTED: &str = "No numeric lab values detected.";

static STANDARD_EXTRACTOR: LazyLock<MarkerExtractor> = LazyLock::new(|| {
    MarkerExtractor::new(standard_markers()).expect("standard marker patterns are valid")
});

/// Errors raised while compiling marker definitions.
#[derive(Debug, Error)]
pub enum MarkerError {
    /// The detection pattern is not a valid regular expression.
    #[error("invalid detection pattern for marker '{marker}': {source}")]
    InvalidPattern {
        /// Marker whose pattern failed to compile.
        marker: String,
        /// Underlying regex compilation error.
        #[source]
        source: regex::Error,
    },
}

/// Inclusive `[low, high]` bounds used to classify a reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceRange {
    /// Lowest value still considered normal.
    pub low: f64,
    /// Highest value still considered normal.
    pub high: f64,
}

impl ReferenceRange {
    /// Construct a range from its bounds.
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Classify a value against the range; both endpoints count as normal.
    pub fn classify(&self, value: f64) -> MarkerStatus {
        if value < self.low {
            MarkerStatus::Low
        } else if value > self.high {
            MarkerStatus::High
        } else {
            MarkerStatus::Normal
        }
    }
}

impl fmt::Display for ReferenceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

/// Classification of a measured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerStatus {
    /// Below the reference range.
    Low,
    /// Within the reference range.
    Normal,
    /// Above the reference range.
    High,
}

impl fmt::Display for MarkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "Low",
            Self::Normal => "Normal",
            Self::High => "High",
        };
        f.write_str(label)
    }
}

/// A named lab measurement with its detection pattern and reference range.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDefinition {
    /// Display name, also used for keyword matching.
    pub name: String,
    /// Regular expression whose first capture group is the value.
    pub pattern: String,
    /// Inclusive normal range.
    pub reference: ReferenceRange,
}

impl MarkerDefinition {
    /// Construct a definition.
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, reference: ReferenceRange) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            reference,
        }
    }
}

/// The four markers recognised in reports, in reporting order.
pub fn standard_markers() -> Vec<MarkerDefinition> {
    vec![
        // g/dL
        MarkerDefinition::new(
            "Hemoglobin",
            r"Hemoglobin[:\s]+([\d\.]+)",
            ReferenceRange::new(12.0, 16.0),
        ),
        // ng/mL
        MarkerDefinition::new(
            "Vitamin D",
            r"Vitamin\s*D[:\s]+([\d\.]+)",
            ReferenceRange::new(20.0, 50.0),
        ),
        // mg/dL
        MarkerDefinition::new(
            "Glucose",
            r"Glucose[:\s]+([\d\.]+)",
            ReferenceRange::new(70.0, 100.0),
        ),
        // mg/dL
        MarkerDefinition::new(
            "Cholesterol",
            r"Cholesterol[:\s]+([\d\.]+)",
            ReferenceRange::new(0.0, 200.0),
        ),
    ]
}

/// Parsed value together with its classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    /// Numeric value captured from the report.
    pub value: f64,
    /// Classification against the marker's reference range.
    pub status: MarkerStatus,
}

/// Outcome of locating one marker in a report.
///
/// `measurement` is `None` when the pattern matched but the captured value was not a number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerReading {
    /// Marker name.
    pub marker: String,
    /// Parsed value and status, absent for degraded readings.
    pub measurement: Option<Measurement>,
    /// Reference range the value was classified against.
    pub reference: ReferenceRange,
}

impl MarkerReading {
    /// Whether the marker was found but its value could not be parsed.
    pub fn is_degraded(&self) -> bool {
        self.measurement.is_none()
    }
}

impl fmt::Display for MarkerReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.measurement {
            Some(Measurement { value, status }) => write!(
                f,
                "{}: {} → {} (Normal range: {})",
                self.marker,
                format_value(*value),
                status,
                self.reference
            ),
            None => write!(f, "{}: Value found but could not parse.", self.marker),
        }
    }
}

/// Render a value the way a float repr does: whole values keep one decimal place (`95.0`),
/// magnitudes below `1e-4` or from `1e16` switch to exponent form (`1e-05`, `1.5e+16`).
fn format_value(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return format!("{value:.1}");
    }
    let scientific = format!("{value:e}");
    let Some((mantissa, exponent)) = scientific
        .split_once('e')
        .and_then(|(mantissa, exponent)| Some((mantissa, exponent.parse::<i32>().ok()?)))
    else {
        return value.to_string();
    };
    if (-4..16).contains(&exponent) {
        if value.fract() == 0.0 {
            format!("{value:.1}")
        } else {
            value.to_string()
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
    }
}

/// Compile a detection pattern with the case-insensitive flag applied.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

struct CompiledMarker {
    definition: MarkerDefinition,
    regex: Regex,
}

/// A set of compiled marker definitions applied in order.
pub struct MarkerExtractor {
    markers: Vec<CompiledMarker>,
}

impl MarkerExtractor {
    /// Compile the supplied definitions, keeping their order.
    pub fn new<I>(definitions: I) -> Result<Self, MarkerError>
    where
        I: IntoIterator<Item = MarkerDefinition>,
    {
        let markers = definitions
            .into_iter()
            .map(|definition| {
                let regex = compile_pattern(&definition.pattern).map_err(|source| {
                    MarkerError::InvalidPattern {
                        marker: definition.name.clone(),
                        source,
                    }
                })?;
                Ok(CompiledMarker { definition, regex })
            })
            .collect::<Result<Vec<_>, MarkerError>>()?;
        Ok(Self { markers })
    }

    /// Shared extractor for [`standard_markers`], compiled on first use.
    pub fn standard() -> &'static Self {
        &STANDARD_EXTRACTOR
    }

    /// Definitions handled by this extractor.
    pub fn definitions(&self) -> impl Iterator<Item = &MarkerDefinition> {
        self.markers.iter().map(|marker| &marker.definition)
    }

    /// Readings for every marker mentioned in `text`, in definition order.
    pub fn extract_readings(&self, text: &str) -> Vec<MarkerReading> {
        self.markers
            .iter()
            .filter_map(|marker| read_marker(text, &marker.definition, &marker.regex))
            .collect()
    }

    /// Rendered reading lines, or the single [`NO_VALUES_DETECTED`] line.
    pub fn summarize(&self, text: &str) -> Vec<String> {
        let lines: Vec<String> = self
            .extract_readings(text)
            .iter()
            .map(ToString::to_string)
            .collect();
        if lines.is_empty() {
            vec![NO_VALUES_DETECTED.to_string()]
        } else {
            lines
        }
    }
}

/// Locate a single marker in `text`.
///
/// Returns `Ok(None)` when the marker is not mentioned and a degraded reading when the value
/// fails to parse.
pub fn extract_reading(
    text: &str,
    definition: &MarkerDefinition,
) -> Result<Option<MarkerReading>, MarkerError> {
    let regex = compile_pattern(&definition.pattern).map_err(|source| MarkerError::InvalidPattern {
        marker: definition.name.clone(),
        source,
    })?;
    Ok(read_marker(text, definition, &regex))
}

fn read_marker(text: &str, definition: &MarkerDefinition, regex: &Regex) -> Option<MarkerReading> {
    let captures = regex.captures(text)?;
    let measurement = captures
        .get(1)
        .and_then(|raw| raw.as_str().parse::<f64>().ok())
        .map(|value| Measurement {
            value,
            status: definition.reference.classify(value),
        });

    if measurement.is_none() {
        tracing::debug!(marker = %definition.name, "Marker found but value could not be parsed");
    }

    Some(MarkerReading {
        marker: definition.name.clone(),
        measurement,
        reference: definition.reference,
    })
}

/// Structured readings for the standard markers.
pub fn extract_readings(text: &str) -> Vec<MarkerReading> {
    MarkerExtractor::standard().extract_readings(text)
}

/// Rendered reading lines for the standard markers.
pub fn summarize_values(text: &str) -> Vec<String> {
    MarkerExtractor::standard().summarize(text)
}
