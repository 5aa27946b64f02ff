//! Planner output parsing
//!
//! Model output is not guaranteed to be well-formed, so parsing is two-tier:
//! first the JSON array of assignment strings the planner prompt asks for,
//! then a phase-marker fallback over the raw text. The fallback always
//! yields at least one assignment.

use crate::types::{AppError, Result};

/// Section marker the fallback splits on.
pub const PHASE_MARKER: &str = "### Phase";

/// The single assignment used when nothing else can be recovered.
pub const OVERALL_ASSIGNMENT: &str = "Overall Research";

/// How the assignment list was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanSource {
    Json,
    Fallback { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPlan {
    pub assignments: Vec<String>,
    pub source: PlanSource,
}

impl ParsedPlan {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, PlanSource::Fallback { .. })
    }
}

/// Parse raw planner output into a non-empty assignment list.
pub fn parse_plan(raw: &str) -> ParsedPlan {
    match parse_json_assignments(raw) {
        Ok(assignments) => ParsedPlan {
            assignments,
            source: PlanSource::Json,
        },
        Err(e) => {
            let reason = match e {
                AppError::Parse(msg) => msg,
                other => other.to_string(),
            };
            tracing::debug!(%reason, "planner output is not a JSON string array; using phase fallback");
            ParsedPlan {
                assignments: fallback_assignments(raw),
                source: PlanSource::Fallback { reason },
            }
        }
    }
}

/// Take the text between the first `[` and the last `]` and parse it as a
/// JSON array of strings.
pub fn parse_json_assignments(raw: &str) -> Result<Vec<String>> {
    let start = raw
        .find('[')
        .ok_or_else(|| AppError::Parse("no '[' found in planner output".to_string()))?;
    let end = raw
        .rfind(']')
        .ok_or_else(|| AppError::Parse("no ']' found in planner output".to_string()))?;
    if end < start {
        return Err(AppError::Parse(
            "closing ']' appears before opening '['".to_string(),
        ));
    }

    let value: serde_json::Value = serde_json::from_str(&raw[start..=end])
        .map_err(|e| AppError::Parse(format!("invalid JSON array: {}", e)))?;

    let items = value
        .as_array()
        .ok_or_else(|| AppError::Parse("planner output is not a JSON array".to_string()))?;

    let assignments = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                AppError::Parse(format!("element {} is not a string", i + 1))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    // An empty array would leave the run with no work.
    if assignments.is_empty() {
        return Err(AppError::Parse("assignment array is empty".to_string()));
    }

    Ok(assignments)
}

/// One assignment per `### Phase` section, named from the section's leading
/// line; `Overall Research` when there are no sections.
pub fn fallback_assignments(raw: &str) -> Vec<String> {
    let phases: Vec<String> = raw
        .split(PHASE_MARKER)
        .skip(1)
        .enumerate()
        .map(|(i, phase)| {
            let title = phase.trim().lines().next().unwrap_or("").trim();
            if title.is_empty() {
                format!("Phase {}", i + 1)
            } else {
                format!("Phase {}", title)
            }
        })
        .collect();

    if phases.is_empty() {
        vec![OVERALL_ASSIGNMENT.to_string()]
    } else {
        phases
    }
}
