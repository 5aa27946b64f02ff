//! Prompt templates for the three agent roles.

use crate::types::SourceItem;

/// Maximum assignment label width in researcher narration.
const LABEL_WIDTH: usize = 25;
const LABEL_KEEP: usize = 22;

pub fn planner_prompt(topic: &str) -> String {
    format!(
        r#"Based on the overall research domain "{topic}", break it down into 3 to 5 distinct, self-contained **research sub-topics**. These sub-topics should represent fundamental areas of inquiry or investigation within the main domain, suitable for specialized academic researchers.

Your output **MUST** be a JSON array of strings, where each string is a detailed, self-contained research assignment. Do not include any other tasks, text, or explanation.

Example for "The Future of Electric Vehicles":
[
  "Investigate the technological advancements and limitations of next-generation battery chemistries (e.g., solid-state, lithium-sulfur) and their projected impact on EV performance metrics.",
  "Analyze the socio-economic and infrastructural challenges hindering the widespread adoption of EV charging networks, including policy interventions and innovative business models.",
  "Evaluate the cradle-to-grave environmental footprint of electric vehicles, specifically focusing on critical mineral extraction, battery manufacturing, recycling processes, and comparison with internal combustion engine vehicles.",
  "Research the ethical and regulatory considerations surrounding the integration of autonomous driving capabilities in EVs, including liability frameworks, public acceptance, and data privacy concerns."
]"#
    )
}

/// Query sent to the search backend for one assignment.
pub fn search_query(assignment: &str) -> String {
    format!("Comprehensive analysis and sources on: {}", assignment)
}

/// Numbered source block, `[n] Title (url)` followed by the snippet.
pub fn numbered_sources(sources: &[SourceItem]) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(i, source)| {
            format!(
                "[{}] {} ({})\n{}",
                i + 1,
                source.title,
                source.url,
                source.snippet
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn researcher_prompt(topic: &str, assignment: &str, sources: &[SourceItem]) -> String {
    format!(
        r#"You are a specialized academic researcher working on the overall research topic "{topic}".
Your assignment: "{assignment}"

Below are {count} sources retrieved for this assignment, each tagged with a number.

**Sources:**
```
{sources}
```

**Instructions:**
1. Open with 2 to 4 direct, verbatim quotes drawn from more than one of the sources above, each attributed with its tag (e.g. [2]).
2. Then write one cohesive synthesis of approximately seven sentences that integrates the sources and stays relevant to "{topic}".
3. Cite sources inline by their numeric tag, e.g. [1] or [1][3]. Do not cite anything that is not listed above."#,
        count = sources.len(),
        sources = numbered_sources(sources),
    )
}

pub fn writer_prompt(topic: &str, notes: &str, allowed_sources: &str) -> String {
    let allowed = if allowed_sources.trim().is_empty() {
        "No sources found."
    } else {
        allowed_sources
    };

    format!(
        r###"You are a professional research writer. Your task is to write a comprehensive, well-structured final report in Markdown format on the topic "{topic}".

You must create a report using the information from the **Collected Research Notes** provided below. Structure your report logically, addressing the different sub-topics covered by the research agents.

**Collected Research Notes:**
```
{notes}
```

**Instructions:**
- Write in clear, well-structured Markdown. Use headings, topics, and sub-topics to organize the content. Aim for a report length of approximately 1500-2000 words.
- **Crucially, you must cite your sources.** When you use information from a research note, add an inline citation using the source number from the list below.
- At the end of the report, you **MUST** include a "## Sources" section. This section must **ONLY** contain the following sources, formatted as the numbered list provided.

**Allowed Sources:**
{allowed}"###
    )
}

/// Short assignment label for researcher narration: at most 25 characters,
/// cut to 22 plus `...` when longer.
pub fn assignment_label(assignment: &str) -> String {
    if assignment.chars().count() > LABEL_WIDTH {
        let kept: String = assignment.chars().take(LABEL_KEEP).collect();
        format!("{}...", kept)
    } else {
        assignment.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_label_truncation() {
        assert_eq!(assignment_label("Short"), "Short");
        assert_eq!(assignment_label("exactly twenty-five chars"), "exactly twenty-five chars");
        let label = assignment_label("Investigate grid-scale battery storage economics");
        assert_eq!(label, "Investigate grid-scale...");
        assert_eq!(label.chars().count(), 25);
    }

    #[test]
    fn test_assignment_label_respects_char_boundaries() {
        let label = assignment_label("Énergie solaire décentralisée en Afrique de l'Ouest");
        assert!(label.ends_with("..."));
        assert_eq!(label.chars().count(), 25);
    }

    #[test]
    fn test_researcher_prompt_numbers_every_source() {
        let sources = vec![
            SourceItem::new("Grid paper", "https://a.example", "alpha"),
            SourceItem::new("Wind study", "https://b.example", "beta"),
        ];
        let prompt = researcher_prompt("Energy", "Storage", &sources);
        assert!(prompt.contains("[1] Grid paper (https://a.example)\nalpha"));
        assert!(prompt.contains("[2] Wind study (https://b.example)\nbeta"));
        assert!(prompt.contains("seven sentences"));
    }

    #[test]
    fn test_writer_prompt_without_sources() {
        let prompt = writer_prompt("Energy", "", "");
        assert!(prompt.contains("No sources found."));
        assert!(prompt.contains("## Sources"));
    }

    #[test]
    fn test_writer_prompt_ends_with_allowed_sources() {
        let allowed = "1. [Grid paper](https://a.example)\n2. [Wind study](https://b.example)";
        let prompt = writer_prompt("Energy", "### Assignment 1: Storage", allowed);
        assert!(prompt.starts_with("You are a professional research writer."));
        assert!(prompt.contains("include a \"## Sources\" section"));
        assert!(prompt.contains("### Assignment 1: Storage"));
        assert!(prompt.ends_with(&format!("**Allowed Sources:**\n{}", allowed)));
    }

    #[test]
    fn test_planner_prompt_mentions_topic_and_format() {
        let prompt = planner_prompt("Solar microgrids");
        assert!(prompt.contains("\"Solar microgrids\""));
        assert!(prompt.contains("JSON array of strings"));
    }
}
