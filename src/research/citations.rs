//! Citation aggregation
//!
//! Findings arrive in completion order, which is racy. Aggregation re-sorts
//! them into assignment order so the writer input and the allowed source list
//! are identical across runs with the same backends. Sources are not
//! de-duplicated across findings.

use crate::types::Finding;
use serde::Serialize;

const NOTE_SEPARATOR: &str = "\n\n---\n\n";

/// One entry of the writer's allowed source list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    /// 1-based position in the flattened list
    pub number: usize,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregatedResearch {
    pub findings: Vec<Finding>,
    pub notes: String,
    pub citations: Vec<Citation>,
}

impl AggregatedResearch {
    /// Markdown list the writer must restrict its "Sources" section to.
    pub fn sources_list(&self) -> String {
        self.citations
            .iter()
            .map(|c| format!("{}. [{}]({})", c.number, c.title, c.url))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn total_sources(&self) -> usize {
        self.citations.len()
    }
}

/// Build the notes block and citation list from `(assignment index, finding)`
/// pairs.
pub fn aggregate(mut indexed: Vec<(usize, Finding)>) -> AggregatedResearch {
    indexed.sort_by_key(|(index, _)| *index);

    let mut citations = Vec::new();
    let mut notes = Vec::with_capacity(indexed.len());

    for (position, (_, finding)) in indexed.iter().enumerate() {
        let mut lines = Vec::with_capacity(finding.sources().len());
        for (local, source) in finding.sources().iter().enumerate() {
            let number = citations.len() + 1;
            lines.push(format!(
                "[{}] {} ({}), listed as source {}",
                local + 1,
                source.title,
                source.url,
                number
            ));
            citations.push(Citation {
                number,
                title: source.title.clone(),
                url: source.url.clone(),
            });
        }

        let sources_block = if lines.is_empty() {
            "No sources found.".to_string()
        } else {
            lines.join("\n")
        };
        let synthesis = if finding.synthesis().trim().is_empty() {
            "No synthesis available."
        } else {
            finding.synthesis()
        };

        notes.push(format!(
            "### Assignment {}: {}\nSources:\n{}\nSynthesis:\n{}",
            position + 1,
            finding.assignment(),
            sources_block,
            synthesis
        ));
    }

    AggregatedResearch {
        findings: indexed.into_iter().map(|(_, finding)| finding).collect(),
        notes: notes.join(NOTE_SEPARATOR),
        citations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceItem;

    fn finding(assignment: &str, urls: &[&str]) -> Finding {
        let sources = urls
            .iter()
            .map(|u| SourceItem::new(format!("Title {}", u), *u, "snippet"))
            .collect();
        Finding::new(assignment, sources, format!("synthesis of {}", assignment))
    }

    #[test]
    fn test_order_follows_assignment_index_not_arrival() {
        let arrived = vec![
            (2, finding("C", &["c1"])),
            (0, finding("A", &["a1", "a2"])),
            (1, finding("B", &["b1"])),
        ];
        let aggregated = aggregate(arrived);

        let urls: Vec<&str> = aggregated.citations.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["a1", "a2", "b1", "c1"]);
        let numbers: Vec<usize> = aggregated.citations.iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(aggregated.findings[0].assignment(), "A");
        assert!(aggregated.notes.find("synthesis of A") < aggregated.notes.find("synthesis of C"));
    }

    #[test]
    fn test_duplicates_across_findings_are_kept() {
        let aggregated = aggregate(vec![
            (0, finding("A", &["shared"])),
            (1, finding("B", &["shared"])),
        ]);
        assert_eq!(aggregated.total_sources(), 2);
        assert_eq!(
            aggregated.sources_list(),
            "1. [Title shared](shared)\n2. [Title shared](shared)"
        );
    }

    #[test]
    fn test_empty_finding_contributes_note_but_no_citations() {
        let aggregated = aggregate(vec![(0, Finding::empty("Nothing here"))]);
        assert!(aggregated.citations.is_empty());
        assert!(aggregated.notes.contains("Nothing here"));
        assert!(aggregated.notes.contains("No sources found."));
        assert_eq!(aggregated.sources_list(), "");
    }

    #[test]
    fn test_notes_are_separated() {
        let aggregated = aggregate(vec![(0, finding("A", &["a"])), (1, finding("B", &["b"]))]);
        assert_eq!(aggregated.notes.matches(NOTE_SEPARATOR).count(), 1);
    }
}
