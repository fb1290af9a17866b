//! Rule-based keyword planner. Pure and offline: the deterministic landing
//! spot whenever the LLM planner is unavailable or returns a malformed plan.

use crate::model::{SearchPlan, SubQuery};
use std::collections::HashSet;

const COMPOUND_WEIGHT: f64 = 2.0;
const INTERSECTION_WEIGHT: f64 = 1.8;
const SINGLE_WEIGHT: f64 = 1.0;
const MAX_SUBQUERIES: usize = 4;
const MAX_SINGLE_CONCEPTS: usize = 2;

/// Known physics compound terms, matched before single-token extraction.
const DEFAULT_COMPOUND_TERMS: &[&str] = &[
    "quantum mechanics",
    "quantum entanglement",
    "quantum computing",
    "quantum field theory",
    "quantum gravity",
    "dark matter",
    "dark energy",
    "gravitational wave",
    "general relativity",
    "special relativity",
    "black hole",
    "event horizon",
    "standard model",
    "particle physics",
    "condensed matter",
    "string theory",
    "higgs boson",
    "neutron star",
    "cosmic ray",
    "cosmic microwave background",
    "magnetic field",
    "electric field",
    "phase transition",
    "statistical mechanics",
    "fluid dynamics",
    "plasma physics",
    "nuclear fusion",
    "nuclear fission",
    "wave function",
    "bose einstein condensate",
    "topological insulator",
];

/// Function words plus generic research vocabulary ("effect", "cause", ...)
/// that carries no searchable content.
const DEFAULT_STOP_WORDS: &[&str] = &[
    // function words
    "the", "and", "but", "for", "nor", "with", "from", "into", "onto", "over", "under", "between",
    "during", "through", "about", "above", "below", "after", "before", "their", "there", "here",
    "this", "that", "these", "those", "what", "which", "whose", "when", "where", "why", "how",
    "who", "whom", "does", "did", "done", "doing", "have", "has", "had", "having", "are", "was",
    "were", "been", "being", "can", "could", "should", "would", "may", "might", "will", "shall",
    "must", "not", "than", "too", "very", "such", "some", "any", "each", "both", "more", "most",
    "other", "another", "also", "just", "only", "its", "his", "her", "our", "your", "you", "they",
    "them", "please", "tell", "give", "show", "explain", "describe",
    // generic or vague research terms
    "effect", "effects", "cause", "causes", "caused", "impact", "impacts", "role", "roles",
    "result", "results", "study", "studies", "research", "analysis", "influence", "influences",
    "relationship", "relation", "difference", "differences", "comparison", "importance",
    "significance", "application", "applications", "example", "examples", "overview",
    "introduction", "basics", "use", "uses", "used", "using", "work", "works", "mean", "means",
    "understand", "know", "need", "want",
];

#[derive(Debug, Clone)]
pub struct FallbackConfig {
    pub compound_terms: Vec<String>,
    pub stop_words: HashSet<String>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            compound_terms: DEFAULT_COMPOUND_TERMS.iter().map(|s| s.to_string()).collect(),
            stop_words: DEFAULT_STOP_WORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Clone)]
pub struct FallbackPlanner {
    cfg: FallbackConfig,
}

impl FallbackPlanner {
    pub fn new(cfg: FallbackConfig) -> Self {
        Self { cfg }
    }

    /// Deterministic and side-effect-free: identical input always yields an
    /// identical plan.
    pub fn plan(&self, sanitized_query: &str) -> SearchPlan {
        let mut text = normalize(sanitized_query);

        // Compound terms first, in order of appearance.
        let mut matched: Vec<(usize, &str)> = vec![];
        for term in &self.cfg.compound_terms {
            if let Some(pos) = text.find(term.as_str()) {
                matched.push((pos, term.as_str()));
            }
        }
        matched.sort_by_key(|(pos, _)| *pos);
        let compounds: Vec<String> = matched.iter().map(|(_, t)| t.to_string()).collect();
        for term in &compounds {
            text = text.replacen(term.as_str(), " ", 1);
        }

        // Leftover single tokens, stop-word- and length-filtered.
        let singles: Vec<String> = text
            .split_whitespace()
            .filter(|t| t.len() > 2 && !self.cfg.stop_words.contains(*t))
            .map(|t| t.to_string())
            .collect();

        let mut concepts: Vec<String> = compounds.clone();
        concepts.extend(singles.iter().cloned());

        let mut searches: Vec<SubQuery> = vec![];
        for term in &compounds {
            searches.push(SubQuery::new(term.clone(), term.clone(), COMPOUND_WEIGHT));
        }
        if concepts.len() >= 2 {
            let joined = format!("{} {}", concepts[0], concepts[1]);
            searches.push(SubQuery::new(joined, "intersection", INTERSECTION_WEIGHT));
        }
        for single in singles.iter().take(MAX_SINGLE_CONCEPTS) {
            searches.push(SubQuery::new(single.clone(), single.clone(), SINGLE_WEIGHT));
        }
        if searches.is_empty() {
            let original = sanitized_query.trim().to_string();
            searches.push(SubQuery::new(original.clone(), original, SINGLE_WEIGHT));
        }
        searches.truncate(MAX_SUBQUERIES);

        let interpretation = if concepts.is_empty() {
            format!("Keyword search for: {}", sanitized_query.trim())
        } else {
            format!("Keyword search for: {}", concepts.join(", "))
        };

        SearchPlan { interpretation, intent: None, concepts, searches }
    }
}

fn normalize(s: &str) -> String {
    let lowered = s.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> FallbackPlanner {
        FallbackPlanner::new(FallbackConfig::default())
    }

    #[test]
    fn extracts_concepts_and_intersection() {
        let plan = planner().plan("What effect does gravity have on biology?");
        assert!(!plan.concepts.iter().any(|c| c == "effect"));
        assert!(plan.concepts.contains(&"gravity".to_string()));
        assert!(plan.concepts.contains(&"biology".to_string()));
        let intersection = plan
            .searches
            .iter()
            .find(|s| s.purpose == "intersection")
            .expect("intersection sub-query");
        assert_eq!(intersection.query, "gravity biology");
        assert_eq!(intersection.weight, 1.8);
    }

    #[test]
    fn compound_term_becomes_weight_two_subquery() {
        let plan = planner().plan("quantum entanglement");
        assert_eq!(plan.searches.len(), 1);
        let sq = &plan.searches[0];
        assert_eq!(sq.query, "quantum entanglement");
        assert_eq!(sq.purpose, "quantum entanglement");
        assert_eq!(sq.weight, 2.0);
        assert!(!plan.concepts.iter().any(|c| c == "what" || c == "effect"));
    }

    #[test]
    fn compound_plus_single_gets_intersection() {
        let plan = planner().plan("dark matter in galaxies");
        assert_eq!(plan.concepts, vec!["dark matter".to_string(), "galaxies".to_string()]);
        assert_eq!(plan.searches[0].query, "dark matter");
        assert_eq!(plan.searches[0].weight, 2.0);
        assert_eq!(plan.searches[1].query, "dark matter galaxies");
        assert_eq!(plan.searches[1].weight, 1.8);
        assert_eq!(plan.searches[2].query, "galaxies");
        assert_eq!(plan.searches[2].weight, 1.0);
    }

    #[test]
    fn nothing_survives_falls_back_to_original() {
        let plan = planner().plan("how does it work");
        assert_eq!(plan.searches.len(), 1);
        assert_eq!(plan.searches[0].query, "how does it work");
        assert_eq!(plan.searches[0].weight, 1.0);
    }

    #[test]
    fn caps_at_four_subqueries() {
        let plan = planner().plan(
            "quantum mechanics dark matter gravitational wave black hole neutron star plasma",
        );
        assert_eq!(plan.searches.len(), 4);
    }

    #[test]
    fn plan_is_pure() {
        let p = planner();
        let a = p.plan("gravity waves from neutron star mergers");
        let b = p.plan("gravity waves from neutron star mergers");
        assert_eq!(a, b);
    }
}
