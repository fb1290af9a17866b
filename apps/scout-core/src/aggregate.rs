//! Result aggregation: merges sub-query result lists into a deduplicated,
//! weighted ranking keyed by document identifier. Accumulation is commutative
//! and associative, so concurrent sub-query completion order cannot change
//! the output.

use crate::config::RankingConfig;
use crate::model::{ArticleRecord, RankedEntry, RankingStats, SubQuery};
use std::collections::{HashMap, HashSet};

#[derive(Clone)]
pub struct Aggregator {
    cfg: RankingConfig,
}

struct Accum {
    article: ArticleRecord,
    sources: Vec<String>,
    overlap: usize,
    weight: f64,
}

impl Aggregator {
    pub fn new(cfg: RankingConfig) -> Self {
        Self { cfg }
    }

    /// Deterministic-plan path. Articles without a document identifier cannot
    /// be deduplicated and are excluded.
    pub fn rank(
        &self,
        batches: &[(SubQuery, Vec<ArticleRecord>)],
    ) -> (Vec<RankedEntry>, RankingStats) {
        let mut map: HashMap<String, Accum> = HashMap::new();
        for (sq, results) in batches {
            let mut seen_in_batch: HashSet<&str> = HashSet::new();
            for (i, article) in results.iter().enumerate() {
                let Some(doi) = article.doi.as_deref() else { continue };
                if !seen_in_batch.insert(doi) {
                    continue;
                }
                let rank_weight = (sq.weight * (1.0 - i as f64 * self.cfg.rank_decay)).max(0.0);
                match map.get_mut(doi) {
                    Some(entry) => {
                        entry.weight += rank_weight;
                        entry.overlap += 1;
                        entry.sources.push(sq.purpose.clone());
                    }
                    None => {
                        map.insert(
                            doi.to_string(),
                            Accum {
                                article: article.clone(),
                                sources: vec![sq.purpose.clone()],
                                overlap: 1,
                                weight: rank_weight,
                            },
                        );
                    }
                }
            }
        }

        let stats = RankingStats {
            unique_papers: map.len(),
            multi_source: map.values().filter(|e| e.overlap > 1).count(),
            strong_overlap: map.values().filter(|e| e.overlap >= 3).count(),
            max_overlap: map.values().map(|e| e.overlap).max().unwrap_or(0),
        };

        let mut entries: Vec<RankedEntry> = map
            .into_values()
            .map(|e| {
                let score = e.weight + (e.overlap as f64 - 1.0) * self.cfg.overlap_bonus;
                RankedEntry {
                    article: e.article,
                    sources: e.sources,
                    overlap: e.overlap,
                    weight: e.weight,
                    score,
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.article.doi.cmp(&b.article.doi))
        });
        entries.truncate(self.cfg.max_results);
        (entries, stats)
    }

    /// Agentic path: no cross-search weighting; papers keep first-seen order.
    pub fn rank_agent(
        &self,
        papers: &[ArticleRecord],
        origins: &[String],
    ) -> (Vec<RankedEntry>, RankingStats) {
        let stats = RankingStats {
            unique_papers: papers.len(),
            multi_source: 0,
            strong_overlap: 0,
            max_overlap: usize::from(!papers.is_empty()),
        };
        let entries = papers
            .iter()
            .zip(origins.iter())
            .take(self.cfg.max_results)
            .map(|(article, origin)| RankedEntry {
                article: article.clone(),
                sources: vec![origin.clone()],
                overlap: 1,
                weight: 1.0,
                score: 1.0,
            })
            .collect();
        (entries, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SubQuery;

    fn article(doi: &str) -> ArticleRecord {
        ArticleRecord {
            title: format!("paper {doi}"),
            authors: vec!["A. Author".into()],
            abstract_text: String::new(),
            journal: "Phys. Rev. X".into(),
            pub_date: "2024-03-01".into(),
            volume: None,
            issue: None,
            pages: None,
            doi: Some(doi.to_string()),
            url: format!("https://doi.org/{doi}"),
            citations: None,
            summary: None,
        }
    }

    fn no_doi() -> ArticleRecord {
        ArticleRecord { doi: None, ..article("x") }
    }

    fn batches() -> Vec<(SubQuery, Vec<ArticleRecord>)> {
        vec![
            (
                SubQuery::new("dark matter", "dark matter", 2.0),
                vec![article("10.1/a"), article("10.1/b"), no_doi()],
            ),
            (
                SubQuery::new("dark matter galaxies", "intersection", 1.8),
                vec![article("10.1/b"), article("10.1/c")],
            ),
            (SubQuery::new("galaxies", "galaxies", 1.0), vec![article("10.1/b")]),
        ]
    }

    #[test]
    fn overlap_invariant_holds() {
        let (entries, stats) = Aggregator::new(RankingConfig::default()).rank(&batches());
        for e in &entries {
            assert_eq!(e.overlap, e.sources.len());
            assert!(e.overlap >= 1);
        }
        assert_eq!(stats.unique_papers, 3);
        assert_eq!(stats.multi_source, 1);
        assert_eq!(stats.strong_overlap, 1);
        assert_eq!(stats.max_overlap, 3);
    }

    #[test]
    fn corroborated_articles_outrank_single_strong_matches() {
        let (entries, _) = Aggregator::new(RankingConfig::default()).rank(&batches());
        // b: 2.0*0.98 + 1.8 + 1.0 + 2*1.5 = 7.76; a: 2.0; c: 1.8*0.98
        assert_eq!(entries[0].article.doi.as_deref(), Some("10.1/b"));
        assert!((entries[0].score - 7.76).abs() < 1e-9);
    }

    #[test]
    fn aggregation_is_order_independent() {
        let agg = Aggregator::new(RankingConfig::default());
        let mut permuted = batches();
        permuted.reverse();
        let (a, sa) = agg.rank(&batches());
        let (b, sb) = agg.rank(&permuted);
        assert_eq!(sa, sb);
        let dois = |v: &[RankedEntry]| {
            v.iter().map(|e| (e.article.doi.clone(), e.overlap, e.score)).collect::<Vec<_>>()
        };
        assert_eq!(dois(&a), dois(&b));
    }

    #[test]
    fn missing_identifier_is_excluded() {
        let (entries, stats) = Aggregator::new(RankingConfig::default())
            .rank(&[(SubQuery::new("q", "q", 1.0), vec![no_doi(), no_doi()])]);
        assert!(entries.is_empty());
        assert_eq!(stats.unique_papers, 0);
        assert_eq!(stats.max_overlap, 0);
    }

    #[test]
    fn output_is_capped() {
        let many: Vec<ArticleRecord> = (0..60).map(|i| article(&format!("10.2/{i:03}"))).collect();
        let (entries, stats) = Aggregator::new(RankingConfig::default())
            .rank(&[(SubQuery::new("q", "q", 1.0), many)]);
        assert_eq!(entries.len(), 20);
        assert_eq!(stats.unique_papers, 60);
    }

    #[test]
    fn rank_decay_orders_within_one_subquery() {
        let (entries, _) = Aggregator::new(RankingConfig::default())
            .rank(&[(SubQuery::new("q", "q", 2.0), vec![article("10.3/a"), article("10.3/b")])]);
        assert_eq!(entries[0].article.doi.as_deref(), Some("10.3/a"));
        assert!((entries[0].weight - 2.0).abs() < 1e-9);
        assert!((entries[1].weight - 1.96).abs() < 1e-9);
    }

    #[test]
    fn agent_path_keeps_arrival_order() {
        let papers = vec![article("10.4/z"), article("10.4/a")];
        let origins = vec!["first query".to_string(), "second query".to_string()];
        let (entries, stats) =
            Aggregator::new(RankingConfig::default()).rank_agent(&papers, &origins);
        assert_eq!(entries[0].article.doi.as_deref(), Some("10.4/z"));
        assert_eq!(entries[0].sources, vec!["first query".to_string()]);
        assert_eq!(stats.unique_papers, 2);
        assert_eq!(stats.max_overlap, 1);
    }
}
