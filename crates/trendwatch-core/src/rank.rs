// Ranking engine - turns classified candidates into an ordered shortlist
//
// Pure function of its inputs: no I/O, no clock, no hidden state.
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

use crate::models::{Candidate, Novelty, RankedEntry};
use crate::{Error, Result};

/// Novelty is a binary signal
pub const NOVELTY_NEW: f64 = 1.0;
pub const NOVELTY_RECURRING: f64 = 0.1;

// log10 of the star/fork counts that saturate the importance curve
const STAR_SATURATION_LOG10: f64 = 5.0; // 100k stars
const FORK_SATURATION_LOG10: f64 = 4.0; // 10k forks

// Stars say more about importance than forks do
const STAR_SHARE: f64 = 0.7;
const FORK_SHARE: f64 = 0.3;

/// How much each sub-score counts toward the composite
///
/// Weights don't have to sum to 1, but scores are only comparable across runs
/// when the same weight vector is used.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RankingWeights {
    #[serde(default = "default_novelty_weight")]
    pub novelty: f64,
    #[serde(default = "default_importance_weight")]
    pub importance: f64,
    #[serde(default = "default_trending_weight")]
    pub trending: f64,
}

fn default_novelty_weight() -> f64 {
    0.4
}

fn default_importance_weight() -> f64 {
    0.4
}

fn default_trending_weight() -> f64 {
    0.2
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            novelty: default_novelty_weight(),
            importance: default_importance_weight(),
            trending: default_trending_weight(),
        }
    }
}

impl RankingWeights {
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [
            ("novelty", self.novelty),
            ("importance", self.importance),
            ("trending", self.trending),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::ConfigError(format!(
                    "ranking.{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }

        if self.novelty + self.importance + self.trending == 0.0 {
            return Err(Error::ConfigError(
                "ranking weights are all zero - nothing to rank by".into(),
            ));
        }
        Ok(())
    }
}

pub fn novelty_score(novelty: Novelty) -> f64 {
    match novelty {
        Novelty::New => NOVELTY_NEW,
        Novelty::Recurring => NOVELTY_RECURRING,
    }
}

/// Log-scaled stars and forks, each saturating at 1.0
pub fn importance_score(stars: u64, forks: u64) -> f64 {
    let star_part = ((1.0 + stars as f64).log10() / STAR_SATURATION_LOG10).min(1.0);
    let fork_part = ((1.0 + forks as f64).log10() / FORK_SATURATION_LOG10).min(1.0);
    STAR_SHARE * star_part + FORK_SHARE * fork_part
}

/// Stars gained relative to the best performer in this batch
pub fn trending_score(stars_gained: u64, batch_max: u64) -> f64 {
    if batch_max == 0 {
        return 0.0;
    }
    (stars_gained as f64 / batch_max as f64).min(1.0)
}

/// Score and order candidates, best first
///
/// Ties on composite score go to whoever gained more stars, then to the
/// lexicographically smaller identity, so the order is total.
pub fn rank(candidates: Vec<(Candidate, Novelty)>, weights: &RankingWeights) -> Vec<RankedEntry> {
    let batch_max = candidates
        .iter()
        .map(|(c, _)| c.stars_gained)
        .max()
        .unwrap_or(0);

    let mut entries: Vec<RankedEntry> = candidates
        .into_iter()
        .map(|(candidate, novelty)| {
            let novelty_score = novelty_score(novelty);
            let importance_score = importance_score(candidate.stars, candidate.forks);
            let trending_score = trending_score(candidate.stars_gained, batch_max);
            let composite_score = weights.novelty * novelty_score
                + weights.importance * importance_score
                + weights.trending * trending_score;

            RankedEntry {
                candidate,
                novelty,
                novelty_score,
                importance_score,
                trending_score,
                composite_score,
                rank: 0,
            }
        })
        .collect();

    entries.sort_by(compare_entries);

    for (position, entry) in entries.iter_mut().enumerate() {
        entry.rank = position + 1;
    }

    debug!("Ranked {} candidates", entries.len());
    entries
}

fn compare_entries(a: &RankedEntry, b: &RankedEntry) -> Ordering {
    b.composite_score
        .total_cmp(&a.composite_score)
        .then_with(|| b.candidate.stars_gained.cmp(&a.candidate.stars_gained))
        .then_with(|| a.candidate.id.cmp(&b.candidate.id))
        .then_with(|| a.candidate.id.full_name().cmp(&b.candidate.id.full_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RepoId;

    fn candidate(full_name: &str, stars: u64, forks: u64, gained: u64) -> Candidate {
        let mut c = Candidate::new(RepoId::parse(full_name).unwrap());
        c.stars = stars;
        c.forks = forks;
        c.stars_gained = gained;
        c
    }

    fn names(entries: &[RankedEntry]) -> Vec<String> {
        entries.iter().map(|e| e.candidate.id.full_name()).collect()
    }

    #[test]
    fn test_importance_is_monotonic_and_bounded() {
        assert_eq!(importance_score(0, 0), 0.0);
        assert!(importance_score(10, 0) < importance_score(100, 0));
        assert!(importance_score(100, 0) < importance_score(100, 5));
        assert!(importance_score(10_000_000, 1_000_000) <= 1.0);
        assert_eq!(importance_score(10_000_000, 1_000_000), 1.0);

        // High magnitudes compress: +1000 stars matters less at 50k than at 1k
        let low_gap = importance_score(2_000, 0) - importance_score(1_000, 0);
        let high_gap = importance_score(51_000, 0) - importance_score(50_000, 0);
        assert!(high_gap < low_gap);
    }

    #[test]
    fn test_trending_is_relative_to_batch_max() {
        assert_eq!(trending_score(50, 100), 0.5);
        assert_eq!(trending_score(100, 100), 1.0);
        assert_eq!(trending_score(0, 0), 0.0);
    }

    #[test]
    fn test_pinned_scenario_scores() {
        let weights = RankingWeights {
            novelty: 0.4,
            importance: 0.4,
            trending: 0.2,
        };
        let ranked = rank(
            vec![
                (candidate("x/y", 1200, 0, 300), Novelty::New),
                (candidate("a/b", 50, 0, 310), Novelty::New),
            ],
            &weights,
        );

        assert_eq!(names(&ranked), vec!["x/y", "a/b"]);

        let xy = &ranked[0];
        assert!((xy.importance_score - 0.431136021036407).abs() < 1e-9);
        assert!((xy.trending_score - 0.967741935483871).abs() < 1e-9);
        assert!((xy.composite_score - 0.766002795511337).abs() < 1e-9);
        assert_eq!(xy.rank, 1);

        let ab = &ranked[1];
        assert!((ab.importance_score - 0.239059824653711).abs() < 1e-9);
        assert_eq!(ab.trending_score, 1.0);
        assert!((ab.composite_score - 0.695623929861485).abs() < 1e-9);
        assert_eq!(ab.rank, 2);
    }

    #[test]
    fn test_tie_breaks_on_stars_gained_then_identity() {
        let weights = RankingWeights {
            novelty: 1.0,
            importance: 1.0,
            trending: 0.0,
        };
        let ranked = rank(
            vec![
                (candidate("slow/one", 500, 10, 80), Novelty::New),
                (candidate("fast/one", 500, 10, 120), Novelty::New),
                (candidate("Beta/same", 500, 10, 80), Novelty::New),
            ],
            &weights,
        );

        assert_eq!(ranked[0].composite_score, ranked[1].composite_score);
        assert_eq!(names(&ranked), vec!["fast/one", "Beta/same", "slow/one"]);
    }

    #[test]
    fn test_new_beats_recurring_all_else_equal() {
        let ranked = rank(
            vec![
                (candidate("old/news", 100, 1, 10), Novelty::Recurring),
                (candidate("new/kid", 100, 1, 10), Novelty::New),
            ],
            &RankingWeights::default(),
        );

        assert_eq!(names(&ranked), vec!["new/kid", "old/news"]);
        assert_eq!(ranked[0].novelty_score, NOVELTY_NEW);
        assert_eq!(ranked[1].novelty_score, NOVELTY_RECURRING);
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let input = vec![
            (candidate("c/c", 10, 1, 5), Novelty::New),
            (candidate("a/a", 10, 1, 5), Novelty::New),
            (candidate("b/b", 3000, 40, 1), Novelty::Recurring),
            (candidate("d/d", 0, 0, 0), Novelty::New),
        ];

        let first = rank(input.clone(), &RankingWeights::default());
        for _ in 0..5 {
            assert_eq!(rank(input.clone(), &RankingWeights::default()), first);
        }
        assert_eq!(
            first.iter().map(|e| e.rank).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn test_empty_batch() {
        assert!(rank(Vec::new(), &RankingWeights::default()).is_empty());
    }

    #[test]
    fn test_weight_validation() {
        assert!(RankingWeights::default().validate().is_ok());
        assert!(RankingWeights {
            novelty: 0.0,
            importance: 0.0,
            trending: 0.0
        }
        .validate()
        .is_err());
        assert!(RankingWeights {
            novelty: f64::NAN,
            importance: 0.5,
            trending: 0.5
        }
        .validate()
        .is_err());
    }
}
