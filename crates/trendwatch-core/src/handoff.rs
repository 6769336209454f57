// Downstream hand-off - where ranked entries leave the pipeline
//
// Summarizers and notifiers get read-only views of the report. They never
// reorder or edit entries.
use async_trait::async_trait;
use tracing::{info, warn};

use crate::models::{RankedEntry, TrendingReport};
use crate::Result;

const NO_DESCRIPTION: &str = "No description available";
const SECTION_SEPARATOR: &str = "\n---\n";

/// Turns one ranked entry into a short blurb
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, entry: &RankedEntry) -> Result<String>;
}

/// Delivers a finished report somewhere (email, chat, stdout...)
#[async_trait]
pub trait Notifier: Send + Sync {
    /// `summaries` lines up with `report.entries`
    async fn notify(&self, report: &TrendingReport, summaries: &[String]) -> Result<()>;
}

/// Summary built from what we already know - no model call involved
///
/// Also what `hand_off` falls back to when a smarter summarizer fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackSummarizer;

impl FallbackSummarizer {
    pub fn summary_for(entry: &RankedEntry) -> String {
        let c = &entry.candidate;
        let mut parts = Vec::with_capacity(2);

        if c.stars > 0 {
            parts.push(format!("⭐ {} stars", c.stars));
        }
        parts.push(
            c.description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .unwrap_or(NO_DESCRIPTION)
                .to_string(),
        );

        parts.join(SECTION_SEPARATOR)
    }
}

#[async_trait]
impl Summarizer for FallbackSummarizer {
    async fn summarize(&self, entry: &RankedEntry) -> Result<String> {
        Ok(Self::summary_for(entry))
    }
}

/// Summarize every entry in rank order, then notify once
///
/// A summarizer error only costs that entry its fancy summary. A notifier
/// error is returned to the caller.
pub async fn hand_off(
    report: &TrendingReport,
    summarizer: &dyn Summarizer,
    notifier: &dyn Notifier,
) -> Result<usize> {
    let mut summaries = Vec::with_capacity(report.entries.len());
    for entry in &report.entries {
        let summary = match summarizer.summarize(entry).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(
                    "Summarizer failed for {}: {}; using fallback",
                    entry.candidate.id, e
                );
                FallbackSummarizer::summary_for(entry)
            }
        };
        summaries.push(summary);
    }

    notifier.notify(report, &summaries).await?;
    info!("Handed off {} entries", summaries.len());
    Ok(summaries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, Novelty, RepoId, TrendingPeriod};
    use crate::Error;
    use chrono::Utc;
    use std::sync::Mutex;

    fn entry(name: &str, stars: u64, description: Option<&str>, rank: usize) -> RankedEntry {
        let mut candidate = Candidate::new(RepoId::parse(name).unwrap());
        candidate.stars = stars;
        candidate.description = description.map(String::from);
        RankedEntry {
            candidate,
            novelty: Novelty::New,
            novelty_score: 1.0,
            importance_score: 0.0,
            trending_score: 0.0,
            composite_score: 0.4,
            rank,
        }
    }

    fn report(entries: Vec<RankedEntry>) -> TrendingReport {
        TrendingReport {
            generated_at: Utc::now(),
            period: TrendingPeriod::Daily,
            language: None,
            total_fetched: entries.len(),
            new_count: entries.len(),
            entries,
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        seen: Mutex<Vec<(Vec<String>, Vec<String>)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, report: &TrendingReport, summaries: &[String]) -> Result<()> {
            let names = report
                .entries
                .iter()
                .map(|e| e.candidate.id.full_name())
                .collect();
            self.seen.lock().unwrap().push((names, summaries.to_vec()));
            Ok(())
        }
    }

    struct FlakySummarizer;

    #[async_trait]
    impl Summarizer for FlakySummarizer {
        async fn summarize(&self, entry: &RankedEntry) -> Result<String> {
            if entry.rank == 2 {
                Err(Error::ApiError("model unavailable".into()))
            } else {
                Ok(format!("summary of {}", entry.candidate.id))
            }
        }
    }

    #[test]
    fn test_fallback_summary_contents() {
        let with_desc = entry("user/test-repo", 100, Some("A test repository"), 1);
        let summary = FallbackSummarizer::summary_for(&with_desc);
        assert_eq!(summary, "⭐ 100 stars\n---\nA test repository");

        let bare = entry("user/bare", 0, Some("   "), 1);
        assert_eq!(FallbackSummarizer::summary_for(&bare), NO_DESCRIPTION);
    }

    #[tokio::test]
    async fn test_hand_off_keeps_rank_order_and_falls_back() {
        let report = report(vec![
            entry("a/first", 10, None, 1),
            entry("b/second", 20, Some("second one"), 2),
            entry("c/third", 0, None, 3),
        ]);
        let notifier = RecordingNotifier::default();

        let count = hand_off(&report, &FlakySummarizer, &notifier).await.unwrap();
        assert_eq!(count, 3);

        let seen = notifier.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (names, summaries) = &seen[0];
        assert_eq!(names, &vec!["a/first", "b/second", "c/third"]);
        assert_eq!(summaries[0], "summary of a/first");
        assert_eq!(summaries[1], "⭐ 20 stars\n---\nsecond one");
        assert_eq!(summaries[2], "summary of c/third");
    }

    #[tokio::test]
    async fn test_hand_off_of_empty_report_still_notifies() {
        let notifier = RecordingNotifier::default();
        let count = hand_off(&report(Vec::new()), &FallbackSummarizer, &notifier)
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(notifier.seen.lock().unwrap().len(), 1);
    }
}
