use crate::{
    models::{EnrichmentStatus, RankedEntry, TrendingReport},
    Error, Result,
};
use std::fmt::Write as _;
use std::path::Path;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Markdown,
    Text,
}

impl ExportFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            "md" | "markdown" => Some(ExportFormat::Markdown),
            "txt" | "text" => Some(ExportFormat::Text),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Markdown => "md",
            ExportFormat::Text => "txt",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_extension(s).ok_or_else(|| {
            Error::ConfigError(format!(
                "Unknown export format '{}' (expected json, csv, md or text)",
                s
            ))
        })
    }
}

/// Renders a ranked report for humans and for other tools
pub struct Exporter;

impl Exporter {
    /// Export a report to a file with automatic format detection
    pub fn export_to_file<P: AsRef<Path>>(report: &TrendingReport, path: P) -> Result<()> {
        let path = path.as_ref();

        // Detect format from extension
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ExportFormat::from_extension)
            .ok_or_else(|| {
                Error::ConfigError(
                    "Could not determine export format from extension. Use .json, .csv, .md or .txt"
                        .to_string(),
                )
            })?;

        Self::export_to_file_with_format(report, path, format)
    }

    /// Export a report to a file with explicit format
    pub fn export_to_file_with_format<P: AsRef<Path>>(
        report: &TrendingReport,
        path: P,
        format: ExportFormat,
    ) -> Result<()> {
        let content = Self::render(report, format)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn render(report: &TrendingReport, format: ExportFormat) -> Result<String> {
        Ok(match format {
            ExportFormat::Json => Self::to_json(report)?,
            ExportFormat::Csv => Self::to_csv(&report.entries),
            ExportFormat::Markdown => Self::to_markdown(report),
            ExportFormat::Text => Self::to_text(report),
        })
    }

    /// Export the whole report to JSON
    pub fn to_json(report: &TrendingReport) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }

    /// One row per ranked entry
    pub fn to_csv(entries: &[RankedEntry]) -> String {
        let mut output = String::new();

        output.push_str(
            "Rank,Name,Novelty,Composite,Novelty Score,Importance Score,Trending Score,\
             Stars,Forks,Stars Gained,Open Issues,Language,Description,Created At,Pushed At,\
             Enrichment,URL\n",
        );

        for entry in entries {
            let c = &entry.candidate;
            let _ = writeln!(
                output,
                "{},{},{},{:.4},{:.4},{:.4},{:.4},{},{},{},{},{},{},{},{},{},{}",
                entry.rank,
                Self::escape_csv(&c.id.full_name()),
                entry.novelty.label(),
                entry.composite_score,
                entry.novelty_score,
                entry.importance_score,
                entry.trending_score,
                c.stars,
                c.forks,
                c.stars_gained,
                c.open_issues.map(|n| n.to_string()).unwrap_or_default(),
                Self::escape_csv(c.language.as_deref().unwrap_or("")),
                Self::escape_csv(c.description.as_deref().unwrap_or("")),
                c.created_at
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                c.pushed_at
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                enrichment_label(c.enrichment),
                c.id.html_url(),
            );
        }

        output
    }

    pub fn to_markdown(report: &TrendingReport) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "# Trending Repositories - {}\n", report.period.display_name());
        let _ = writeln!(
            output,
            "Generated {} | Language: {} | {} fetched, {} new\n",
            report.generated_at.format("%Y-%m-%d %H:%M UTC"),
            report.language.as_deref().unwrap_or("all"),
            report.total_fetched,
            report.new_count
        );

        if report.is_empty() {
            output.push_str("_No trending repositories for this period._\n");
            return output;
        }

        output.push_str("| # | Repository | Novelty | Score | Stars | Gained | Language |\n");
        output.push_str("|---|------------|---------|-------|-------|--------|----------|\n");
        for entry in &report.entries {
            let c = &entry.candidate;
            let _ = writeln!(
                output,
                "| {} | [{}]({}) | {} | {:.3} | {} | +{} | {} |",
                entry.rank,
                c.id.full_name(),
                c.id.html_url(),
                if entry.novelty.is_new() { "🆕 new" } else { "recurring" },
                entry.composite_score,
                Self::format_number(c.stars),
                Self::format_number(c.stars_gained),
                c.language.as_deref().unwrap_or("-"),
            );
        }

        output.push_str("\n---\n\n");

        for entry in &report.entries {
            let c = &entry.candidate;
            let _ = writeln!(output, "## {}. [{}]({})\n", entry.rank, c.id.full_name(), c.id.html_url());
            if let Some(desc) = &c.description {
                let _ = writeln!(output, "{}\n", desc);
            }
            output.push_str("| Metric | Value |\n");
            output.push_str("|--------|-------|\n");
            let _ = writeln!(output, "| ⭐ Stars | {} |", Self::format_number(c.stars));
            let _ = writeln!(output, "| 🍴 Forks | {} |", Self::format_number(c.forks));
            let _ = writeln!(output, "| 📈 Gained | +{} |", Self::format_number(c.stars_gained));
            if let Some(issues) = c.open_issues {
                let _ = writeln!(output, "| 🐛 Open Issues | {} |", Self::format_number(issues));
            }
            if let Some(created) = c.created_at {
                let _ = writeln!(output, "| 📅 Created | {} |", created.format("%Y-%m-%d"));
            }
            if let Some(pushed) = c.pushed_at {
                let _ = writeln!(output, "| 📌 Pushed | {} |", pushed.format("%Y-%m-%d"));
            }
            let _ = writeln!(
                output,
                "| Scores | novelty {:.2} / importance {:.2} / trending {:.2} |\n",
                entry.novelty_score, entry.importance_score, entry.trending_score
            );
        }

        output
    }

    /// Terminal-friendly listing
    pub fn to_text(report: &TrendingReport) -> String {
        let mut output = String::new();

        let _ = writeln!(
            output,
            "Trending {} ({}): {} fetched, {} new",
            report.period.display_name().to_lowercase(),
            report.language.as_deref().unwrap_or("all languages"),
            report.total_fetched,
            report.new_count
        );

        for entry in &report.entries {
            let c = &entry.candidate;
            let _ = writeln!(
                output,
                "{:>3}. {:<40} {:>9} {:>7} ★ +{:<6} {:.3}",
                entry.rank,
                c.id.full_name(),
                entry.novelty.label(),
                Self::format_number(c.stars),
                Self::format_number(c.stars_gained),
                entry.composite_score,
            );
            if let Some(desc) = &c.description {
                let _ = writeln!(output, "     {}", desc);
            }
        }

        output
    }

    /// Escape CSV special characters
    fn escape_csv(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }

    /// Format numbers with K/M suffixes
    fn format_number(num: u64) -> String {
        if num >= 1_000_000 {
            format!("{:.1}M", num as f64 / 1_000_000.0)
        } else if num >= 1_000 {
            format!("{:.1}k", num as f64 / 1_000.0)
        } else {
            num.to_string()
        }
    }
}

fn enrichment_label(status: EnrichmentStatus) -> &'static str {
    match status {
        EnrichmentStatus::NotAttempted => "not_attempted",
        EnrichmentStatus::Succeeded => "succeeded",
        EnrichmentStatus::Failed => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, Novelty, RepoId, TrendingPeriod};
    use chrono::Utc;

    fn create_test_report() -> TrendingReport {
        let mut candidate = Candidate::new(RepoId::new("test", "repo"));
        candidate.description = Some("A test repository, with commas".to_string());
        candidate.language = Some("Rust".to_string());
        candidate.stars = 1234;
        candidate.forks = 56;
        candidate.stars_gained = 78;

        TrendingReport {
            generated_at: Utc::now(),
            period: TrendingPeriod::Daily,
            language: None,
            total_fetched: 1,
            new_count: 1,
            entries: vec![RankedEntry {
                candidate,
                novelty: Novelty::New,
                novelty_score: 1.0,
                importance_score: 0.5,
                trending_score: 1.0,
                composite_score: 0.8,
                rank: 1,
            }],
        }
    }

    #[test]
    fn test_export_format_detection() {
        assert_eq!(
            ExportFormat::from_extension("JSON"),
            Some(ExportFormat::Json)
        );
        assert_eq!(ExportFormat::from_extension("csv"), Some(ExportFormat::Csv));
        assert_eq!(
            ExportFormat::from_extension("markdown"),
            Some(ExportFormat::Markdown)
        );
        assert_eq!(ExportFormat::from_extension("txt"), Some(ExportFormat::Text));
        assert_eq!(ExportFormat::from_extension("xml"), None);
        assert!("yaml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_json_export() {
        let json = Exporter::to_json(&create_test_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["entries"][0]["rank"], 1);
        assert_eq!(value["entries"][0]["novelty"], "new");
        assert_eq!(value["period"], "daily");
    }

    #[test]
    fn test_csv_export() {
        let csv = Exporter::to_csv(&create_test_report().entries);
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("Rank,Name,Novelty"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("1,test/repo,NEW,0.8000"));
        assert!(row.contains("\"A test repository, with commas\""));
        assert!(row.ends_with("not_attempted,https://github.com/test/repo"));
    }

    #[test]
    fn test_markdown_export() {
        let md = Exporter::to_markdown(&create_test_report());
        assert!(md.contains("# Trending Repositories - Today"));
        assert!(md.contains("[test/repo](https://github.com/test/repo)"));
        assert!(md.contains("⭐ Stars | 1.2k"));
    }

    #[test]
    fn test_markdown_empty_report() {
        let mut report = create_test_report();
        report.entries.clear();
        let md = Exporter::to_markdown(&report);
        assert!(md.contains("No trending repositories"));
    }

    #[test]
    fn test_text_export() {
        let text = Exporter::to_text(&create_test_report());
        assert!(text.starts_with("Trending today (all languages): 1 fetched, 1 new"));
        assert!(text.contains("test/repo"));
    }

    #[test]
    fn test_export_to_file_detects_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        Exporter::export_to_file(&create_test_report(), &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Rank,"));

        assert!(Exporter::export_to_file(&create_test_report(), dir.path().join("report")).is_err());
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(Exporter::escape_csv("simple"), "simple");
        assert_eq!(Exporter::escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(Exporter::escape_csv("with\"quote"), "\"with\"\"quote\"");
    }
}
