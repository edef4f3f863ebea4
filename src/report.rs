//! Rendering of scored batches for out-of-band diagnostics.
//!
//! A degraded reward is indistinguishable in type from a genuine low score;
//! callers who need failure visibility read the per-spec breakdowns here
//! rather than the reward value itself.

use crate::models::RolloutReport;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Markdown,
    JsonPretty,
}

#[tracing::instrument(skip_all)]
pub fn render_markdown_report(report: &RolloutReport) -> String {
    let mut s = String::new();
    s.push_str("# Rollout Report\n\n");
    s.push_str(&format!("- report_id: `{}`\n", report.id));
    s.push_str(&format!("- env: `{}`\n", report.env));
    s.push_str(&format!(
        "- created_at: `{}`\n",
        report.created_at.to_rfc3339()
    ));
    s.push_str(&format!("- rollouts: `{}`\n", report.rollouts.len()));
    s.push_str(&format!("- mean_reward: `{:.4}`\n", report.mean_reward()));
    s.push_str("\n## Rollouts\n\n");
    s.push_str("| # | reward | breakdown |\n");
    s.push_str("|---|--------|-----------|\n");
    for (i, r) in report.rollouts.iter().enumerate() {
        let breakdown = r
            .breakdown
            .scores
            .iter()
            .map(|sc| format!("{}={:.4}", sc.name, sc.score))
            .collect::<Vec<_>>()
            .join(", ");
        s.push_str(&format!("| {} | {:.4} | {} |\n", i, r.reward, breakdown));
    }
    s
}

#[tracing::instrument(skip_all)]
pub fn render_report(report: &RolloutReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Markdown => Ok(render_markdown_report(report)),
        ReportFormat::JsonPretty => Ok(serde_json::to_string_pretty(report)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Example, Message, RewardBreakdown, ScoredRollout, SpecScore, Trajectory,
    };

    fn report() -> RolloutReport {
        let rollout = ScoredRollout {
            example: Example::new(vec![Message::user("q")], "a"),
            trajectory: Trajectory::new(vec![Message::user("q"), Message::assistant("a")]),
            breakdown: RewardBreakdown {
                scores: vec![SpecScore {
                    name: "exact_match".to_string(),
                    weight: 1.0,
                    score: 1.0,
                }],
            },
            reward: 1.0,
        };
        RolloutReport::new("simple", vec![rollout])
    }

    #[test]
    fn markdown_carries_breakdown_and_mean() {
        let md = render_markdown_report(&report());
        assert!(md.contains("env: `simple`"));
        assert!(md.contains("mean_reward: `1.0000`"));
        assert!(md.contains("exact_match=1.0000"));
    }

    #[test]
    fn json_render_roundtrips() {
        let rendered = render_report(&report(), ReportFormat::JsonPretty).unwrap();
        let parsed: RolloutReport = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed.rollouts.len(), 1);
        assert_eq!(parsed.rollouts[0].reward, 1.0);
    }
}
