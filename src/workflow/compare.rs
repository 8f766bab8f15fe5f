use std::fmt::Write as _;

use serde::Serialize;

use super::result::WorkflowResult;

/// `key` 最大者胜；平局保留靠前的结果，`None` 跳过
fn best_by<F>(results: &[WorkflowResult], key: F) -> Option<&WorkflowResult>
where
    F: Fn(&WorkflowResult) -> Option<f64>,
{
    let mut best: Option<(&WorkflowResult, f64)> = None;
    for result in results {
        let Some(value) = key(result) else { continue };
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((result, value)),
        }
    }
    best.map(|(result, _)| result)
}

pub fn best_score(results: &[WorkflowResult]) -> Option<&WorkflowResult> {
    best_by(results, |r| Some(f64::from(r.score)))
}

/// 跳过没有步数的结果；都没有时第一个胜出
pub fn best_score_per_move(results: &[WorkflowResult]) -> Option<&WorkflowResult> {
    if results.iter().all(|r| r.moves == 0) {
        return results.first();
    }
    best_by(results, |r| {
        (r.moves > 0).then(|| f64::from(r.score) / f64::from(r.moves))
    })
}

pub fn fastest(results: &[WorkflowResult]) -> Option<&WorkflowResult> {
    best_by(results, |r| Some(-r.elapsed.as_secs_f64()))
}

pub fn best_score_per_token(results: &[WorkflowResult]) -> Option<&WorkflowResult> {
    best_by(results, |r| {
        let tokens = r.total_tokens();
        (tokens > 0).then(|| f64::from(r.score) / tokens as f64)
    })
}

pub fn best_score_per_cost(results: &[WorkflowResult]) -> Option<&WorkflowResult> {
    best_by(results, |r| {
        (r.estimated_cost > 0.0).then(|| f64::from(r.score) / r.estimated_cost)
    })
}

/// 各项比较的胜者名称
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonReport {
    pub best_score: Option<String>,
    pub best_score_per_move: Option<String>,
    pub fastest: Option<String>,
    pub best_score_per_token: Option<String>,
    pub best_score_per_cost: Option<String>,
}

impl ComparisonReport {
    pub fn from_results(results: &[WorkflowResult]) -> Self {
        let name = |winner: Option<&WorkflowResult>| winner.map(|r| r.name.clone());
        Self {
            best_score: name(best_score(results)),
            best_score_per_move: name(best_score_per_move(results)),
            fastest: name(fastest(results)),
            best_score_per_token: name(best_score_per_token(results)),
            best_score_per_cost: name(best_score_per_cost(results)),
        }
    }

    pub fn render(&self) -> String {
        let rows = [
            ("highest score", &self.best_score),
            ("score per move", &self.best_score_per_move),
            ("fastest", &self.fastest),
            ("score per token", &self.best_score_per_token),
            ("score per dollar", &self.best_score_per_cost),
        ];
        let mut out = String::new();
        for (label, winner) in rows {
            let _ = writeln!(out, "{label:<18} {}", winner.as_deref().unwrap_or("-"));
        }
        out
    }
}

/// 定宽表格，按给定顺序每个结果一行
pub fn summary_table(results: &[WorkflowResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:<28} {:>6} {:>6} {:>9} {:>6} {:>9} {:>10} {:>10}",
        "workflow", "display", "score", "moves", "completed", "turns", "seconds", "tokens", "cost"
    );
    let _ = writeln!(out, "{}", "-".repeat(110));
    for r in results {
        let _ = writeln!(
            out,
            "{:<20} {:<28} {:>6} {:>6} {:>9} {:>6} {:>9.2} {:>10} {:>10.4}",
            truncate(&r.name, 20),
            truncate(&r.display, 28),
            r.score,
            r.moves,
            if r.completed { "yes" } else { "no" },
            r.turns,
            r.elapsed.as_secs_f64(),
            r.total_tokens(),
            r.estimated_cost,
        );
    }
    out
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('~');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{TokenUsage, UsageLedger};
    use std::time::Duration;

    fn result(name: &str, score: u32, moves: u32, millis: u64, tokens: u64, cost: f64) -> WorkflowResult {
        let mut usage = UsageLedger::new();
        if tokens > 0 {
            usage.record("m", TokenUsage::new(tokens, 0, tokens));
        }
        let mut r = WorkflowResult::degraded(name, name, "");
        r.error = None;
        r.score = score;
        r.moves = moves;
        r.elapsed = Duration::from_millis(millis);
        r.usage = usage;
        r.estimated_cost = cost;
        r
    }

    #[test]
    fn reductions_pick_independent_winners() {
        let results = vec![
            result("a", 10, 20, 300, 1000, 0.5),
            result("b", 10, 5, 100, 0, 0.0),
            result("c", 4, 0, 200, 100, 0.01),
        ];
        assert_eq!(best_score(&results).map(|r| r.name.as_str()), Some("a"));
        assert_eq!(best_score_per_move(&results).map(|r| r.name.as_str()), Some("b"));
        assert_eq!(fastest(&results).map(|r| r.name.as_str()), Some("b"));
        assert_eq!(best_score_per_token(&results).map(|r| r.name.as_str()), Some("c"));
        assert_eq!(best_score_per_cost(&results).map(|r| r.name.as_str()), Some("c"));
    }

    #[test]
    fn zero_denominators_are_skipped_or_fall_back() {
        let results = vec![result("a", 0, 0, 10, 0, 0.0), result("b", 5, 0, 10, 0, 0.0)];
        assert_eq!(best_score_per_move(&results).map(|r| r.name.as_str()), Some("a"));
        assert!(best_score_per_token(&results).is_none());
        assert!(best_score_per_cost(&results).is_none());
        assert_eq!(fastest(&results).map(|r| r.name.as_str()), Some("a"));
    }

    #[test]
    fn table_has_a_row_per_result() {
        let results = vec![result("alpha", 1, 2, 10, 5, 0.0), result("beta", 3, 4, 10, 5, 0.0)];
        let table = summary_table(&results);
        assert_eq!(table.lines().count(), 4);
        assert!(table.lines().nth(2).is_some_and(|line| line.starts_with("alpha")));
        let report = ComparisonReport::from_results(&results);
        assert_eq!(report.best_score.as_deref(), Some("beta"));
    }
}
