//! Order-independent reduction of per-question results.
//!
//! `AggregateMetrics` forms a commutative monoid under `merge`, so partial
//! aggregates computed by independent workers combine without reprocessing
//! and evaluation order never affects reported totals.

use govbench_core::model::{QuestionResult, QuestionStatus, Usage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub count: u64,
    pub score_sum: f64,
    pub passed: u64,
    pub errored: u64,
}

impl GroupStats {
    fn record(&mut self, r: &QuestionResult) {
        self.count += 1;
        self.score_sum += r.score;
        if r.status == QuestionStatus::Pass {
            self.passed += 1;
        }
        if r.status == QuestionStatus::Error {
            self.errored += 1;
        }
    }

    fn merge(&mut self, other: &GroupStats) {
        self.count += other.count;
        self.score_sum += other.score_sum;
        self.passed += other.passed;
        self.errored += other.errored;
    }

    pub fn mean_score(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.score_sum / self.count as f64
        }
    }

    /// Share of questions that earned the full score.
    pub fn accuracy(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.passed as f64 / self.count as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub total: GroupStats,
    pub by_type: BTreeMap<String, GroupStats>,
    pub by_difficulty: BTreeMap<String, GroupStats>,
    pub by_category: BTreeMap<String, GroupStats>,
    pub usage: Usage,
}

impl AggregateMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, r: &QuestionResult) {
        self.total.record(r);
        self.by_type
            .entry(r.evaluation_type.as_str().to_string())
            .or_default()
            .record(r);
        self.by_difficulty
            .entry(r.difficulty.as_str().to_string())
            .or_default()
            .record(r);
        self.by_category
            .entry(r.category.clone())
            .or_default()
            .record(r);
        self.usage.merge(&r.usage);
    }

    pub fn merge(&mut self, other: &AggregateMetrics) {
        self.total.merge(&other.total);
        for (k, v) in &other.by_type {
            self.by_type.entry(k.clone()).or_default().merge(v);
        }
        for (k, v) in &other.by_difficulty {
            self.by_difficulty.entry(k.clone()).or_default().merge(v);
        }
        for (k, v) in &other.by_category {
            self.by_category.entry(k.clone()).or_default().merge(v);
        }
        self.usage.merge(&other.usage);
    }

    pub fn accuracy(&self) -> f64 {
        self.total.accuracy()
    }

    pub fn mean_score(&self) -> f64 {
        self.total.mean_score()
    }
}

pub fn aggregate(results: &[QuestionResult]) -> AggregateMetrics {
    let mut m = AggregateMetrics::new();
    for r in results {
        m.record(r);
    }
    m
}
