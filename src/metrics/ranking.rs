//! Ranked-retrieval metrics over `(ranked ids, relevant ids)` pairs.
//!
//! Ranks are 1-based. Repeated ids in a ranking only count the first time
//! they appear. Every function returns 0.0 when there is nothing to score.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// A ranked result list with its relevance judgments
#[derive(Debug, Clone)]
pub struct RankedQuery<T> {
    pub retrieved: Vec<T>,
    pub relevant: HashSet<T>,
}

impl<T: Eq + Hash> RankedQuery<T> {
    pub fn new(retrieved: Vec<T>, relevant: HashSet<T>) -> Self {
        Self { retrieved, relevant }
    }
}

/// 1-based ranks of relevant ids within the top `k`
fn hit_ranks<T: Eq + Hash>(retrieved: &[T], relevant: &HashSet<T>, k: usize) -> Vec<usize> {
    let mut seen = HashSet::new();
    retrieved
        .iter()
        .take(k)
        .enumerate()
        .filter(|(_, id)| relevant.contains(*id) && seen.insert(*id))
        .map(|(i, _)| i + 1)
        .collect()
}

fn discount(rank: usize) -> f64 {
    (rank as f64 + 1.0).log2()
}

/// Fraction of the top `k` slots holding relevant ids
pub fn precision_at_k<T: Eq + Hash>(retrieved: &[T], relevant: &HashSet<T>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    hit_ranks(retrieved, relevant, k).len() as f64 / k as f64
}

/// Fraction of relevant ids found in the top `k`
pub fn recall_at_k<T: Eq + Hash>(retrieved: &[T], relevant: &HashSet<T>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    hit_ranks(retrieved, relevant, k).len() as f64 / relevant.len() as f64
}

/// NDCG@k with graded relevance: gain `rel / log2(rank + 1)`, normalized by
/// the DCG of the ideal ordering of all judged ids.
pub fn ndcg_at_k<T: Eq + Hash>(retrieved: &[T], relevance: &HashMap<T, f64>, k: usize) -> f64 {
    let mut seen = HashSet::new();
    let dcg: f64 = retrieved
        .iter()
        .take(k)
        .enumerate()
        .filter(|(_, id)| seen.insert(*id))
        .map(|(i, id)| relevance.get(id).copied().unwrap_or(0.0) / discount(i + 1))
        .sum();

    let mut ideal: Vec<f64> = relevance.values().copied().filter(|r| *r > 0.0).collect();
    ideal.sort_by(|a, b| b.total_cmp(a));
    let idcg: f64 = ideal
        .iter()
        .take(k)
        .enumerate()
        .map(|(i, rel)| rel / discount(i + 1))
        .sum();

    if idcg == 0.0 {
        0.0
    } else {
        dcg / idcg
    }
}

/// NDCG@k where every relevant id has gain 1
pub fn ndcg_at_k_binary<T: Eq + Hash>(retrieved: &[T], relevant: &HashSet<T>, k: usize) -> f64 {
    let dcg: f64 = hit_ranks(retrieved, relevant, k).into_iter().map(|r| 1.0 / discount(r)).sum();
    let idcg: f64 = (1..=relevant.len().min(k)).map(|r| 1.0 / discount(r)).sum();
    if idcg == 0.0 {
        0.0
    } else {
        dcg / idcg
    }
}

/// 1 / rank of the first relevant id
pub fn reciprocal_rank<T: Eq + Hash>(retrieved: &[T], relevant: &HashSet<T>) -> f64 {
    retrieved
        .iter()
        .position(|id| relevant.contains(id))
        .map(|i| 1.0 / (i + 1) as f64)
        .unwrap_or(0.0)
}

/// Mean of precision at each relevant rank, over all relevant ids
pub fn average_precision<T: Eq + Hash>(retrieved: &[T], relevant: &HashSet<T>) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let sum: f64 = hit_ranks(retrieved, relevant, retrieved.len())
        .into_iter()
        .enumerate()
        .map(|(hits_before, rank)| (hits_before + 1) as f64 / rank as f64)
        .sum();
    sum / relevant.len() as f64
}

fn mean_over<T, F>(queries: &[RankedQuery<T>], f: F) -> f64
where
    F: Fn(&RankedQuery<T>) -> f64,
{
    if queries.is_empty() {
        return 0.0;
    }
    queries.iter().map(f).sum::<f64>() / queries.len() as f64
}

pub fn mean_reciprocal_rank<T: Eq + Hash>(queries: &[RankedQuery<T>]) -> f64 {
    mean_over(queries, |q| reciprocal_rank(&q.retrieved, &q.relevant))
}

pub fn mean_average_precision<T: Eq + Hash>(queries: &[RankedQuery<T>]) -> f64 {
    mean_over(queries, |q| average_precision(&q.retrieved, &q.relevant))
}
