//! Deterministic affordance ranking.

use std::collections::HashMap;

use bic_contract::{Affordance, Landmark};

use crate::extract::Candidate;

pub const VISIBLE_BONUS: i32 = 50;
pub const ENABLED_BONUS: i32 = 10;
pub const DUPLICATE_CHROME_PENALTY: i32 = 150;

pub fn landmark_weight(landmark: Landmark) -> i32 {
    match landmark {
        Landmark::Modal => 500,
        Landmark::Banner => 450,
        Landmark::Main => 400,
        Landmark::Nav => 200,
        Landmark::Footer => 150,
        Landmark::Unknown => 0,
    }
}

/// The fields ranking looks at.
#[derive(Clone, Copy, Debug)]
pub struct RankKey<'a> {
    pub landmark: Landmark,
    pub visible: bool,
    pub disabled: bool,
    pub role: &'a str,
    pub name: &'a str,
    pub href: Option<&'a str>,
}

pub trait Rankable {
    fn rank_key(&self) -> RankKey<'_>;
}

impl Rankable for Candidate {
    fn rank_key(&self) -> RankKey<'_> {
        RankKey {
            landmark: self.landmark,
            visible: self.visible,
            disabled: self.disabled,
            role: &self.role,
            name: &self.name,
            href: self.href.as_deref(),
        }
    }
}

impl Rankable for Affordance {
    fn rank_key(&self) -> RankKey<'_> {
        RankKey {
            landmark: self.landmark,
            visible: self.visible,
            disabled: self.disabled,
            role: &self.role,
            name: &self.name,
            href: self.href.as_deref(),
        }
    }
}

/// Scores every item; index order matches the input.
pub fn scores<T: Rankable>(items: &[T]) -> Vec<i32> {
    let mut best_weight: HashMap<(&str, &str, Option<&str>), i32> = HashMap::new();
    for item in items {
        let key = item.rank_key();
        let weight = landmark_weight(key.landmark);
        best_weight
            .entry((key.role, key.name, key.href))
            .and_modify(|best| *best = (*best).max(weight))
            .or_insert(weight);
    }

    items
        .iter()
        .map(|item| {
            let key = item.rank_key();
            let weight = landmark_weight(key.landmark);
            let mut score = weight;
            if key.visible {
                score += VISIBLE_BONUS;
            }
            if !key.disabled {
                score += ENABLED_BONUS;
            }
            let chrome = matches!(key.landmark, Landmark::Nav | Landmark::Footer);
            if chrome && best_weight[&(key.role, key.name, key.href)] > weight {
                score -= DUPLICATE_CHROME_PENALTY;
            }
            score
        })
        .collect()
}

/// Sorts by descending score; ties keep their original order.
pub fn rank<T: Rankable>(items: Vec<T>) -> Vec<T> {
    let scores = scores(&items);
    let mut indexed: Vec<(i32, T)> = scores.into_iter().zip(items).collect();
    indexed.sort_by(|a, b| b.0.cmp(&a.0));
    indexed.into_iter().map(|(_, item)| item).collect()
}

pub fn rank_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    rank(candidates)
}

pub fn rank_affordances(affordances: Vec<Affordance>) -> Vec<Affordance> {
    rank(affordances)
}
