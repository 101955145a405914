use std::cmp::Ordering;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::association::{Association, Scored};
use crate::collection::AssociationCollection;

/// Ranking policy applied to the left entities of a collection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Prioritizer {
    /// Highest association score first; unscored entities last.
    #[default]
    HighestScore,
}

impl fmt::Display for Prioritizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prioritizer::HighestScore => write!(f, "highest-score"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntity<T> {
    pub entity: T,
    /// The priority key; `None` ranks below every score.
    pub score: Option<f64>,
}

impl Prioritizer {
    pub fn rank<P>(&self, collection: &AssociationCollection<P>) -> Vec<P::Left>
    where
        P: Association + Scored,
    {
        self.rank_with_scores(collection)
            .into_iter()
            .map(|ranked| ranked.entity)
            .collect()
    }

    /// Every left entity with its priority key, best first. Equal keys fall
    /// back to the entity order, so the result never depends on insertion order.
    pub fn rank_with_scores<P>(
        &self,
        collection: &AssociationCollection<P>,
    ) -> Vec<RankedEntity<P::Left>>
    where
        P: Association + Scored,
    {
        let mut ranked: Vec<RankedEntity<P::Left>> = match self {
            Prioritizer::HighestScore => collection
                .lefts()
                .map(|left| RankedEntity {
                    entity: left.clone(),
                    score: highest_score(collection.by_left(left)),
                })
                .collect(),
        };
        ranked.sort_by(|a, b| {
            compare_keys(b.score, a.score).then_with(|| a.entity.cmp(&b.entity))
        });
        ranked
    }
}

fn highest_score<'a, P: Scored + 'a>(pairs: impl Iterator<Item = &'a P>) -> Option<f64> {
    pairs.filter_map(Scored::score).max_by(f64::total_cmp)
}

fn compare_keys(left: Option<f64>, right: Option<f64>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => left.total_cmp(&right),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
