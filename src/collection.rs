use std::collections::{BTreeSet, HashMap};

use crate::association::{Association, GeneDiseaseAssociation};
use crate::domain::{Disease, Gene};

pub type GeneDiseaseCollection = AssociationCollection<GeneDiseaseAssociation>;

/// Owns the canonical instance of every association pair and indexes them by
/// both endpoints.
///
/// Buckets only exist for endpoints that currently have at least one pair, so
/// [`lefts`](Self::lefts) and [`rights`](Self::rights) enumerate exactly the
/// represented entities.
#[derive(Debug, Clone)]
pub struct AssociationCollection<P: Association> {
    pairs: HashMap<(P::Left, P::Right), P>,
    by_left: HashMap<P::Left, BTreeSet<P::Right>>,
    by_right: HashMap<P::Right, BTreeSet<P::Left>>,
}

impl<P: Association> Default for AssociationCollection<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Association> AssociationCollection<P> {
    pub fn new() -> Self {
        Self {
            pairs: HashMap::new(),
            by_left: HashMap::new(),
            by_right: HashMap::new(),
        }
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = P>) -> Self {
        let mut collection = Self::new();
        for pair in pairs {
            collection.insert(pair);
        }
        collection
    }

    /// Returns `false` and drops `pair` when an equal pair is already stored;
    /// the stored instance stays canonical.
    pub fn insert(&mut self, pair: P) -> bool {
        let key = (pair.left().clone(), pair.right().clone());
        if self.pairs.contains_key(&key) {
            return false;
        }
        self.by_left
            .entry(key.0.clone())
            .or_default()
            .insert(key.1.clone());
        self.by_right
            .entry(key.1.clone())
            .or_default()
            .insert(key.0.clone());
        self.pairs.insert(key, pair);
        true
    }

    /// Returns the canonical instance equal to `pair`, inserting `pair` first
    /// if no equal pair is stored yet.
    pub fn get_or_insert(&mut self, pair: P) -> &mut P {
        let key = (pair.left().clone(), pair.right().clone());
        if !self.pairs.contains_key(&key) {
            self.by_left
                .entry(key.0.clone())
                .or_default()
                .insert(key.1.clone());
            self.by_right
                .entry(key.1.clone())
                .or_default()
                .insert(key.0.clone());
        }
        self.pairs.entry(key).or_insert(pair)
    }

    pub fn get(&self, left: &P::Left, right: &P::Right) -> Option<&P> {
        self.pairs.get(&(left.clone(), right.clone()))
    }

    pub fn get_mut(&mut self, left: &P::Left, right: &P::Right) -> Option<&mut P> {
        self.pairs.get_mut(&(left.clone(), right.clone()))
    }

    /// Looks up the canonical instance equal to `pair`.
    pub fn lookup(&self, pair: &P) -> Option<&P> {
        self.get(pair.left(), pair.right())
    }

    pub fn contains(&self, pair: &P) -> bool {
        self.lookup(pair).is_some()
    }

    pub fn take(&mut self, left: &P::Left, right: &P::Right) -> Option<P> {
        let removed = self.pairs.remove(&(left.clone(), right.clone()))?;
        remove_from_bucket(&mut self.by_left, left, right);
        remove_from_bucket(&mut self.by_right, right, left);
        Some(removed)
    }

    pub fn remove(&mut self, pair: &P) -> bool {
        self.take(pair.left(), pair.right()).is_some()
    }

    /// Moves every pair of `other` into this collection, folding pairs that
    /// exist in both into the canonical instance.
    pub fn merge(&mut self, other: Self) {
        for (key, pair) in other.pairs {
            match self.pairs.get_mut(&key) {
                Some(existing) => existing.absorb(pair),
                None => {
                    self.insert(pair);
                }
            }
        }
    }

    /// Pairs containing `left`, ordered by their right endpoint.
    pub fn by_left<'a>(&'a self, left: &'a P::Left) -> impl Iterator<Item = &'a P> + 'a {
        self.by_left
            .get(left)
            .into_iter()
            .flatten()
            .filter_map(move |right| self.pairs.get(&(left.clone(), right.clone())))
    }

    /// Pairs containing `right`, ordered by their left endpoint.
    pub fn by_right<'a>(&'a self, right: &'a P::Right) -> impl Iterator<Item = &'a P> + 'a {
        self.by_right
            .get(right)
            .into_iter()
            .flatten()
            .filter_map(move |left| self.pairs.get(&(left.clone(), right.clone())))
    }

    pub fn lefts(&self) -> impl Iterator<Item = &P::Left> {
        self.by_left.keys()
    }

    pub fn rights(&self) -> impl Iterator<Item = &P::Right> {
        self.by_right.keys()
    }

    pub fn rights_ordered(&self) -> Vec<&P::Right> {
        let mut rights: Vec<&P::Right> = self.by_right.keys().collect();
        rights.sort();
        rights
    }

    pub fn iter(&self) -> impl Iterator<Item = &P> {
        self.pairs.values()
    }

    /// All pairs ordered by left endpoint, then right endpoint.
    pub fn all_ordered(&self) -> Vec<&P> {
        let mut pairs: Vec<&P> = self.pairs.values().collect();
        pairs.sort_by(|a, b| a.left().cmp(b.left()).then_with(|| a.right().cmp(b.right())));
        pairs
    }

    /// All pairs ordered by right endpoint, then left endpoint.
    pub fn all_ordered_by_right(&self) -> Vec<&P> {
        let mut pairs: Vec<&P> = self.pairs.values().collect();
        pairs.sort_by(|a, b| a.right().cmp(b.right()).then_with(|| a.left().cmp(b.left())));
        pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl AssociationCollection<GeneDiseaseAssociation> {
    pub fn genes(&self) -> impl Iterator<Item = &Gene> {
        self.lefts()
    }

    pub fn diseases(&self) -> impl Iterator<Item = &Disease> {
        self.rights()
    }
}

impl<P: Association> FromIterator<P> for AssociationCollection<P> {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

fn remove_from_bucket<K, V>(index: &mut HashMap<K, BTreeSet<V>>, key: &K, value: &V)
where
    K: Eq + std::hash::Hash,
    V: Ord,
{
    if let Some(bucket) = index.get_mut(key) {
        bucket.remove(value);
        if bucket.is_empty() {
            index.remove(key);
        }
    }
}
