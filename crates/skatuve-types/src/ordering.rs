//! Manual ordering of list entries.
//!
//! The display order of a collection is a property of the whole collection:
//! moving one entry rewrites the `order` of every entry to its new position.

use std::{cmp::Ordering, collections::HashSet, str::FromStr};

use time::OffsetDateTime;

pub trait Ordered {
    fn key(&self) -> &str;
    fn order(&self) -> i64;
    fn created_at(&self) -> Option<OffsetDateTime>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl FromStr for Direction {
    type Err = OrderingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(OrderingError::InvalidOperation(format!(
                "Unknown direction {s}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderingError {
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Item not found: {0}")]
    NotFound(String),
}

/// Sorts by `order` ascending, equal orders by creation time (unknown last).
pub fn sort_items<T: Ordered>(items: &mut [T]) {
    items.sort_by(|a, b| {
        a.order()
            .cmp(&b.order())
            .then_with(|| match (a.created_at(), b.created_at()) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    });
}

pub fn position_of<T: Ordered>(items: &[T], key: &str) -> Result<usize, OrderingError> {
    items
        .iter()
        .position(|i| i.key() == key)
        .ok_or_else(|| OrderingError::NotFound(key.to_string()))
}

/// Index an item at `index` would land on, moving one step in `direction`.
pub fn move_target(len: usize, index: usize, direction: Direction) -> Result<usize, OrderingError> {
    if index >= len {
        return Err(OrderingError::InvalidOperation(format!(
            "Index {index} out of range for {len} items"
        )));
    }
    match direction {
        Direction::Up if index == 0 => Err(OrderingError::InvalidOperation(
            "First item cannot be moved up".to_string(),
        )),
        Direction::Down if index + 1 == len => Err(OrderingError::InvalidOperation(
            "Last item cannot be moved down".to_string(),
        )),
        Direction::Up => Ok(index - 1),
        Direction::Down => Ok(index + 1),
    }
}

/// Keys of `items` after moving the item identified by `key` one step.
///
/// `items` are expected in display order. Nothing is modified on error.
pub fn moved_sequence<T: Ordered>(
    items: &[T],
    key: &str,
    direction: Direction,
) -> Result<Vec<String>, OrderingError> {
    let index = position_of(items, key)?;
    let target = move_target(items.len(), index, direction)?;
    let mut keys: Vec<String> = items.iter().map(|i| i.key().to_string()).collect();
    let moved = keys.remove(index);
    keys.insert(target, moved);
    Ok(keys)
}

/// New `order` value for every item, given the desired key sequence.
///
/// `sequence` must be a permutation of the keys of `items`; every item gets
/// its 0-based position, whether or not it actually changed place.
pub fn reorder_assignments<T: Ordered>(
    items: &[T],
    sequence: &[String],
) -> Result<Vec<(String, i64)>, OrderingError> {
    if sequence.len() != items.len() {
        return Err(OrderingError::InvalidOperation(format!(
            "Expected {} ids, got {}",
            items.len(),
            sequence.len()
        )));
    }
    let known: HashSet<&str> = items.iter().map(|i| i.key()).collect();
    let mut seen = HashSet::with_capacity(sequence.len());
    for key in sequence {
        if !known.contains(key.as_str()) {
            return Err(OrderingError::NotFound(key.clone()));
        }
        if !seen.insert(key.as_str()) {
            return Err(OrderingError::InvalidOperation(format!(
                "Duplicate id {key} in new order"
            )));
        }
    }
    Ok(sequence
        .iter()
        .enumerate()
        .map(|(position, key)| (key.clone(), position as i64))
        .collect())
}

/// Order value for a newly appended item.
pub fn next_order<T>(items: &[T]) -> i64 {
    items.len() as i64
}
