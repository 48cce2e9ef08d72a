//! Shared numeric utilities for the imputers.
//!
//! Grouping keys for exact float equality and the majority vote used to
//! reconcile duplicate patients.

use std::collections::HashMap;

// =============================================================================
// Grouping Utilities
// =============================================================================

/// Hashable key for grouping on exact float equality.
///
/// `-0.0` and `0.0` map to the same key so that grouping agrees with `==`.
#[inline]
pub fn float_key(value: f64) -> u64 {
    if value == 0.0 {
        0.0_f64.to_bits()
    } else {
        value.to_bits()
    }
}

// =============================================================================
// Mode With Tie Detection
// =============================================================================

/// Outcome of a majority vote over a group of cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Majority {
    /// One known value is strictly more frequent than every other.
    Unique(f64),
    /// Two or more known values share the highest frequency.
    Ambiguous,
    /// The group holds a single cell; there is nothing to reconcile.
    Singleton,
    /// Several cells but none of them known.
    Empty,
}

impl Majority {
    /// The value to write into the group, if any.
    pub fn value(&self) -> Option<f64> {
        match self {
            Majority::Unique(value) => Some(*value),
            _ => None,
        }
    }
}

/// Count the known values of a group and report its unique mode.
///
/// The group size (nulls included) decides [`Majority::Singleton`] before
/// any counting happens.
pub fn numeric_mode(cells: &[Option<f64>]) -> Majority {
    if cells.len() == 1 {
        return Majority::Singleton;
    }

    // key -> (value, count)
    let mut counts: HashMap<u64, (f64, usize)> = HashMap::new();
    for value in cells.iter().flatten() {
        counts.entry(float_key(*value)).or_insert((*value, 0)).1 += 1;
    }

    let Some(best) = counts.values().map(|(_, count)| *count).max() else {
        return Majority::Empty;
    };

    let mut leaders = counts.values().filter(|(_, count)| *count == best);
    match (leaders.next(), leaders.next()) {
        (Some((value, _)), None) => Majority::Unique(*value),
        _ => Majority::Ambiguous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_key_signed_zero() {
        assert_eq!(float_key(0.0), float_key(-0.0));
        assert_ne!(float_key(1.0), float_key(2.0));
    }

    #[test]
    fn test_numeric_mode_unique() {
        let cells = [Some(0.0), Some(0.0), Some(42.0)];
        assert_eq!(numeric_mode(&cells), Majority::Unique(0.0));
    }

    #[test]
    fn test_numeric_mode_ignores_nulls() {
        let cells = [None, Some(7.5), None];
        assert_eq!(numeric_mode(&cells), Majority::Unique(7.5));
    }

    #[test]
    fn test_numeric_mode_tie() {
        let cells = [Some(1.0), Some(2.0)];
        assert_eq!(numeric_mode(&cells), Majority::Ambiguous);
        assert_eq!(numeric_mode(&cells).value(), None);
    }

    #[test]
    fn test_numeric_mode_singleton_and_empty() {
        assert_eq!(numeric_mode(&[Some(3.0)]), Majority::Singleton);
        assert_eq!(numeric_mode(&[None]), Majority::Singleton);
        assert_eq!(numeric_mode(&[None, None]), Majority::Empty);
    }
}
