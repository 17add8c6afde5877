/**
 * A compact set of floors in the closed range `[minFloor, maxFloor]`.
 *
 * Backed by a plain `Vec<bool>` indexed relative to `minFloor`, the way the
 * rest of this codebase already represents per-floor state (compare the
 * teacher's `hall_requests: Vec<Vec<bool>>`). `FloorSet` just gives that
 * representation the range-aware predicates the control engine needs
 * (`any_lower`, `any_higher`, `any_other`, `has_additional`) instead of
 * re-deriving them at every call site.
 */

/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::{Deserialize, Serialize};
use std::ops::{BitOr, BitOrAssign};

/***************************************/
/*             Public API              */
/***************************************/

/// The inclusive floor range a cab services. Implemented both by a
/// freestanding bounds value and by `Driver`, so `FloorSet` methods can be
/// called with either a driver handle or a lightweight bounds literal.
pub trait FloorBounds {
    fn min_floor(&self) -> i32;
    fn max_floor(&self) -> i32;
}

/// A simple owned bounds value, mostly useful in tests and for
/// constructing a `FloorSet` when no `Driver` is at hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_floor: i32,
    pub max_floor: i32,
}

impl FloorBounds for Bounds {
    fn min_floor(&self) -> i32 {
        self.min_floor
    }
    fn max_floor(&self) -> i32 {
        self.max_floor
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct FloorSet {
    min_floor: i32,
    bits: Vec<bool>,
}

impl FloorSet {
    pub fn new(bounds: &dyn FloorBounds) -> FloorSet {
        let min_floor = bounds.min_floor();
        let max_floor = bounds.max_floor();
        assert!(min_floor <= max_floor, "invalid floor bounds");
        FloorSet {
            min_floor,
            bits: vec![false; (max_floor - min_floor + 1) as usize],
        }
    }

    fn index(&self, floor: i32) -> usize {
        debug_assert!(
            floor >= self.min_floor && (floor - self.min_floor) < self.bits.len() as i32,
            "floor {} out of bounds for set starting at {}",
            floor,
            self.min_floor
        );
        (floor - self.min_floor) as usize
    }

    /// Sets or clears `floor`. Returns whether the bit actually changed,
    /// callers use this to detect edges (a just-served hall call, a
    /// redundant inside-button press) without a separate read-then-write.
    pub fn set(&mut self, value: bool, floor: i32, bounds: &dyn FloorBounds) -> bool {
        debug_assert_eq!(self.min_floor, bounds.min_floor(), "bounds mismatch");
        let idx = self.index(floor);
        let changed = self.bits[idx] != value;
        self.bits[idx] = value;
        changed
    }

    pub fn get(&self, floor: i32, bounds: &dyn FloorBounds) -> bool {
        debug_assert_eq!(self.min_floor, bounds.min_floor(), "bounds mismatch");
        self.bits[self.index(floor)]
    }

    pub fn reset(&mut self) {
        self.bits.iter_mut().for_each(|b| *b = false);
    }

    pub fn has_any(&self) -> bool {
        self.bits.iter().any(|&b| b)
    }

    pub fn any_lower(&self, floor: i32, bounds: &dyn FloorBounds) -> bool {
        debug_assert_eq!(self.min_floor, bounds.min_floor(), "bounds mismatch");
        let idx = self.index(floor);
        self.bits[..idx].iter().any(|&b| b)
    }

    pub fn any_higher(&self, floor: i32, bounds: &dyn FloorBounds) -> bool {
        debug_assert_eq!(self.min_floor, bounds.min_floor(), "bounds mismatch");
        let idx = self.index(floor) + 1;
        self.bits[idx.min(self.bits.len())..].iter().any(|&b| b)
    }

    /// True if the set contains any floor distinct from `floor`.
    pub fn any_other(&self, floor: i32, bounds: &dyn FloorBounds) -> bool {
        debug_assert_eq!(self.min_floor, bounds.min_floor(), "bounds mismatch");
        let idx = self.index(floor);
        self.bits.iter().enumerate().any(|(i, &b)| b && i != idx)
    }

    /// True iff `current \ previous` is non-empty, edge detection for an
    /// inside-button re-press while the door is open.
    pub fn has_additional(previous: &FloorSet, current: &FloorSet) -> bool {
        debug_assert_eq!(previous.min_floor, current.min_floor, "bounds mismatch");
        previous
            .bits
            .iter()
            .zip(current.bits.iter())
            .any(|(&was, &is)| is && !was)
    }

    pub fn consistent(&self, bounds: &dyn FloorBounds) -> bool {
        self.min_floor == bounds.min_floor()
            && self.bits.len() as i32 == bounds.max_floor() - bounds.min_floor() + 1
    }
}

impl BitOr for FloorSet {
    type Output = FloorSet;

    fn bitor(mut self, rhs: FloorSet) -> FloorSet {
        self |= rhs;
        self
    }
}

impl BitOrAssign for FloorSet {
    fn bitor_assign(&mut self, rhs: FloorSet) {
        debug_assert_eq!(self.min_floor, rhs.min_floor, "bounds mismatch");
        for (a, b) in self.bits.iter_mut().zip(rhs.bits.iter()) {
            *a |= *b;
        }
    }
}

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Bounds {
        Bounds {
            min_floor: 0,
            max_floor: 3,
        }
    }

    #[test]
    fn set_reports_whether_it_changed() {
        // Arrange
        let b = bounds();
        let mut set = FloorSet::new(&b);

        // Act / Assert
        assert!(set.set(true, 2, &b), "first set should report a change");
        assert!(!set.set(true, 2, &b), "redundant set should report no change");
        assert!(set.set(false, 2, &b), "clearing should report a change");
        assert!(!set.get(2, &b));
    }

    #[test]
    fn any_other_is_false_for_singleton_true_once_second_member_added() {
        // Arrange
        let b = bounds();
        let mut set = FloorSet::new(&b);
        set.set(true, 1, &b);

        // Assert
        assert!(!set.any_other(1, &b));

        // Act
        set.set(true, 2, &b);

        // Assert
        assert!(set.any_other(1, &b));
    }

    #[test]
    fn any_lower_and_any_higher() {
        let b = bounds();
        let mut set = FloorSet::new(&b);
        set.set(true, 0, &b);
        set.set(true, 3, &b);

        assert!(!set.any_lower(0, &b));
        assert!(set.any_lower(1, &b));
        assert!(set.any_higher(2, &b));
        assert!(!set.any_higher(3, &b));
    }

    #[test]
    fn has_additional_detects_new_members_only() {
        let b = bounds();
        let mut previous = FloorSet::new(&b);
        let mut current = FloorSet::new(&b);
        previous.set(true, 1, &b);
        current.set(true, 1, &b);

        assert!(!FloorSet::has_additional(&previous, &current));

        current.set(true, 2, &b);
        assert!(FloorSet::has_additional(&previous, &current));

        // Removing a floor is not an "addition".
        let mut removed = current.clone();
        removed.set(false, 1, &b);
        assert!(!FloorSet::has_additional(&current, &removed));
    }

    #[test]
    fn union_combines_members() {
        let b = bounds();
        let mut a = FloorSet::new(&b);
        let mut c = FloorSet::new(&b);
        a.set(true, 0, &b);
        c.set(true, 3, &b);

        let u = a | c;
        assert!(u.get(0, &b));
        assert!(u.get(3, &b));
        assert!(!u.get(1, &b));
    }

    #[test]
    fn reset_empties_the_set() {
        let b = bounds();
        let mut set = FloorSet::new(&b);
        set.set(true, 0, &b);
        set.set(true, 3, &b);
        assert!(set.has_any());

        set.reset();
        assert!(!set.has_any());
    }

    #[test]
    fn consistent_checks_bounds_match() {
        let b = bounds();
        let set = FloorSet::new(&b);
        assert!(set.consistent(&b));

        let other = Bounds {
            min_floor: 0,
            max_floor: 4,
        };
        assert!(!set.consistent(&other));
    }
}
