//! One-dimensional constrained length distribution.
//!
//! A [`Flex`] owns an ordered list of items, each with a minimum and maximum
//! length, and a container length they should fill. Space is always moved in
//! proportion to the items' *current* lengths: growth and shrinkage are
//! spread over the items that still have room, items that hit a bound are
//! frozen there, and the remainder is redistributed among the rest.
//!
//! Every mutating operation works on a scratch copy of the lengths and only
//! commits when the whole operation succeeded, so a failed call leaves the
//! solver exactly as it was.

use thiserror::Error;

use super::graph::ResizeDirection;

const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FlexError {
    /// The minimum lengths of the items cannot fit in the container.
    #[error("flex constraints cannot be satisfied")]
    Unsatisfiable,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlexItem {
    pub min: f64,
    pub max: f64,
    pub length: f64,
}

impl FlexItem {
    fn has_room(&self, length: f64, growing: bool) -> bool {
        if growing { length < self.max - EPSILON } else { length > self.min + EPSILON }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Flex {
    items: Vec<FlexItem>,
    container: f64,
}

impl Flex {
    pub fn new(container_length: f64) -> Self {
        Self {
            items: Vec::new(),
            container: container_length.max(0.0),
        }
    }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn items(&self) -> &[FlexItem] { &self.items }

    pub fn item(&self, index: usize) -> Option<&FlexItem> { self.items.get(index) }

    pub fn lengths(&self) -> impl Iterator<Item = f64> + '_ { self.items.iter().map(|i| i.length) }

    pub fn container_length(&self) -> f64 { self.container }

    pub fn used_length(&self) -> f64 { self.lengths().sum() }

    pub fn min_length(&self) -> f64 { self.items.iter().map(|i| i.min).sum() }

    pub fn max_length(&self) -> f64 { self.items.iter().map(|i| i.max).sum() }

    pub fn set_container_length(&mut self, length: f64) -> Result<(), FlexError> {
        let length = length.max(0.0);
        if length + EPSILON < self.min_length() {
            return Err(FlexError::Unsatisfiable);
        }
        let mut lengths = self.snapshot();
        fit(&self.items, &mut lengths, length);
        self.container = length;
        self.commit(lengths);
        Ok(())
    }

    /// Inserts a new item at `index` (clamped to the end).
    ///
    /// The item asks for an even share of the container, bounded by its own
    /// constraints. Unused container space is handed out first; the rest is
    /// taken from the existing items in proportion to their lengths.
    pub fn insert(&mut self, index: usize, min: f64, max: f64) -> Result<(), FlexError> {
        let index = index.min(self.items.len());
        let (min, max) = normalize_bounds(min, max);
        let desired = (self.container / (self.items.len() + 1) as f64).clamp(min, max);

        let mut lengths = self.snapshot();
        let free = (self.container - self.used_length()).max(0.0);
        let from_free = desired.min(free);
        let all: Vec<usize> = (0..self.items.len()).collect();
        let taken = -distribute(&self.items, &mut lengths, &all, -(desired - from_free));
        let length = from_free + taken;
        if length + EPSILON < min {
            return Err(FlexError::Unsatisfiable);
        }

        self.commit(lengths);
        self.items.insert(index, FlexItem { min, max, length: length.clamp(min, max) });

        let mut lengths = self.snapshot();
        fit(&self.items, &mut lengths, self.container);
        self.commit(lengths);
        Ok(())
    }

    /// Removes the item at `index`, handing its length back to the remaining
    /// items in proportion to their current lengths.
    pub fn remove(&mut self, index: usize) -> FlexItem {
        let removed = self.items.remove(index);
        let mut lengths = self.snapshot();
        fit(&self.items, &mut lengths, self.container);
        self.commit(lengths);
        removed
    }

    pub fn update_constraints(&mut self, index: usize, min: f64, max: f64) -> Result<(), FlexError> {
        let (min, max) = normalize_bounds(min, max);
        let item = self.items[index];
        if item.min == min && item.max == max {
            return Ok(());
        }
        let mut items = self.items.clone();
        let mut lengths = self.snapshot();
        apply_constraints(&mut items, &mut lengths, self.container, index, min, max)?;
        self.items = items;
        self.commit(lengths);
        Ok(())
    }

    /// Applies new bounds to every item at once. Either all of them are
    /// applied or none.
    pub fn update_all_constraints(&mut self, bounds: &[(f64, f64)]) -> Result<(), FlexError> {
        debug_assert_eq!(bounds.len(), self.items.len());
        let mut items = self.items.clone();
        let mut lengths = self.snapshot();
        for (index, &(min, max)) in bounds.iter().enumerate() {
            let (min, max) = normalize_bounds(min, max);
            if items[index].min == min && items[index].max == max {
                continue;
            }
            apply_constraints(&mut items, &mut lengths, self.container, index, min, max)?;
        }
        self.items = items;
        self.commit(lengths);
        Ok(())
    }

    /// Resizes one item towards `length`, exchanging space with its
    /// neighbours on the side(s) given by `direction`. Neighbours closest to
    /// the moving edge give or take space first.
    ///
    /// Returns the resulting length of the item, which may fall short of the
    /// request when the item's bounds or its neighbours' bounds get in the
    /// way.
    pub fn resize_item(&mut self, index: usize, length: f64, direction: ResizeDirection) -> f64 {
        let item = self.items[index];
        let delta = length.clamp(item.min, item.max) - item.length;
        if delta.abs() < EPSILON {
            return item.length;
        }

        let mut lengths = self.snapshot();
        let before: Vec<usize> = (0..index).rev().collect();
        let after: Vec<usize> = (index + 1..self.items.len()).collect();
        let absorbed = match direction {
            ResizeDirection::TowardsStart => absorb(&self.items, &mut lengths, &before, delta),
            ResizeDirection::TowardsEnd => absorb(&self.items, &mut lengths, &after, delta),
            ResizeDirection::Both => {
                let first = absorb(&self.items, &mut lengths, &before, delta / 2.0);
                let second = absorb(&self.items, &mut lengths, &after, delta - first);
                first + second
            }
        };
        lengths[index] += absorbed;
        self.commit(lengths);
        self.items[index].length
    }

    pub fn move_item(&mut self, from: usize, to: usize) {
        let item = self.items.remove(from);
        let to = to.min(self.items.len());
        self.items.insert(to, item);
    }

    fn snapshot(&self) -> Vec<f64> { self.items.iter().map(|i| i.length).collect() }

    fn commit(&mut self, lengths: Vec<f64>) {
        for (item, length) in self.items.iter_mut().zip(lengths) {
            item.length = length.clamp(item.min, item.max).max(0.0);
        }
    }
}

fn normalize_bounds(min: f64, max: f64) -> (f64, f64) {
    let min = min.max(0.0);
    (min, max.max(min))
}

fn apply_constraints(
    items: &mut [FlexItem],
    lengths: &mut [f64],
    container: f64,
    index: usize,
    min: f64,
    max: f64,
) -> Result<(), FlexError> {
    items[index].min = min;
    items[index].max = max;
    let current = lengths[index];
    let clamped = current.clamp(min, max);
    let delta = clamped - current;
    lengths[index] = clamped;

    let others: Vec<usize> = (0..items.len()).filter(|&i| i != index).collect();
    if delta > EPSILON {
        let used: f64 = lengths.iter().sum::<f64>() - delta;
        let free = (container - used).max(0.0);
        let needed = delta - delta.min(free);
        let taken = -distribute(items, lengths, &others, -needed);
        if taken + EPSILON < needed {
            return Err(FlexError::Unsatisfiable);
        }
    } else if delta < -EPSILON {
        distribute(items, lengths, &others, -delta);
    }

    fit(items, lengths, container);
    Ok(())
}

/// Grows or shrinks `lengths` so they fill `container`, or as much of it as
/// the items' maximums allow.
fn fit(items: &[FlexItem], lengths: &mut [f64], container: f64) {
    let max_total: f64 = items.iter().map(|i| i.max).sum();
    let target = container.min(max_total);
    let delta = target - lengths.iter().sum::<f64>();
    if delta.abs() > EPSILON {
        let all: Vec<usize> = (0..items.len()).collect();
        distribute(items, lengths, &all, delta);
    }
}

/// Spreads `delta` over `candidates` in proportion to their current lengths,
/// freezing items at their bounds. Returns the amount actually applied.
fn distribute(items: &[FlexItem], lengths: &mut [f64], candidates: &[usize], delta: f64) -> f64 {
    let growing = delta > 0.0;
    let mut remaining = delta;
    let mut active: Vec<usize> =
        candidates.iter().copied().filter(|&i| items[i].has_room(lengths[i], growing)).collect();

    while remaining.abs() > EPSILON && !active.is_empty() {
        let weight: f64 = active.iter().map(|&i| lengths[i]).sum();
        let shares: Vec<f64> = active
            .iter()
            .map(|&i| {
                if weight > EPSILON {
                    remaining * lengths[i] / weight
                } else {
                    remaining / active.len() as f64
                }
            })
            .collect();

        let mut still_active = Vec::with_capacity(active.len());
        let mut froze_any = false;
        for (&i, &share) in active.iter().zip(&shares) {
            let proposed = lengths[i] + share;
            let bound = if growing { items[i].max } else { items[i].min };
            let crosses = if growing { proposed >= bound - EPSILON } else { proposed <= bound + EPSILON };
            if crosses {
                remaining -= bound - lengths[i];
                lengths[i] = bound;
                froze_any = true;
            } else {
                still_active.push(i);
            }
        }

        if !froze_any {
            for (&i, &share) in active.iter().zip(&shares) {
                lengths[i] += share;
            }
            remaining = 0.0;
            break;
        }
        active = still_active;
    }

    delta - remaining
}

/// Exchanges `delta` with the items in `side`, nearest first. A positive
/// delta means the resized item grows, so neighbours shrink.
fn absorb(items: &[FlexItem], lengths: &mut [f64], side: &[usize], delta: f64) -> f64 {
    let mut remaining = delta.abs();
    for &i in side {
        if remaining < EPSILON {
            break;
        }
        let room = if delta > 0.0 {
            lengths[i] - items[i].min
        } else {
            items[i].max - lengths[i]
        };
        let step = room.max(0.0).min(remaining);
        lengths[i] += if delta > 0.0 { -step } else { step };
        remaining -= step;
    }
    (delta.abs() - remaining).copysign(delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNBOUNDED: f64 = f64::INFINITY;

    #[track_caller]
    fn assert_lengths(flex: &Flex, expected: &[f64]) {
        let actual: Vec<f64> = flex.lengths().collect();
        assert_eq!(actual.len(), expected.len(), "lengths {actual:?} vs {expected:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-3, "lengths {actual:?} vs {expected:?}");
        }
    }

    #[track_caller]
    fn assert_feasible(flex: &Flex) {
        for item in flex.items() {
            assert!(item.length >= item.min - 1e-3, "{item:?} below min");
            assert!(item.length <= item.max + 1e-3, "{item:?} above max");
            assert!(item.length >= 0.0);
        }
        let expected = flex.container_length().min(flex.max_length());
        assert!(
            (flex.used_length() - expected).abs() < 1e-3,
            "used {} expected {} in {flex:?}",
            flex.used_length(),
            expected
        );
    }

    #[test]
    fn single_item_fills_container() {
        let mut flex = Flex::new(100.0);
        flex.insert(0, 0.0, 100.0).unwrap();
        assert_lengths(&flex, &[100.0]);
    }

    #[test]
    fn items_inserted_before_sizing_share_equally() {
        let mut flex = Flex::default();
        flex.insert(0, 0.0, 100.0).unwrap();
        flex.insert(1, 0.0, 100.0).unwrap();
        flex.set_container_length(100.0).unwrap();
        assert_lengths(&flex, &[50.0, 50.0]);
    }

    #[test]
    fn minimums_take_space_from_small_items() {
        let mut flex = Flex::new(100.0);
        flex.insert(0, 0.0, 20.0).unwrap();
        flex.insert(1, 0.0, 20.0).unwrap();
        flex.insert(0, 90.0, 10000.0).unwrap();
        assert_lengths(&flex, &[90.0, 5.0, 5.0]);

        flex.update_constraints(1, 8.0, 20.0).unwrap();
        assert_lengths(&flex, &[90.0, 8.0, 2.0]);
        assert_feasible(&flex);
    }

    #[test]
    fn third_half_screen_item_is_unsatisfiable() {
        let mut flex = Flex::new(1920.0);
        flex.insert(0, 960.0, UNBOUNDED).unwrap();
        flex.insert(1, 960.0, UNBOUNDED).unwrap();
        let before = flex.clone();

        assert_eq!(flex.insert(2, 960.0, UNBOUNDED), Err(FlexError::Unsatisfiable));
        assert_eq!(flex, before);
    }

    #[test]
    fn shrinking_below_minimums_is_atomic() {
        let mut flex = Flex::new(300.0);
        flex.insert(0, 100.0, UNBOUNDED).unwrap();
        flex.insert(1, 100.0, UNBOUNDED).unwrap();
        let before = flex.clone();

        assert_eq!(flex.set_container_length(150.0), Err(FlexError::Unsatisfiable));
        assert_eq!(flex, before);

        flex.set_container_length(200.0).unwrap();
        assert_lengths(&flex, &[100.0, 100.0]);
    }

    #[test]
    fn raising_a_minimum_past_the_slack_is_atomic() {
        let mut flex = Flex::new(100.0);
        flex.insert(0, 40.0, UNBOUNDED).unwrap();
        flex.insert(1, 0.0, UNBOUNDED).unwrap();
        let before = flex.clone();

        assert_eq!(flex.update_constraints(1, 70.0, UNBOUNDED), Err(FlexError::Unsatisfiable));
        assert_eq!(flex, before);
    }

    #[test]
    fn batch_update_is_all_or_nothing() {
        let mut flex = Flex::new(100.0);
        flex.insert(0, 0.0, UNBOUNDED).unwrap();
        flex.insert(1, 0.0, UNBOUNDED).unwrap();
        let before = flex.clone();

        let result = flex.update_all_constraints(&[(30.0, UNBOUNDED), (80.0, UNBOUNDED)]);
        assert_eq!(result, Err(FlexError::Unsatisfiable));
        assert_eq!(flex, before);

        flex.update_all_constraints(&[(30.0, UNBOUNDED), (60.0, UNBOUNDED)]).unwrap();
        assert_lengths(&flex, &[40.0, 60.0]);
    }

    #[test]
    fn underfull_container_leaves_space_unused() {
        let mut flex = Flex::new(100.0);
        flex.insert(0, 0.0, 20.0).unwrap();
        flex.insert(1, 0.0, 30.0).unwrap();
        assert_lengths(&flex, &[20.0, 30.0]);
        assert_feasible(&flex);

        flex.update_constraints(0, 0.0, UNBOUNDED).unwrap();
        assert_lengths(&flex, &[70.0, 30.0]);
    }

    #[test]
    fn lowering_a_maximum_gives_space_to_the_others() {
        let mut flex = Flex::new(100.0);
        flex.insert(0, 0.0, UNBOUNDED).unwrap();
        flex.insert(1, 0.0, UNBOUNDED).unwrap();
        flex.update_constraints(0, 0.0, 10.0).unwrap();
        assert_lengths(&flex, &[10.0, 90.0]);
    }

    #[test]
    fn update_constraints_is_idempotent() {
        let mut flex = Flex::new(100.0);
        flex.insert(0, 0.0, UNBOUNDED).unwrap();
        flex.insert(1, 0.0, UNBOUNDED).unwrap();
        flex.insert(2, 0.0, UNBOUNDED).unwrap();

        flex.update_constraints(2, 50.0, 60.0).unwrap();
        let once = flex.clone();
        flex.update_constraints(2, 50.0, 60.0).unwrap();
        assert_eq!(flex, once);
    }

    #[test]
    fn remove_returns_space_proportionally() {
        let mut flex = Flex::new(100.0);
        flex.insert(0, 0.0, UNBOUNDED).unwrap();
        flex.insert(1, 0.0, UNBOUNDED).unwrap();
        flex.resize_item(0, 75.0, ResizeDirection::TowardsEnd);
        flex.insert(2, 0.0, UNBOUNDED).unwrap();

        let removed = flex.remove(1);
        assert!(removed.length > 0.0);
        assert_feasible(&flex);
        let lengths: Vec<f64> = flex.lengths().collect();
        assert!(lengths[0] > lengths[1]);
    }

    #[test]
    fn insert_then_remove_does_not_restore_clamped_distribution() {
        let mut flex = Flex::new(100.0);
        flex.insert(0, 0.0, UNBOUNDED).unwrap();
        flex.insert(1, 40.0, UNBOUNDED).unwrap();
        assert_lengths(&flex, &[50.0, 50.0]);

        flex.insert(2, 0.0, UNBOUNDED).unwrap();
        assert_lengths(&flex, &[26.667, 40.0, 33.333]);

        flex.remove(2);
        assert_lengths(&flex, &[40.0, 60.0]);
    }

    #[test]
    fn resize_towards_end_takes_from_nearest_neighbour_first() {
        let mut flex = Flex::new(300.0);
        for i in 0..3 {
            flex.insert(i, 50.0, UNBOUNDED).unwrap();
        }
        assert_lengths(&flex, &[100.0, 100.0, 100.0]);

        assert_eq!(flex.resize_item(0, 180.0, ResizeDirection::TowardsEnd), 180.0);
        assert_lengths(&flex, &[180.0, 50.0, 70.0]);
        assert_feasible(&flex);
    }

    #[test]
    fn resize_towards_start_at_the_first_item_is_a_no_op() {
        let mut flex = Flex::new(200.0);
        flex.insert(0, 0.0, UNBOUNDED).unwrap();
        flex.insert(1, 0.0, UNBOUNDED).unwrap();
        assert_eq!(flex.resize_item(0, 150.0, ResizeDirection::TowardsStart), 100.0);
        assert_lengths(&flex, &[100.0, 100.0]);
    }

    #[test]
    fn resize_both_splits_the_change() {
        let mut flex = Flex::new(300.0);
        for i in 0..3 {
            flex.insert(i, 0.0, UNBOUNDED).unwrap();
        }
        flex.resize_item(1, 160.0, ResizeDirection::Both);
        assert_lengths(&flex, &[70.0, 160.0, 70.0]);
    }

    #[test]
    fn resize_is_clamped_to_bounds() {
        let mut flex = Flex::new(200.0);
        flex.insert(0, 0.0, 120.0).unwrap();
        flex.insert(1, 0.0, UNBOUNDED).unwrap();
        assert_eq!(flex.resize_item(0, 190.0, ResizeDirection::TowardsEnd), 120.0);
        assert_lengths(&flex, &[120.0, 80.0]);

        // The first item is already at its maximum and cannot take the space.
        assert_eq!(flex.resize_item(1, 10.0, ResizeDirection::TowardsStart), 80.0);
        assert_lengths(&flex, &[120.0, 80.0]);
    }

    #[test]
    fn move_item_keeps_lengths() {
        let mut flex = Flex::new(100.0);
        flex.insert(0, 0.0, UNBOUNDED).unwrap();
        flex.insert(1, 0.0, UNBOUNDED).unwrap();
        flex.resize_item(0, 30.0, ResizeDirection::TowardsEnd);
        flex.move_item(0, 1);
        assert_lengths(&flex, &[70.0, 30.0]);
    }

    #[test]
    fn random_operations_stay_feasible() {
        // Small LCG so the sequence is reproducible without extra crates.
        let mut state = 0x2545_f491_u64;
        let mut next = move |bound: u64| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 33) % bound
        };

        let mut flex = Flex::new(1000.0);
        for _ in 0..2000 {
            let before = flex.clone();
            let result = match next(6) {
                0 => {
                    let index = next(flex.len() as u64 + 1) as usize;
                    let min = next(300) as f64;
                    let max = if next(3) == 0 { min + next(400) as f64 } else { UNBOUNDED };
                    flex.insert(index, min, max)
                }
                1 if !flex.is_empty() => {
                    flex.remove(next(flex.len() as u64) as usize);
                    Ok(())
                }
                2 if !flex.is_empty() => {
                    let index = next(flex.len() as u64) as usize;
                    let min = next(300) as f64;
                    flex.update_constraints(index, min, min + next(800) as f64)
                }
                3 if !flex.is_empty() => {
                    let index = next(flex.len() as u64) as usize;
                    let direction = match next(3) {
                        0 => ResizeDirection::TowardsStart,
                        1 => ResizeDirection::TowardsEnd,
                        _ => ResizeDirection::Both,
                    };
                    flex.resize_item(index, next(1000) as f64, direction);
                    Ok(())
                }
                4 => flex.set_container_length(500.0 + next(1000) as f64),
                _ if flex.len() > 1 => {
                    let from = next(flex.len() as u64) as usize;
                    flex.move_item(from, next(flex.len() as u64) as usize);
                    Ok(())
                }
                _ => Ok(()),
            };

            match result {
                Ok(()) => assert_feasible(&flex),
                Err(FlexError::Unsatisfiable) => assert_eq!(flex, before),
            }
        }
    }
}
