use crate::geo::haversine_m;
use crate::optimization::models::Waypoint;

/// Lazily yields every ordering of `items`.
///
/// Orderings come out in the same sequence as the "pick each element, then permute the
/// rest" recursion: lexicographic by position in the input. A slice of zero or one element
/// yields itself once.
pub struct Permutations<T> {
    items: Vec<T>,
    positions: Vec<usize>,
    exhausted: bool,
}

impl<T: Clone> Permutations<T> {
    pub fn new(items: Vec<T>) -> Self {
        let positions = (0..items.len()).collect();
        Self {
            items,
            positions,
            exhausted: false,
        }
    }

    fn advance(&mut self) {
        let p = &mut self.positions;
        let Some(i) = (1..p.len()).rev().find(|&i| p[i - 1] < p[i]).map(|i| i - 1) else {
            self.exhausted = true;
            return;
        };
        // p[i + 1..] is non-increasing, so a larger element always exists there
        let j = (i + 1..p.len()).rev().find(|&j| p[j] > p[i]).unwrap_or(i + 1);
        p.swap(i, j);
        p[i + 1..].reverse();
    }
}

impl<T: Clone> Iterator for Permutations<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let current = self
            .positions
            .iter()
            .map(|&pos| self.items[pos].clone())
            .collect();
        self.advance();
        Some(current)
    }
}

pub fn permutations<T: Clone>(items: &[T]) -> Permutations<T> {
    Permutations::new(items.to_vec())
}

/// Greedy order: from `start`, keep hopping to the closest unvisited interior stop by
/// straight-line distance, then finish at `end`. Ties keep the lower index.
pub fn nearest_neighbor_order(waypoints: &[Waypoint], start: usize, end: usize) -> Vec<usize> {
    let mut sequence = Vec::with_capacity(waypoints.len());
    let mut unvisited: Vec<usize> = (0..waypoints.len())
        .filter(|&i| i != start && i != end)
        .collect();
    let mut current = start;
    sequence.push(current);

    while !unvisited.is_empty() {
        let mut closest: Option<usize> = None;
        let mut smallest = f64::MAX;

        for (slot, &candidate) in unvisited.iter().enumerate() {
            let distance = haversine_m(
                waypoints[current].coordinates(),
                waypoints[candidate].coordinates(),
            );
            if distance < smallest {
                smallest = distance;
                closest = Some(slot);
            }
        }

        match closest {
            Some(slot) => {
                current = unvisited.remove(slot);
                sequence.push(current);
            }
            // only reachable when every distance is NaN
            None => {
                sequence.append(&mut unvisited);
            }
        }
    }

    if end != start {
        sequence.push(end);
    }
    sequence
}

/// Pins the first and last index around an interior ordering.
pub fn with_endpoints(first: usize, interior: &[usize], last: usize) -> Vec<usize> {
    let mut order = Vec::with_capacity(interior.len() + 2);
    order.push(first);
    order.extend_from_slice(interior);
    order.push(last);
    order
}

/// Percentage improvement of `best` over `baseline`, one decimal, never below zero.
pub fn savings_percent(baseline: f64, best: f64) -> f64 {
    if baseline.is_nan() || baseline <= 0.0 || !best.is_finite() {
        return 0.0;
    }
    let percent = ((1.0 - best / baseline) * 1000.0).round() / 10.0;
    percent.max(0.0)
}
