//! Visiting order over all waypoints.
//!
//! The order is fixed once before play: an open path from the ship's start
//! through every waypoint, minimising summed route cost, found by depth-first
//! branch and bound seeded with the identity permutation.

use ptsp_core::{DVec2, RouteError, RouteOracle};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TspOrder {
    pub order: Vec<usize>,
    pub cost: f64,
    /// Number of indices placed in `order`.
    pub filled: usize,
}

impl TspOrder {
    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SolveStats {
    pub expansions: u64,
    /// Incumbent cost after the seed and after every improvement.
    pub incumbent_costs: Vec<f64>,
    /// False when the expansion limit cut the search short.
    pub complete: bool,
}

/// Start costs plus the symmetric pairwise cost matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct TspProblem {
    start_costs: Vec<f64>,
    costs: Vec<Vec<f64>>,
}

impl TspProblem {
    pub fn from_matrix(start_costs: Vec<f64>, costs: Vec<Vec<f64>>) -> Self {
        debug_assert_eq!(start_costs.len(), costs.len());
        Self { start_costs, costs }
    }

    /// Queries every unordered pair once and mirrors the result.
    pub fn from_oracle(
        oracle: &impl RouteOracle,
        start: DVec2,
        waypoints: &[DVec2],
    ) -> Result<Self, RouteError> {
        let n = waypoints.len();
        let mut costs = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..i {
                let cost = oracle.route_cost(waypoints[i], waypoints[j])?;
                costs[i][j] = cost;
                costs[j][i] = cost;
            }
        }

        let start_costs = waypoints
            .iter()
            .map(|waypoint| oracle.route_cost(start, *waypoint))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { start_costs, costs })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.start_costs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start_costs.is_empty()
    }

    pub fn path_cost(&self, order: &[usize]) -> f64 {
        let Some(first) = order.first() else {
            return 0.0;
        };
        let legs: f64 = order
            .windows(2)
            .map(|pair| self.costs[pair[0]][pair[1]])
            .sum();
        self.start_costs[*first] + legs
    }

    pub fn solve(&self, expansion_limit: Option<u64>) -> (TspOrder, SolveStats) {
        let identity: Vec<usize> = (0..self.len()).collect();
        let seed_cost = self.path_cost(&identity);

        let mut search = Search {
            problem: self,
            path: Vec::with_capacity(self.len()),
            used: vec![false; self.len()],
            best: TspOrder {
                filled: identity.len(),
                order: identity,
                cost: seed_cost,
            },
            stats: SolveStats {
                expansions: 0,
                incumbent_costs: vec![seed_cost],
                complete: true,
            },
            limit: expansion_limit,
        };
        search.expand(0.0);

        (search.best, search.stats)
    }
}

struct Search<'a> {
    problem: &'a TspProblem,
    path: Vec<usize>,
    used: Vec<bool>,
    best: TspOrder,
    stats: SolveStats,
    limit: Option<u64>,
}

impl Search<'_> {
    fn expand(&mut self, cost: f64) {
        let n = self.problem.len();
        if self.path.len() == n {
            if cost < self.best.cost {
                self.best = TspOrder {
                    order: self.path.clone(),
                    cost,
                    filled: n,
                };
                self.stats.incumbent_costs.push(cost);
            }
            return;
        }

        let last = self.path.last().copied();
        for next in 0..n {
            if self.used[next] {
                continue;
            }
            let step = match last {
                Some(from) => self.problem.costs[from][next],
                None => self.problem.start_costs[next],
            };
            let next_cost = cost + step;
            if next_cost >= self.best.cost {
                continue;
            }
            if self.limit.is_some_and(|limit| self.stats.expansions >= limit) {
                self.stats.complete = false;
                return;
            }

            self.stats.expansions += 1;
            self.used[next] = true;
            self.path.push(next);
            self.expand(next_cost);
            self.path.pop();
            self.used[next] = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn euclidean(start: DVec2, points: &[DVec2]) -> TspProblem {
        let costs = points
            .iter()
            .map(|a| points.iter().map(|b| a.distance(*b)).collect())
            .collect();
        let start_costs = points.iter().map(|p| start.distance(*p)).collect();
        TspProblem::from_matrix(start_costs, costs)
    }

    fn permutations(items: &mut Vec<usize>, k: usize, out: &mut Vec<Vec<usize>>) {
        if k == items.len() {
            out.push(items.clone());
            return;
        }
        for i in k..items.len() {
            items.swap(k, i);
            permutations(items, k + 1, out);
            items.swap(k, i);
        }
    }

    fn brute_force(problem: &TspProblem) -> f64 {
        let mut all = Vec::new();
        permutations(&mut (0..problem.len()).collect(), 0, &mut all);
        all.iter()
            .map(|order| problem.path_cost(order))
            .fold(f64::INFINITY, f64::min)
    }

    fn scattered(n: usize, salt: u64) -> Vec<DVec2> {
        let mut state = 0x2545_F491_4F6C_DD1Du64 ^ salt;
        (0..n)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                let x = (state % 1_000) as f64;
                let y = ((state >> 20) % 1_000) as f64;
                DVec2::new(x, y)
            })
            .collect()
    }

    #[test]
    fn matches_brute_force_on_small_instances() {
        for n in 2..=8 {
            for salt in 0..3 {
                let problem = euclidean(DVec2::new(500.0, 500.0), &scattered(n, salt));
                let (order, stats) = problem.solve(None);
                assert!(stats.complete);
                assert_eq!(order.filled, n);
                let mut sorted = order.order.clone();
                sorted.sort_unstable();
                assert_eq!(sorted, (0..n).collect::<Vec<_>>());
                assert!((order.cost - problem.path_cost(&order.order)).abs() < 1e-9);
                assert!(
                    (order.cost - brute_force(&problem)).abs() < 1e-9,
                    "n={n} salt={salt}"
                );
            }
        }
    }

    #[test]
    fn incumbent_cost_only_decreases() {
        let problem = euclidean(DVec2::ZERO, &scattered(8, 42));
        let (order, stats) = problem.solve(None);
        assert!(stats
            .incumbent_costs
            .windows(2)
            .all(|pair| pair[1] < pair[0]));
        assert_eq!(stats.incumbent_costs.last().copied(), Some(order.cost));
    }

    #[test]
    fn degenerate_sizes() {
        let (order, _) = TspProblem::from_matrix(vec![], vec![]).solve(None);
        assert!(order.is_empty());
        assert_eq!(order.cost, 0.0);

        let (order, _) = TspProblem::from_matrix(vec![7.5], vec![vec![0.0]]).solve(None);
        assert_eq!(order.order, vec![0]);
        assert_eq!(order.cost, 7.5);
    }

    #[test]
    fn solve_is_deterministic() {
        let problem = euclidean(DVec2::new(10.0, 990.0), &scattered(7, 9));
        assert_eq!(problem.solve(None), problem.solve(None));
    }

    #[test]
    fn expansion_limit_keeps_a_valid_incumbent() {
        let problem = euclidean(DVec2::ZERO, &scattered(8, 5));
        let (order, stats) = problem.solve(Some(10));
        assert!(!stats.complete);
        assert!(stats.expansions <= 10);
        assert_eq!(order.len(), 8);
        assert!((order.cost - problem.path_cost(&order.order)).abs() < 1e-9);
        assert!(order.cost <= stats.incumbent_costs[0]);
    }

    #[test]
    fn from_oracle_mirrors_pair_costs() {
        struct Manhattan;
        impl RouteOracle for Manhattan {
            fn shortest_path(&self, from: DVec2, to: DVec2) -> Option<ptsp_core::Route> {
                let delta = (to - from).abs();
                Some(ptsp_core::Route {
                    cost: delta.x + delta.y,
                    nodes: vec![from, to],
                })
            }
        }

        let points = [
            DVec2::new(1.0, 0.0),
            DVec2::new(4.0, 4.0),
            DVec2::new(0.0, 9.0),
        ];
        let problem = TspProblem::from_oracle(&Manhattan, DVec2::ZERO, &points).expect("routes");
        assert_eq!(problem.len(), 3);
        assert_eq!(problem.path_cost(&[0, 1, 2]), 1.0 + 7.0 + 9.0);
        assert_eq!(problem.path_cost(&[2, 1, 0]), 9.0 + 9.0 + 7.0);
    }

    #[test]
    fn from_oracle_surfaces_missing_routes() {
        struct Nowhere;
        impl RouteOracle for Nowhere {
            fn shortest_path(&self, _: DVec2, _: DVec2) -> Option<ptsp_core::Route> {
                None
            }
        }

        let err = TspProblem::from_oracle(&Nowhere, DVec2::ZERO, &[DVec2::ONE, DVec2::X]);
        assert!(matches!(err, Err(RouteError::NoRoute { .. })));
    }
}
