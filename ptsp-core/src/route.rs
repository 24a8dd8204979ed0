//! Shortest routes over a coarse lattice laid on the tile map.
//!
//! Nodes sit every `spacing` tiles where a ship-sized disc fits, edges join
//! the eight lattice neighbours when the straight segment between them stays
//! off walls. Edge weights are integer milli-tiles so the search works on
//! `u64` costs; every public cost is converted back to tiles.

use glam::DVec2;
use pathfinding::prelude::{astar, dijkstra_all};

use crate::constants::SHIP_RADIUS;
use crate::error::RouteError;
use crate::map::TileMap;

const MILLI: f64 = 1000.0;
const SEGMENT_STEP: f64 = 0.5;
const NEIGHBOURS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    /// Length in tiles, including the legs from and to the snapped nodes.
    pub cost: f64,
    pub nodes: Vec<DVec2>,
}

/// Anything that can answer point-to-point route queries.
pub trait RouteOracle {
    fn shortest_path(&self, from: DVec2, to: DVec2) -> Option<Route>;

    fn route_cost(&self, from: DVec2, to: DVec2) -> Result<f64, RouteError> {
        self.shortest_path(from, to)
            .map(|route| route.cost)
            .ok_or(RouteError::NoRoute { from, to })
    }
}

#[derive(Clone, Debug)]
pub struct PathGraph {
    spacing: usize,
    cols: usize,
    rows: usize,
    positions: Vec<DVec2>,
    open: Vec<bool>,
    edges: Vec<Vec<(usize, u64)>>,
    map: TileMap,
}

impl PathGraph {
    pub fn build(map: &TileMap, spacing: usize) -> Self {
        let spacing = spacing.max(1);
        let cols = map.width().div_ceil(spacing);
        let rows = map.height().div_ceil(spacing);
        let offset = (spacing / 2) as f64;

        let mut positions = Vec::with_capacity(cols * rows);
        let mut open = Vec::with_capacity(cols * rows);
        for row in 0..rows {
            for col in 0..cols {
                let point = DVec2::new(
                    (col * spacing) as f64 + offset,
                    (row * spacing) as f64 + offset,
                );
                positions.push(point);
                open.push(disc_is_clear(map, point, SHIP_RADIUS));
            }
        }

        let mut edges = vec![Vec::new(); cols * rows];
        for row in 0..rows {
            for col in 0..cols {
                let id = row * cols + col;
                if !open[id] {
                    continue;
                }
                for (dx, dy) in NEIGHBOURS {
                    let nc = col as i64 + dx;
                    let nr = row as i64 + dy;
                    if nc < 0 || nr < 0 || nc >= cols as i64 || nr >= rows as i64 {
                        continue;
                    }
                    let other = nr as usize * cols + nc as usize;
                    if open[other] && segment_is_clear(map, positions[id], positions[other]) {
                        let weight = to_milli(positions[id].distance(positions[other]));
                        edges[id].push((other, weight));
                    }
                }
            }
        }

        Self {
            spacing,
            cols,
            rows,
            positions,
            open,
            edges,
            map: map.clone(),
        }
    }

    #[inline]
    pub fn spacing(&self) -> usize {
        self.spacing
    }

    pub fn node_count(&self) -> usize {
        self.open.iter().filter(|open| **open).count()
    }

    pub fn position(&self, node: usize) -> Option<DVec2> {
        self.open
            .get(node)
            .copied()
            .unwrap_or(false)
            .then(|| self.positions[node])
    }

    /// Nearest open node with a clear line to `point`, searched ring by ring
    /// outward from the lattice cell under it. Falls back to the nearest open
    /// node regardless of line of sight.
    pub fn closest_node(&self, point: DVec2) -> Option<usize> {
        let (col, row) = self.cell_of(point);
        let max_ring = self.cols.max(self.rows) as i64;
        let mut fallback: Option<(usize, f64)> = None;

        for ring in 0..=max_ring {
            let mut best: Option<(usize, f64)> = None;
            for node in self.ring(col, row, ring) {
                let distance = point.distance_squared(self.positions[node]);
                if fallback.map_or(true, |(_, d)| distance < d) {
                    fallback = Some((node, distance));
                }
                if best.map_or(true, |(_, d)| distance < d)
                    && segment_is_clear(&self.map, point, self.positions[node])
                {
                    best = Some((node, distance));
                }
            }
            if let Some((node, _)) = best {
                return Some(node);
            }
        }
        fallback.map(|(node, _)| node)
    }

    /// Single-source costs from the node nearest `target` to every node.
    pub fn distance_field(&self, target: DVec2) -> Result<DistanceField, RouteError> {
        let source = self
            .closest_node(target)
            .ok_or(RouteError::Unreachable { point: target })?;
        let reached = dijkstra_all(&source, |node| self.edges[*node].iter().copied());

        let mut costs = vec![f64::INFINITY; self.positions.len()];
        let snap = target.distance(self.positions[source]);
        costs[source] = snap;
        for (node, (_, cost)) in reached {
            costs[node] = snap + from_milli(cost);
        }

        Ok(DistanceField {
            map: self.map.clone(),
            target,
            spacing: self.spacing,
            cols: self.cols,
            rows: self.rows,
            positions: self.positions.clone(),
            costs,
        })
    }

    fn cell_of(&self, point: DVec2) -> (i64, i64) {
        lattice_cell(point, self.spacing, self.cols, self.rows)
    }

    fn ring(&self, col: i64, row: i64, ring: i64) -> impl Iterator<Item = usize> + '_ {
        ring_cells(col, row, ring, self.cols, self.rows).filter(|node| self.open[*node])
    }
}

impl RouteOracle for PathGraph {
    fn shortest_path(&self, from: DVec2, to: DVec2) -> Option<Route> {
        let start = self.closest_node(from)?;
        let goal = self.closest_node(to)?;
        let goal_point = self.positions[goal];

        let (path, cost) = astar(
            &start,
            |node| self.edges[*node].iter().copied(),
            |node| to_milli(self.positions[*node].distance(goal_point)),
            |node| *node == goal,
        )?;

        let mut nodes = Vec::with_capacity(path.len() + 2);
        nodes.push(from);
        nodes.extend(path.iter().map(|node| self.positions[*node]));
        nodes.push(to);

        let cost =
            from.distance(self.positions[start]) + from_milli(cost) + to.distance(goal_point);
        Some(Route { cost, nodes })
    }
}

/// Precomputed route costs towards one target. Lookups add the straight
/// distance to each surrounding lattice node in line of sight to its stored
/// cost.
#[derive(Clone, Debug)]
pub struct DistanceField {
    map: TileMap,
    target: DVec2,
    spacing: usize,
    cols: usize,
    rows: usize,
    positions: Vec<DVec2>,
    costs: Vec<f64>,
}

impl DistanceField {
    #[inline]
    pub fn target(&self) -> DVec2 {
        self.target
    }

    /// `None` when no reachable node is near `point`. Nodes behind a wall
    /// are only used when no nearby node is visible.
    pub fn cost_from(&self, point: DVec2) -> Option<f64> {
        let (col, row) = lattice_cell(point, self.spacing, self.cols, self.rows);
        let nearest = |rings: std::ops::RangeInclusive<i64>, visible: bool| {
            rings
                .flat_map(|ring| ring_cells(col, row, ring, self.cols, self.rows))
                .filter(|node| self.costs[*node].is_finite())
                .filter(|node| {
                    !visible || segment_is_clear(&self.map, point, self.positions[*node])
                })
                .map(|node| point.distance(self.positions[node]) + self.costs[node])
                .min_by(f64::total_cmp)
        };
        nearest(0..=1, true)
            .or_else(|| nearest(2..=2, true))
            .or_else(|| nearest(0..=2, false))
    }
}

fn lattice_cell(point: DVec2, spacing: usize, cols: usize, rows: usize) -> (i64, i64) {
    let offset = (spacing / 2) as f64;
    let spacing = spacing as f64;
    let col = ((point.x - offset) / spacing).round() as i64;
    let row = ((point.y - offset) / spacing).round() as i64;
    (
        col.clamp(0, cols.saturating_sub(1) as i64),
        row.clamp(0, rows.saturating_sub(1) as i64),
    )
}

/// Lattice ids on the square ring at Chebyshev distance `ring` from a cell.
fn ring_cells(
    col: i64,
    row: i64,
    ring: i64,
    cols: usize,
    rows: usize,
) -> impl Iterator<Item = usize> {
    let cols = cols as i64;
    let rows = rows as i64;
    (-ring..=ring)
        .flat_map(move |dy| (-ring..=ring).map(move |dx| (dx, dy)))
        .filter(move |(dx, dy)| dx.abs() == ring || dy.abs() == ring)
        .map(move |(dx, dy)| (col + dx, row + dy))
        .filter(move |(c, r)| *c >= 0 && *r >= 0 && *c < cols && *r < rows)
        .map(move |(c, r)| (r * cols + c) as usize)
}

fn disc_is_clear(map: &TileMap, centre: DVec2, radius: f64) -> bool {
    let reach = radius.ceil() as i64;
    let cx = centre.x.round() as i64;
    let cy = centre.y.round() as i64;
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            if ((dx * dx + dy * dy) as f64) > radius * radius {
                continue;
            }
            match map.tile(cx + dx, cy + dy) {
                Some(tile) if !tile.is_wall() => {}
                _ => return false,
            }
        }
    }
    true
}

fn segment_is_clear(map: &TileMap, from: DVec2, to: DVec2) -> bool {
    let length = from.distance(to);
    let steps = (length / SEGMENT_STEP).ceil().max(1.0) as usize;
    (0..=steps).all(|step| map.is_open(from.lerp(to, step as f64 / steps as f64)))
}

#[inline]
fn to_milli(distance: f64) -> u64 {
    (distance * MILLI).round() as u64
}

#[inline]
fn from_milli(cost: u64) -> f64 {
    cost as f64 / MILLI
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two rooms joined by a gap at the bottom of the dividing wall.
    const ROOMS: &str = "\
scale=8
##########
#S..#....#
#...#..W.#
#...#....#
#........#
##########
";

    fn rooms() -> TileMap {
        TileMap::parse(ROOMS).expect("map parses")
    }

    #[test]
    fn route_detours_around_the_dividing_wall() {
        let map = rooms();
        let graph = PathGraph::build(&map, 2);
        let from = map.start();
        let to = map.waypoints()[0];

        let route = graph.shortest_path(from, to).expect("rooms are connected");
        let straight = from.distance(to);
        assert!(
            route.cost > straight * 1.2,
            "route {} should bend around the wall (straight {straight})",
            route.cost
        );
        assert_eq!(route.nodes.first(), Some(&from));
        assert_eq!(route.nodes.last(), Some(&to));
        assert!(route.nodes.iter().all(|node| map.is_open(*node)));
    }

    #[test]
    fn route_costs_are_symmetric() {
        let map = rooms();
        let graph = PathGraph::build(&map, 2);
        let a = map.start();
        let b = map.waypoints()[0];
        let there = graph.route_cost(a, b).expect("route");
        let back = graph.route_cost(b, a).expect("route");
        assert!((there - back).abs() < 1e-6);
        assert!(graph.route_cost(a, a).expect("route") < graph.spacing() as f64 * 2.0);
    }

    #[test]
    fn distance_field_agrees_with_point_queries() {
        let map = rooms();
        let graph = PathGraph::build(&map, 2);
        let target = map.waypoints()[0];
        let field = graph.distance_field(target).expect("field");

        let from = map.start();
        let direct = graph.route_cost(from, target).expect("route");
        let looked_up = field.cost_from(from).expect("reachable");
        assert!(
            (looked_up - direct).abs() < 6.0,
            "field {looked_up} vs route {direct}"
        );
        assert!(field.cost_from(target).expect("reachable") < 4.0);
    }

    #[test]
    fn field_lookups_do_not_see_through_thin_walls() {
        // One-tile wall at x = 10 with a gap along the bottom.
        let mut rows = vec![vec!['.'; 20]; 30];
        for row in rows.iter_mut().take(20) {
            row[10] = '#';
        }
        rows[25][5] = 'S';
        let rows: Vec<String> = rows.into_iter().map(String::from_iter).collect();
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        let map = TileMap::from_rows(&rows, 1).expect("map parses");
        let graph = PathGraph::build(&map, 4);

        let target = DVec2::new(14.0, 6.0);
        let field = graph.distance_field(target).expect("field");
        let beside_wall = DVec2::new(9.0, 5.0);

        let cost = field.cost_from(beside_wall).expect("reachable");
        assert!(
            cost > 30.0,
            "lookup {cost} should go round through the gap, not {} through the wall",
            beside_wall.distance(target)
        );
    }

    #[test]
    fn closed_map_has_no_nodes() {
        let map = TileMap::parse("###\n#S#\n###").expect("map parses");
        let graph = PathGraph::build(&map, 1);
        assert_eq!(graph.node_count(), 0);
        assert!(graph.shortest_path(map.start(), map.start()).is_none());
        assert_eq!(
            graph.distance_field(map.start()).err(),
            Some(RouteError::Unreachable { point: map.start() })
        );
    }
}
