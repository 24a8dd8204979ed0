use ptsp_core::{DistanceField, GameState};

use crate::config::{OrderAdherence, ScoreWeights};

/// The next one or two waypoints in the fixed order that are still
/// uncollected at the planning root. Waypoints picked up out of order are
/// skipped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TargetWindow {
    pub first: Option<usize>,
    pub second: Option<usize>,
}

impl TargetWindow {
    pub fn from_state(order: &[usize], root: &GameState) -> Self {
        let waypoints = root.waypoints();
        let mut pending = order
            .iter()
            .copied()
            .filter(|index| waypoints.get(*index).is_some_and(|w| !w.collected));
        Self {
            first: pending.next(),
            second: pending.next(),
        }
    }
}

/// Everything the scorer needs besides the simulated state.
#[derive(Clone, Copy, Debug)]
pub struct ScoreContext<'a> {
    pub order: &'a [usize],
    /// One field per waypoint index.
    pub fields: &'a [DistanceField],
    pub window: TargetWindow,
    pub weights: ScoreWeights,
    pub adherence: OrderAdherence,
    /// Waypoints already visited at the planning root.
    pub root_visited: usize,
}

impl<'a> ScoreContext<'a> {
    pub fn new(
        order: &'a [usize],
        fields: &'a [DistanceField],
        root: &GameState,
        weights: ScoreWeights,
        adherence: OrderAdherence,
    ) -> Self {
        Self {
            order,
            fields,
            window: TargetWindow::from_state(order, root),
            weights,
            adherence,
            root_visited: root.waypoints_visited(),
        }
    }
}

/// Fitness of a simulated state; higher is better.
pub fn score(state: &GameState, ctx: &ScoreContext<'_>) -> f64 {
    let w = &ctx.weights;
    let visited = state.waypoints_visited();
    let elapsed = state.elapsed_ticks() as f64;

    if visited == state.waypoints().len() {
        return w.finish_multiplier * (visited as f64 * w.per_waypoint + (w.time_horizon - elapsed));
    }

    let position = state.ship().position();
    let collected = |index: usize| state.waypoints().get(index).is_some_and(|w| w.collected);
    let distance_to = |index: usize| {
        let cost = ctx
            .fields
            .get(index)
            .and_then(|field| field.cost_from(position))
            .unwrap_or(w.max_distance);
        (w.max_distance - cost).max(0.0)
    };

    let distance = match ctx.window {
        TargetWindow {
            first: Some(first),
            second,
        } if collected(first) => match second {
            Some(second) => distance_to(second) + w.second_target_bonus,
            None => w.max_distance,
        },
        TargetWindow {
            first: Some(first), ..
        } => distance_to(first),
        TargetWindow { first: None, .. } => 0.0,
    };

    distance + order_bonus(state, ctx)
        + w.per_fuel_tank * state.fuel_tanks_collected() as f64
        + (w.time_horizon - elapsed)
        - w.damage_factor * state.ship().damage() as f64
}

fn order_bonus(state: &GameState, ctx: &ScoreContext<'_>) -> f64 {
    let Some(first) = ctx.window.first else {
        return 0.0;
    };
    let history = state.visit_order();
    let in_order = match ctx.adherence {
        OrderAdherence::Rollout => {
            let expected = [Some(first), ctx.window.second];
            history
                .iter()
                .skip(ctx.root_visited)
                .zip(expected)
                .all(|(got, want)| Some(*got) == want)
        }
        OrderAdherence::History => history
            .iter()
            .zip(ctx.order)
            .all(|(got, want)| got == want),
    };
    if !in_order {
        return 0.0;
    }

    let has = |index: usize| history.contains(&index);
    match ctx.window.second {
        Some(second) if has(first) && has(second) => 2.0 * ctx.weights.per_waypoint,
        _ if has(first) => ctx.weights.per_waypoint,
        _ => 0.0,
    }
}
