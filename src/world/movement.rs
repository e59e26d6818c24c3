//! Movement validation and collision resolution.
//!
//! Clients propose positions; the server resolves them against obstacle
//! geometry and district bounds and owns the result. Interiors have no
//! server-side geometry, so their positions pass through untouched.

use std::time::{Duration, Instant};

use crate::world::geometry::{circle_intersects_rect, district_geometry, Rect, Side, Vec2};

/// How far inside the neighboring district's edge a crossing session lands.
const CROSS_ENTRY_OFFSET: f32 = 40.0;

/// Result of resolving one movement request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    /// Position accepted, possibly adjusted by sliding or boundary clamping.
    Moved(Vec2),
    /// Fully obstructed; the session stays where it was.
    Blocked,
    /// The session left the district on a side with a neighbor.
    Crossed { target: &'static str, spawn: Vec2 },
}

pub struct MovementResolver {
    player_radius: f32,
    transfer_cooldown: Duration,
}

impl MovementResolver {
    pub fn new(player_radius: f32, transfer_cooldown_ms: u64) -> Self {
        Self {
            player_radius,
            transfer_cooldown: Duration::from_millis(transfer_cooldown_ms),
        }
    }

    /// Resolves a requested position for a session in `district`.
    ///
    /// `last_crossing` is the session's most recent district change; a
    /// session still inside the cooldown window never re-evaluates boundary
    /// crossings and is clamped to bounds instead.
    pub fn resolve(
        &self,
        district: &str,
        current: Vec2,
        requested: Vec2,
        last_crossing: Option<Instant>,
        now: Instant,
    ) -> MoveOutcome {
        let Some(geo) = district_geometry(district) else {
            // Interior or otherwise unbounded district.
            return MoveOutcome::Moved(requested);
        };

        let candidate =
            match slide_candidate(current, requested, self.player_radius, geo.obstacles) {
                Some(pos) => pos,
                None => return MoveOutcome::Blocked,
            };

        if let Some(side) = exit_side(&geo.bounds, candidate) {
            let in_cooldown = last_crossing
                .map(|at| now.duration_since(at) < self.transfer_cooldown)
                .unwrap_or(false);
            if !in_cooldown {
                if let Some(target) = geo.neighbors.on_side(side) {
                    let spawn = entry_position(target, side, candidate);
                    return MoveOutcome::Crossed { target, spawn };
                }
            }
            return MoveOutcome::Moved(geo.bounds.clamp_inside(candidate));
        }

        MoveOutcome::Moved(candidate)
    }
}

/// Collision resolution against obstacle rectangles. Tries the full move,
/// then each axis alone. `None` means no axis was passable.
fn slide_candidate(
    current: Vec2,
    requested: Vec2,
    radius: f32,
    obstacles: &[Rect],
) -> Option<Vec2> {
    let collides =
        |p: Vec2| obstacles.iter().any(|r| circle_intersects_rect(p, radius, r));

    if !collides(requested) {
        return Some(requested);
    }
    let x_only = Vec2::new(requested.x, current.y);
    if !collides(x_only) {
        return Some(x_only);
    }
    let y_only = Vec2::new(current.x, requested.y);
    if !collides(y_only) {
        return Some(y_only);
    }
    None
}

/// Which side of `bounds` the point left through, if any. Horizontal exits
/// win over vertical ones when both apply.
fn exit_side(bounds: &Rect, p: Vec2) -> Option<Side> {
    if p.x < bounds.x {
        Some(Side::Left)
    } else if p.x > bounds.right() {
        Some(Side::Right)
    } else if p.y < bounds.y {
        Some(Side::Top)
    } else if p.y > bounds.bottom() {
        Some(Side::Bottom)
    } else {
        None
    }
}

/// Entry point just inside the neighbor's opposite edge, carrying the
/// perpendicular coordinate over (clamped to the neighbor's bounds).
fn entry_position(target: &str, crossed: Side, candidate: Vec2) -> Vec2 {
    let bounds = district_geometry(target)
        .map(|geo| geo.bounds)
        .unwrap_or(Rect::new(0.0, 0.0, 800.0, 600.0));
    let entry = match crossed {
        Side::Left => Vec2::new(bounds.right() - CROSS_ENTRY_OFFSET, candidate.y),
        Side::Right => Vec2::new(bounds.x + CROSS_ENTRY_OFFSET, candidate.y),
        Side::Top => Vec2::new(candidate.x, bounds.bottom() - CROSS_ENTRY_OFFSET),
        Side::Bottom => Vec2::new(candidate.x, bounds.y + CROSS_ENTRY_OFFSET),
    };
    bounds.clamp_inside(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::geometry::{DISTRICT_ARENA, DISTRICT_BEACH, DISTRICT_HOUSING, DISTRICT_PLAZA};

    fn resolver() -> MovementResolver {
        MovementResolver::new(16.0, 1200)
    }

    #[test]
    fn open_move_is_accepted() {
        let outcome = resolver().resolve(
            DISTRICT_PLAZA,
            Vec2::new(100.0, 100.0),
            Vec2::new(120.0, 110.0),
            None,
            Instant::now(),
        );
        assert_eq!(outcome, MoveOutcome::Moved(Vec2::new(120.0, 110.0)));
    }

    #[test]
    fn interior_positions_pass_through() {
        // Interiors have no server-side bounds at all.
        let outcome = resolver().resolve(
            "house_plot2",
            Vec2::new(10.0, 10.0),
            Vec2::new(2000.0, -50.0),
            None,
            Instant::now(),
        );
        assert_eq!(outcome, MoveOutcome::Moved(Vec2::new(2000.0, -50.0)));
    }

    #[test]
    fn obstacle_slide_keeps_free_axis() {
        // Arena obstacle at (300,380) 200x50. Approach from the left and
        // push diagonally into it; X is obstructed, Y is not.
        let outcome = resolver().resolve(
            DISTRICT_ARENA,
            Vec2::new(280.0, 400.0),
            Vec2::new(310.0, 405.0),
            None,
            Instant::now(),
        );
        assert_eq!(outcome, MoveOutcome::Moved(Vec2::new(280.0, 405.0)));
    }

    #[test]
    fn pocket_between_obstacles_blocks_fully() {
        // Synthetic corner pocket: both single-axis retries collide.
        let pocket = [
            Rect::new(100.0, 0.0, 40.0, 100.0),
            Rect::new(0.0, 100.0, 100.0, 40.0),
        ];
        let current = Vec2::new(70.0, 70.0);
        let requested = Vec2::new(95.0, 95.0);
        assert_eq!(slide_candidate(current, requested, 16.0, &pocket), None);
    }

    #[test]
    fn left_exit_crosses_into_neighbor() {
        let outcome = resolver().resolve(
            DISTRICT_PLAZA,
            Vec2::new(30.0, 300.0),
            Vec2::new(-5.0, 300.0),
            None,
            Instant::now(),
        );
        assert_eq!(
            outcome,
            MoveOutcome::Crossed {
                target: DISTRICT_BEACH,
                spawn: Vec2::new(760.0, 300.0),
            }
        );
    }

    #[test]
    fn right_exit_crosses_into_neighbor() {
        let outcome = resolver().resolve(
            DISTRICT_PLAZA,
            Vec2::new(780.0, 250.0),
            Vec2::new(808.0, 250.0),
            None,
            Instant::now(),
        );
        assert_eq!(
            outcome,
            MoveOutcome::Crossed {
                target: DISTRICT_HOUSING,
                spawn: Vec2::new(40.0, 250.0),
            }
        );
    }

    #[test]
    fn cooldown_suppresses_crossing() {
        let outcome = resolver().resolve(
            DISTRICT_PLAZA,
            Vec2::new(30.0, 300.0),
            Vec2::new(-5.0, 300.0),
            Some(Instant::now()),
            Instant::now(),
        );
        assert_eq!(outcome, MoveOutcome::Moved(Vec2::new(0.0, 300.0)));
    }

    #[test]
    fn expired_cooldown_crosses_again() {
        let resolver = MovementResolver::new(16.0, 1200);
        let crossed_at = Instant::now();
        let later = crossed_at + Duration::from_millis(1500);
        let outcome = resolver.resolve(
            DISTRICT_PLAZA,
            Vec2::new(30.0, 300.0),
            Vec2::new(-5.0, 300.0),
            Some(crossed_at),
            later,
        );
        assert!(matches!(outcome, MoveOutcome::Crossed { .. }));
    }

    #[test]
    fn wall_without_neighbor_clamps() {
        // Housing's right side has no neighbor.
        let outcome = resolver().resolve(
            DISTRICT_HOUSING,
            Vec2::new(790.0, 300.0),
            Vec2::new(815.0, 300.0),
            None,
            Instant::now(),
        );
        assert_eq!(outcome, MoveOutcome::Moved(Vec2::new(800.0, 300.0)));

        let outcome = resolver().resolve(
            DISTRICT_PLAZA,
            Vec2::new(400.0, 10.0),
            Vec2::new(400.0, -12.0),
            None,
            Instant::now(),
        );
        assert_eq!(outcome, MoveOutcome::Moved(Vec2::new(400.0, 0.0)));
    }
}
