//! Fixed world geometry: vector math, axis-aligned rectangles, and the
//! static per-district layout table (bounds, spawn points, neighbors,
//! obstacles). Districts use screen coordinates: the origin is the top-left
//! corner and y grows downward.

use serde::{Deserialize, Serialize};

/// A point or displacement in 2D world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    pub fn distance_to(&self, other: Vec2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// An axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// The point inside the rectangle closest to `point`.
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        Vec2 {
            x: point.x.clamp(self.x, self.right()),
            y: point.y.clamp(self.y, self.bottom()),
        }
    }

    /// Clamps `point` to lie within the rectangle.
    pub fn clamp_inside(&self, point: Vec2) -> Vec2 {
        self.closest_point(point)
    }
}

/// Circle-vs-rectangle overlap test: a circle of `radius` centered at
/// `center` intersects the rectangle when the closest rectangle point lies
/// strictly within the radius.
pub fn circle_intersects_rect(center: Vec2, radius: f32, rect: &Rect) -> bool {
    rect.closest_point(center).distance_to(center) < radius
}

/// One side of a district's bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

/// Per-side neighbor configuration. A `None` side is a hard wall.
#[derive(Debug, Clone, Copy)]
pub struct Neighbors {
    pub left: Option<&'static str>,
    pub right: Option<&'static str>,
    pub top: Option<&'static str>,
    pub bottom: Option<&'static str>,
}

impl Neighbors {
    const NONE: Neighbors = Neighbors {
        left: None,
        right: None,
        top: None,
        bottom: None,
    };

    pub fn on_side(&self, side: Side) -> Option<&'static str> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
            Side::Top => self.top,
            Side::Bottom => self.bottom,
        }
    }
}

/// Static layout of one fixed district.
#[derive(Debug, Clone, Copy)]
pub struct DistrictGeometry {
    pub name: &'static str,
    pub bounds: Rect,
    pub spawn: Vec2,
    pub neighbors: Neighbors,
    /// Obstacle rectangles checked for combat-zone movement.
    pub obstacles: &'static [Rect],
    pub combat: bool,
    /// Where defeated players reappear; combat zone only.
    pub respawn: Option<Vec2>,
}

pub const DISTRICT_PLAZA: &str = "plaza";
pub const DISTRICT_BEACH: &str = "beach";
pub const DISTRICT_HOUSING: &str = "housing";
pub const DISTRICT_ARENA: &str = "arena";

/// Prefix for dynamically-named plot interiors (`house_<plotId>`).
pub const HOUSE_DISTRICT_PREFIX: &str = "house_";

const DISTRICT_BOUNDS: Rect = Rect::new(0.0, 0.0, 800.0, 600.0);

const ARENA_OBSTACLES: [Rect; 4] = [
    Rect::new(180.0, 140.0, 120.0, 40.0),
    Rect::new(500.0, 120.0, 60.0, 160.0),
    Rect::new(300.0, 380.0, 200.0, 50.0),
    Rect::new(120.0, 430.0, 80.0, 80.0),
];

static DISTRICTS: [DistrictGeometry; 4] = [
    DistrictGeometry {
        name: DISTRICT_PLAZA,
        bounds: DISTRICT_BOUNDS,
        spawn: Vec2::new(400.0, 300.0),
        neighbors: Neighbors {
            left: Some(DISTRICT_BEACH),
            right: Some(DISTRICT_HOUSING),
            top: None,
            bottom: None,
        },
        obstacles: &[],
        combat: false,
        respawn: None,
    },
    DistrictGeometry {
        name: DISTRICT_BEACH,
        bounds: DISTRICT_BOUNDS,
        spawn: Vec2::new(400.0, 320.0),
        neighbors: Neighbors {
            left: None,
            right: Some(DISTRICT_PLAZA),
            top: None,
            bottom: None,
        },
        obstacles: &[],
        combat: false,
        respawn: None,
    },
    DistrictGeometry {
        name: DISTRICT_HOUSING,
        bounds: DISTRICT_BOUNDS,
        spawn: Vec2::new(400.0, 300.0),
        neighbors: Neighbors {
            left: Some(DISTRICT_PLAZA),
            right: None,
            top: None,
            bottom: None,
        },
        obstacles: &[],
        combat: false,
        respawn: None,
    },
    DistrictGeometry {
        name: DISTRICT_ARENA,
        bounds: DISTRICT_BOUNDS,
        spawn: Vec2::new(400.0, 520.0),
        neighbors: Neighbors::NONE,
        obstacles: &ARENA_OBSTACLES,
        combat: true,
        respawn: Some(Vec2::new(400.0, 80.0)),
    },
];

/// Looks up the static geometry for a fixed district. Interiors and unknown
/// names have no geometry.
pub fn district_geometry(name: &str) -> Option<&'static DistrictGeometry> {
    DISTRICTS.iter().find(|d| d.name == name)
}

/// All fixed district names, in canonical order.
pub fn fixed_district_names() -> impl Iterator<Item = &'static str> {
    DISTRICTS.iter().map(|d| d.name)
}

/// True when `name` is a syntactically valid interior district for `plot_id`
/// extraction, i.e. `house_<plotId>` with a non-empty id.
pub fn interior_plot_id(name: &str) -> Option<&str> {
    let id = name.strip_prefix(HOUSE_DISTRICT_PREFIX)?;
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}
