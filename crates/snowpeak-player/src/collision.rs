//! Ray queries against static, axis-aligned obstacles.
//!
//! Movement only ever asks one question: how far along this heading is the
//! nearest obstacle? [`CollisionQuery`] is that boundary, and [`ObstacleSet`]
//! answers it for a mutable set of boxes populated by the map loader.

use std::collections::BTreeMap;

use glam::Vec3;

/// Nearest intersection reported by a ray query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin to the hit, in world units.
    pub distance: f32,
}

/// Ray queries over whatever geometry blocks movement.
pub trait CollisionQuery {
    /// Nearest hit along `direction` (normalized) from `origin`, if any.
    fn query_ray(&self, origin: Vec3, direction: Vec3) -> Option<RayHit>;
}

/// Axis-aligned box in world space.
///
/// Invariant: `min <= max` on every axis. [`Aabb::new`] sorts the corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box spanning two opposite corners, in any order.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Box from a center point and half-extents.
    pub fn from_center_half_extents(center: Vec3, half: Vec3) -> Self {
        Self::new(center - half, center + half)
    }

    /// True if `p` lies inside or on the boundary.
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Entry distance of the ray into this box (slab method).
    ///
    /// A ray starting inside the box hits at distance zero.
    pub fn ray_distance(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if d.abs() < f32::EPSILON {
                // Parallel to this slab: must already be within it.
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d;
            let t1 = (lo - o) * inv;
            let t2 = (hi - o) * inv;
            t_min = t_min.max(t1.min(t2));
            t_max = t_max.min(t1.max(t2));
        }

        let entry = t_min.max(0.0);
        (t_max >= entry).then_some(entry)
    }
}

/// Identifier of an obstacle inside an [`ObstacleSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObstacleId(pub u64);

/// Mutable set of box obstacles.
#[derive(Debug, Default, Clone)]
pub struct ObstacleSet {
    boxes: BTreeMap<ObstacleId, Aabb>,
    next_id: u64,
}

impl ObstacleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a box and return its id.
    pub fn insert(&mut self, aabb: Aabb) -> ObstacleId {
        let id = ObstacleId(self.next_id);
        self.next_id += 1;
        self.boxes.insert(id, aabb);
        id
    }

    /// Remove a box. Returns it if it was present.
    pub fn remove(&mut self, id: ObstacleId) -> Option<Aabb> {
        self.boxes.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn clear(&mut self) {
        self.boxes.clear();
    }

    /// Four thin walls enclosing the square `[-half, half]` on x and z,
    /// `height` tall, standing on the ground plane.
    pub fn walled_room(half: f32, height: f32) -> Self {
        let mut set = Self::new();
        let t = 0.5;
        set.insert(Aabb::new(Vec3::new(-half - t, 0.0, half), Vec3::new(half + t, height, half + t)));
        set.insert(Aabb::new(Vec3::new(-half - t, 0.0, -half - t), Vec3::new(half + t, height, -half)));
        set.insert(Aabb::new(Vec3::new(half, 0.0, -half), Vec3::new(half + t, height, half)));
        set.insert(Aabb::new(Vec3::new(-half - t, 0.0, -half), Vec3::new(-half, height, half)));
        set
    }
}

impl CollisionQuery for ObstacleSet {
    fn query_ray(&self, origin: Vec3, direction: Vec3) -> Option<RayHit> {
        self.boxes
            .values()
            .filter_map(|aabb| aabb.ray_distance(origin, direction))
            .min_by(f32::total_cmp)
            .map(|distance| RayHit { distance })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall_at_z(z: f32) -> Aabb {
        Aabb::new(Vec3::new(-5.0, 0.0, z), Vec3::new(5.0, 3.0, z + 1.0))
    }

    #[test]
    fn test_empty_set_always_misses() {
        let set = ObstacleSet::new();
        assert!(set.query_ray(Vec3::ZERO, Vec3::Z).is_none());
        assert!(set.query_ray(Vec3::ZERO, Vec3::X).is_none());
    }

    #[test]
    fn test_ray_hits_wall_ahead() {
        let mut set = ObstacleSet::new();
        set.insert(wall_at_z(4.0));
        let hit = set.query_ray(Vec3::new(0.0, 0.5, 0.0), Vec3::Z).unwrap();
        assert!((hit.distance - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_ray_misses_wall_behind() {
        let mut set = ObstacleSet::new();
        set.insert(wall_at_z(-4.0));
        assert!(set.query_ray(Vec3::new(0.0, 0.5, 0.0), Vec3::Z).is_none());
    }

    #[test]
    fn test_parallel_ray_outside_slab_misses() {
        let mut set = ObstacleSet::new();
        set.insert(wall_at_z(4.0));
        // Above the wall.
        assert!(set.query_ray(Vec3::new(0.0, 5.0, 0.0), Vec3::Z).is_none());
    }

    #[test]
    fn test_nearest_hit_wins() {
        let mut set = ObstacleSet::new();
        set.insert(wall_at_z(8.0));
        set.insert(wall_at_z(2.0));
        let hit = set.query_ray(Vec3::new(0.0, 0.5, 0.0), Vec3::Z).unwrap();
        assert!((hit.distance - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_origin_inside_box_hits_at_zero() {
        let aabb = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE);
        assert!(aabb.contains_point(Vec3::ZERO));
        assert_eq!(aabb.ray_distance(Vec3::ZERO, Vec3::X), Some(0.0));
    }

    #[test]
    fn test_diagonal_ray() {
        let aabb = Aabb::new(Vec3::new(2.0, 0.0, 2.0), Vec3::new(3.0, 1.0, 3.0));
        let dir = Vec3::new(1.0, 0.0, 1.0).normalize();
        let d = aabb.ray_distance(Vec3::new(0.0, 0.5, 0.0), dir).unwrap();
        assert!((d - 2.0 * 2.0_f32.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn test_removed_obstacle_no_longer_blocks() {
        let mut set = ObstacleSet::new();
        let id = set.insert(wall_at_z(1.0));
        assert!(set.query_ray(Vec3::new(0.0, 0.5, 0.0), Vec3::Z).is_some());
        assert!(set.remove(id).is_some());
        assert!(set.remove(id).is_none());
        assert!(set.query_ray(Vec3::new(0.0, 0.5, 0.0), Vec3::Z).is_none());
        assert!(set.is_empty());
    }

    #[test]
    fn test_walled_room_encloses_origin() {
        let room = ObstacleSet::walled_room(10.0, 3.0);
        assert_eq!(room.len(), 4);
        let origin = Vec3::new(0.0, 0.5, 0.0);
        for dir in [Vec3::X, Vec3::NEG_X, Vec3::Z, Vec3::NEG_Z] {
            let hit = room.query_ray(origin, dir).unwrap();
            assert!((hit.distance - 10.0).abs() < 1e-4, "{dir:?} -> {}", hit.distance);
        }
    }
}
