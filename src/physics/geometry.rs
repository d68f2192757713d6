//! Hull geometry: facings, cross-sections, and sweep intersection tests
//!
//! Hulls are cylinders aligned with the forward axis, radius one eighth of
//! the length. Facing classification and cross-sections feed the combat
//! resolver; the segment sweeps feed terminal projectile flight.

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;

/// Radius as a fraction of hull length for the cylinder model
pub const RADIUS_TO_LENGTH_RATIO: f64 = 1.0 / 8.0;
/// Impacts within this many degrees of dead-ahead strike the nose
pub const NOSE_HIT_ANGLE_DEG: f64 = 30.0;
/// Impacts beyond this many degrees from dead-ahead strike the tail
pub const TAIL_HIT_ANGLE_DEG: f64 = 150.0;

/// Hull facing struck by an impact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HitLocation {
    Nose,
    Lateral,
    Tail,
}

impl HitLocation {
    pub fn name(&self) -> &'static str {
        match self {
            HitLocation::Nose => "nose",
            HitLocation::Lateral => "lateral",
            HitLocation::Tail => "tail",
        }
    }
}

/// Cylinder hull dimensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HullGeometry {
    /// Hull length along the forward axis, meters
    #[serde(default = "default_length")]
    pub length_m: f64,
}

fn default_length() -> f64 {
    100.0
}

impl Default for HullGeometry {
    fn default() -> Self {
        Self { length_m: default_length() }
    }
}

impl HullGeometry {
    pub fn new(length_m: f64) -> Self {
        Self { length_m }
    }

    pub fn radius_m(&self) -> f64 {
        self.length_m * RADIUS_TO_LENGTH_RATIO
    }

    /// Frontal (nose-on) silhouette, m^2
    pub fn nose_cross_section_m2(&self) -> f64 {
        std::f64::consts::PI * self.radius_m() * self.radius_m()
    }

    /// Tail silhouette is slightly larger than the nose due to engine bells
    pub fn tail_cross_section_m2(&self) -> f64 {
        self.nose_cross_section_m2() * 1.2
    }

    /// Broadside silhouette, m^2
    pub fn lateral_cross_section_m2(&self) -> f64 {
        self.length_m * 2.0 * self.radius_m()
    }

    /// Silhouette presented toward a viewing direction, blending frontal and
    /// broadside projections by the angle off the hull axis.
    pub fn cross_section_toward(&self, view_dir: &Vec3, forward: &Vec3) -> f64 {
        let cos_angle = view_dir.normalized().dot(&forward.normalized()).clamp(-1.0, 1.0);
        let frontal_factor = cos_angle.abs();
        let side_factor = (1.0 - cos_angle * cos_angle).sqrt();
        frontal_factor * self.nose_cross_section_m2() + side_factor * self.lateral_cross_section_m2()
    }

    /// Classify the facing struck by a projectile travelling along
    /// `impact_dir` against a hull pointing along `forward`.
    ///
    /// A projectile arriving head-on travels opposite to forward, so an
    /// angle near 180 degrees is a nose hit and an angle near zero (caught
    /// from behind) is a tail hit.
    pub fn hit_location(&self, impact_dir: &Vec3, forward: &Vec3) -> HitLocation {
        let angle_deg = impact_dir.angle_to(forward).to_degrees();
        if angle_deg > 180.0 - NOSE_HIT_ANGLE_DEG {
            HitLocation::Nose
        } else if angle_deg < 180.0 - TAIL_HIT_ANGLE_DEG {
            HitLocation::Tail
        } else {
            HitLocation::Lateral
        }
    }
}

/// Time to closest approach for two points in uniform relative motion.
///
/// Returns (tca_s, closest_distance_m); tca is clamped to zero if the pair
/// is already separating.
pub fn time_to_closest_approach(
    pos_a: &Vec3,
    vel_a: &Vec3,
    pos_b: &Vec3,
    vel_b: &Vec3,
) -> (f64, f64) {
    let rel_pos = *pos_a - *pos_b;
    let rel_vel = *vel_a - *vel_b;
    let vel_sq = rel_vel.magnitude_squared();
    if vel_sq < 1e-10 {
        return (0.0, rel_pos.magnitude());
    }
    let tca = -rel_pos.dot(&rel_vel) / vel_sq;
    if tca < 0.0 {
        return (0.0, rel_pos.magnitude());
    }
    let closest = rel_pos + rel_vel * tca;
    (tca, closest.magnitude())
}

/// Sweep a segment against a hull cylinder (sides and end caps).
///
/// `tolerance_m` widens the cylinder radius to stand in for dispersion.
/// Returns the impact point and the parametric position along the segment.
pub fn segment_hits_cylinder(
    start: &Vec3,
    end: &Vec3,
    hull_center: &Vec3,
    hull_forward: &Vec3,
    geometry: &HullGeometry,
    tolerance_m: f64,
) -> Option<(Vec3, f64)> {
    let radius = geometry.radius_m() + tolerance_m;
    let half_length = geometry.length_m / 2.0;

    // Build an orthonormal hull frame with forward as local X.
    let forward = hull_forward.normalized();
    let reference = if forward.z.abs() < 0.9 { Vec3::unit_z() } else { Vec3::unit_x() };
    let right = forward.cross(&reference).normalized();
    let up = right.cross(&forward).normalized();

    let to_local = |p: &Vec3| {
        let rel = *p - *hull_center;
        Vec3::new(rel.dot(&forward), rel.dot(&right), rel.dot(&up))
    };
    let s = to_local(start);
    let e = to_local(end);
    let d = e - s;

    let mut best_t: Option<f64> = None;
    let mut consider = |t: f64| {
        if (0.0..=1.0).contains(&t) && best_t.map_or(true, |b| t < b) {
            best_t = Some(t);
        }
    };

    // Infinite-cylinder side surface: (s.y + t d.y)^2 + (s.z + t d.z)^2 = r^2
    let a = d.y * d.y + d.z * d.z;
    if a > 1e-10 {
        let b = 2.0 * (s.y * d.y + s.z * d.z);
        let c = s.y * s.y + s.z * s.z - radius * radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant >= 0.0 {
            let sqrt_disc = discriminant.sqrt();
            for t in [(-b - sqrt_disc) / (2.0 * a), (-b + sqrt_disc) / (2.0 * a)] {
                let x = s.x + t * d.x;
                if (-half_length..=half_length).contains(&x) {
                    consider(t);
                }
            }
        }
    }

    // End caps at x = +/- half_length.
    if d.x.abs() > 1e-10 {
        for cap_x in [half_length, -half_length] {
            let t = (cap_x - s.x) / d.x;
            let y = s.y + t * d.y;
            let z = s.z + t * d.z;
            if y * y + z * z <= radius * radius {
                consider(t);
            }
        }
    }

    best_t.map(|t| (*start + (*end - *start) * t, t))
}

/// Sweep a segment against a sphere. Fallback test for hulls without
/// detailed geometry.
pub fn segment_hits_sphere(start: &Vec3, end: &Vec3, center: &Vec3, radius: f64) -> bool {
    let line = *end - *start;
    let len_sq = line.magnitude_squared();
    if len_sq < 1e-10 {
        return start.distance_to(center) <= radius;
    }
    let t = ((*center - *start).dot(&line) / len_sq).clamp(0.0, 1.0);
    let closest = *start + line * t;
    closest.distance_to(center) <= radius
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_on_impact_is_nose_hit() {
        let geom = HullGeometry::new(120.0);
        // Hull faces +X, projectile travels -X (arriving from ahead).
        let loc = geom.hit_location(&-Vec3::unit_x(), &Vec3::unit_x());
        assert_eq!(loc, HitLocation::Nose);
    }

    #[test]
    fn test_stern_chase_impact_is_tail_hit() {
        let geom = HullGeometry::new(120.0);
        let loc = geom.hit_location(&Vec3::unit_x(), &Vec3::unit_x());
        assert_eq!(loc, HitLocation::Tail);
    }

    #[test]
    fn test_beam_impact_is_lateral_hit() {
        let geom = HullGeometry::new(120.0);
        let loc = geom.hit_location(&Vec3::unit_y(), &Vec3::unit_x());
        assert_eq!(loc, HitLocation::Lateral);
    }

    #[test]
    fn test_broadside_cross_section_largest() {
        let geom = HullGeometry::new(120.0);
        assert!(geom.lateral_cross_section_m2() > geom.tail_cross_section_m2());
        assert!(geom.tail_cross_section_m2() > geom.nose_cross_section_m2());
    }

    #[test]
    fn test_cross_section_blends_with_aspect() {
        let geom = HullGeometry::new(120.0);
        let head_on = geom.cross_section_toward(&Vec3::unit_x(), &Vec3::unit_x());
        let broadside = geom.cross_section_toward(&Vec3::unit_y(), &Vec3::unit_x());
        assert!((head_on - geom.nose_cross_section_m2()).abs() < 1e-6);
        assert!((broadside - geom.lateral_cross_section_m2()).abs() < 1e-6);
        let quartering = geom.cross_section_toward(
            &Vec3::new(1.0, 1.0, 0.0).normalized(),
            &Vec3::unit_x(),
        );
        assert!(quartering > head_on && quartering < head_on + broadside);
    }

    #[test]
    fn test_tca_closing_pair() {
        let (tca, dist) = time_to_closest_approach(
            &Vec3::new(-1000.0, 100.0, 0.0),
            &Vec3::new(100.0, 0.0, 0.0),
            &Vec3::zero(),
            &Vec3::zero(),
        );
        assert!((tca - 10.0).abs() < 1e-9);
        assert!((dist - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_tca_separating_pair_clamped_to_now() {
        let (tca, _) = time_to_closest_approach(
            &Vec3::new(1000.0, 0.0, 0.0),
            &Vec3::new(100.0, 0.0, 0.0),
            &Vec3::zero(),
            &Vec3::zero(),
        );
        assert_eq!(tca, 0.0);
    }

    #[test]
    fn test_segment_through_cylinder_hits() {
        let geom = HullGeometry::new(100.0);
        let hit = segment_hits_cylinder(
            &Vec3::new(0.0, -1000.0, 0.0),
            &Vec3::new(0.0, 1000.0, 0.0),
            &Vec3::zero(),
            &Vec3::unit_x(),
            &geom,
            0.0,
        );
        assert!(hit.is_some());
        let (point, _) = hit.unwrap();
        // Entry on the -Y side of the hull at its radius.
        assert!((point.y + geom.radius_m()).abs() < 1e-6);
    }

    #[test]
    fn test_segment_past_cylinder_misses() {
        let geom = HullGeometry::new(100.0);
        let hit = segment_hits_cylinder(
            &Vec3::new(0.0, -1000.0, 500.0),
            &Vec3::new(0.0, 1000.0, 500.0),
            &Vec3::zero(),
            &Vec3::unit_x(),
            &geom,
            0.0,
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_tolerance_widens_the_cylinder() {
        let geom = HullGeometry::new(100.0);
        let start = Vec3::new(0.0, -1000.0, 200.0);
        let end = Vec3::new(0.0, 1000.0, 200.0);
        let center = Vec3::zero();
        assert!(segment_hits_cylinder(&start, &end, &center, &Vec3::unit_x(), &geom, 0.0).is_none());
        assert!(segment_hits_cylinder(&start, &end, &center, &Vec3::unit_x(), &geom, 500.0).is_some());
    }

    #[test]
    fn test_sphere_sweep_hit_and_miss() {
        let center = Vec3::zero();
        assert!(segment_hits_sphere(
            &Vec3::new(-1000.0, 30.0, 0.0),
            &Vec3::new(1000.0, 30.0, 0.0),
            &center,
            50.0,
        ));
        assert!(!segment_hits_sphere(
            &Vec3::new(-1000.0, 80.0, 0.0),
            &Vec3::new(1000.0, 80.0, 0.0),
            &center,
            50.0,
        ));
        // Degenerate zero-length segment falls back to a point test.
        let p = Vec3::new(10.0, 0.0, 0.0);
        assert!(segment_hits_sphere(&p, &p, &center, 50.0));
    }

    #[test]
    fn test_end_cap_hit() {
        let geom = HullGeometry::new(100.0);
        let hit = segment_hits_cylinder(
            &Vec3::new(-1000.0, 0.0, 0.0),
            &Vec3::new(1000.0, 0.0, 0.0),
            &Vec3::zero(),
            &Vec3::unit_x(),
            &geom,
            0.0,
        );
        assert!(hit.is_some());
        let (point, _) = hit.unwrap();
        assert!((point.x + 50.0).abs() < 1e-6);
    }
}
