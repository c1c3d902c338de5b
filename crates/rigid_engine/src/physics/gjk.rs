//! Gilbert-Johnson-Keerthi distance and intersection queries
//!
//! GJK works on the Minkowski difference `A - B` of two convex shapes: the
//! shapes overlap exactly when that difference contains the origin. The
//! simplex is reduced with the signed-volume method (Montanari et al.), which
//! projects the origin onto the lowest-dimensional sub-simplex that supports
//! it and yields barycentric weights for the witness points at the same time.

use crate::foundation::math::{utils, Vec3, Vec4};
use crate::physics::body::Body;
use crate::physics::epa;

/// Origin counts as enclosed once the simplex is this close (squared)
const CONTAINS_EPSILON: f32 = 1e-4 * 1e-4;

/// Support points closer than this are treated as duplicates
const DUPLICATE_EPSILON: f32 = 1e-6;

/// Point on the Minkowski difference with its witnesses on each body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportPoint {
    /// `on_a - on_b`
    pub xyz: Vec3,
    /// World point on body A
    pub on_a: Vec3,
    /// World point on body B
    pub on_b: Vec3,
}

impl Default for SupportPoint {
    fn default() -> Self {
        Self {
            xyz: Vec3::zeros(),
            on_a: Vec3::zeros(),
            on_b: Vec3::zeros(),
        }
    }
}

impl SupportPoint {
    /// Recompute the difference after moving a witness
    pub fn refresh(&mut self) {
        self.xyz = self.on_a - self.on_b;
    }
}

/// Support of the Minkowski difference `A - B` along `dir`
pub fn support(body_a: &Body, body_b: &Body, dir: &Vec3, bias: f32) -> SupportPoint {
    let dir = dir.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros);

    let on_a = body_a.shape.support(&dir, &body_a.position, &body_a.orientation, bias);
    let on_b = body_b.shape.support(&-dir, &body_b.position, &body_b.orientation, bias);
    SupportPoint { xyz: on_a - on_b, on_a, on_b }
}

fn same_sign(a: f32, b: f32) -> bool {
    (a > 0.0 && b > 0.0) || (a < 0.0 && b < 0.0)
}

/// Barycentric weights of the point on segment `s1 s2` closest to the origin
pub fn signed_volume_1d(s1: &Vec3, s2: &Vec3) -> [f32; 2] {
    let ab = s2 - s1;
    let ap = -s1;
    let p0 = s1 + ab * (ab.dot(&ap) / ab.norm_squared());

    // Work on the axis where the segment is longest
    let mut axis = 0;
    let mut mu_max = 0.0_f32;
    for i in 0..3 {
        let mu = s2[i] - s1[i];
        if mu * mu > mu_max * mu_max {
            mu_max = mu;
            axis = i;
        }
    }

    let (a, b, p) = (s1[axis], s2[axis], p0[axis]);
    let c1 = p - a;
    let c2 = b - p;

    if (p > a && p < b) || (p > b && p < a) {
        return [c2 / mu_max, c1 / mu_max];
    }
    if (a <= b && p <= a) || (a >= b && p >= a) {
        return [1.0, 0.0];
    }
    [0.0, 1.0]
}

/// Signed area of the 2D triangle `abc`
fn area_2d(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> f32 {
    let ab = (b.0 - a.0, b.1 - a.1);
    let ac = (c.0 - a.0, c.1 - a.1);
    ab.0 * ac.1 - ab.1 * ac.0
}

/// Picks the coordinate plane in which triangle `s` has the largest area.
/// Returns the two axes of that plane and the signed area there.
pub(crate) fn dominant_plane(s: &[Vec3; 3]) -> (usize, usize, f32) {
    let mut best = 0;
    let mut area_max = 0.0_f32;
    for i in 0..3 {
        let (j, k) = ((i + 1) % 3, (i + 2) % 3);
        let area = area_2d((s[0][j], s[0][k]), (s[1][j], s[1][k]), (s[2][j], s[2][k]));
        if area * area > area_max * area_max {
            best = i;
            area_max = area;
        }
    }
    ((best + 1) % 3, (best + 2) % 3, area_max)
}

/// Sub-areas formed by `p` and each edge opposite a vertex, in the plane
/// spanned by axes `x` and `y`
pub(crate) fn projected_areas(s: &[Vec3; 3], p: &Vec3, x: usize, y: usize) -> Vec3 {
    let projected = [(s[0][x], s[0][y]), (s[1][x], s[1][y]), (s[2][x], s[2][y])];
    let p = (p[x], p[y]);

    let mut areas = Vec3::zeros();
    for i in 0..3 {
        areas[i] = area_2d(p, projected[(i + 1) % 3], projected[(i + 2) % 3]);
    }
    areas
}

/// Barycentric weights of the point on triangle `s1 s2 s3` closest to the origin
pub fn signed_volume_2d(s1: &Vec3, s2: &Vec3, s3: &Vec3) -> Vec3 {
    let normal = (s2 - s1).cross(&(s3 - s1));
    let p0 = normal * (s1.dot(&normal) / normal.norm_squared());

    let points = [*s1, *s2, *s3];
    let (x, y, area_max) = dominant_plane(&points);
    let areas = projected_areas(&points, &p0, x, y);

    if (0..3).all(|i| same_sign(area_max, areas[i])) {
        return areas / area_max;
    }

    // Outside the triangle: take the best of the three edges
    let mut dist = f32::MAX;
    let mut lambdas = Vec3::new(1.0, 0.0, 0.0);
    for i in 0..3 {
        let (k, l) = ((i + 1) % 3, (i + 2) % 3);
        let edge = signed_volume_1d(&points[k], &points[l]);
        let point = points[k] * edge[0] + points[l] * edge[1];
        if point.norm_squared() < dist {
            dist = point.norm_squared();
            lambdas[i] = 0.0;
            lambdas[k] = edge[0];
            lambdas[l] = edge[1];
        }
    }
    lambdas
}

fn det3(a: &Vec3, b: &Vec3, c: &Vec3) -> f32 {
    a.dot(&b.cross(c))
}

/// Barycentric weights of the point on tetrahedron `s1..s4` closest to the origin
pub fn signed_volume_3d(s1: &Vec3, s2: &Vec3, s3: &Vec3, s4: &Vec3) -> Vec4 {
    // Cofactors of the bottom row of [s1 s2 s3 s4; 1 1 1 1]
    let cofactors = Vec4::new(
        -det3(s2, s3, s4),
        det3(s1, s3, s4),
        -det3(s1, s2, s4),
        det3(s1, s2, s3),
    );
    let det = cofactors.sum();

    if (0..4).all(|i| same_sign(det, cofactors[i])) {
        return cofactors / det;
    }

    // Outside: project onto each face and keep the closest
    let points = [*s1, *s2, *s3, *s4];
    let mut dist = f32::MAX;
    let mut lambdas = Vec4::zeros();
    for i in 0..4 {
        let (j, k) = ((i + 1) % 4, (i + 2) % 4);
        let face = signed_volume_2d(&points[i], &points[j], &points[k]);
        let point = points[i] * face[0] + points[j] * face[1] + points[k] * face[2];
        if point.norm_squared() < dist {
            dist = point.norm_squared();
            lambdas = Vec4::zeros();
            lambdas[i] = face[0];
            lambdas[j] = face[1];
            lambdas[k] = face[2];
        }
    }
    lambdas
}

/// Working simplex: up to four support points, all slots start at zero
#[derive(Debug, Clone, Default)]
struct Simplex {
    points: [SupportPoint; 4],
    len: usize,
}

impl Simplex {
    fn new(first: SupportPoint) -> Self {
        let mut simplex = Self::default();
        simplex.points[0] = first;
        simplex.len = 1;
        simplex
    }

    fn push(&mut self, point: SupportPoint) {
        self.points[self.len] = point;
        self.len += 1;
    }

    /// Checks every slot, including unused ones
    fn contains(&self, point: &SupportPoint) -> bool {
        self.points
            .iter()
            .any(|existing| (existing.xyz - point.xyz).norm_squared() < DUPLICATE_EPSILON * DUPLICATE_EPSILON)
    }

    /// Weights of the closest point to the origin, the new search
    /// direction, and whether the origin is (numerically) enclosed
    fn reduce(&self) -> (Vec4, Vec3, bool) {
        let p = &self.points;
        let lambdas = match self.len {
            2 => {
                let l = signed_volume_1d(&p[0].xyz, &p[1].xyz);
                Vec4::new(l[0], l[1], 0.0, 0.0)
            }
            3 => {
                let l = signed_volume_2d(&p[0].xyz, &p[1].xyz, &p[2].xyz);
                Vec4::new(l[0], l[1], l[2], 0.0)
            }
            4 => signed_volume_3d(&p[0].xyz, &p[1].xyz, &p[2].xyz, &p[3].xyz),
            _ => Vec4::new(1.0, 0.0, 0.0, 0.0),
        };

        let closest: Vec3 = (0..self.len).map(|i| p[i].xyz * lambdas[i]).sum();
        (lambdas, -closest, closest.norm_squared() < CONTAINS_EPSILON)
    }

    /// Drop points with zero weight, compacting the rest to the front
    fn keep_supporting(&mut self, lambdas: &mut Vec4) {
        let mut points = [SupportPoint::default(); 4];
        let mut weights = Vec4::zeros();
        let mut count = 0;
        for i in 0..4 {
            if lambdas[i] != 0.0 {
                points[count] = self.points[i];
                weights[count] = lambdas[i];
                count += 1;
            }
        }
        self.points = points;
        *lambdas = weights;
        self.len = count;
    }

    /// Blend the witness points with the given weights
    fn witnesses(&self, lambdas: &Vec4) -> (Vec3, Vec3) {
        let mut on_a = Vec3::zeros();
        let mut on_b = Vec3::zeros();
        for i in 0..4 {
            on_a += self.points[i].on_a * lambdas[i];
            on_b += self.points[i].on_b * lambdas[i];
        }
        (on_a, on_b)
    }
}

/// Core GJK loop shared by the boolean and penetration queries
fn enclose_origin(body_a: &Body, body_b: &Body) -> (bool, Simplex) {
    let mut simplex = Simplex::new(support(body_a, body_b, &Vec3::repeat(1.0), 0.0));
    let mut dir = -simplex.points[0].xyz;
    let mut closest_dist = f32::MAX;

    loop {
        let candidate = support(body_a, body_b, &dir, 0.0);
        if simplex.contains(&candidate) {
            return (false, simplex);
        }
        simplex.push(candidate);

        // The new point did not pass the origin, so the origin is outside
        if dir.dot(&candidate.xyz) < 0.0 {
            return (false, simplex);
        }

        let (mut lambdas, new_dir, contains_origin) = simplex.reduce();
        if contains_origin {
            return (true, simplex);
        }

        // No progress towards the origin
        let dist = new_dir.norm_squared();
        if dist >= closest_dist {
            return (false, simplex);
        }
        closest_dist = dist;
        dir = new_dir;

        simplex.keep_supporting(&mut lambdas);
        if simplex.len == 4 {
            return (true, simplex);
        }
    }
}

/// Boolean overlap test
pub fn intersects(body_a: &Body, body_b: &Body) -> bool {
    enclose_origin(body_a, body_b).0
}

/// Overlap test that also returns the deepest contact points.
///
/// Both shapes are inflated by `bias` before the polytope is expanded, so the
/// returned points lie `bias` outside the true surfaces. Returns `None` when
/// the shapes do not overlap.
pub fn penetration(body_a: &Body, body_b: &Body, bias: f32) -> Option<(Vec3, Vec3)> {
    let (hit, mut simplex) = enclose_origin(body_a, body_b);
    if !hit {
        return None;
    }

    // EPA needs a full tetrahedron to start from
    if simplex.len == 1 {
        let dir = -simplex.points[0].xyz;
        simplex.push(support(body_a, body_b, &dir, 0.0));
    }
    if simplex.len == 2 {
        let ab = simplex.points[1].xyz - simplex.points[0].xyz;
        let (u, _) = utils::orthonormal_basis(&ab.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::z));
        simplex.push(support(body_a, body_b, &u, 0.0));
    }
    if simplex.len == 3 {
        let ab = simplex.points[1].xyz - simplex.points[0].xyz;
        let ac = simplex.points[2].xyz - simplex.points[0].xyz;
        simplex.push(support(body_a, body_b, &ab.cross(&ac), 0.0));
    }

    // Inflate the simplex away from its center by the bias
    let center = simplex.points.iter().map(|p| p.xyz).sum::<Vec3>() * 0.25;
    for point in &mut simplex.points {
        let dir = (point.xyz - center).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros);
        point.on_a += dir * bias;
        point.on_b -= dir * bias;
        point.refresh();
    }

    epa::expand(body_a, body_b, bias, &simplex.points)
}

/// Closest points between two separated shapes
pub fn closest_points(body_a: &Body, body_b: &Body) -> (Vec3, Vec3) {
    let mut simplex = Simplex::new(support(body_a, body_b, &Vec3::repeat(1.0), 0.0));
    let mut lambdas = Vec4::new(1.0, 0.0, 0.0, 0.0);
    let mut dir = -simplex.points[0].xyz;
    let mut closest_dist = f32::MAX;

    while simplex.len < 4 {
        let candidate = support(body_a, body_b, &dir, 0.0);
        if simplex.contains(&candidate) {
            break;
        }
        simplex.push(candidate);

        let (weights, new_dir, _) = simplex.reduce();
        lambdas = weights;
        simplex.keep_supporting(&mut lambdas);
        dir = new_dir;

        let dist = dir.norm_squared();
        if dist >= closest_dist {
            break;
        }
        closest_dist = dist;
    }

    simplex.witnesses(&lambdas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::shapes::{BoxShape, Shape};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn create_test_box(position: Vec3) -> Body {
        Body::new(Arc::new(Shape::Box(BoxShape::new(Vec3::repeat(1.0)))))
            .with_position(position)
            .with_inv_mass(1.0)
    }

    fn create_test_sphere(position: Vec3) -> Body {
        Body::new(Arc::new(Shape::sphere(1.0)))
            .with_position(position)
            .with_inv_mass(1.0)
    }

    #[test]
    fn test_signed_volume_1d() {
        let l = signed_volume_1d(&Vec3::new(-1.0, 1.0, 0.0), &Vec3::new(3.0, 1.0, 0.0));
        assert_relative_eq!(l[0], 0.75, epsilon = 1e-6);
        assert_relative_eq!(l[1], 0.25, epsilon = 1e-6);

        // Origin beyond the first endpoint
        assert_eq!(signed_volume_1d(&Vec3::new(1.0, 1.0, 0.0), &Vec3::new(3.0, 1.0, 0.0)), [1.0, 0.0]);
    }

    #[test]
    fn test_signed_volume_3d_inside_and_outside() {
        let offset = Vec3::repeat(-0.25);
        let l = signed_volume_3d(&offset, &(Vec3::x() + offset), &(Vec3::y() + offset), &(Vec3::z() + offset));
        assert_relative_eq!(l, Vec4::repeat(0.25), epsilon = 1e-5);

        // Origin outside: weights sum to one and touch at most a face
        let offset = Vec3::repeat(1.0);
        let l = signed_volume_3d(&offset, &(Vec3::x() + offset), &(Vec3::y() + offset), &(Vec3::z() + offset));
        assert_relative_eq!(l.sum(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(l[0], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_separated_spheres_do_not_intersect() {
        let a = create_test_sphere(Vec3::zeros());
        let b = create_test_sphere(Vec3::new(3.0, 0.0, 0.0));
        assert!(!intersects(&a, &b));
        assert!(penetration(&a, &b, 0.001).is_none());
    }

    #[test]
    fn test_overlapping_boxes_intersect() {
        let a = create_test_box(Vec3::zeros());
        let b = create_test_box(Vec3::new(1.5, 0.2, -0.1));
        assert!(intersects(&a, &b));
    }

    #[test]
    fn test_epa_depth_for_overlapping_boxes() {
        let a = create_test_box(Vec3::zeros());
        let b = create_test_box(Vec3::new(1.8, 0.0, 0.0));

        let (on_a, on_b) = penetration(&a, &b, 0.0).unwrap();
        let depth = (on_b - on_a).norm();

        // Faces overlap by 0.2 along X
        assert_relative_eq!(depth, 0.2, epsilon = 0.01);
        assert_relative_eq!(on_a.x, 1.0, epsilon = 0.01);
        assert_relative_eq!(on_b.x, 0.8, epsilon = 0.01);
    }

    #[test]
    fn test_closest_points_between_boxes() {
        let a = create_test_box(Vec3::zeros());
        let b = create_test_box(Vec3::new(0.0, 0.0, 5.0));

        let (on_a, on_b) = closest_points(&a, &b);
        assert_relative_eq!(on_a.z, 1.0, epsilon = 1e-4);
        assert_relative_eq!(on_b.z, 4.0, epsilon = 1e-4);
        assert_relative_eq!((on_b - on_a).norm(), 3.0, epsilon = 1e-4);
    }

    #[test]
    fn test_closest_points_between_spheres() {
        let a = create_test_sphere(Vec3::zeros());
        let b = create_test_sphere(Vec3::new(2.0, 2.0, 1.0));

        let (on_a, on_b) = closest_points(&a, &b);
        // Centers are 3 apart, so the gap is 1
        assert_relative_eq!((on_b - on_a).norm(), 1.0, epsilon = 1e-3);
    }
}
