//! Expanding polytope algorithm
//!
//! Starting from a GJK tetrahedron that encloses the origin, the polytope is
//! grown towards the face of the Minkowski difference nearest the origin. The
//! origin's projection onto that face gives the deepest contact points.

use crate::foundation::math::Vec3;
use crate::physics::body::Body;
use crate::physics::gjk::{self, SupportPoint};

/// Expansion rounds before the current best face is accepted
pub const MAX_EPA_ITERATIONS: usize = 64;

/// Support points closer than this to an existing vertex stop the expansion
const DUPLICATE_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Copy)]
struct Face {
    a: usize,
    b: usize,
    c: usize,
}

impl Face {
    const fn edges(self) -> [Edge; 3] {
        [Edge(self.a, self.b), Edge(self.b, self.c), Edge(self.c, self.a)]
    }
}

#[derive(Debug, Clone, Copy)]
struct Edge(usize, usize);

impl Edge {
    /// Winding is ignored
    const fn same_as(self, other: Self) -> bool {
        (self.0 == other.0 && self.1 == other.1) || (self.0 == other.1 && self.1 == other.0)
    }
}

struct Polytope {
    points: Vec<SupportPoint>,
    faces: Vec<Face>,
}

impl Polytope {
    fn from_tetrahedron(simplex: &[SupportPoint; 4]) -> Self {
        let mut polytope = Self {
            points: simplex.to_vec(),
            faces: Vec::with_capacity(16),
        };

        for i in 0..4 {
            let mut face = Face { a: i, b: (i + 1) % 4, c: (i + 2) % 4 };
            // The fourth point must sit behind the face
            let unused = polytope.points[(i + 3) % 4].xyz;
            if polytope.signed_distance(face, &unused) > 0.0 {
                std::mem::swap(&mut face.a, &mut face.b);
            }
            polytope.faces.push(face);
        }
        polytope
    }

    fn normal(&self, face: Face) -> Vec3 {
        let a = self.points[face.a].xyz;
        let ab = self.points[face.b].xyz - a;
        let ac = self.points[face.c].xyz - a;
        ab.cross(&ac).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros)
    }

    fn signed_distance(&self, face: Face, point: &Vec3) -> f32 {
        self.normal(face).dot(&(point - self.points[face.a].xyz))
    }

    /// Index of the face whose plane passes closest to the origin
    fn closest_face(&self) -> Option<usize> {
        let origin = Vec3::zeros();
        self.faces
            .iter()
            .map(|&face| {
                let dist = self.signed_distance(face, &origin);
                dist * dist
            })
            .enumerate()
            .min_by(|(_, lhs), (_, rhs)| lhs.total_cmp(rhs))
            .map(|(index, _)| index)
    }

    fn has_vertex_near(&self, point: &Vec3) -> bool {
        self.faces.iter().any(|face| {
            [face.a, face.b, face.c]
                .iter()
                .any(|&i| (point - self.points[i].xyz).norm_squared() < DUPLICATE_EPSILON * DUPLICATE_EPSILON)
        })
    }

    /// Remove every face that can see `point`; returns how many went
    fn remove_faces_facing(&mut self, point: &Vec3) -> usize {
        let before = self.faces.len();
        let visible: Vec<bool> = self
            .faces
            .iter()
            .map(|&face| self.signed_distance(face, point) > 0.0)
            .collect();
        let mut flags = visible.into_iter();
        self.faces.retain(|_| !flags.next().unwrap_or(false));
        before - self.faces.len()
    }

    /// Edges used by exactly one remaining face: the rim of the hole
    fn dangling_edges(&self) -> Vec<Edge> {
        let mut dangling = Vec::new();
        for (i, face) in self.faces.iter().enumerate() {
            for edge in face.edges() {
                let shared = self
                    .faces
                    .iter()
                    .enumerate()
                    .any(|(j, other)| j != i && other.edges().iter().any(|&e| e.same_as(edge)));
                if !shared {
                    dangling.push(edge);
                }
            }
        }
        dangling
    }
}

/// Barycentric coordinates of `point` projected onto triangle `s`
fn barycentric(s: [Vec3; 3], point: &Vec3) -> Vec3 {
    let s = [s[0] - point, s[1] - point, s[2] - point];

    let normal = (s[1] - s[0]).cross(&(s[2] - s[0]));
    let p0 = normal * (s[0].dot(&normal) / normal.norm_squared());

    let (x, y, area_max) = gjk::dominant_plane(&s);
    let lambdas = gjk::projected_areas(&s, &p0, x, y) / area_max;

    if lambdas.iter().all(|l| l.is_finite()) {
        lambdas
    } else {
        Vec3::new(1.0, 0.0, 0.0)
    }
}

/// Expand the enclosing tetrahedron and return the contact points on A and B.
///
/// Returns `None` only if the polytope collapses and no face is left.
pub fn expand(body_a: &Body, body_b: &Body, bias: f32, simplex: &[SupportPoint; 4]) -> Option<(Vec3, Vec3)> {
    let mut polytope = Polytope::from_tetrahedron(simplex);
    let center = simplex.iter().map(|p| p.xyz).sum::<Vec3>() * 0.25;

    for _ in 0..MAX_EPA_ITERATIONS {
        let closest = polytope.faces[polytope.closest_face()?];
        let normal = polytope.normal(closest);

        let candidate = gjk::support(body_a, body_b, &normal, bias);
        if polytope.has_vertex_near(&candidate.xyz) {
            break;
        }

        // Cannot expand past this face
        if polytope.signed_distance(closest, &candidate.xyz) <= 0.0 {
            break;
        }

        let new_index = polytope.points.len();
        polytope.points.push(candidate);

        if polytope.remove_faces_facing(&candidate.xyz) == 0 {
            break;
        }

        let rim = polytope.dangling_edges();
        if rim.is_empty() {
            break;
        }

        for edge in rim {
            let mut face = Face { a: new_index, b: edge.1, c: edge.0 };
            if polytope.signed_distance(face, &center) > 0.0 {
                std::mem::swap(&mut face.b, &mut face.c);
            }
            polytope.faces.push(face);
        }
    }

    let face = polytope.faces[polytope.closest_face()?];
    let [a, b, c] = [polytope.points[face.a], polytope.points[face.b], polytope.points[face.c]];
    let lambdas = barycentric([a.xyz, b.xyz, c.xyz], &Vec3::zeros());

    let on_a = a.on_a * lambdas[0] + b.on_a * lambdas[1] + c.on_a * lambdas[2];
    let on_b = a.on_b * lambdas[0] + b.on_b * lambdas[1] + c.on_b * lambdas[2];
    Some((on_a, on_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_barycentric_of_centroid() {
        let s = [Vec3::new(1.0, 0.0, 1.0), Vec3::new(0.0, 1.0, 1.0), Vec3::new(-1.0, -1.0, 1.0)];
        let centroid = (s[0] + s[1] + s[2]) / 3.0;
        let lambdas = barycentric(s, &centroid);
        assert_relative_eq!(lambdas, Vec3::repeat(1.0 / 3.0), epsilon = 1e-5);
    }

    #[test]
    fn test_degenerate_triangle_falls_back() {
        let s = [Vec3::zeros(), Vec3::zeros(), Vec3::zeros()];
        assert_eq!(barycentric(s, &Vec3::x()), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_dangling_edges_of_open_fan() {
        let simplex = [
            SupportPoint { xyz: Vec3::new(1.0, 0.0, -1.0), ..SupportPoint::default() },
            SupportPoint { xyz: Vec3::new(-1.0, 1.0, -1.0), ..SupportPoint::default() },
            SupportPoint { xyz: Vec3::new(-1.0, -1.0, -1.0), ..SupportPoint::default() },
            SupportPoint { xyz: Vec3::new(0.0, 0.0, 1.0), ..SupportPoint::default() },
        ];
        let mut polytope = Polytope::from_tetrahedron(&simplex);
        assert!(polytope.dangling_edges().is_empty());

        // Removing one face of a closed tetrahedron opens a triangular hole
        polytope.faces.pop();
        assert_eq!(polytope.dangling_edges().len(), 3);
    }

    #[test]
    fn test_tetrahedron_faces_point_outward() {
        let simplex = [
            SupportPoint { xyz: Vec3::new(1.0, 0.0, -1.0), ..SupportPoint::default() },
            SupportPoint { xyz: Vec3::new(-1.0, 1.0, -1.0), ..SupportPoint::default() },
            SupportPoint { xyz: Vec3::new(-1.0, -1.0, -1.0), ..SupportPoint::default() },
            SupportPoint { xyz: Vec3::new(0.0, 0.0, 1.0), ..SupportPoint::default() },
        ];
        let polytope = Polytope::from_tetrahedron(&simplex);
        let center = simplex.iter().map(|p| p.xyz).sum::<Vec3>() * 0.25;
        for &face in &polytope.faces {
            assert!(polytope.signed_distance(face, &center) < 0.0);
        }
    }
}
