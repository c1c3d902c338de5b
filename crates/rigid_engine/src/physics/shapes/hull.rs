//! Incremental convex hull construction
//!
//! Starts from the largest tetrahedron that can be found in the cloud and
//! grows it one extreme point at a time, replacing every face that can see
//! the new point with a fan of faces around the horizon.

use crate::foundation::math::Vec3;
use crate::physics::error::HullError;

/// Triangle as indices into the hull point list, wound counter-clockwise
/// when seen from outside
pub type Triangle = [usize; 3];

/// Points closer than this to an existing hull vertex are dropped
const WELD_DISTANCE: f32 = 0.01;

/// Below this a line or plane counts as degenerate
const DEGENERATE_EPSILON: f32 = 1e-6;

/// Builds the convex hull of `points`, returning the hull vertices and faces.
pub fn build_convex_hull(points: &[Vec3]) -> Result<(Vec<Vec3>, Vec<Triangle>), HullError> {
    if points.len() < 4 {
        return Err(HullError::TooFewPoints(points.len()));
    }

    let (mut hull_points, mut triangles) = build_tetrahedron(points)?;

    let mut external = points.to_vec();
    remove_internal_points(&hull_points, &triangles, &mut external);

    while let Some(first) = external.first().copied() {
        let index = furthest_in_direction(&external, &first);
        let point = external.remove(index);

        add_point(&mut hull_points, &mut triangles, point);
        remove_internal_points(&hull_points, &triangles, &mut external);
    }

    remove_unreferenced_points(&mut hull_points, &mut triangles);
    Ok((hull_points, triangles))
}

/// True if `point` is in front of any face of the hull
pub fn is_external(hull_points: &[Vec3], triangles: &[Triangle], point: &Vec3) -> bool {
    triangles
        .iter()
        .any(|triangle| face_distance(hull_points, triangle, point) > 0.0)
}

fn face_distance(hull_points: &[Vec3], triangle: &Triangle, point: &Vec3) -> f32 {
    let [a, b, c] = *triangle;
    distance_from_triangle(&hull_points[a], &hull_points[b], &hull_points[c], point)
}

fn furthest_in_direction(points: &[Vec3], dir: &Vec3) -> usize {
    let mut best = 0;
    let mut best_dist = dir.dot(&points[0]);
    for (i, point) in points.iter().enumerate().skip(1) {
        let dist = dir.dot(point);
        if dist > best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

fn distance_from_line(a: &Vec3, b: &Vec3, point: &Vec3) -> f32 {
    let ab = (b - a).normalize();
    let ray = point - a;
    (ray - ab * ray.dot(&ab)).norm()
}

/// Signed distance of `point` above the plane of triangle `abc`
fn distance_from_triangle(a: &Vec3, b: &Vec3, c: &Vec3, point: &Vec3) -> f32 {
    let normal = (b - a).cross(&(c - a)).normalize();
    (point - a).dot(&normal)
}

fn build_tetrahedron(points: &[Vec3]) -> Result<(Vec<Vec3>, Vec<Triangle>), HullError> {
    let p0 = points[furthest_in_direction(points, &Vec3::x())];
    let p1 = points[furthest_in_direction(points, &-p0)];
    if (p1 - p0).norm_squared() < DEGENERATE_EPSILON {
        return Err(HullError::Collinear);
    }

    let p2 = points
        .iter()
        .map(|p| (p, distance_from_line(&p0, &p1, p)))
        .fold((p0, 0.0_f32), |best, (p, dist)| if dist > best.1 { (*p, dist) } else { best });
    if p2.1 < DEGENERATE_EPSILON {
        return Err(HullError::Collinear);
    }
    let p2 = p2.0;

    // Largest absolute distance, either side of the plane
    let p3 = points
        .iter()
        .map(|p| (p, distance_from_triangle(&p0, &p1, &p2, p)))
        .fold((p0, 0.0_f32), |best, (p, dist)| {
            if dist * dist > best.1 * best.1 { (*p, dist) } else { best }
        });
    if p3.1.abs() < DEGENERATE_EPSILON {
        return Err(HullError::Coplanar);
    }
    let p3 = p3.0;

    // Keep every face wound outward
    let (p0, p1) = if distance_from_triangle(&p0, &p1, &p2, &p3) > 0.0 {
        (p1, p0)
    } else {
        (p0, p1)
    };

    let hull_points = vec![p0, p1, p2, p3];
    let triangles = vec![[0, 1, 2], [0, 2, 3], [2, 1, 3], [1, 0, 3]];
    Ok((hull_points, triangles))
}

fn remove_internal_points(hull_points: &[Vec3], triangles: &[Triangle], candidates: &mut Vec<Vec3>) {
    candidates.retain(|point| is_external(hull_points, triangles, point));
    candidates.retain(|point| {
        hull_points
            .iter()
            .all(|hull_point| (hull_point - point).norm_squared() >= WELD_DISTANCE * WELD_DISTANCE)
    });
}

fn edges(triangle: &Triangle) -> [(usize, usize); 3] {
    let [a, b, c] = *triangle;
    [(a, b), (b, c), (c, a)]
}

fn same_edge(lhs: (usize, usize), rhs: (usize, usize)) -> bool {
    lhs == rhs || (lhs.0 == rhs.1 && lhs.1 == rhs.0)
}

fn add_point(hull_points: &mut Vec<Vec3>, triangles: &mut Vec<Triangle>, point: Vec3) {
    let facing: Vec<usize> = triangles
        .iter()
        .enumerate()
        .filter(|&(_, triangle)| face_distance(hull_points, triangle, &point) > 0.0)
        .map(|(i, _)| i)
        .collect();

    // Horizon: edges owned by exactly one facing triangle
    let mut horizon = Vec::new();
    for &tri_index in &facing {
        for edge in edges(&triangles[tri_index]) {
            let shared = facing
                .iter()
                .filter(|&&other| other != tri_index)
                .any(|&other| edges(&triangles[other]).iter().any(|&e| same_edge(e, edge)));
            if !shared {
                horizon.push(edge);
            }
        }
    }

    // Indices are ascending, so remove from the back
    for &tri_index in facing.iter().rev() {
        triangles.remove(tri_index);
    }

    hull_points.push(point);
    let new_index = hull_points.len() - 1;
    triangles.extend(horizon.into_iter().map(|(a, b)| [a, b, new_index]));
}

fn remove_unreferenced_points(hull_points: &mut Vec<Vec3>, triangles: &mut [Triangle]) {
    let mut remap = vec![usize::MAX; hull_points.len()];
    for triangle in triangles.iter() {
        for &index in triangle {
            remap[index] = 0;
        }
    }

    let mut next = 0;
    for slot in &mut remap {
        if *slot == 0 {
            *slot = next;
            next += 1;
        }
    }

    let mut index = 0;
    hull_points.retain(|_| {
        let keep = remap[index] != usize::MAX;
        index += 1;
        keep
    });
    for triangle in triangles.iter_mut() {
        for vertex in triangle.iter_mut() {
            *vertex = remap[*vertex];
        }
    }
}
