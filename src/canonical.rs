//! Canonical triangle ordering
//!
//! Renderers emit triangles in whatever order their internals produce. To make
//! merged output reproducible, every triangle is rotated so its smallest vertex
//! index comes first, then the list is sorted by `(v1, v2, v3)`.
//!
//! Only cyclic rotations are applied: `(a, b, c)` may become `(b, c, a)` or
//! `(c, a, b)` but never `(a, c, b)`, which would flip the face normal.

use crate::model::Triangle;

/// Rotate a triangle so that its minimum vertex index is first
///
/// Per-vertex property indices (`p1`..`p3`) rotate together with their
/// vertices. When the minimum index repeats (degenerate triangles), the
/// lexicographically smallest rotation is chosen, so every rotation of the
/// same face maps to one result.
pub fn canonicalize_triangle(triangle: &Triangle) -> Triangle {
    let indices = triangle.indices();
    let rotation = |shift: usize| [0, 1, 2].map(|offset| indices[(shift + offset) % 3]);
    let shift = (0..3).min_by_key(|&shift| rotation(shift)).unwrap_or(0);

    let properties = [triangle.p1, triangle.p2, triangle.p3];
    let at = |offset: usize| (shift + offset) % 3;

    Triangle {
        v1: indices[at(0)],
        v2: indices[at(1)],
        v3: indices[at(2)],
        pid: triangle.pid,
        p1: properties[at(0)],
        p2: properties[at(1)],
        p3: properties[at(2)],
    }
}

/// Canonicalize a triangle list: rotate every triangle, then sort by `(v1, v2, v3)`
///
/// The sort is stable, so triangles with identical indices keep their
/// relative order.
pub fn canonicalize(triangles: &[Triangle]) -> Vec<Triangle> {
    let mut canonical: Vec<Triangle> = triangles.iter().map(canonicalize_triangle).collect();
    canonical.sort_by_key(Triangle::indices);
    canonical
}

/// Whether a triangle list is already in canonical form
pub fn is_canonical(triangles: &[Triangle]) -> bool {
    triangles
        .iter()
        .all(|t| canonicalize_triangle(t).indices() == t.indices())
        && triangles.windows(2).all(|pair| pair[0].indices() <= pair[1].indices())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_keeps_winding() {
        assert_eq!(canonicalize_triangle(&Triangle::new(2, 0, 1)).indices(), [0, 1, 2]);
        assert_eq!(canonicalize_triangle(&Triangle::new(1, 2, 0)).indices(), [0, 1, 2]);
        assert_eq!(canonicalize_triangle(&Triangle::new(0, 2, 1)).indices(), [0, 2, 1]);
        // (5, 9, 3) rotates, it is never swapped into (3, 5, 9)
        assert_eq!(canonicalize_triangle(&Triangle::new(5, 9, 3)).indices(), [3, 5, 9]);
        assert_eq!(canonicalize_triangle(&Triangle::new(9, 3, 5)).indices(), [3, 5, 9]);
        assert_eq!(canonicalize_triangle(&Triangle::new(9, 5, 3)).indices(), [3, 9, 5]);
    }

    #[test]
    fn test_degenerate_triangles() {
        assert_eq!(canonicalize_triangle(&Triangle::new(4, 1, 1)).indices(), [1, 1, 4]);
        assert_eq!(canonicalize_triangle(&Triangle::new(1, 4, 1)).indices(), [1, 1, 4]);
        assert_eq!(canonicalize_triangle(&Triangle::new(1, 1, 4)).indices(), [1, 1, 4]);
        assert_eq!(canonicalize_triangle(&Triangle::new(7, 7, 7)).indices(), [7, 7, 7]);
        assert!(!is_canonical(&[Triangle::new(1, 4, 1)]));
    }

    #[test]
    fn test_properties_follow_their_vertex() {
        let mut triangle = Triangle::new(8, 2, 5);
        triangle.pid = Some(1);
        triangle.p1 = Some(10);
        triangle.p2 = Some(20);
        triangle.p3 = Some(30);

        let canonical = canonicalize_triangle(&triangle);
        assert_eq!(canonical.indices(), [2, 5, 8]);
        assert_eq!(canonical.pid, Some(1));
        assert_eq!((canonical.p1, canonical.p2, canonical.p3), (Some(20), Some(30), Some(10)));
    }

    #[test]
    fn test_list_order_is_independent_of_input_order() {
        let a = vec![
            Triangle::new(3, 1, 2),
            Triangle::new(0, 2, 1),
            Triangle::new(2, 3, 0),
        ];
        let b = vec![
            Triangle::new(0, 2, 3),
            Triangle::new(1, 2, 3),
            Triangle::new(1, 0, 2),
        ];

        let canonical = canonicalize(&a);
        assert_eq!(canonical, canonicalize(&b));
        assert_eq!(
            canonical.iter().map(Triangle::indices).collect::<Vec<_>>(),
            vec![[0, 2, 1], [0, 2, 3], [1, 2, 3]]
        );
        assert!(is_canonical(&canonical));
        assert!(!is_canonical(&a));
    }

    #[test]
    fn test_empty_list() {
        assert!(canonicalize(&[]).is_empty());
        assert!(is_canonical(&[]));
    }
}
