//! Property-based tests for color3mf
//!
//! These tests use proptest to generate triangle lists and color tokens and
//! verify the canonical form and color resolution invariants hold across a
//! wide range of inputs.

use color3mf::canonical::{canonicalize, canonicalize_triangle, is_canonical};
use color3mf::{Rgba, SlicerConfig, Triangle, parse_color, resolve_color};
use proptest::prelude::*;

// ============================================================================
// Generators
// ============================================================================

/// Generate a triangle with small indices so degenerate ones show up often
fn triangle_strategy() -> impl Strategy<Value = Triangle> {
    (
        0usize..8,
        0usize..8,
        0usize..8,
        prop::option::of(0usize..4),
        prop::option::of(0usize..100),
        prop::option::of(0usize..100),
        prop::option::of(0usize..100),
    )
        .prop_map(|(v1, v2, v3, pid, p1, p2, p3)| {
            let mut tri = Triangle::new(v1, v2, v3);
            tri.pid = pid;
            tri.p1 = p1;
            tri.p2 = p2;
            tri.p3 = p3;
            tri
        })
}

/// Generate a triangle list together with a shuffled copy of it
fn shuffled_triangles_strategy() -> impl Strategy<Value = (Vec<Triangle>, Vec<Triangle>)> {
    prop::collection::vec(triangle_strategy(), 0..40)
        .prop_flat_map(|triangles| (Just(triangles.clone()), Just(triangles).prop_shuffle()))
}

/// The three cyclic rotations of a triangle's (vertex, property) pairs
fn rotations(tri: &Triangle) -> Vec<[(usize, Option<usize>); 3]> {
    let pairs = [(tri.v1, tri.p1), (tri.v2, tri.p2), (tri.v3, tri.p3)];
    (0..3)
        .map(|shift| [pairs[shift], pairs[(shift + 1) % 3], pairs[(shift + 2) % 3]])
        .collect()
}

/// Generate a token that is neither a color name nor a number nor hex
fn unknown_token_strategy() -> impl Strategy<Value = String> {
    "zz[a-z]{3,10}"
}

// ============================================================================
// Canonical form
// ============================================================================

proptest! {
    /// The canonical triangle is a rotation starting at the minimum index
    #[test]
    fn canonical_triangle_is_minimal_rotation(tri in triangle_strategy()) {
        let canonical = canonicalize_triangle(&tri);
        let min = tri.v1.min(tri.v2).min(tri.v3);

        prop_assert_eq!(canonical.v1, min);
        prop_assert_eq!(canonical.pid, tri.pid);

        let canonical_pairs = [
            (canonical.v1, canonical.p1),
            (canonical.v2, canonical.p2),
            (canonical.v3, canonical.p3),
        ];
        prop_assert!(rotations(&tri).contains(&canonical_pairs));
    }

    /// Every rotation of a triangle has the same canonical indices
    #[test]
    fn canonical_triangle_ignores_rotation(tri in triangle_strategy()) {
        let rotated = Triangle::new(tri.v2, tri.v3, tri.v1);
        prop_assert_eq!(
            canonicalize_triangle(&tri).indices(),
            canonicalize_triangle(&rotated).indices()
        );
    }

    /// Canonicalization is idempotent
    #[test]
    fn canonicalize_is_idempotent(triangles in prop::collection::vec(triangle_strategy(), 0..40)) {
        let once = canonicalize(&triangles);
        prop_assert!(is_canonical(&once));
        prop_assert_eq!(canonicalize(&once), once.clone());
        prop_assert_eq!(once.len(), triangles.len());
    }

    /// Input order does not change the canonical list
    #[test]
    fn canonicalize_ignores_input_order((triangles, shuffled) in shuffled_triangles_strategy()) {
        let indices = |list: &[Triangle]| {
            canonicalize(list).iter().map(Triangle::indices).collect::<Vec<_>>()
        };
        prop_assert_eq!(indices(&triangles), indices(&shuffled));
    }
}

// ============================================================================
// Color resolution
// ============================================================================

proptest! {
    /// Resolution never fails and every channel stays in range
    #[test]
    fn resolved_channels_in_range(token in ".{0,16}") {
        let (rgba, _) = resolve_color(&token);
        let (r, g, b, a) = rgba.to_tuple();
        for channel in [r, g, b, a] {
            prop_assert!((0.0..=1.0).contains(&channel));
        }
    }

    /// Unknown tokens resolve to opaque black with a warning naming them
    #[test]
    fn unknown_token_is_black(token in unknown_token_strategy()) {
        let (rgba, warning) = resolve_color(&token);
        prop_assert_eq!(rgba, Rgba::BLACK);
        prop_assert_eq!(warning.map(|w| w.token), Some(token));
    }

    /// Eight-digit hex round-trips through the byte channels
    #[test]
    fn hex_rgba_roundtrip(r in any::<u8>(), g in any::<u8>(), b in any::<u8>(), a in any::<u8>()) {
        let token = format!("#{:02x}{:02X}{:02x}{:02X}", r, g, b, a);
        let rgba = parse_color(&token).unwrap();
        prop_assert_eq!(rgba.to_rgba8(), (r, g, b, a));
    }

    /// Grayscale numbers in [0, 1] are accepted as gray levels
    #[test]
    fn grayscale_is_gray(level in 0.0f64..=1.0) {
        let rgba = parse_color(&level.to_string()).unwrap();
        prop_assert_eq!((rgba.r, rgba.g, rgba.b, rgba.a), (level, level, level, 1.0));
    }
}

// ============================================================================
// Slicer metadata
// ============================================================================

proptest! {
    /// Any label produces a document that reads back as XML
    #[test]
    fn slicer_document_is_well_formed(label in "\\PC{0,20}") {
        let config = SlicerConfig::new(1).with_part(color3mf::PartRecord {
            resource_id: 2,
            label: label.clone(),
        });
        let xml = config.to_xml().unwrap();

        let mut reader = quick_xml::Reader::from_str(&xml);
        let mut values = Vec::new();
        loop {
            match reader.read_event() {
                Ok(quick_xml::events::Event::Eof) => break,
                Ok(quick_xml::events::Event::Empty(e)) => {
                    for attr in e.attributes() {
                        let attr = attr.unwrap();
                        if attr.key.as_ref() == b"value" {
                            let raw = String::from_utf8_lossy(&attr.value);
                            values.push(quick_xml::escape::unescape(&raw).unwrap().into_owned());
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => prop_assert!(false, "malformed XML: {}", e),
            }
        }
        prop_assert_eq!(values, vec![label]);
    }
}
