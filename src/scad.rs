//! Color tokens used by an OpenSCAD source file
//!
//! Finds every `color("token")` / `color('token')` call whose argument is a
//! string literal. Calls with vector arguments such as `color([1, 0, 0])`
//! cannot be isolated by label and are ignored.

use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::path::Path;

const CALL_NAME: &str = "color";

/// Read `path` and return its distinct color tokens, sorted
///
/// Fails with [`Error::NoColors`] when the file uses no string color tokens.
pub fn extract_colors(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;

    let colors = scan_colors(&source);
    if colors.is_empty() {
        return Err(Error::NoColors(path.to_path_buf()));
    }
    Ok(colors)
}

/// Distinct color tokens of OpenSCAD source text, sorted
pub fn scan_colors(source: &str) -> Vec<String> {
    let mut colors = BTreeSet::new();
    let mut rest = source;

    while let Some(pos) = rest.find(CALL_NAME) {
        rest = &rest[pos + CALL_NAME.len()..];
        if let Some(token) = string_argument(rest) {
            colors.insert(token.to_string());
        }
    }

    colors.into_iter().collect()
}

/// The literal in `( "token" )` at the start of `s`, whitespace allowed around it
fn string_argument(s: &str) -> Option<&str> {
    let s = s.trim_start().strip_prefix('(')?.trim_start();
    let s = s.strip_prefix(['"', '\''])?;

    let end = s.find(['"', '\''])?;
    if end == 0 {
        return None;
    }

    s[end + 1..]
        .trim_start()
        .starts_with(')')
        .then_some(&s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_colors() {
        let source = r##"
color("red") cube(10);
color ( 'blue' ) translate([20, 0, 0]) sphere(5);
color("red") cylinder(h = 3, r = 1);
color("#00ff00") cube(1);
color("tab:orange")
    cube(2);
"##;
        assert_eq!(
            scan_colors(source),
            vec!["#00ff00", "blue", "red", "tab:orange"]
        );
    }

    #[test]
    fn test_non_literal_arguments_are_ignored() {
        let source = r#"
color([1, 0, 0]) cube(1);
color(c) cube(1);
color("") cube(1);
color("red", 0.5) cube(1);
"#;
        assert!(scan_colors(source).is_empty());
    }

    #[test]
    fn test_extract_colors_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.scad");

        std::fs::write(&path, "color(\"yellow\") cube(1);\ncolor(\"black\") cube(2);\n").unwrap();
        assert_eq!(extract_colors(&path).unwrap(), vec!["black", "yellow"]);

        std::fs::write(&path, "cube(1);\n").unwrap();
        assert!(matches!(extract_colors(&path), Err(Error::NoColors(_))));

        let missing = dir.path().join("missing.scad");
        assert!(matches!(extract_colors(&missing), Err(Error::Io(_))));
    }
}
