//! Rendering one 3MF file per color
//!
//! A [`Renderer`] turns a source description plus one color token into a
//! single-color 3MF file. [`OpenScad`] does this by overriding OpenSCAD's
//! `color()` module so only children of the matching color are emitted.
//!
//! [`render_all`] fans the colors out over a worker pool. Renders are
//! independent processes writing to distinct files; a failed render is
//! recorded and never stops its siblings.

use crate::error::{Error, Result};
use rayon::prelude::*;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// Produces a single-color model file for one color token
pub trait Renderer: Sync {
    /// Render the parts of `source` colored `color` into `output`
    fn render(&self, color: &str, source: &Path, output: &Path) -> Result<()>;
}

/// Candidate executables tried after a user-supplied path, in order
#[cfg(target_os = "windows")]
const DEFAULT_PATHS: &[&str] = &[
    r"C:\Program Files\OpenSCAD\openscad.exe",
    r"C:\Program Files\OpenSCAD (Nightly)\openscad.exe",
];

/// Candidate executables tried after a user-supplied path, in order
#[cfg(target_os = "macos")]
const DEFAULT_PATHS: &[&str] = &[
    "/Applications/OpenSCAD.app/Contents/MacOS/OpenSCAD",
    "/Applications/OpenSCAD (Nightly).app/Contents/MacOS/OpenSCAD",
    "/usr/local/bin/openscad",
    "/usr/local/bin/openscad-nightly",
];

/// Candidate executables tried after a user-supplied path, in order
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const DEFAULT_PATHS: &[&str] = &[
    "openscad",
    "/usr/bin/openscad",
    "/usr/bin/openscad-nightly",
    "/usr/local/bin/openscad",
    "/usr/local/bin/openscad-nightly",
    "~/Applications/OpenSCAD-Nightly.AppImage",
    "/snap/bin/openscad-nightly",
];

/// The OpenSCAD command-line renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenScad {
    executable: PathBuf,
}

impl OpenScad {
    /// Use a specific executable without checking it
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Find a working executable
    ///
    /// Tries `user_path` first, then the platform's usual install locations.
    /// A candidate works when `<candidate> --version` exits successfully.
    pub fn discover(user_path: Option<&Path>) -> Result<Self> {
        let mut tried = Vec::new();

        if let Some(path) = user_path {
            if responds(path) {
                return Ok(Self::new(path));
            }
            warn!(
                "OpenSCAD not found or invalid at '{}', trying defaults",
                path.display()
            );
            tried.push(path.display().to_string());
        }

        for candidate in DEFAULT_PATHS {
            let path = expand_home(candidate);
            if responds(&path) {
                debug!("Using OpenSCAD at {}", path.display());
                return Ok(Self::new(path));
            }
            tried.push(candidate.to_string());
        }

        Err(Error::RendererNotFound { tried })
    }

    /// The executable this renderer runs
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// OpenSCAD definition replacing `color()` so only `color` is emitted
    pub fn color_override(color: &str) -> String {
        format!(
            "module color(c) {{ if (str(c)==\"{}\") children(); }}",
            color
        )
    }
}

impl Renderer for OpenScad {
    fn render(&self, color: &str, source: &Path, output: &Path) -> Result<()> {
        debug!("Rendering '{}' into {}", color, output.display());

        let result = Command::new(&self.executable)
            .arg("-o")
            .arg(output)
            .arg("-D")
            .arg(Self::color_override(color))
            .arg(source)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::Render {
                color: color.to_string(),
                message: format!("failed to run {}: {}", self.executable.display(), e),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::Render {
                color: color.to_string(),
                message: format!("{} ({})", result.status, stderr.trim()),
            });
        }

        Ok(())
    }
}

/// A color whose render succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedColor {
    /// The color token
    pub color: String,
    /// The single-color model file, named `<color>.3mf`
    pub path: PathBuf,
}

/// A color whose render failed
#[derive(Debug)]
pub struct RenderFailure {
    /// The color token
    pub color: String,
    /// Why the render failed
    pub error: Error,
}

/// Outcome of rendering every color
#[derive(Debug, Default)]
pub struct RenderSet {
    /// Successful renders, sorted by color
    pub rendered: Vec<RenderedColor>,
    /// Failed renders, sorted by color
    pub failures: Vec<RenderFailure>,
}

/// Render every color of `source` into `work_dir` on `threads` workers
///
/// Returns once every render has finished or failed.
pub fn render_all<R: Renderer>(
    renderer: &R,
    colors: &[String],
    source: &Path,
    work_dir: &Path,
    threads: usize,
) -> Result<RenderSet> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;

    info!(colors = colors.len(), threads, "Rendering colors");

    let results: Vec<(String, Result<PathBuf>)> = pool.install(|| {
        colors
            .par_iter()
            .map(|color| {
                let result = render_path(work_dir, color).and_then(|output| {
                    renderer.render(color, source, &output).map(|()| output)
                });
                (color.clone(), result)
            })
            .collect()
    });

    let mut set = RenderSet::default();
    for (color, result) in results {
        match result {
            Ok(path) => set.rendered.push(RenderedColor { color, path }),
            Err(error) => {
                warn!("{}", error);
                set.failures.push(RenderFailure { color, error });
            }
        }
    }
    set.rendered.sort_by(|a, b| a.color.cmp(&b.color));
    set.failures.sort_by(|a, b| a.color.cmp(&b.color));

    Ok(set)
}

/// `<work_dir>/<color>.3mf`, refusing tokens that would leave `work_dir`
///
/// The merge reads the label back from the file stem, so the token must be a
/// single plain file name.
fn render_path(work_dir: &Path, color: &str) -> Result<PathBuf> {
    let mut components = Path::new(color).components();
    let plain = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !color.contains(['/', '\\']);

    if !plain {
        return Err(Error::Render {
            color: color.to_string(),
            message: "color is not usable as a file name".to_string(),
        });
    }
    Ok(work_dir.join(format!("{}.3mf", color)))
}

/// Whether `<path> --version` runs and exits successfully
fn responds(path: &Path) -> bool {
    Command::new(path)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

fn expand_home(candidate: &str) -> PathBuf {
    match (candidate.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(candidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Writes the color name into the output, failing for `fail_on`
    struct FakeRenderer {
        fail_on: &'static str,
        calls: Mutex<Vec<String>>,
    }

    impl Renderer for FakeRenderer {
        fn render(&self, color: &str, _source: &Path, output: &Path) -> Result<()> {
            self.calls.lock().unwrap().push(color.to_string());
            if color == self.fail_on {
                return Err(Error::Render {
                    color: color.to_string(),
                    message: "exit status: 1".to_string(),
                });
            }
            std::fs::write(output, color)?;
            Ok(())
        }
    }

    #[test]
    fn test_color_override() {
        assert_eq!(
            OpenScad::color_override("red"),
            r#"module color(c) { if (str(c)=="red") children(); }"#
        );
    }

    #[test]
    fn test_render_all_collects_failures() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FakeRenderer {
            fail_on: "green",
            calls: Mutex::new(Vec::new()),
        };
        let colors: Vec<String> = ["red", "green", "blue"].map(String::from).to_vec();

        let set = render_all(&renderer, &colors, Path::new("model.scad"), dir.path(), 2).unwrap();

        assert_eq!(renderer.calls.lock().unwrap().len(), 3);
        let rendered: Vec<&str> = set.rendered.iter().map(|r| r.color.as_str()).collect();
        assert_eq!(rendered, vec!["blue", "red"]);
        assert_eq!(set.rendered[1].path, dir.path().join("red.3mf"));
        assert_eq!(std::fs::read_to_string(&set.rendered[1].path).unwrap(), "red");

        assert_eq!(set.failures.len(), 1);
        assert_eq!(set.failures[0].color, "green");
        assert!(matches!(set.failures[0].error, Error::Render { .. }));
    }

    #[test]
    fn test_tokens_with_path_separators_are_not_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let work_dir = dir.path().join("work");
        std::fs::create_dir(&work_dir).unwrap();
        let renderer = FakeRenderer {
            fail_on: "",
            calls: Mutex::new(Vec::new()),
        };
        let colors: Vec<String> = ["../escaped", "dark/red", "..", "red"]
            .map(String::from)
            .to_vec();

        let set = render_all(&renderer, &colors, Path::new("model.scad"), &work_dir, 2).unwrap();

        assert_eq!(*renderer.calls.lock().unwrap(), vec!["red".to_string()]);
        assert_eq!(set.rendered.len(), 1);
        assert_eq!(set.rendered[0].path, work_dir.join("red.3mf"));
        let failed: Vec<&str> = set.failures.iter().map(|f| f.color.as_str()).collect();
        assert_eq!(failed, vec!["..", "../escaped", "dark/red"]);
        assert!(set.failures.iter().all(|f| matches!(f.error, Error::Render { .. })));
        assert!(!dir.path().join("escaped.3mf").exists());
    }

    #[test]
    fn test_discover_reports_every_candidate() {
        let bogus = Path::new("/nonexistent/openscad-for-tests");
        match OpenScad::discover(Some(bogus)) {
            Ok(found) => assert_ne!(found.executable(), bogus),
            Err(Error::RendererNotFound { tried }) => {
                assert_eq!(tried[0], bogus.display().to_string());
                assert_eq!(tried.len(), DEFAULT_PATHS.len() + 1);
            }
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_executable_is_a_render_error() {
        let renderer = OpenScad::new("/nonexistent/openscad-for-tests");
        let err = renderer
            .render("red", Path::new("model.scad"), Path::new("red.3mf"))
            .unwrap_err();
        assert!(matches!(err, Error::Render { ref color, .. } if color == "red"));
    }
}
