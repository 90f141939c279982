//! Error and warning types for reading, merging and writing 3MF files
//!
//! All errors carry an error code for categorization. Errors are fatal for the
//! operation that produced them; when the merge engine catches an error at the
//! per-file boundary it is downgraded to a [`MergeWarning`] instead.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O and archive errors
//! - **E2xxx**: XML parsing and structure errors
//! - **E3xxx**: Model validation errors
//! - **E5xxx**: Merge errors
//! - **E6xxx**: Rendering pipeline errors
//!
//! ## Common Error Codes
//!
//! - `E1001`: I/O error reading file
//! - `E1002`: ZIP archive format error
//! - `E1003`: Missing required file in archive
//! - `E2001`: XML parsing error
//! - `E2003`: Invalid XML structure
//! - `E2004`: Invalid 3MF format
//! - `E3001`: Invalid model structure
//! - `E5001`: Composite model could not be built
//! - `E5002`: Composite model could not be written
//! - `E6002`: Renderer invocation failed

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for 3MF operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, merging or writing 3MF files
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred while reading or writing a file
    ///
    /// **Error Code**: E1001
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// ZIP archive error
    ///
    /// **Error Code**: E1002
    ///
    /// **Common Causes**:
    /// - Corrupted ZIP file
    /// - Truncated archive (e.g. a render that was interrupted)
    #[error("[E1002] ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Missing required file in the 3MF archive
    ///
    /// **Error Code**: E1003
    #[error("[E1003] Missing required file: {0}")]
    MissingFile(String),

    /// XML parsing error
    ///
    /// **Error Code**: E2001
    #[error("[E2001] XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute error
    ///
    /// **Error Code**: E2002
    #[error("[E2002] XML attribute error: {0}")]
    XmlAttr(String),

    /// Invalid XML structure
    ///
    /// **Error Code**: E2003
    ///
    /// **Common Causes**:
    /// - Missing required attributes
    /// - Elements in the wrong place
    #[error("[E2003] Invalid XML structure: {0}")]
    InvalidXml(String),

    /// Invalid 3MF format
    ///
    /// **Error Code**: E2004
    ///
    /// **Common Causes**:
    /// - Non-compliant OPC structure
    /// - Missing content types or relationships
    #[error("[E2004] Invalid 3MF format: {0}")]
    InvalidFormat(String),

    /// XML writing error
    ///
    /// **Error Code**: E2005
    #[error("[E2005] XML writing error: {0}")]
    XmlWrite(String),

    /// Invalid model structure
    ///
    /// **Error Code**: E3001
    ///
    /// **Common Causes**:
    /// - Out-of-bounds vertex indices
    /// - Objects without a mesh or components
    #[error("[E3001] Invalid model: {0}")]
    InvalidModel(String),

    /// Parse error for numeric values
    ///
    /// **Error Code**: E3002
    #[error("[E3002] Parse error: {0}")]
    ParseError(String),

    /// The composite model could not be assembled
    ///
    /// **Error Code**: E5001
    ///
    /// **Common Causes**:
    /// - Every input file was skipped, so there is nothing to build
    #[error("[E5001] Failed to build composite model: {0}")]
    AggregateBuild(String),

    /// The composite model could not be written to its destination
    ///
    /// **Error Code**: E5002
    ///
    /// Nothing is left at the destination path when this error is returned.
    #[error("[E5002] Failed to write '{}': {source}", path.display())]
    Write {
        /// Destination that was being written
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// The source description uses no color tokens
    ///
    /// **Error Code**: E6001
    #[error("[E6001] No color() calls found in '{}'", .0.display())]
    NoColors(PathBuf),

    /// A renderer invocation failed
    ///
    /// **Error Code**: E6002
    #[error("[E6002] Rendering color '{color}' failed: {message}")]
    Render {
        /// Color token that was being rendered
        color: String,
        /// Description of the failure
        message: String,
    },

    /// No working renderer executable was found
    ///
    /// **Error Code**: E6003
    #[error("[E6003] Could not find a working OpenSCAD executable (tried: {})", tried.join(", "))]
    RendererNotFound {
        /// Candidate paths that were tried
        tried: Vec<String>,
    },
}

impl From<std::num::ParseFloatError> for Error {
    fn from(err: std::num::ParseFloatError) -> Self {
        Error::ParseError(format!("Failed to parse floating-point number: {}", err))
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::ParseError(format!("Failed to parse integer: {}", err))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttr(format!("Attribute parsing failed: {}", err))
    }
}

impl Error {
    /// Create an InvalidXml error for a missing required attribute
    pub fn missing_attribute(element: &str, attribute: &str) -> Self {
        Error::InvalidXml(format!(
            "Element '<{}>' is missing required attribute '{}'",
            element, attribute
        ))
    }

    /// Create an InvalidFormat error with context about what structure is invalid
    pub fn invalid_format_context(context: &str, message: &str) -> Self {
        Error::InvalidFormat(format!("{}: {}", context, message))
    }

    /// Create an XmlWrite error
    pub fn xml_write(message: String) -> Self {
        Error::XmlWrite(message)
    }

    /// Wrap an error raised while writing `path`
    pub fn write(path: impl Into<PathBuf>, source: Error) -> Self {
        Error::Write {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

/// A color token that the color resolver does not recognize
///
/// Never fatal: the resolver substitutes opaque black and processing continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot parse color '{token}' as a named or hex color, using black")]
pub struct ColorParseWarning {
    /// The unrecognized token
    pub token: String,
}

/// A non-fatal problem encountered while merging one input file
#[derive(Error, Debug)]
pub enum MergeWarning {
    /// The file's color label could not be resolved; the part is colored black
    #[error("{}: {warning}", path.display())]
    ColorParse {
        /// Input file whose label was unrecognized
        path: PathBuf,
        /// Resolver warning
        warning: ColorParseWarning,
    },

    /// The file could not be loaded and was skipped
    #[error("skipped '{}': {error}", path.display())]
    ModelRead {
        /// Input file that was skipped
        path: PathBuf,
        /// Why loading failed
        #[source]
        error: Error,
    },

    /// The file loaded but contained no mesh resources, so it contributed nothing
    #[error("'{}' contains no mesh objects", path.display())]
    NoMeshes {
        /// Input file without meshes
        path: PathBuf,
    },
}

impl MergeWarning {
    /// The input file this warning refers to
    pub fn path(&self) -> &std::path::Path {
        match self {
            MergeWarning::ColorParse { path, .. }
            | MergeWarning::ModelRead { path, .. }
            | MergeWarning::NoMeshes { path } => path,
        }
    }

    /// Whether this warning means the whole file was skipped
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            MergeWarning::ModelRead { .. } | MergeWarning::NoMeshes { .. }
        )
    }
}
