//! Error taxonomy for pillar resolution and template rendering.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::pillar::PILLAR_ENV;

/// Where a pillar document came from. Carried in data errors so the
/// diagnostic names the offending source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    File(PathBuf),
    Environment,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::File(path) => write!(f, "{}", path.display()),
            Origin::Environment => write!(f, "environment variable {PILLAR_ENV}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// The pillar data file could not be read.
    #[error("cannot read pillar data from {origin}")]
    NotFound {
        origin: Origin,
        #[source]
        source: std::io::Error,
    },

    /// The pillar document failed to parse.
    #[error("malformed pillar data in {origin}")]
    Parse {
        origin: Origin,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The pillar document parsed, but its top level is not a mapping.
    #[error("pillar data in {origin} must be a mapping at the top level")]
    NotAMapping { origin: Origin },

    /// The engine could not parse the template.
    #[error("template syntax error")]
    TemplateSyntax(#[source] minijinja::Error),

    /// The template referenced a variable the pillar does not define.
    /// Only produced in strict mode.
    #[error("undefined template variable")]
    Undefined(#[source] minijinja::Error),

    /// Any other engine failure during rendering.
    #[error("template rendering failed")]
    Render(#[source] minijinja::Error),
}
