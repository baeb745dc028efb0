//! Results of server-side stencil rendering.

use serde::{Deserialize, Serialize};

/// A problem reported while rendering a stencil.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderIssue {
    /// Issue text.
    pub text: String,
    /// Filename of the stencil the issue belongs to.
    #[serde(default)]
    pub stencil: String,
}

/// A single rendered stencil.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedStencil {
    /// Output filename.
    pub filename: String,
    /// Rendered content.
    #[serde(default)]
    pub content: String,
    /// Render order within the formation.
    #[serde(default)]
    pub sequence: i32,
    /// Errors raised while rendering this stencil.
    #[serde(default)]
    pub errors: Vec<RenderIssue>,
    /// Warnings raised while rendering this stencil.
    #[serde(default)]
    pub warnings: Vec<RenderIssue>,
}

/// The full result of a render request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Renders {
    /// Rendered stencils in render order.
    #[serde(default)]
    pub stencils: Vec<RenderedStencil>,
}

impl Renders {
    /// All errors across the rendered stencils.
    #[must_use]
    pub fn errors(&self) -> Vec<&RenderIssue> {
        self.stencils.iter().flat_map(|s| s.errors.iter()).collect()
    }

    /// All warnings across the rendered stencils.
    #[must_use]
    pub fn warnings(&self) -> Vec<&RenderIssue> {
        self.stencils
            .iter()
            .flat_map(|s| s.warnings.iter())
            .collect()
    }
}
