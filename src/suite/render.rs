//! The seam between the test-case model and on-disk syntax.

use super::pytest::PytestRenderer;
use super::yaml::YamlRenderer;
use super::Suite;
use crate::config::{Config, OutputFormat};

/// Turns a [`Suite`] into the text of one output file.
pub trait Renderer {
    /// File extension, without the dot.
    fn extension(&self) -> &'static str;

    /// Renders the whole suite.
    ///
    /// # Errors
    ///
    /// Returns the serializer's message if the suite cannot be rendered.
    fn render(&self, suite: &Suite) -> Result<String, String>;
}

/// Returns the renderer for the configured output format.
#[must_use]
pub fn renderer_for(config: &Config) -> Box<dyn Renderer> {
    match config.format {
        OutputFormat::Pytest => Box::new(PytestRenderer::new(config.client_fixture.clone())),
        OutputFormat::Yaml => Box::new(YamlRenderer),
    }
}
