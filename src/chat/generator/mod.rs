
use tracing::info;

use super::ChatEngine;
use crate::Result;

/// Wrap a component description in the generation instructions
#[inline]
pub fn component_prompt(description: &str) -> String {
    format!(
        "Based on the existing code in the repository, generate a new component that matches this description:\n\
         {}\n\n\
         Follow the conventions and best practices used in the repository.\n\
         Include brief comments explaining the key parts.\n\n\
         Generate the complete component code:",
        description.trim()
    )
}

impl ChatEngine {
    /// Ask for a new component in the style of the indexed repository.
    ///
    /// Fails the same way `chat` does and leaves memory unchanged on failure.
    #[inline]
    pub async fn generate_component(&mut self, description: &str) -> Result<String> {
        info!("Generating component: {}", description.trim());
        self.chat(&component_prompt(description)).await
    }
}
