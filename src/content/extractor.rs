//! Article body extraction
//!
//! Pulls the plain text out of the configured body container: direct text
//! nodes plus the text of direct `<p>` children, in document order.

use crate::config::ExtractorConfig;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};

/// Turns raw HTML into plain article text
pub trait ContentExtractor: Send + Sync {
    /// Returns the extracted text, or an empty string if nothing matched
    fn extract(&self, html: &str) -> String;
}

/// [`ContentExtractor`] driven by a CSS container selector
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    container: Selector,
}

impl SelectorExtractor {
    /// Compiles the container selector
    ///
    /// # Returns
    ///
    /// * `Ok(SelectorExtractor)` - Selector parsed
    /// * `Err(ConfigError::InvalidSelector)` - Selector is not valid CSS
    pub fn new(selector: &str) -> Result<Self, ConfigError> {
        let container = Selector::parse(selector)
            .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))?;
        Ok(Self { container })
    }

    /// Builds an extractor from the `[extractor]` config section
    pub fn from_config(config: &ExtractorConfig) -> Result<Self, ConfigError> {
        Self::new(&config.container_selector)
    }
}

impl ContentExtractor for SelectorExtractor {
    fn extract(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        let mut content = String::new();

        for container in document.select(&self.container) {
            for child in container.children() {
                if let Some(text) = child.value().as_text() {
                    content.push_str(text);
                } else if let Some(paragraph) = ElementRef::wrap(child) {
                    if paragraph.value().name() == "p" {
                        content.extend(paragraph.text());
                    }
                }
            }
        }

        content
    }
}
