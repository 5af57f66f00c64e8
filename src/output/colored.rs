//! Colored formatter implementation with terminal color support
//!
//! Uses the shared report layout from [`OutputFormatter`] and paints
//! headings, outcomes and latency values with ANSI colors.

use super::formatter::OutputFormatter;
use crate::types::PerformanceLevel;
use colored::*;

/// Color used for a latency classification
pub fn performance_color(level: PerformanceLevel) -> Color {
    match level {
        PerformanceLevel::Good => Color::Green,
        PerformanceLevel::Moderate => Color::Yellow,
        PerformanceLevel::Poor => Color::Red,
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub error: Color,
    pub highlight: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            error: Color::Red,
            highlight: Color::Magenta,
        }
    }
}

/// Colored formatter implementation
#[derive(Debug, Clone, Default)]
pub struct ColoredFormatter {
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a colored formatter with custom color scheme
    pub fn with_color_scheme(color_scheme: ColorScheme) -> Self {
        Self { color_scheme }
    }
}

impl OutputFormatter for ColoredFormatter {
    fn heading(&self, text: &str) -> String {
        text.color(self.color_scheme.header).bold().to_string()
    }

    fn latency(&self, text: &str, level: PerformanceLevel) -> String {
        text.color(performance_color(level)).to_string()
    }

    fn success(&self, text: &str) -> String {
        text.color(self.color_scheme.success).to_string()
    }

    fn failure(&self, text: &str) -> String {
        text.color(self.color_scheme.error).to_string()
    }

    fn emphasis(&self, text: &str) -> String {
        text.color(self.color_scheme.highlight).bold().to_string()
    }

    fn format_warning(&self, warning: &str) -> crate::error::Result<String> {
        Ok(format!("{} {}", "Warning:".yellow().bold(), warning))
    }
}
