//! Output formatting and display system
//!
//! This module renders a [`TestResult`] as colored text, plain text or
//! JSON, and writes it to stdout or to a file.

mod colored;
mod formatter;

pub use colored::{performance_color, ColorScheme, ColoredFormatter};
pub use formatter::{fmt_ms, kind_of, summary_line, test_type, JsonFormatter, OutputFormatter, PlainFormatter};

use crate::{
    error::{AppError, Result},
    models::{Config, TestResult},
};
use std::io::{self, Write};
use std::path::PathBuf;

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// JSON when requested; otherwise colored text for a terminal, plain text
    /// when colors are off or the report goes to a file.
    pub fn create_formatter(config: &Config) -> Box<dyn OutputFormatter> {
        if config.json_output {
            Box::new(JsonFormatter)
        } else if config.enable_color && config.output_file.is_none() {
            Box::new(ColoredFormatter::new())
        } else {
            Box::new(PlainFormatter)
        }
    }
}

/// Main output coordinator that handles all result display
pub struct OutputCoordinator {
    formatter: Box<dyn OutputFormatter>,
    output_file: Option<PathBuf>,
}

impl OutputCoordinator {
    /// Create a new output coordinator with the specified formatter
    pub fn new(formatter: Box<dyn OutputFormatter>) -> Self {
        Self {
            formatter,
            output_file: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            formatter: OutputFormatterFactory::create_formatter(config),
            output_file: config.output_file.clone(),
        }
    }

    pub fn with_output_file(mut self, path: PathBuf) -> Self {
        self.output_file = Some(path);
        self
    }

    pub fn formatter(&self) -> &dyn OutputFormatter {
        self.formatter.as_ref()
    }

    pub fn render(&self, result: &TestResult) -> Result<String> {
        self.formatter.format_result(result)
    }

    /// Write the report to the output file, or stdout when none is set
    pub fn display_results(&self, result: &TestResult) -> Result<()> {
        let mut report = self.render(result)?;
        if !report.ends_with('\n') {
            report.push('\n');
        }

        match &self.output_file {
            Some(path) => std::fs::write(path, report)
                .map_err(|e| AppError::io(format!("Failed to write report to {}: {}", path.display(), e))),
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(report.as_bytes())?;
                stdout.flush()?;
                Ok(())
            }
        }
    }
}
