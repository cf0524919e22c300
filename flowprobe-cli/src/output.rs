//! Report rendering for `--output text|json`
//!
//! Command handlers build a report value and hand it to [`OutputWriter`];
//! they never branch on the output format themselves.

use std::io::Write;

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Writes command reports in the format selected on the command line.
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Write `report` to stdout.
    pub fn render<R: Render + Serialize>(&self, report: &R) -> Result<(), CliError> {
        let mut out = std::io::stdout().lock();
        self.render_to(report, &mut out)
    }

    /// Write `report` to `out`.
    ///
    /// JSON output is pretty-printed and terminated by a newline so that
    /// consecutive reports stay line-delimited.
    pub fn render_to<R: Render + Serialize>(
        &self,
        report: &R,
        out: &mut dyn Write,
    ) -> Result<(), CliError> {
        if self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)?;
        } else {
            report.render_text(out)?;
        }
        Ok(())
    }
}

/// Human-readable form of a report.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}
