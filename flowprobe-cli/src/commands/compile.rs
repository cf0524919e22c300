//! `flowprobe compile` command handler

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use flowprobe_core::config::FlowprobeConfig;
use flowprobe_engine::{Arg, Catalog, Compiler, FeatureSpec, Program};

use crate::cli::CompileArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `compile` command.
///
/// Loads the specification (argument or `spec.path`), compiles it against the
/// built-in catalog and renders the resulting register program.
///
/// # Errors
///
/// Returns `CliError::Spec` if the file cannot be loaded and
/// `CliError::Compile` if compilation fails.
pub async fn execute(
    args: CompileArgs,
    config: &FlowprobeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let path = args
        .spec
        .unwrap_or_else(|| PathBuf::from(&config.spec.path));
    info!(path = %path.display(), "compiling feature specification");

    let spec = FeatureSpec::load(&path).await?;
    let catalog = Catalog::builtin();
    let program = Compiler::from_config(&catalog, &config.compiler).compile(&spec)?;

    let report = CompileReport::new(path.display().to_string(), &program);
    writer.render(&report)
}

/// Compiled program report.
#[derive(Debug, Serialize)]
pub struct CompileReport {
    /// Specification file path
    pub source: String,
    /// Registers in evaluation order
    pub registers: Vec<RegisterRow>,
    /// Exported features in specification order
    pub exports: Vec<ExportRow>,
    /// Export template alternatives
    pub templates: Vec<TemplateRow>,
    /// Filter names
    pub filters: Vec<String>,
}

/// A single register.
#[derive(Debug, Serialize)]
pub struct RegisterRow {
    pub register: usize,
    pub signature: String,
    pub kind: String,
    /// `raw` or `r<N>`
    pub arguments: Vec<String>,
    /// raw, control, constant, variant
    pub flags: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct ExportRow {
    pub register: usize,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct TemplateRow {
    pub id: usize,
    pub fields: Vec<String>,
}

impl CompileReport {
    pub fn new(source: String, program: &Program) -> Self {
        let registers = program
            .nodes()
            .iter()
            .enumerate()
            .map(|(register, node)| {
                let mut flags = Vec::new();
                if node.consumes_raw() {
                    flags.push("raw");
                }
                if node.control {
                    flags.push("control");
                }
                if node.constant.is_some() {
                    flags.push("constant");
                }
                if program.variants().contains(&register) {
                    flags.push("variant");
                }
                RegisterRow {
                    register,
                    signature: node.signature.clone(),
                    kind: node.kind.to_string(),
                    arguments: node
                        .args
                        .iter()
                        .map(|arg| match arg {
                            Arg::Raw => "raw".to_owned(),
                            Arg::Register(r) => format!("r{r}"),
                        })
                        .collect(),
                    flags,
                }
            })
            .collect();

        let exports = program
            .exports()
            .iter()
            .zip(program.fields())
            .map(|(&register, name)| ExportRow {
                register,
                name: name.clone(),
            })
            .collect();

        let templates = program
            .template()
            .alternatives()
            .into_iter()
            .map(|template| TemplateRow {
                id: template.id,
                fields: template.elements.iter().map(|ie| ie.to_string()).collect(),
            })
            .collect();

        Self {
            source,
            registers,
            exports,
            templates,
            filters: program.filters().iter().map(|f| f.name.clone()).collect(),
        }
    }
}

impl Render for CompileReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Program (source: {})", self.source.bold())?;
        writeln!(
            w,
            "  Registers: {}  Exports: {}  Templates: {}",
            self.registers.len(),
            self.exports.len(),
            self.templates.len()
        )?;
        if !self.filters.is_empty() {
            writeln!(w, "  Filters: {}", self.filters.join(", "))?;
        }
        writeln!(w)?;

        writeln!(
            w,
            "{:>5}  {:<40} {:<14} {:<16} {}",
            "REG".bold(),
            "SIGNATURE".bold(),
            "KIND".bold(),
            "ARGS".bold(),
            "FLAGS".bold()
        )?;
        for row in &self.registers {
            writeln!(
                w,
                "{:>5}  {:<40} {:<14} {:<16} {}",
                format!("r{}", row.register),
                row.signature,
                row.kind,
                row.arguments.join(","),
                row.flags.join(",").dimmed()
            )?;
        }

        writeln!(w)?;
        writeln!(w, "{}", "Exports:".bold())?;
        for (i, export) in self.exports.iter().enumerate() {
            writeln!(w, "  #{:<3} r{:<4} {}", i + 1, export.register, export.name.cyan())?;
        }

        writeln!(w)?;
        writeln!(w, "{}", "Templates:".bold())?;
        for template in &self.templates {
            writeln!(w, "  [{}] {}", template.id, template.fields.join(", "))?;
        }
        Ok(())
    }
}
