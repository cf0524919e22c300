//! `flowprobe features` command handler

use std::io::Write;

use serde::Serialize;

use flowprobe_engine::Catalog;

use crate::cli::FeaturesArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `features` command.
///
/// # Errors
///
/// Returns `CliError::Command` if `--name` matches no catalog entry.
pub fn execute(args: FeaturesArgs, writer: &OutputWriter) -> Result<(), CliError> {
    let catalog = Catalog::builtin();
    let report = FeaturesReport::from_catalog(&catalog, args.name.as_deref());

    if let Some(name) = &args.name
        && report.is_empty()
    {
        return Err(CliError::Command(format!("unknown feature: {name}")));
    }

    writer.render(&report)
}

/// Catalog listing.
#[derive(Debug, Serialize)]
pub struct FeaturesReport {
    pub features: Vec<FeatureRow>,
    pub composites: Vec<CompositeRow>,
    pub filters: Vec<String>,
}

/// One feature overload.
#[derive(Debug, Serialize)]
pub struct FeatureRow {
    pub name: String,
    pub returns: String,
    pub arguments: Vec<String>,
    pub output: String,
    /// Takes the raw input as an implicit last argument
    pub implicit_input: bool,
    /// Rewritten away during compilation
    pub lowered: bool,
}

#[derive(Debug, Serialize)]
pub struct CompositeRow {
    pub name: String,
    pub definition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ie: Option<String>,
}

impl FeaturesReport {
    /// Build a listing, optionally restricted to entries named `name`.
    pub fn from_catalog(catalog: &Catalog, name: Option<&str>) -> Self {
        let wanted = |candidate: &str| name.is_none_or(|n| n == candidate);

        let features = catalog
            .makers()
            .filter(|(_, maker)| wanted(maker.name.as_str()))
            .map(|(_, maker)| FeatureRow {
                name: maker.name.clone(),
                returns: maker.return_kind.to_string(),
                arguments: maker.arguments.iter().map(ToString::to_string).collect(),
                output: maker.output.to_string(),
                implicit_input: maker.implicit_input,
                lowered: maker.factory.is_none(),
            })
            .collect();

        let composites = catalog
            .composites()
            .filter(|composite| wanted(composite.name.as_str()))
            .map(|composite| CompositeRow {
                name: composite.name.clone(),
                definition: composite.definition.to_string(),
                ie: composite.ie.as_ref().map(ToString::to_string),
            })
            .collect();

        let filters = catalog
            .filter_names()
            .filter(|filter| wanted(*filter))
            .map(str::to_owned)
            .collect();

        Self {
            features,
            composites,
            filters,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty() && self.composites.is_empty() && self.filters.is_empty()
    }
}

impl Render for FeaturesReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if !self.features.is_empty() {
            writeln!(w, "{}", "Features:".bold())?;
            writeln!(
                w,
                "  {:<28} {:<14} {:<40} {}",
                "NAME", "RETURNS", "ARGUMENTS", "OUTPUT"
            )?;
            for row in &self.features {
                let mut arguments = row.arguments.join(", ");
                if row.implicit_input {
                    arguments.push_str(" +raw");
                }
                let output = if row.lowered {
                    "(lowered)".dimmed().to_string()
                } else {
                    row.output.clone()
                };
                writeln!(
                    w,
                    "  {:<28} {:<14} {:<40} {}",
                    row.name.cyan(),
                    row.returns,
                    arguments,
                    output
                )?;
            }
        }

        if !self.composites.is_empty() {
            writeln!(w)?;
            writeln!(w, "{}", "Composites:".bold())?;
            for row in &self.composites {
                match &row.ie {
                    Some(ie) => writeln!(w, "  {} = {} -> {}", row.name.cyan(), row.definition, ie)?,
                    None => writeln!(w, "  {} = {}", row.name.cyan(), row.definition)?,
                }
            }
        }

        if !self.filters.is_empty() {
            writeln!(w)?;
            writeln!(w, "{} {}", "Filters:".bold(), self.filters.join(", "))?;
        }
        Ok(())
    }
}
