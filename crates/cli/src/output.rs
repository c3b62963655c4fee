//! Structured output handling for CLI commands.

use serde::Serialize;
use switchblade_common::models::ResultSet;

#[derive(clap::ValueEnum, Clone, Debug, Default, PartialEq, Eq, Copy)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Returns true if the output format is intended for machine consumption
    pub fn is_machine_readable(&self) -> bool {
        match self {
            OutputFormat::Human => false,
            OutputFormat::Json | OutputFormat::Yaml => true,
        }
    }
}

/// Envelope for machine-readable responses
#[derive(Serialize)]
pub struct CommandResponse<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> CommandResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            exit_code: Some(0),
            data,
        }
    }

    pub fn error(message: String, exit_code: i32, data: T) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message),
            exit_code: Some(exit_code),
            data,
        }
    }
}

/// Print the output to stdout in the requested format
pub fn print_output<T: Serialize>(format: OutputFormat, data: T) -> anyhow::Result<()> {
    match format {
        OutputFormat::Human => {
            // Human output is printed by the command itself.
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&data)?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&data)?;
            println!("{}", yaml);
        }
    }
    Ok(())
}

/// Print a structured success response for machine outputs
pub fn print_success<T: Serialize>(format: OutputFormat, data: T) -> anyhow::Result<()> {
    if format == OutputFormat::Human {
        return Ok(());
    }

    let response = CommandResponse::success(data);
    print_output(format, response)
}

/// Print a structured error response for machine outputs
pub fn print_error<T: Serialize + Default>(
    format: OutputFormat,
    message: &str,
    exit_code: i32,
) -> anyhow::Result<()> {
    if format == OutputFormat::Human {
        return Ok(());
    }

    let response = CommandResponse::error(message.to_string(), exit_code, T::default());
    print_output(format, response)
}

/// Print an error envelope that still carries command data
pub fn print_error_with<T: Serialize>(
    format: OutputFormat,
    message: &str,
    exit_code: i32,
    data: T,
) -> anyhow::Result<()> {
    if format == OutputFormat::Human {
        return Ok(());
    }

    let response = CommandResponse::error(message.to_string(), exit_code, data);
    print_output(format, response)
}

pub const NULL_MARKER: &str = "NULL";

/// Plain-text table with left-aligned columns sized to their widest cell.
pub fn render_table(results: &ResultSet) -> String {
    // Widths in chars, matching how `format!` pads.
    let mut widths: Vec<usize> = results
        .columns()
        .iter()
        .map(|c| c.chars().count())
        .collect();
    for row in results.rows() {
        for (idx, cell) in row.iter().enumerate() {
            let len = cell.as_deref().unwrap_or(NULL_MARKER).chars().count();
            widths[idx] = widths[idx].max(len);
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = Vec::with_capacity(results.row_count() + 2);
    out.push(line(results.columns().iter().map(String::as_str).collect()));
    out.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in results.rows() {
        out.push(line(
            row.iter()
                .map(|c| c.as_deref().unwrap_or(NULL_MARKER))
                .collect(),
        ));
    }
    out.join("\n")
}
