//! Output abstraction for poll results.
//!
//! Schedulers stay decoupled from encoding details: everything user-facing
//! goes through a [`Printer`]. Printers that know how to render typed
//! changes expose that through the optional [`ChangePrinter`] capability,
//! resolved once at scheduler setup.

use std::io::Write;

use anyhow::Result;
use serde_json::{json, Value};

use crate::diff::{Change, ChangeKind};
use crate::poll::wait::WaitOutcome;

/// Optional capability for watch-aware printers.
pub trait ChangePrinter {
    /// Print a batch of typed changes from one poll cycle.
    fn print_changes(&mut self, changes: &[Change]) -> Result<()>;
}

/// Sink for poll output.
pub trait Printer: Send {
    /// Print a single value.
    fn print(&mut self, value: &Value) -> Result<()>;

    /// Print a list of values.
    fn print_list(&mut self, values: &[Value]) -> Result<()>;

    /// The change-printing capability, if this printer supports it.
    fn changes(&mut self) -> Option<&mut dyn ChangePrinter> {
        None
    }
}

/// Requested output format for Wait results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Print the record list directly; a no-op when empty.
    Table,
    /// Wrap records under a `records` key before printing.
    #[default]
    Json,
}

/// Print a Wait outcome's records in the requested format.
pub fn print_wait_records(
    outcome: &WaitOutcome,
    format: OutputFormat,
    printer: &mut dyn Printer,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if outcome.records.is_empty() {
                return Ok(());
            }
            printer.print_list(&outcome.records)
        }
        OutputFormat::Json => printer.print(&json!({ "records": outcome.records })),
    }
}

/// Line-oriented JSON printer writing to any sink.
///
/// Changes are rendered one per line with `+`/`~`/`-` prefixes; Modified
/// entries append per-field old/new metadata.
pub struct JsonPrinter<W: Write + Send> {
    writer: W,
}

impl JsonPrinter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonPrinter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Printer for JsonPrinter<W> {
    fn print(&mut self, value: &Value) -> Result<()> {
        writeln!(self.writer, "{}", serde_json::to_string_pretty(value)?)?;
        Ok(())
    }

    fn print_list(&mut self, values: &[Value]) -> Result<()> {
        for value in values {
            writeln!(self.writer, "{}", serde_json::to_string(value)?)?;
        }
        Ok(())
    }

    fn changes(&mut self) -> Option<&mut dyn ChangePrinter> {
        Some(self)
    }
}

impl<W: Write + Send> ChangePrinter for JsonPrinter<W> {
    fn print_changes(&mut self, changes: &[Change]) -> Result<()> {
        for change in changes {
            write!(
                self.writer,
                "{} {}",
                change.kind.prefix(),
                serde_json::to_string(&change.resource)?
            )?;
            if change.kind == ChangeKind::Modified && !change.fields.is_empty() {
                let detail: Vec<String> = change
                    .fields
                    .iter()
                    .map(|f| format!("{}: {} -> {}", f.field, f.old, f.new))
                    .collect();
                write!(self.writer, " ({})", detail.join(", "))?;
            }
            writeln!(self.writer)?;
        }
        Ok(())
    }
}
