//! Result printing for the CLI tools.

use std::io::{self, Write};
use std::time::Duration;

use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::error::Error;
use crate::variable::SnmpVariable;

#[derive(Debug, Serialize)]
struct JsonVariable<'a> {
    oid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    numeric_oid: Option<String>,
    #[serde(rename = "type")]
    snmp_type: Option<&'static str>,
    value: Option<&'a str>,
}

impl<'a> From<&'a SnmpVariable> for JsonVariable<'a> {
    fn from(var: &'a SnmpVariable) -> Self {
        Self {
            oid: &var.oid,
            index: var.oid_index.as_deref(),
            numeric_oid: var.numeric_oid.as_ref().map(|oid| oid.to_dotted()),
            snmp_type: var.snmp_type.map(|t| t.name()),
            value: var.value.as_deref(),
        }
    }
}

/// `sysDescr.0 = OCTETSTR: Linux router`
fn human_line(var: &SnmpVariable) -> String {
    let snmp_type = var.snmp_type.map(|t| t.name()).unwrap_or("NULL");
    match &var.value {
        Some(value) => format!("{} = {}: {}", var.full_name(), snmp_type, value),
        None => format!("{} = {}", var.full_name(), snmp_type),
    }
}

/// Write `vars` to `w` in `format`.
pub fn write_results<W: Write>(w: &mut W, format: OutputFormat, vars: &[SnmpVariable]) -> io::Result<()> {
    match format {
        OutputFormat::Human => {
            for var in vars {
                writeln!(w, "{}", human_line(var))?;
            }
        }
        OutputFormat::Json => {
            let rows: Vec<JsonVariable<'_>> = vars.iter().map(JsonVariable::from).collect();
            serde_json::to_writer_pretty(&mut *w, &rows).map_err(io::Error::other)?;
            writeln!(w)?;
        }
    }
    Ok(())
}

/// Print results to stdout and timing, if asked for, to stderr.
pub fn print_results(format: OutputFormat, vars: &[SnmpVariable], timing: Option<Duration>) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    write_results(&mut stdout, format, vars)?;
    if let Some(elapsed) = timing {
        eprintln!("{} result(s) in {:.2}ms", vars.len(), elapsed.as_secs_f64() * 1000.0);
    }
    Ok(())
}

/// Print an error to stderr.
pub fn write_error(err: &Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "Error: {}", err);
    match err {
        Error::Timeout { retries, .. } => {
            let _ = writeln!(stderr, "  no response after {} attempt(s)", retries + 1);
        }
        Error::Authentication { .. } => {
            let _ = writeln!(stderr, "  check the username and passphrases");
        }
        _ => {}
    }
}
