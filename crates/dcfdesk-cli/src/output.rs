use std::io::{self, Write};

use dcfdesk_core::Envelope;
use serde_json::{Map, Value};

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn render(
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            writeln!(out, "{payload}")?;
        }
        OutputFormat::Table => write_table(&mut out, envelope)?,
    }
    Ok(())
}

fn write_table(out: &mut impl Write, envelope: &Envelope<Value>) -> Result<(), CliError> {
    writeln!(out, "request_id  : {}", envelope.meta.request_id)?;
    if let Some(trace_id) = &envelope.meta.trace_id {
        writeln!(out, "trace_id    : {trace_id}")?;
    }
    writeln!(out, "generated_at: {}", envelope.meta.generated_at)?;
    writeln!(
        out,
        "sources     : {}",
        envelope
            .meta
            .source_chain
            .iter()
            .map(|source| source.as_str())
            .collect::<Vec<_>>()
            .join(",")
    )?;
    writeln!(out, "latency_ms  : {}", envelope.meta.latency_ms)?;

    if !envelope.meta.warnings.is_empty() {
        writeln!(out, "warnings:")?;
        for warning in &envelope.meta.warnings {
            writeln!(out, "  - {warning}")?;
        }
    }

    writeln!(out)?;
    match &envelope.data {
        Value::Object(fields) => write_fields(out, fields, 0)?,
        other => writeln!(out, "{}", scalar(other))?,
    }

    if !envelope.errors.is_empty() {
        writeln!(out)?;
        writeln!(out, "errors:")?;
        for error in &envelope.errors {
            writeln!(out, "  - {}: {}", error.code, error.message)?;
        }
    }
    Ok(())
}

/// Scalars as `key: value`, nested objects indented, arrays of objects as
/// aligned columns.
fn write_fields(out: &mut impl Write, fields: &Map<String, Value>, depth: usize) -> io::Result<()> {
    let indent = "  ".repeat(depth);
    let width = fields.keys().map(String::len).max().unwrap_or(0);

    for (key, value) in fields {
        match value {
            Value::Object(nested) => {
                writeln!(out, "{indent}{key}:")?;
                write_fields(out, nested, depth + 1)?;
            }
            Value::Array(rows) if rows.iter().all(Value::is_object) && !rows.is_empty() => {
                writeln!(out, "{indent}{key}:")?;
                write_rows(out, rows, depth + 1)?;
            }
            Value::Array(items) => {
                let joined = items.iter().map(scalar).collect::<Vec<_>>().join(", ");
                writeln!(out, "{indent}{key:<width$} : [{joined}]")?;
            }
            other => writeln!(out, "{indent}{key:<width$} : {}", scalar(other))?,
        }
    }
    Ok(())
}

fn write_rows(out: &mut impl Write, rows: &[Value], depth: usize) -> io::Result<()> {
    let indent = "  ".repeat(depth);
    let Some(Value::Object(first)) = rows.first() else {
        return Ok(());
    };
    let columns = first.keys().cloned().collect::<Vec<_>>();

    let cells = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| row.get(column).map(scalar).unwrap_or_default())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    let widths = columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            cells
                .iter()
                .map(|row| row[index].len())
                .chain(std::iter::once(column.len()))
                .max()
                .unwrap_or(0)
        })
        .collect::<Vec<_>>();

    let header = columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| format!("{column:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(out, "{indent}{}", header.trim_end())?;
    for row in cells {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:>width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(out, "{indent}{line}")?;
    }
    Ok(())
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => String::from("-"),
        Value::String(text) => text.clone(),
        Value::Number(number) => match number.as_f64() {
            Some(float) if number.is_f64() => format!("{float:.4}"),
            _ => number.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcfdesk_core::{EnvelopeError, EnvelopeMeta, ProviderId};
    use serde_json::json;

    fn envelope(data: Value) -> Envelope<Value> {
        let meta = EnvelopeMeta::new("request-12345", "v1.0.0", vec![ProviderId::Static], 3)
            .expect("valid meta");
        Envelope::success(meta, data)
    }

    fn render_table(envelope: &Envelope<Value>) -> String {
        let mut buffer = Vec::new();
        write_table(&mut buffer, envelope).expect("renders");
        String::from_utf8(buffer).expect("utf8")
    }

    #[test]
    fn rows_render_as_aligned_columns() {
        let rendered = render_table(&envelope(json!({
            "symbol": "MGLU3.SA",
            "rows": [
                {"date": "2023-12-31", "amount": 110.0, "kind": "actual"},
                {"date": "2024-12-31", "amount": 115.5, "kind": "projected"}
            ]
        })));

        assert!(rendered.contains("symbol : MGLU3.SA"));
        assert!(rendered.contains("amount    date        kind"));
        assert!(rendered.contains("115.5000"));
    }

    #[test]
    fn errors_are_listed_after_data() {
        let mut envelope = envelope(json!({"symbol": "MGLU3.SA", "valuation": null}));
        envelope
            .push_error(EnvelopeError::new("valuation.missing_data", "missing data: ebitda").expect("valid"))
            .expect("valid error");

        let rendered = render_table(&envelope);
        assert!(rendered.contains("valuation : -"));
        assert!(rendered.contains("- valuation.missing_data: missing data: ebitda"));
    }
}
