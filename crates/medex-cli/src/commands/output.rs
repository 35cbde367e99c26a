//! Record formatting for the `process` and `batch` commands.

use medex_core::FieldRecord;

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON object with one key per field
    Json,
    /// CSV with a header row and one data row
    Csv,
    /// One "field: value" line per field
    Text,
}

impl OutputFormat {
    /// File extension used when writing to an output directory.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub fn format_record(record: &FieldRecord, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
        OutputFormat::Csv => format_csv(record),
        OutputFormat::Text => Ok(format_text(record)),
    }
}

fn format_csv(record: &FieldRecord) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(record.headers())?;
    wtr.write_record(record.values())?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(record: &FieldRecord) -> String {
    let mut output = String::new();

    for (name, value) in record.fields() {
        // Continuation lines of multi-line values are indented under the name
        let value = value.replace('\n', "\n    ");
        output.push_str(&format!("{}: {}\n", name, value));
    }

    output
}
