use std::fs::File;
use std::io::BufReader;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info, warn};

use super::{TableData, TableSource};
use crate::column::{Categories, ColumnData, ColumnSpec};
use crate::config::{ColumnKindOverride, CsvConfig, NullConfig};
use crate::schema::{parse_instant, SchemaDetector, RFC3339};
use crate::{Result, TableError};

/// CSV data source. The whole file is read on a blocking worker thread.
#[derive(Debug, Clone)]
pub struct CsvSource {
    config: CsvConfig,
}

/// Values of one column while a file is being read
enum ColumnBuilder {
    Numeric(Vec<f64>),
    Temporal { values: Vec<DateTime<Utc>>, format: String },
    Categorical(Categories),
    Skip,
}

impl ColumnBuilder {
    fn new(kind: &ColumnKindOverride) -> Self {
        match kind {
            ColumnKindOverride::Numeric => ColumnBuilder::Numeric(Vec::new()),
            ColumnKindOverride::Temporal { format } => ColumnBuilder::Temporal {
                values: Vec::new(),
                format: format.clone().unwrap_or_else(|| RFC3339.to_string()),
            },
            ColumnKindOverride::Categorical => ColumnBuilder::Categorical(Categories::new()),
            ColumnKindOverride::Ignored => ColumnBuilder::Skip,
        }
    }

    fn push(&mut self, raw: &str, nulls: &NullConfig, line: u64, column: &str) -> Result<()> {
        let missing = nulls.is_null(raw);
        match self {
            ColumnBuilder::Numeric(values) => {
                if missing {
                    values.push(f64::NAN);
                } else {
                    let value = raw.trim().parse::<f64>().map_err(|_| parse_error(line, column, raw, "a number"))?;
                    values.push(value);
                }
            }
            ColumnBuilder::Temporal { values, format } => {
                let value = (!missing)
                    .then(|| parse_instant(raw, format))
                    .flatten()
                    .ok_or_else(|| parse_error(line, column, raw, &format!("an instant ({})", format)))?;
                values.push(value);
            }
            ColumnBuilder::Categorical(categories) => {
                categories.push(if missing { "" } else { raw.trim() });
            }
            ColumnBuilder::Skip => {}
        }
        Ok(())
    }

    fn finish(self) -> Option<ColumnData> {
        match self {
            ColumnBuilder::Numeric(values) => Some(ColumnData::Numeric(values)),
            ColumnBuilder::Temporal { values, .. } => Some(ColumnData::Temporal(values)),
            ColumnBuilder::Categorical(categories) => Some(ColumnData::Categorical(categories)),
            ColumnBuilder::Skip => None,
        }
    }
}

fn parse_error(line: u64, column: &str, value: &str, expected: &str) -> TableError {
    TableError::Parse {
        line,
        column: column.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

impl CsvSource {
    pub fn new(config: CsvConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CsvConfig {
        &self.config
    }

    /// Read and parse the file on the current thread
    pub fn read_blocking(config: &CsvConfig) -> Result<TableData> {
        let file = File::open(&config.path)?;
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(config.delimiter)
            .from_reader(BufReader::new(file));

        let mut records = csv_reader.records().skip(config.header_line);
        let headers: Vec<String> = match records.next() {
            Some(record) => record?.iter().map(|h| h.trim().to_string()).collect(),
            None => {
                return Err(TableError::Csv(format!(
                    "{}: no header on line {}",
                    config.file_name(),
                    config.header_line + 1
                )))
            }
        };
        let rows: Vec<StringRecord> = records.collect::<std::result::Result<_, _>>()?;

        for name in config.unknown_columns(&headers) {
            warn!(column = name, file = %config.file_name(), "column override does not match any header");
        }

        let samples: Vec<Vec<String>> = rows
            .iter()
            .take(config.sample_size)
            .map(|record| record.iter().map(str::to_string).collect())
            .collect();
        let kinds = SchemaDetector::new()
            .with_sample_size(config.sample_size)
            .with_null_config(config.null_config.clone())
            .detect_from_samples(&headers, &samples, |name| config.kind_override(name).cloned());
        debug!(?kinds, "column kinds resolved");

        let mut builders: Vec<ColumnBuilder> = kinds.iter().map(ColumnBuilder::new).collect();
        for record in &rows {
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            if record.len() != headers.len() {
                return Err(TableError::Csv(format!(
                    "line {}: expected {} fields, found {}",
                    line,
                    headers.len(),
                    record.len()
                )));
            }
            for ((builder, raw), name) in builders.iter_mut().zip(record.iter()).zip(&headers) {
                builder.push(raw, &config.null_config, line, name)?;
            }
        }

        let columns: Vec<ColumnSpec> = headers
            .into_iter()
            .zip(builders)
            .filter_map(|(name, builder)| builder.finish().map(|data| ColumnSpec { name, data }))
            .collect();

        info!(
            file = %config.file_name(),
            rows = rows.len(),
            columns = columns.len(),
            "CSV file loaded"
        );
        Ok(TableData { columns })
    }
}

#[async_trait]
impl TableSource for CsvSource {
    async fn read_table(&self) -> Result<TableData> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || Self::read_blocking(&config)).await?
    }

    fn source_name(&self) -> String {
        self.config.file_name()
    }
}
