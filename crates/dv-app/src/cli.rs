use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;

use dv_data::schema::{parse_instant, RFC3339};
use dv_data::{ColumnKind, ColumnKindOverride, CsvConfig, DataTable, SelectionBounds};

/// Load a CSV file into a data table, apply a query and print the summary
/// statistics of every column.
#[derive(Parser, Debug)]
#[command(name = "datavis", about = "Summarise a CSV file and the rows matching a query")]
pub struct Args {
    /// CSV file to load.
    pub path: PathBuf,

    /// Field delimiter.
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    /// Zero-based line holding the column names.
    #[arg(long, default_value_t = 0)]
    pub header_line: usize,

    /// Load a column as categorical (repeatable).
    #[arg(long, value_name = "NAME")]
    pub categorical: Vec<String>,

    /// Load a column as temporal, optionally with a chrono format (repeatable).
    #[arg(long, value_name = "NAME[=FORMAT]")]
    pub temporal: Vec<String>,

    /// Skip a column (repeatable).
    #[arg(long, value_name = "NAME")]
    pub ignore: Vec<String>,

    /// Select rows whose value lies in `MIN..MAX` (repeatable). Ranges on
    /// one column are OR-ed, ranges on different columns are AND-ed.
    #[arg(long = "range", value_name = "NAME=MIN..MAX")]
    pub ranges: Vec<String>,

    /// Select rows of a categorical column holding one of the listed categories.
    #[arg(long = "category", value_name = "NAME=A,B,...")]
    pub categories: Vec<String>,

    /// Fixed histogram bin count.
    #[arg(long)]
    pub bins: Option<usize>,

    /// Table settings JSON file.
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Also summarise the rows outside the query.
    #[arg(long)]
    pub nonquery: bool,
}

impl Args {
    pub fn csv_config(&self) -> Result<CsvConfig> {
        let delimiter = u8::try_from(self.delimiter)
            .map_err(|_| anyhow!("delimiter must be a single-byte character, got {:?}", self.delimiter))?;
        let mut config = CsvConfig::new(&self.path)
            .with_delimiter(delimiter)
            .with_header_line(self.header_line);

        for name in &self.categorical {
            config = config.with_column_kind(name.as_str(), ColumnKindOverride::Categorical);
        }
        for arg in &self.temporal {
            let (name, format) = match arg.split_once('=') {
                Some((name, format)) => (name, Some(format.to_string())),
                None => (arg.as_str(), None),
            };
            config = config.with_column_kind(name, ColumnKindOverride::Temporal { format });
        }
        for name in &self.ignore {
            config = config.with_column_kind(name.as_str(), ColumnKindOverride::Ignored);
        }
        Ok(config)
    }
}

/// A selection given on the command line, resolved against a loaded table
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionArg {
    Range { column: String, low: String, high: String },
    Categories { column: String, categories: Vec<String> },
}

impl SelectionArg {
    pub fn parse_range(arg: &str) -> Result<Self> {
        let (column, bounds) = split_assignment(arg)?;
        let (low, high) = bounds
            .split_once("..")
            .with_context(|| format!("range '{arg}' must look like NAME=MIN..MAX"))?;
        Ok(SelectionArg::Range {
            column: column.to_string(),
            low: low.trim().to_string(),
            high: high.trim().to_string(),
        })
    }

    pub fn parse_categories(arg: &str) -> Result<Self> {
        let (column, list) = split_assignment(arg)?;
        let categories = list.split(',').map(|c| c.trim().to_string()).collect();
        Ok(SelectionArg::Categories {
            column: column.to_string(),
            categories,
        })
    }

    pub fn column(&self) -> &str {
        match self {
            SelectionArg::Range { column, .. } | SelectionArg::Categories { column, .. } => column,
        }
    }

    /// Build bounds matching the kind of the named column
    pub fn bounds(&self, table: &DataTable) -> Result<SelectionBounds> {
        let column = table
            .column_by_name(self.column())
            .with_context(|| format!("no column named '{}'", self.column()))?;

        match (self, column.kind()) {
            (SelectionArg::Range { low, high, .. }, ColumnKind::Numeric) => {
                let low: f64 = low.parse().with_context(|| format!("'{low}' is not a number"))?;
                let high: f64 = high.parse().with_context(|| format!("'{high}' is not a number"))?;
                Ok(SelectionBounds::numeric(low, high))
            }
            (SelectionArg::Range { low, high, .. }, ColumnKind::Temporal) => {
                Ok(SelectionBounds::temporal(instant(low)?, instant(high)?))
            }
            (SelectionArg::Categories { categories, .. }, ColumnKind::Categorical) => {
                Ok(SelectionBounds::categories(categories.iter().cloned()))
            }
            (_, kind) => bail!(
                "column '{}' is {} and cannot take this selection",
                self.column(),
                kind.label()
            ),
        }
    }
}

fn split_assignment(arg: &str) -> Result<(&str, &str)> {
    let (column, value) = arg
        .split_once('=')
        .with_context(|| format!("'{arg}' must look like NAME=VALUE"))?;
    if column.trim().is_empty() {
        bail!("'{arg}' is missing a column name");
    }
    Ok((column.trim(), value))
}

fn instant(value: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    [RFC3339, "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d"]
        .iter()
        .find_map(|format| parse_instant(value, format))
        .with_context(|| format!("'{value}' is not an instant"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dv_data::ColumnSpec;

    fn table() -> DataTable {
        let mut table = DataTable::new();
        table
            .set_data(vec![
                ColumnSpec::numeric("mpg", vec![18.0, 25.0, 31.0]),
                ColumnSpec::categorical("origin", ["USA", "Japan", "Europe"]),
            ])
            .unwrap();
        table
    }

    #[test]
    fn test_csv_config_from_args() {
        let args = Args::parse_from([
            "datavis",
            "cars.csv",
            "--delimiter",
            ";",
            "--categorical",
            "cylinders",
            "--temporal",
            "built=%d/%m/%Y",
            "--temporal",
            "sold",
            "--ignore",
            "notes",
        ]);
        let config = args.csv_config().unwrap();

        assert_eq!(config.delimiter, b';');
        assert_eq!(config.kind_override("cylinders"), Some(&ColumnKindOverride::Categorical));
        assert_eq!(
            config.kind_override("built"),
            Some(&ColumnKindOverride::Temporal {
                format: Some("%d/%m/%Y".to_string())
            })
        );
        assert_eq!(config.kind_override("sold"), Some(&ColumnKindOverride::Temporal { format: None }));
        assert!(config.is_ignored("notes"));
    }

    #[test]
    fn test_parse_selections() {
        assert_eq!(
            SelectionArg::parse_range("mpg=20..30").unwrap(),
            SelectionArg::Range {
                column: "mpg".to_string(),
                low: "20".to_string(),
                high: "30".to_string()
            }
        );
        assert!(SelectionArg::parse_range("mpg=20").is_err());
        assert!(SelectionArg::parse_range("=1..2").is_err());

        let categories = SelectionArg::parse_categories("origin=USA, Japan").unwrap();
        assert_eq!(categories.column(), "origin");
    }

    #[test]
    fn test_bounds_follow_column_kind() {
        let table = table();

        let bounds = SelectionArg::parse_range("mpg=20..30").unwrap().bounds(&table).unwrap();
        assert_eq!(bounds, SelectionBounds::numeric(20.0, 30.0));

        let bounds = SelectionArg::parse_categories("origin=USA,Japan")
            .unwrap()
            .bounds(&table)
            .unwrap();
        assert_eq!(bounds, SelectionBounds::categories(["Japan", "USA"].map(String::from)));

        assert!(SelectionArg::parse_range("origin=1..2").unwrap().bounds(&table).is_err());
        assert!(SelectionArg::parse_range("weight=1..2").unwrap().bounds(&table).is_err());
    }
}
