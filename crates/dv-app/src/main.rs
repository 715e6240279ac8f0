//! Command line entry point: load a CSV file, apply a query, print statistics

use std::fmt::Write as _;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use dv_core::TableSettings;
use dv_data::{
    ColumnSummaryStats, CsvSource, DataTable, SharedDataTable, StatsScope, TableEvent, TableListener,
};

mod cli;

use cli::{Args, SelectionArg};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    run(args).await
}

async fn run(args: Args) -> Result<()> {
    let mut settings = match &args.settings {
        Some(path) => TableSettings::from_json_file(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?,
        None => TableSettings::default(),
    };
    if let Some(bins) = args.bins {
        settings.num_histogram_bins = Some(bins);
    }
    if args.nonquery {
        settings.calculate_nonquery_statistics = true;
    }

    let table = SharedDataTable::new(DataTable::with_settings(settings).context("invalid table settings")?);
    let source = CsvSource::new(args.csv_config()?);
    table
        .load(&source)
        .await
        .with_context(|| format!("failed to load {}", args.path.display()))?;

    let log_events: std::sync::Arc<dyn TableListener> =
        std::sync::Arc::new(|table: &DataTable, event: &TableEvent| {
            if event.affects_query() {
                debug!(?event, queried = table.query().queried_count(), "query partition changed");
            } else {
                debug!(?event, "table changed");
            }
        });
    table.read(|t| t.subscribe(&log_events))?;

    let selections = args
        .ranges
        .iter()
        .map(|arg| SelectionArg::parse_range(arg))
        .chain(args.categories.iter().map(|arg| SelectionArg::parse_categories(arg)))
        .collect::<Result<Vec<_>>>()?;
    for selection in &selections {
        let bounds = table.read(|t| selection.bounds(t))??;
        let column = selection.column();
        table
            .try_mutate(|t| {
                let id = t.column_by_name(column).map(|c| c.id());
                match id {
                    Some(id) => t.add_selection_range(id, bounds),
                    None => Err(dv_data::TableError::ColumnNotFound {
                        column: column.to_string(),
                    }),
                }
            })
            .with_context(|| format!("cannot select on '{column}'"))?;
    }

    let report = table.read(report)?;
    print!("{report}");
    info!(selections = selections.len(), "done");
    Ok(())
}

fn report(table: &DataTable) -> String {
    let query = table.query();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} tuples, {} columns, {} queried, {} not queried",
        table.tuple_count(),
        table.column_count(),
        query.queried_count(),
        query.non_queried_count()
    );

    for column in table.enabled_columns() {
        let _ = writeln!(out, "\n{} ({})", column.name(), column.kind().label());
        for (label, scope) in [
            ("all", StatsScope::All),
            ("queried", StatsScope::Queried),
            ("not queried", StatsScope::NonQueried),
        ] {
            if let Some(stats) = table.statistics(column.id(), scope) {
                let _ = writeln!(out, "  {:<12}{}", label, describe(stats));
            }
        }
    }
    out
}

fn describe(stats: &ColumnSummaryStats) -> String {
    match stats {
        ColumnSummaryStats::Numeric(s) => format!(
            "n={} min={:.3} max={:.3} mean={:.3} sd={:.3} median={:.3} bins={}",
            s.count,
            s.min,
            s.max,
            s.mean,
            s.std_dev,
            s.median,
            s.histogram.num_bins()
        ),
        ColumnSummaryStats::Temporal(s) => format!("n={} from {} to {} mean {}", s.count, s.start, s.end, s.mean),
        ColumnSummaryStats::Categorical(s) => {
            let counts: Vec<String> = s
                .category_counts
                .iter()
                .map(|(category, count)| format!("{category}={count}"))
                .collect();
            format!("n={} {}", s.count, counts.join(" "))
        }
        ColumnSummaryStats::Bivariate(s) => match s.correlation {
            Some(r) => format!("pairs={} r={:.3}", s.pair_count, r),
            None => format!("pairs={}", s.pair_count),
        },
    }
}
