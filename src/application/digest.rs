// Plain-text statistics digest
use crate::domain::series::SeriesTable;
use chrono::{DateTime, Utc};

const TAIL_ROWS: usize = 6;
const CELL_WIDTH: usize = 12;

/// Render the descriptive text block the distribution layer attaches to
/// its messages: per source, descriptive statistics and the last rows;
/// the sensor section opens with the correlation matrix.
pub fn build_digest(tables: &[SeriesTable], now: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} v{} Data Report {}\n\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        now.format("%d-%m-%Y")
    ));

    for table in tables {
        let section = if table.is_primary {
            "Sensor Data".to_string()
        } else {
            format!("{} Data", table.source.display_name)
        };
        out.push_str(&format!("------------- {section} -------------\n"));

        if table.is_empty() {
            out.push_str("no rows recorded\n\n");
            continue;
        }

        if table.is_primary {
            out.push_str(&correlation_block(table));
            out.push('\n');
        }
        out.push_str(&describe_block(table));
        out.push('\n');
        out.push_str(&tail_block(table));
        out.push('\n');
    }

    out
}

fn header_row(names: &[&str]) -> String {
    let mut row = format!("{:<10}", "");
    for name in names {
        row.push_str(&format!("{name:>CELL_WIDTH$}"));
    }
    row.push('\n');
    row
}

fn cell(value: f64) -> String {
    if value.is_nan() {
        format!("{:>CELL_WIDTH$}", "NaN")
    } else {
        format!("{value:>CELL_WIDTH$.2}")
    }
}

fn describe_block(table: &SeriesTable) -> String {
    let columns: Vec<(&str, &[f64])> = table.columns().collect();
    let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();

    let mut block = header_row(&names);
    let stats: [(&str, fn(&[f64]) -> f64); 8] = [
        ("count", |v| finite(v).len() as f64),
        ("mean", |v| mean(&finite(v))),
        ("std", |v| std_dev(&finite(v))),
        ("min", |v| quantile(&sorted_finite(v), 0.0)),
        ("25%", |v| quantile(&sorted_finite(v), 0.25)),
        ("50%", |v| quantile(&sorted_finite(v), 0.5)),
        ("75%", |v| quantile(&sorted_finite(v), 0.75)),
        ("max", |v| quantile(&sorted_finite(v), 1.0)),
    ];
    for (label, stat) in stats {
        let mut row = format!("{label:<10}");
        for (_, values) in &columns {
            row.push_str(&cell(stat(values)));
        }
        row.push('\n');
        block.push_str(&row);
    }
    block
}

fn correlation_block(table: &SeriesTable) -> String {
    let columns: Vec<(&str, &[f64])> = table.columns().collect();
    if columns.len() < 2 || table.len() < 2 {
        return String::new();
    }
    let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();

    let mut block = header_row(&names);
    for (name, values) in &columns {
        let mut row = format!("{name:<10}");
        for (_, other) in &columns {
            row.push_str(&cell(pearson(values, other)));
        }
        row.push('\n');
        block.push_str(&row);
    }
    block
}

fn tail_block(table: &SeriesTable) -> String {
    let columns: Vec<(&str, &[f64])> = table.columns().collect();
    let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();

    let mut block = format!("{:<20}", "timestamp");
    for name in &names {
        block.push_str(&format!("{name:>CELL_WIDTH$}"));
    }
    block.push('\n');

    let start = table.len().saturating_sub(TAIL_ROWS);
    for row in start..table.len() {
        let mut line = format!("{:<20}", table.timestamps()[row].format("%Y-%m-%d %H:%M:%S"));
        for (_, values) in &columns {
            line.push_str(&cell(values[row]));
        }
        line.push('\n');
        block.push_str(&line);
    }
    block
}

fn finite(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut out = finite(values);
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Quantile of an ascending slice with linear interpolation.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    }
}

/// Pearson correlation over rows where both columns are finite.
fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return f64::NAN;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}
