use crate::activity::{ActivityGrid, DAY_NAMES};
use crate::aggregator::PlotSeries;
use crate::formatter::{format_query, html_escape, FormatStyle};
use crate::parser::QueryRecord;
use crate::session::{FileOutcome, FileSummary, Session, Totals};
use crate::stats::{Bounds, RunningStats};
use crate::OutputFormat;
use chrono::NaiveDateTime;
use std::fmt::Display;
use std::io::Write;
use std::path::PathBuf;
use tabled::builder::Builder;
use tabled::{Table, Tabled};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const HOUR_FORMAT: &str = "%Y-%m-%d %H:00";

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "File")]
    name: String,
    #[tabled(rename = "Size (bytes)")]
    size: usize,
    #[tabled(rename = "Blocks")]
    blocks: String,
    #[tabled(rename = "Records")]
    records: String,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Query Time")]
    query_time: String,
    #[tabled(rename = "Lock Time")]
    lock_time: String,
    #[tabled(rename = "Rows Sent")]
    rows_sent: u64,
    #[tabled(rename = "Rows Examined")]
    rows_examined: u64,
    #[tabled(rename = "Database")]
    database: String,
    #[tabled(rename = "Query ID")]
    query_id: String,
    #[tabled(rename = "Query")]
    query: String,
}

#[derive(Tabled)]
struct BucketRow {
    #[tabled(rename = "Hour")]
    hour: String,
    #[tabled(rename = "Count")]
    count: usize,
}

/// Bounds shared by all series, for drawing them on one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedBounds {
    pub x_min: NaiveDateTime,
    pub x_max: NaiveDateTime,
    pub y_min: usize,
    pub y_max: usize,
    /// File and hour holding the most queries.
    pub busiest: (String, NaiveDateTime, usize),
}

pub fn combined_bounds<'a>(series: impl IntoIterator<Item = &'a PlotSeries>) -> Option<CombinedBounds> {
    let mut combined: Option<CombinedBounds> = None;
    for s in series {
        let (Some(x_min), Some(x_max)) = (s.x_min, s.x_max) else {
            continue;
        };
        let Some(peak) = s.buckets.iter().max_by_key(|b| b.count) else {
            continue;
        };
        match combined.as_mut() {
            None => {
                combined = Some(CombinedBounds {
                    x_min,
                    x_max,
                    y_min: s.y_min,
                    y_max: s.y_max,
                    busiest: (s.name.clone(), peak.hour, peak.count),
                })
            }
            Some(c) => {
                c.x_min = c.x_min.min(x_min);
                c.x_max = c.x_max.max(x_max);
                c.y_min = c.y_min.min(s.y_min);
                c.y_max = c.y_max.max(s.y_max);
                if peak.count > c.busiest.2 {
                    c.busiest = (s.name.clone(), peak.hour, peak.count);
                }
            }
        }
    }
    combined
}

pub fn print_report(
    session: &Session,
    format: OutputFormat,
    output_path: Option<&PathBuf>,
    limit: usize,
    format_sql: bool,
) -> anyhow::Result<()> {
    let mut writer: Box<dyn Write> = if let Some(path) = output_path {
        Box::new(std::fs::File::create(path)?)
    } else {
        Box::new(std::io::stdout())
    };

    match format {
        OutputFormat::Table => print_text(session, &mut writer, limit, format_sql),
        OutputFormat::Html => print_html(session, &mut writer, limit, format_sql),
    }
}

fn query_id(statement: &str) -> String {
    format!("{:x}", md5::compute(statement))
}

fn file_row(file: &FileOutcome) -> FileRow {
    let (blocks, records, status) = match file {
        FileOutcome::Parsed(s) => (s.blocks.to_string(), s.records.len().to_string(), "ok".to_string()),
        FileOutcome::Empty { .. } => ("0".to_string(), "0".to_string(), "no queries".to_string()),
        FileOutcome::Failed { error, .. } => ("-".to_string(), "-".to_string(), format!("error: {}", error.source)),
    };
    FileRow {
        name: file.name().to_string(),
        size: file.size(),
        blocks,
        records,
        status,
    }
}

fn range<T: Display>(bounds: Option<Bounds<T>>, unit: &str) -> (String, String) {
    match bounds {
        Some(b) => (format!("{}{unit}", b.min), format!("{}{unit}", b.max)),
        None => ("-".to_string(), "-".to_string()),
    }
}

fn stat_rows(stats: &RunningStats) -> Vec<StatRow> {
    let rows = [
        ("Query time", range(stats.query_time, "s")),
        ("Lock time", range(stats.lock_time, "s")),
        ("Rows sent", range(stats.rows_sent, "")),
        ("Rows examined", range(stats.rows_examined, "")),
    ];
    rows.into_iter()
        .map(|(field, (min, max))| StatRow { field, min, max })
        .collect()
}

fn single_line(statement: &str) -> String {
    let q = statement.replace('\n', " ");
    if q.chars().count() > 50 {
        let mut short: String = q.chars().take(47).collect();
        short.push_str("...");
        short
    } else {
        q
    }
}

fn record_row(record: &QueryRecord, format_sql: bool) -> RecordRow {
    RecordRow {
        date: record.timestamp.format(DATE_FORMAT).to_string(),
        query_time: format!("{}s", record.query_time),
        lock_time: format!("{}s", record.lock_time),
        rows_sent: record.rows_sent,
        rows_examined: record.rows_examined,
        database: record.database.clone(),
        query_id: query_id(&record.statement),
        query: if format_sql {
            format_query(&record.statement, FormatStyle::Text)
        } else {
            single_line(&record.statement)
        },
    }
}

fn bucket_rows(series: &PlotSeries) -> Vec<BucketRow> {
    series
        .buckets
        .iter()
        .map(|b| BucketRow { hour: b.hour.format(HOUR_FORMAT).to_string(), count: b.count })
        .collect()
}

fn series_bounds(series: &PlotSeries) -> String {
    match (series.x_min, series.x_max) {
        (Some(x_min), Some(x_max)) => format!(
            "{} - {}, {} to {} queries per hour",
            x_min.format(HOUR_FORMAT),
            x_max.format(HOUR_FORMAT),
            series.y_min,
            series.y_max
        ),
        _ => "N/A".to_string(),
    }
}

fn activity_rows(grid: &ActivityGrid) -> Vec<Vec<String>> {
    let mut rows = vec![std::iter::once("Day".to_string()).chain((0..24).map(|h| format!("{h:02}"))).collect()];
    for (day, name) in DAY_NAMES.iter().enumerate() {
        rows.push(std::iter::once(name.to_string()).chain((0..24).map(|h| grid.count(day, h).to_string())).collect());
    }
    rows
}

fn totals_line(totals: &Totals) -> String {
    format!(
        "Files: {}  Size: {} bytes  Entries: {}  Records: {}  Failed: {}",
        totals.files, totals.bytes, totals.blocks, totals.records, totals.failed
    )
}

fn parsed_files(session: &Session) -> impl Iterator<Item = &FileSummary> {
    session.files().iter().filter_map(|f| match f {
        FileOutcome::Parsed(summary) => Some(summary),
        _ => None,
    })
}

fn print_text(session: &Session, writer: &mut dyn Write, limit: usize, format_sql: bool) -> anyhow::Result<()> {
    let files: Vec<FileRow> = session.files().iter().map(file_row).collect();
    writeln!(writer, "{}", Table::new(files))?;
    writeln!(writer, "{}", totals_line(&session.totals()))?;

    writeln!(writer, "\nRunning Stats\n=============")?;
    writeln!(writer, "{}", Table::new(stat_rows(&session.stats())))?;

    if let Some(c) = combined_bounds(session.series()) {
        writeln!(writer, "\nInterval: {} - {}", c.x_min.format(HOUR_FORMAT), c.x_max.format(HOUR_FORMAT))?;
        writeln!(writer, "Queries per hour: {} to {}", c.y_min, c.y_max)?;
        writeln!(writer, "Busiest hour: {} in {} ({} queries)", c.busiest.1.format(HOUR_FORMAT), c.busiest.0, c.busiest.2)?;
    }

    for file in parsed_files(session) {
        writeln!(writer, "\n{}\n{}", file.name, "=".repeat(file.name.chars().count()))?;
        let rows: Vec<RecordRow> = file.records.iter().take(limit).map(|r| record_row(r, format_sql)).collect();
        writeln!(writer, "{}", Table::new(rows))?;
        if file.records.len() > limit {
            writeln!(writer, "({} more records not shown)", file.records.len() - limit)?;
        }

        writeln!(writer, "\nHourly Buckets ({} queries): {}", file.series.total(), series_bounds(&file.series))?;
        writeln!(writer, "{}", Table::new(bucket_rows(&file.series)))?;
    }

    let grid = session.activity();
    if !grid.is_empty() {
        writeln!(writer, "\nActivity by Day and Hour\n========================")?;
        let mut builder = Builder::default();
        for row in activity_rows(grid) {
            builder.push_record(row);
        }
        writeln!(writer, "{}", builder.build())?;
    }
    Ok(())
}

fn print_html(session: &Session, writer: &mut dyn Write, limit: usize, format_sql: bool) -> anyhow::Result<()> {
    writeln!(writer, "<!DOCTYPE html>")?;
    writeln!(writer, "<html>")?;
    writeln!(writer, "<head>")?;
    writeln!(writer, "<title>Slow Query Timeline</title>")?;
    writeln!(writer, "<style>")?;
    writeln!(writer, "body {{ font-family: sans-serif; margin: 20px; }}")?;
    writeln!(writer, "table {{ border-collapse: collapse; margin-bottom: 20px; }}")?;
    writeln!(writer, "th, td {{ border: 1px solid #ddd; padding: 6px; text-align: left; vertical-align: top; }}")?;
    writeln!(writer, "th {{ background-color: #f2f2f2; }}")?;
    writeln!(writer, ".error {{ color: #b00; }}")?;
    writeln!(writer, ".query-sql {{ font-family: monospace; }}")?;
    writeln!(writer, ".sql_keyword {{ color: #0050a0; font-weight: bold; }}")?;
    writeln!(writer, "</style>")?;
    writeln!(writer, "</head>")?;
    writeln!(writer, "<body>")?;
    writeln!(writer, "<h1>Slow Query Timeline</h1>")?;

    writeln!(writer, "<h2>Files</h2>")?;
    writeln!(writer, "<table>")?;
    writeln!(writer, "<thead><tr><th>File</th><th>Size (bytes)</th><th>Blocks</th><th>Records</th><th>Status</th></tr></thead>")?;
    writeln!(writer, "<tbody>")?;
    for file in session.files() {
        let row = file_row(file);
        let class = if matches!(file, FileOutcome::Failed { .. }) { " class=\"error\"" } else { "" };
        writeln!(
            writer,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td{}>{}</td></tr>",
            html_escape(&row.name),
            row.size,
            row.blocks,
            row.records,
            class,
            html_escape(&row.status)
        )?;
    }
    writeln!(writer, "</tbody>")?;
    writeln!(writer, "</table>")?;
    writeln!(writer, "<p>{}</p>", totals_line(&session.totals()))?;

    writeln!(writer, "<h2>Running Stats</h2>")?;
    writeln!(writer, "<table>")?;
    writeln!(writer, "<thead><tr><th>Field</th><th>Min</th><th>Max</th></tr></thead>")?;
    writeln!(writer, "<tbody>")?;
    for row in stat_rows(&session.stats()) {
        writeln!(writer, "<tr><td>{}</td><td>{}</td><td>{}</td></tr>", row.field, row.min, row.max)?;
    }
    writeln!(writer, "</tbody>")?;
    writeln!(writer, "</table>")?;
    if let Some(c) = combined_bounds(session.series()) {
        writeln!(writer, "<ul>")?;
        writeln!(writer, "<li>Interval: {} - {}</li>", c.x_min.format(HOUR_FORMAT), c.x_max.format(HOUR_FORMAT))?;
        writeln!(writer, "<li>Queries per hour: {} to {}</li>", c.y_min, c.y_max)?;
        writeln!(
            writer,
            "<li>Busiest hour: {} in {} ({} queries)</li>",
            c.busiest.1.format(HOUR_FORMAT),
            html_escape(&c.busiest.0),
            c.busiest.2
        )?;
        writeln!(writer, "</ul>")?;
    }

    for file in parsed_files(session) {
        writeln!(writer, "<h2>{}</h2>", html_escape(&file.name))?;
        writeln!(writer, "<table>")?;
        writeln!(writer, "<thead><tr><th>Date</th><th>Query time (s)</th><th>Lock time (s)</th><th>Rows sent</th><th>Rows examined</th><th>Database</th><th>Query ID</th><th>Slow query</th></tr></thead>")?;
        writeln!(writer, "<tbody>")?;
        for record in file.records.iter().take(limit) {
            let sql = if format_sql {
                format_query(&record.statement, FormatStyle::Html)
            } else {
                html_escape(&record.statement).replace('\n', "<br/>")
            };
            writeln!(writer, "<tr>")?;
            writeln!(writer, "<td>{}</td>", record.timestamp.format(DATE_FORMAT))?;
            writeln!(writer, "<td>{}</td>", record.query_time)?;
            writeln!(writer, "<td>{}</td>", record.lock_time)?;
            writeln!(writer, "<td>{}</td>", record.rows_sent)?;
            writeln!(writer, "<td>{}</td>", record.rows_examined)?;
            writeln!(writer, "<td>{}</td>", html_escape(&record.database))?;
            writeln!(writer, "<td class=\"query-sql\">{}</td>", query_id(&record.statement))?;
            writeln!(writer, "<td class=\"query-sql\">{}</td>", sql)?;
            writeln!(writer, "</tr>")?;
        }
        writeln!(writer, "</tbody>")?;
        writeln!(writer, "</table>")?;
        if file.records.len() > limit {
            writeln!(writer, "<p>{} more records not shown</p>", file.records.len() - limit)?;
        }

        writeln!(writer, "<h3>Hourly Buckets ({} queries)</h3>", file.series.total())?;
        writeln!(writer, "<p>{}</p>", series_bounds(&file.series))?;
        writeln!(writer, "<table>")?;
        writeln!(writer, "<thead><tr><th>Hour</th><th>Count</th></tr></thead>")?;
        writeln!(writer, "<tbody>")?;
        for row in bucket_rows(&file.series) {
            writeln!(writer, "<tr><td>{}</td><td>{}</td></tr>", row.hour, row.count)?;
        }
        writeln!(writer, "</tbody>")?;
        writeln!(writer, "</table>")?;
    }

    let grid = session.activity();
    if !grid.is_empty() {
        writeln!(writer, "<h2>Activity by Day and Hour</h2>")?;
        writeln!(writer, "<table>")?;
        let mut rows = activity_rows(grid).into_iter();
        if let Some(header) = rows.next() {
            writeln!(writer, "<thead><tr><th>{}</th></tr></thead>", header.join("</th><th>"))?;
        }
        writeln!(writer, "<tbody>")?;
        for row in rows {
            writeln!(writer, "<tr><td>{}</td></tr>", row.join("</td><td>"))?;
        }
        writeln!(writer, "</tbody>")?;
        writeln!(writer, "</table>")?;
    }

    writeln!(writer, "</body>")?;
    writeln!(writer, "</html>")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::StatsLayout;

    const LOG: &str = "# Time: 130421  6:45:32
# User@Host: db[db] @ localhost []
# Query_time: 7  Lock_time: 0  Rows_sent: 0  Rows_examined: 0
use db;
COMMIT;
# User@Host: db[db] @ localhost []
# Query_time: 7  Lock_time: 0  Rows_sent: 0  Rows_examined: 0
COMMIT;
# Time: 130421  9:01:00
# User@Host: db[db] @ localhost []
# Query_time: 2  Lock_time: 0  Rows_sent: 5  Rows_examined: 50
SELECT name FROM users WHERE id < 10;
";

    fn session() -> Session {
        let mut session = Session::new(StatsLayout::Labeled);
        session.ingest("a.log", LOG);
        session.ingest("b.log", &LOG.replace("130421  9:01:00", "130422  9:01:00"));
        session.ingest("broken.log", "# Time: nope\n");
        session
    }

    fn render(format: fn(&Session, &mut dyn Write, usize, bool) -> anyhow::Result<()>, limit: usize) -> String {
        let mut out = Vec::new();
        format(&session(), &mut out, limit, true).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_combined_bounds() {
        let s = session();
        let c = combined_bounds(s.series()).unwrap();
        assert_eq!(c.x_min.format(HOUR_FORMAT).to_string(), "2013-04-21 06:00");
        assert_eq!(c.x_max.format(HOUR_FORMAT).to_string(), "2013-04-22 09:00");
        assert_eq!((c.y_min, c.y_max), (0, 2));
        assert_eq!(c.busiest.0, "a.log");
        assert_eq!(c.busiest.2, 2);
    }

    #[test]
    fn test_combined_bounds_without_series() {
        assert!(combined_bounds(Vec::<&PlotSeries>::new()).is_none());
    }

    #[test]
    fn test_query_id_is_md5_of_statement() {
        assert_eq!(query_id("COMMIT;"), format!("{:x}", md5::compute("COMMIT;")));
        assert_eq!(query_id("COMMIT;").len(), 32);
    }

    #[test]
    fn test_single_line_truncates_on_chars() {
        assert_eq!(single_line("SELECT 1\nFROM dual"), "SELECT 1 FROM dual");
        let long = "é".repeat(60);
        let short = single_line(&long);
        assert_eq!(short.chars().count(), 50);
        assert!(short.ends_with("..."));
    }

    #[test]
    fn test_text_report_sections() {
        let out = render(print_text, 1);
        assert!(out.contains("broken.log"));
        assert!(out.contains("error: malformed timestamp line"));
        assert!(out.contains("Files: 3"));
        assert!(out.contains("Records: 6"));
        assert!(out.contains("Busiest hour: 2013-04-21 06:00 in a.log (2 queries)"));
        assert!(out.contains("(2 more records not shown)"));
        assert!(out.contains("2013-04-22 09:00"));
        assert!(out.contains("Sunday"));
    }

    #[test]
    fn test_html_report_sections() {
        let out = render(print_html, 10);
        assert!(out.starts_with("<!DOCTYPE html>"));
        assert!(out.contains("<h2>a.log</h2>"));
        assert!(out.contains("class=\"error\""));
        assert!(out.contains("<span class=\"sql_keyword\">COMMIT</span>"));
        assert!(out.contains("id &lt; 10"));
        assert!(out.contains("<tr><td>2013-04-21 06:00</td><td>2</td></tr>"));
        assert!(out.trim_end().ends_with("</html>"));
    }
}
