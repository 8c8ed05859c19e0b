use crate::error::ParseError;
use crate::expander::SubBlock;
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

/// One logged slow query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRecord {
    /// Server-local time, as written in the log.
    pub timestamp: NaiveDateTime,
    pub database: String,
    pub query_time: f64,
    pub lock_time: f64,
    pub rows_sent: u64,
    pub rows_examined: u64,
    pub statement: String,
}

/// How the `# Query_time:` line is read.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatsLayout {
    /// Take the token following each label.
    #[default]
    Labeled,
    /// Legacy fixed columns: split on single spaces, values at 2, 5, 8 and 11.
    Fixed,
}

static RE_TIME: OnceLock<Regex> = OnceLock::new();

const QUERY_TIME: &str = "Query_time";
const LOCK_TIME: &str = "Lock_time";
const ROWS_SENT: &str = "Rows_sent";
const ROWS_EXAMINED: &str = "Rows_examined";

/// Parses one expanded block (time line, user/host line, stats line, statement).
pub fn parse_record(block: &SubBlock, layout: StatsLayout) -> Result<QueryRecord, ParseError> {
    let mut lines = block.as_str().lines();

    let timestamp = parse_timestamp(lines.next().unwrap_or_default())?;
    let database = parse_database(lines.next().unwrap_or_default())?;
    let stats = parse_stats(lines.next().unwrap_or_default(), layout)?;
    let statement = join_statement(lines);

    Ok(QueryRecord {
        timestamp,
        database,
        query_time: stats.query_time,
        lock_time: stats.lock_time,
        rows_sent: stats.rows_sent,
        rows_examined: stats.rows_examined,
        statement,
    })
}

/// Decodes `# Time: YYMMDD H:M:S`; the year is taken as 2000 + YY.
pub fn parse_timestamp(line: &str) -> Result<NaiveDateTime, ParseError> {
    let re = RE_TIME.get_or_init(|| {
        Regex::new(r"^#\s*Time:\s+(\d{2})(\d{2})(\d{2})\s+(\d{1,2}):(\d{1,2}):(\d{1,2})(?:\s|$)").unwrap()
    });
    let malformed = || ParseError::MalformedTimestamp { line: line.to_string() };

    let caps = re.captures(line.trim()).ok_or_else(malformed)?;
    let num = |i: usize| caps[i].parse::<u32>().map_err(|_| malformed());

    NaiveDate::from_ymd_opt(2000 + num(1)? as i32, num(2)?, num(3)?)
        .and_then(|date| date.and_hms_opt(num(4).ok()?, num(5).ok()?, num(6).ok()?))
        .ok_or_else(malformed)
}

/// Extracts the database name from `# User@Host: name[name] @ host [ip]`.
pub fn parse_database(line: &str) -> Result<String, ParseError> {
    let open = line.find('[');
    let close = open.and_then(|o| line[o + 1..].find(']').map(|c| o + 1 + c));
    match (open, close) {
        (Some(o), Some(c)) => Ok(line[o + 1..c].to_string()),
        _ => Err(ParseError::MalformedHostLine { line: line.to_string() }),
    }
}

#[derive(Debug, PartialEq)]
struct Stats {
    query_time: f64,
    lock_time: f64,
    rows_sent: u64,
    rows_examined: u64,
}

fn parse_stats(line: &str, layout: StatsLayout) -> Result<Stats, ParseError> {
    Ok(Stats {
        query_time: seconds(QUERY_TIME, stat_token(line, layout, QUERY_TIME)?)?,
        lock_time: seconds(LOCK_TIME, stat_token(line, layout, LOCK_TIME)?)?,
        rows_sent: count(ROWS_SENT, stat_token(line, layout, ROWS_SENT)?)?,
        rows_examined: count(ROWS_EXAMINED, stat_token(line, layout, ROWS_EXAMINED)?)?,
    })
}

fn stat_token<'a>(line: &'a str, layout: StatsLayout, field: &'static str) -> Result<&'a str, ParseError> {
    let token = match layout {
        StatsLayout::Labeled => {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            tokens
                .iter()
                .position(|t| t.strip_suffix(':') == Some(field))
                .and_then(|i| tokens.get(i + 1).copied())
        }
        StatsLayout::Fixed => {
            let column = match field {
                QUERY_TIME => 2,
                LOCK_TIME => 5,
                ROWS_SENT => 8,
                _ => 11,
            };
            line.split(' ').nth(column)
        }
    };
    token.ok_or_else(|| missing(field, line))
}

fn missing(field: &'static str, line: &str) -> ParseError {
    ParseError::MalformedStatsLine { field, line: line.to_string() }
}

fn seconds(field: &'static str, token: &str) -> Result<f64, ParseError> {
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(ParseError::NonNumericField { field, token: token.to_string() }),
    }
}

fn count(field: &'static str, token: &str) -> Result<u64, ParseError> {
    token
        .parse::<u64>()
        .map_err(|_| ParseError::NonNumericField { field, token: token.to_string() })
}

/// Joins statement lines with `\n`, dropping blank lines at either end.
fn join_statement<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    let lines: Vec<&str> = lines.collect();
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(s), Some(e)) => lines[s..=e].join("\n"),
        _ => String::new(),
    }
}
