use thiserror::Error;

/// Reasons a block of the slow query log cannot become a `QueryRecord`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// The input held no `# Time: ` header at all.
    #[error("no '# Time:' header found")]
    EmptyInput,

    #[error("malformed timestamp line: {line:?}")]
    MalformedTimestamp { line: String },

    #[error("malformed user/host line (no [database]): {line:?}")]
    MalformedHostLine { line: String },

    #[error("malformed stats line, {field} is missing: {line:?}")]
    MalformedStatsLine { field: &'static str, line: String },

    #[error("{field} is not numeric: {token:?}")]
    NonNumericField { field: &'static str, token: String },
}

/// A `ParseError` located inside one input file.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{file}: block {block}, query {query}: {source}")]
pub struct IngestError {
    pub file: String,
    /// Index of the raw `# Time:` block, counted from zero.
    pub block: usize,
    /// Index of the query inside that block once expanded.
    pub query: usize,
    #[source]
    pub source: ParseError,
}
