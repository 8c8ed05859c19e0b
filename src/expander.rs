use crate::tokenizer::{RawBlock, TIME_MARKER};

/// Tag that opens the user/host line of every logged query.
pub const HOST_MARKER: &str = "# User@Host: ";

/// Number of header lines (time, user/host, stats) in front of a statement.
const HEADER_LINES: usize = 3;

/// One query event, re-assembled so that it starts with its own `# Time: ` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubBlock(pub String);

impl SubBlock {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Expands a raw block into the query events it holds.
///
/// MySQL writes `# Time:` only when the second changes, so queries logged
/// within the same second follow each other in one block, each opened by its
/// own `# User@Host:` line. Every such follower gets a copy of the block's
/// time line; the leading query keeps the block as written.
///
/// Malformed blocks (fewer than three header lines) are passed through
/// untouched and left for the record parser to reject.
pub fn expand(block: RawBlock<'_>) -> Vec<SubBlock> {
    let text = block.as_str();
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= HEADER_LINES {
        return vec![SubBlock(format!("{TIME_MARKER}{text}"))];
    }

    let (header, statement) = lines.split_at(HEADER_LINES);
    let starts: Vec<usize> = statement
        .iter()
        .enumerate()
        .filter(|(_, line)| line.starts_with(HOST_MARKER.trim_end()))
        .map(|(i, _)| i)
        .collect();

    let Some(&first_end) = starts.first() else {
        return vec![SubBlock(format!("{TIME_MARKER}{text}"))];
    };

    let time_line = header[0];
    let mut out = Vec::with_capacity(starts.len() + 1);
    out.push(assemble(time_line, &header[1..], &statement[..first_end]));

    for (n, &start) in starts.iter().enumerate() {
        let end = starts.get(n + 1).copied().unwrap_or(statement.len());
        out.push(assemble(time_line, &[], &statement[start..end]));
    }

    tracing::trace!(time = time_line.trim(), queries = out.len(), "expanded grouped block");
    out
}

fn assemble(time_line: &str, header: &[&str], body: &[&str]) -> SubBlock {
    let mut s = String::from(TIME_MARKER);
    s.push_str(time_line);
    for line in header.iter().chain(body) {
        s.push('\n');
        s.push_str(line);
    }
    SubBlock(s)
}
