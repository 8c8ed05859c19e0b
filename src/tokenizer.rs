/// Literal tag that opens every timestamp group in the slow query log.
pub const TIME_MARKER: &str = "# Time: ";

/// Text following one `# Time: ` marker, up to the next marker or end of input.
///
/// The marker itself is not part of the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBlock<'a>(pub &'a str);

impl<'a> RawBlock<'a> {
    pub fn as_str(&self) -> &'a str {
        self.0
    }
}

/// Splits a whole log into raw blocks.
///
/// Whatever precedes the first marker is the server banner
/// (`mysqld, Version: ... started with:`) and is dropped.
pub fn tokenize(text: &str) -> Vec<RawBlock<'_>> {
    let mut segments = text.split(TIME_MARKER);
    let banner = segments.next().unwrap_or_default();
    if !banner.trim().is_empty() {
        tracing::trace!(bytes = banner.len(), "skipping server banner");
    }
    segments.map(RawBlock).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_banner() {
        let text = "/usr/sbin/mysqld, Version: 5.5.31-log. started with:\n\
                    Tcp port: 3306  Unix socket: /var/run/mysqld/mysqld.sock\n\
                    # Time: 130421  6:45:32\nA\n# Time: 130421  6:45:33\nB\n";
        let blocks = tokenize(text);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].as_str(), "130421  6:45:32\nA\n");
        assert_eq!(blocks[1].as_str(), "130421  6:45:33\nB\n");
    }

    #[test]
    fn test_tokenize_no_marker() {
        assert!(tokenize("Tcp port: 3306\nTime Id Command Argument\n").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_tokenize_leading_marker() {
        let blocks = tokenize("# Time: 130421  6:45:32\nSELECT 1;");
        assert_eq!(blocks, vec![RawBlock("130421  6:45:32\nSELECT 1;")]);
    }
}
