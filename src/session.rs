use crate::activity::ActivityGrid;
use crate::aggregator::{PlotSeries, TimeBucketAggregator};
use crate::error::{IngestError, ParseError};
use crate::expander::expand;
use crate::parser::{parse_record, QueryRecord, StatsLayout};
use crate::stats::{RunningStats, StatsTracker};
use crate::tokenizer::tokenize;

/// A successfully parsed file.
#[derive(Debug, Clone)]
pub struct FileSummary {
    pub name: String,
    pub size: usize,
    /// `# Time:` blocks, before grouped queries are expanded.
    pub blocks: usize,
    pub records: Vec<QueryRecord>,
    pub series: PlotSeries,
}

#[derive(Debug, Clone)]
pub enum FileOutcome {
    Parsed(FileSummary),
    /// No `# Time:` header at all; nothing to report but not an error.
    Empty { name: String, size: usize },
    Failed { size: usize, error: IngestError },
}

impl FileOutcome {
    pub fn name(&self) -> &str {
        match self {
            FileOutcome::Parsed(summary) => &summary.name,
            FileOutcome::Empty { name, .. } => name,
            FileOutcome::Failed { error, .. } => &error.file,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            FileOutcome::Parsed(summary) => summary.size,
            FileOutcome::Empty { size, .. } | FileOutcome::Failed { size, .. } => *size,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub files: usize,
    pub bytes: usize,
    pub blocks: usize,
    pub records: usize,
    pub failed: usize,
}

/// State shared by all files parsed together.
///
/// Files are ingested one at a time; a file either commits all of its
/// records to the shared statistics or none of them.
#[derive(Debug)]
pub struct Session {
    layout: StatsLayout,
    stats: StatsTracker,
    activity: ActivityGrid,
    files: Vec<FileOutcome>,
}

impl Session {
    pub fn new(layout: StatsLayout) -> Self {
        Self {
            layout,
            stats: StatsTracker::new(),
            activity: ActivityGrid::new(),
            files: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.stats.reset();
        self.activity = ActivityGrid::new();
        self.files.clear();
    }

    /// Parses one complete log and records the outcome.
    pub fn ingest(&mut self, name: &str, text: &str) -> &FileOutcome {
        let outcome = match self.parse_file(name, text) {
            Ok((0, _)) => {
                tracing::warn!(file = name, "{}", ParseError::EmptyInput);
                FileOutcome::Empty { name: name.to_string(), size: text.len() }
            }
            Ok((blocks, records)) => FileOutcome::Parsed(self.commit(name, text.len(), blocks, records)),
            Err(error) => {
                tracing::error!("{error}");
                FileOutcome::Failed { size: text.len(), error }
            }
        };
        self.files.push(outcome);
        &self.files[self.files.len() - 1]
    }

    fn parse_file(&self, name: &str, text: &str) -> Result<(usize, Vec<QueryRecord>), IngestError> {
        let blocks = tokenize(text);
        let mut records = Vec::with_capacity(blocks.len());

        for (block_index, block) in blocks.iter().enumerate() {
            for (query_index, sub_block) in expand(*block).iter().enumerate() {
                let record = parse_record(sub_block, self.layout).map_err(|source| IngestError {
                    file: name.to_string(),
                    block: block_index,
                    query: query_index,
                    source,
                })?;
                records.push(record);
            }
        }

        tracing::debug!(file = name, blocks = blocks.len(), records = records.len(), "parsed");
        Ok((blocks.len(), records))
    }

    fn commit(&mut self, name: &str, size: usize, blocks: usize, records: Vec<QueryRecord>) -> FileSummary {
        let mut buckets = TimeBucketAggregator::new(name);
        for record in &records {
            self.stats.observe(record);
            self.activity.observe(record);
            buckets.observe(record);
        }
        FileSummary {
            name: name.to_string(),
            size,
            blocks,
            records,
            series: buckets.finalize(),
        }
    }

    pub fn files(&self) -> &[FileOutcome] {
        &self.files
    }

    pub fn stats(&self) -> RunningStats {
        self.stats.snapshot()
    }

    pub fn activity(&self) -> &ActivityGrid {
        &self.activity
    }

    /// Series of every successfully parsed file, in submission order.
    pub fn series(&self) -> impl Iterator<Item = &PlotSeries> {
        self.files.iter().filter_map(|f| match f {
            FileOutcome::Parsed(summary) => Some(&summary.series),
            _ => None,
        })
    }

    pub fn totals(&self) -> Totals {
        let mut totals = Totals::default();
        for file in &self.files {
            totals.files += 1;
            totals.bytes += file.size();
            match file {
                FileOutcome::Parsed(summary) => {
                    totals.blocks += summary.blocks;
                    totals.records += summary.records.len();
                }
                FileOutcome::Empty { .. } => {}
                FileOutcome::Failed { .. } => totals.failed += 1,
            }
        }
        totals
    }
}
