//! Record collections and iteration
//!
//! A shift declares its records either as a finite in-memory sequence or as
//! a streaming source queried lazily in fixed-size windows, ordered by a
//! stable ascending key. Only streaming sources can be resumed: resumption
//! filters on key strictly greater than an operator-supplied value, and ad
//! hoc in-memory sequences guarantee no stable ordering key.

use crate::error::{Result, ShiftError};
use std::collections::VecDeque;

/// Window size for streaming collections.
pub const WINDOW_SIZE: usize = 1000;

/// A record the engine can process.
pub trait ShiftRecord {
    /// Stable identifier. For streaming collections this doubles as the
    /// ordering key and the resume cursor.
    fn id(&self) -> String;
}

/// A streaming record source, queried in keyset windows.
pub trait RecordStream<R: ShiftRecord> {
    /// Number of records with key strictly greater than `after` (all
    /// records when `after` is `None`). Counting up front may be costly for
    /// large sources; the engine accepts that for operator visibility.
    fn count(&mut self, after: Option<&str>) -> Result<u64>;

    /// Fetch up to `limit` records with key strictly greater than `after`,
    /// in ascending key order.
    fn fetch_after(&mut self, after: Option<&str>, limit: usize) -> Result<Vec<R>>;
}

/// A lookup source for fetching records by explicit id.
pub trait RecordLookup<R: ShiftRecord> {
    fn fetch_by_ids(&mut self, ids: &[String]) -> Result<Vec<R>>;
}

/// The collection a shift declares.
pub enum Collection<R: ShiftRecord> {
    /// Finite in-memory sequence, processed in the given order
    Memory(Vec<R>),
    /// Streaming source ordered by a stable ascending key
    Stream(Box<dyn RecordStream<R>>),
}

impl<R: ShiftRecord> Collection<R> {
    /// Computed size of the collection, honoring a resume cursor.
    pub fn size(&mut self, continue_from: Option<&str>) -> Result<u64> {
        match self {
            Collection::Memory(records) => Ok(records.len() as u64),
            Collection::Stream(source) => source.count(continue_from),
        }
    }

    /// Whether this collection supports `continue_from`.
    pub fn supports_resume(&self) -> bool {
        matches!(self, Collection::Stream(_))
    }

    /// Turn the collection into a pull-based record sequence.
    ///
    /// Fails fast with a configuration error if resume was requested on an
    /// in-memory collection.
    pub fn into_drain(self, continue_from: Option<String>) -> Result<RecordDrain<R>> {
        match self {
            Collection::Memory(_) if continue_from.is_some() => Err(ShiftError::ResumeUnsupported),
            Collection::Memory(records) => Ok(RecordDrain {
                inner: DrainInner::Memory(records.into_iter()),
            }),
            Collection::Stream(source) => Ok(RecordDrain {
                inner: DrainInner::Stream {
                    source,
                    buffer: VecDeque::new(),
                    cursor: continue_from,
                    exhausted: false,
                },
            }),
        }
    }
}

/// Pull-based record sequence over either collection shape.
pub struct RecordDrain<R: ShiftRecord> {
    inner: DrainInner<R>,
}

impl<R: ShiftRecord> std::fmt::Debug for RecordDrain<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordDrain").finish_non_exhaustive()
    }
}

enum DrainInner<R: ShiftRecord> {
    Memory(std::vec::IntoIter<R>),
    Stream {
        source: Box<dyn RecordStream<R>>,
        buffer: VecDeque<R>,
        cursor: Option<String>,
        exhausted: bool,
    },
}

impl<R: ShiftRecord> RecordDrain<R> {
    /// Next record, fetching the next window from a streaming source when
    /// the buffer runs dry. Fallible, so not an `Iterator` impl.
    pub fn next_record(&mut self) -> Result<Option<R>> {
        match &mut self.inner {
            DrainInner::Memory(iter) => Ok(iter.next()),
            DrainInner::Stream {
                source,
                buffer,
                cursor,
                exhausted,
            } => {
                if buffer.is_empty() && !*exhausted {
                    let window = source.fetch_after(cursor.as_deref(), WINDOW_SIZE)?;
                    if window.len() < WINDOW_SIZE {
                        *exhausted = true;
                    }
                    if let Some(last) = window.last() {
                        *cursor = Some(last.id());
                    }
                    buffer.extend(window);
                }
                Ok(buffer.pop_front())
            },
        }
    }
}

/// Fetch exactly the records named by `ids`, erroring on any miss.
///
/// Ids are de-duplicated first. An empty id list short-circuits to an empty
/// result without querying. Any id the source cannot produce makes the whole
/// call fail with an error enumerating the missing ids.
pub fn find_exactly<R, L>(lookup: &mut L, kind: &str, ids: &[String]) -> Result<Vec<R>>
where
    R: ShiftRecord,
    L: RecordLookup<R> + ?Sized,
{
    let mut unique: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(id.clone());
        }
    }

    if unique.is_empty() {
        return Ok(Vec::new());
    }

    let found = lookup.fetch_by_ids(&unique)?;

    let missing: Vec<String> = unique
        .iter()
        .filter(|id| !found.iter().any(|r| r.id() == **id))
        .cloned()
        .collect();

    if !missing.is_empty() {
        return Err(ShiftError::MissingRecords {
            kind: kind.to_string(),
            missing,
        });
    }

    Ok(found)
}
