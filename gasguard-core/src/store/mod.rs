//! Reading stores
//!
//! Two [`ReadingStore`](crate::traits::ReadingStore) implementations:
//!
//! - [`MemoryStore`]: in-process history, one lock per sensor type
//! - [`CsvStore`]: the append-only reading log on disk (feature `csv-store`)
//!
//! Both return `recent` rows oldest first and make an `append` visible to
//! any `recent` call that starts after it returns.

mod memory;
#[cfg(feature = "csv-store")]
mod csv_log;

pub use memory::MemoryStore;
#[cfg(feature = "csv-store")]
pub use csv_log::{CsvStore, CSV_HEADER, TIMESTAMP_FORMAT};

use crate::reading::Reading;

/// Last `count` elements of `rows`, order kept
pub(crate) fn tail(rows: &[Reading], count: usize) -> Vec<Reading> {
    rows[rows.len().saturating_sub(count)..].to_vec()
}
