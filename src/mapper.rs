//! Conversion of index rows into media records.

use chrono::{DateTime, Utc};

use crate::error::{MediaIndexError, Result};
use crate::index::ResultSet;
use crate::models::{Media, MediaType};
use crate::query::{columns, Value};

/// Column positions of the media projection within one result set.
#[derive(Debug, Clone, Copy)]
struct MediaColumns {
    id: usize,
    bucket_id: usize,
    is_favorite: usize,
    is_trashed: usize,
    media_type: usize,
    mime_type: usize,
    date_added: usize,
    date_modified: usize,
    orientation: usize,
}

impl MediaColumns {
    fn resolve(set: &ResultSet) -> Result<Self> {
        Ok(Self {
            id: set.column_index(columns::ID)?,
            bucket_id: set.column_index(columns::BUCKET_ID)?,
            is_favorite: set.column_index(columns::IS_FAVORITE)?,
            is_trashed: set.column_index(columns::IS_TRASHED)?,
            media_type: set.column_index(columns::MEDIA_TYPE)?,
            mime_type: set.column_index(columns::MIME_TYPE)?,
            date_added: set.column_index(columns::DATE_ADDED)?,
            date_modified: set.column_index(columns::DATE_MODIFIED)?,
            orientation: set.column_index(columns::ORIENTATION)?,
        })
    }

    fn read(&self, row: &[Value]) -> Result<Media> {
        Ok(Media::new(
            int(row, self.id),
            int(row, self.bucket_id) as i32,
            int(row, self.is_favorite) == 1,
            int(row, self.is_trashed) == 1,
            MediaType::from_index_value(int(row, self.media_type))?,
            row.get(self.mime_type)
                .and_then(Value::as_str)
                .unwrap_or_default(),
            timestamp(row, self.date_added, columns::DATE_ADDED)?,
            timestamp(row, self.date_modified, columns::DATE_MODIFIED)?,
            int(row, self.orientation) as i32,
        ))
    }
}

/// NULL reads as 0, like a cursor's integer getter.
fn int(row: &[Value], index: usize) -> i64 {
    row.get(index).and_then(Value::as_i64).unwrap_or(0)
}

/// Epoch seconds on the index, millisecond precision in the record.
fn timestamp(row: &[Value], index: usize, column: &'static str) -> Result<DateTime<Utc>> {
    let seconds = int(row, index);
    seconds
        .checked_mul(1000)
        .and_then(DateTime::from_timestamp_millis)
        .ok_or(MediaIndexError::SchemaMismatch {
            column,
            value: seconds,
        })
}

/// Map every row of a query result into a media record.
///
/// An absent or empty result maps to no records. An unknown media type fails
/// the whole mapping.
pub fn media_from_cursor(cursor: Option<&ResultSet>) -> Result<Vec<Media>> {
    let Some(set) = cursor.filter(|s| !s.is_empty()) else {
        return Ok(Vec::new());
    };
    let columns = MediaColumns::resolve(set)?;
    set.rows().map(|row| columns.read(row)).collect()
}

/// A media record together with its folder's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumRow {
    pub media: Media,
    pub bucket_display_name: Option<String>,
}

/// Map the rows of an album query.
pub fn album_rows_from_cursor(cursor: Option<&ResultSet>) -> Result<Vec<AlbumRow>> {
    let Some(set) = cursor.filter(|s| !s.is_empty()) else {
        return Ok(Vec::new());
    };
    let columns = MediaColumns::resolve(set)?;
    let display_name = set.column_index(columns::BUCKET_DISPLAY_NAME)?;
    set.rows()
        .map(|row| {
            Ok(AlbumRow {
                media: columns.read(row)?,
                bucket_display_name: row
                    .get(display_name)
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        })
        .collect()
}
