pub const SCHEMA: &str = r#"
-- Files table: one row per indexed file
CREATE TABLE IF NOT EXISTS files (
    _id INTEGER PRIMARY KEY AUTOINCREMENT,
    _data TEXT NOT NULL UNIQUE,

    -- Owning folder
    bucket_id INTEGER NOT NULL,
    bucket_display_name TEXT,

    -- 0 = other, 1 = image, 3 = video
    media_type INTEGER NOT NULL DEFAULT 0,
    mime_type TEXT NOT NULL,

    -- User actions
    is_favorite INTEGER NOT NULL DEFAULT 0,
    is_trashed INTEGER NOT NULL DEFAULT 0,

    -- Epoch seconds
    date_added INTEGER NOT NULL,
    date_modified INTEGER NOT NULL,

    -- Degrees: 0, 90, 180, 270
    orientation INTEGER NOT NULL DEFAULT 0
);

-- Indexes for common queries
CREATE INDEX IF NOT EXISTS idx_files_bucket ON files(bucket_id);
CREATE INDEX IF NOT EXISTS idx_files_date_added ON files(date_added);
CREATE INDEX IF NOT EXISTS idx_files_trashed ON files(is_trashed);
CREATE INDEX IF NOT EXISTS idx_files_favorite ON files(is_favorite);
"#;
