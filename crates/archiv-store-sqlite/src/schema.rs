//! SQL schema for the archive SQLite store.
//!
//! Run on every open. `user_version` records the revision the tables match.

/// Base table plus one table per variant, linked by `object_id`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS persons (
    person_id    TEXT PRIMARY KEY,
    given_name   TEXT NOT NULL,
    family_name  TEXT NOT NULL,
    born         TEXT,            -- YYYY-MM-DD
    died         TEXT,            -- YYYY-MM-DD
    sex          TEXT CHECK (sex IN ('M', 'F'))
);

CREATE TABLE IF NOT EXISTS categories (
    category_id  TEXT PRIMARY KEY,
    name         TEXT NOT NULL,   -- unique by convention only
    description  TEXT NOT NULL DEFAULT ''
);

-- One row per stored file; the bytes live in the blob store.
CREATE TABLE IF NOT EXISTS blobs (
    blob_id       TEXT PRIMARY KEY,
    file_name     TEXT NOT NULL,
    path          TEXT NOT NULL UNIQUE,
    content_hash  TEXT NOT NULL,
    size          INTEGER NOT NULL,
    stored_at     TEXT NOT NULL   -- ISO 8601 UTC
);

-- Base row shared by every variant. `kind` selects the variant table.
CREATE TABLE IF NOT EXISTS archived_objects (
    object_id          TEXT PRIMARY KEY,
    kind               TEXT NOT NULL CHECK (kind IN ('document', 'photograph')),
    archived_on        TEXT NOT NULL,
    description        TEXT NOT NULL DEFAULT '',
    precise_date       TEXT,
    year               INTEGER,
    century            TEXT,
    primary_person_id  TEXT REFERENCES persons(person_id) ON DELETE SET NULL,
    blob_id            TEXT UNIQUE REFERENCES blobs(blob_id),
    CHECK ((precise_date IS NOT NULL) + (year IS NOT NULL) + (century IS NOT NULL) = 1)
);

CREATE TABLE IF NOT EXISTS documents (
    object_id    TEXT PRIMARY KEY REFERENCES archived_objects(object_id) ON DELETE CASCADE,
    category_id  TEXT REFERENCES categories(category_id) ON DELETE SET NULL,
    language     TEXT NOT NULL DEFAULT 'cs'
);

CREATE TABLE IF NOT EXISTS photographs (
    object_id   TEXT PRIMARY KEY REFERENCES archived_objects(object_id) ON DELETE CASCADE,
    photo_type  TEXT NOT NULL DEFAULT '',
    height_cm   INTEGER NOT NULL CHECK (height_cm > 0),
    width_cm    INTEGER NOT NULL CHECK (width_cm > 0)
);

-- Association set between objects and persons.
CREATE TABLE IF NOT EXISTS object_people (
    object_id  TEXT NOT NULL REFERENCES archived_objects(object_id) ON DELETE CASCADE,
    person_id  TEXT NOT NULL REFERENCES persons(person_id) ON DELETE CASCADE,
    PRIMARY KEY (object_id, person_id)
);

CREATE INDEX IF NOT EXISTS objects_kind_idx        ON archived_objects(kind);
CREATE INDEX IF NOT EXISTS objects_archived_idx    ON archived_objects(archived_on);
CREATE INDEX IF NOT EXISTS documents_category_idx  ON documents(category_id);
CREATE INDEX IF NOT EXISTS object_people_person_idx ON object_people(person_id);
CREATE INDEX IF NOT EXISTS persons_name_idx        ON persons(family_name, given_name);

PRAGMA user_version = 1;
";
