//! Schema definitions, grouped into migration sets.
//!
//! The core set is always loaded; each enabled media type adds its own set.
//! A set's latest migration version is the schema level the code expects.

/// One schema step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

/// An independently versioned group of tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationSet {
    pub name: &'static str,
    pub migrations: &'static [Migration],
}

impl MigrationSet {
    /// Version the code expects the database to be at.
    pub fn latest(&self) -> i64 {
        self.migrations.iter().map(|m| m.version).max().unwrap_or(0)
    }

    /// Migrations newer than `version`, in order.
    pub fn pending(&self, version: i64) -> impl Iterator<Item = &'static Migration> {
        self.migrations.iter().filter(move |m| m.version > version)
    }
}

pub const CORE_MODELS: MigrationSet = MigrationSet {
    name: "__main__",
    migrations: &[
        Migration {
            version: 1,
            description: "users and media entries",
            sql: "CREATE TABLE core__users (
                    id INTEGER PRIMARY KEY,
                    username TEXT NOT NULL UNIQUE,
                    email TEXT,
                    created TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                );
                CREATE TABLE core__media_entries (
                    id INTEGER PRIMARY KEY,
                    uploader INTEGER NOT NULL REFERENCES core__users(id),
                    title TEXT NOT NULL,
                    slug TEXT,
                    media_type TEXT NOT NULL,
                    state TEXT NOT NULL DEFAULT 'unprocessed',
                    queued_media_file TEXT,
                    created TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                );",
        },
        Migration {
            version: 2,
            description: "media files",
            sql: "CREATE TABLE core__media_files (
                    media_entry INTEGER NOT NULL REFERENCES core__media_entries(id),
                    name TEXT NOT NULL,
                    file_path TEXT NOT NULL,
                    PRIMARY KEY (media_entry, name)
                );",
        },
        Migration {
            version: 3,
            description: "comments",
            sql: "CREATE TABLE core__media_comments (
                    id INTEGER PRIMARY KEY,
                    media_entry INTEGER NOT NULL REFERENCES core__media_entries(id),
                    author INTEGER NOT NULL REFERENCES core__users(id),
                    content TEXT NOT NULL,
                    created TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                );",
        },
    ],
};

pub const IMAGE_MODELS: MigrationSet = MigrationSet {
    name: "image",
    migrations: &[
        Migration {
            version: 1,
            description: "image media data",
            sql: "CREATE TABLE image__mediadata (
                    media_entry INTEGER PRIMARY KEY REFERENCES core__media_entries(id),
                    width INTEGER,
                    height INTEGER
                );",
        },
        Migration {
            version: 2,
            description: "exif data",
            sql: "ALTER TABLE image__mediadata ADD COLUMN exif_all TEXT;",
        },
    ],
};

pub const VIDEO_MODELS: MigrationSet = MigrationSet {
    name: "video",
    migrations: &[Migration {
        version: 1,
        description: "video media data",
        sql: "CREATE TABLE video__mediadata (
                media_entry INTEGER PRIMARY KEY REFERENCES core__media_entries(id),
                width INTEGER,
                height INTEGER,
                orig_metadata TEXT
            );",
    }],
};

pub const AUDIO_MODELS: MigrationSet = MigrationSet {
    name: "audio",
    migrations: &[Migration {
        version: 1,
        description: "audio media data",
        sql: "CREATE TABLE audio__mediadata (
                media_entry INTEGER PRIMARY KEY REFERENCES core__media_entries(id),
                length REAL
            );",
    }],
};

/// Media types compiled into this build.
pub const MEDIA_TYPE_MODELS: &[MigrationSet] = &[IMAGE_MODELS, VIDEO_MODELS, AUDIO_MODELS];

/// The migration sets this instance uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRegistry {
    sets: Vec<MigrationSet>,
}

impl ModelRegistry {
    pub fn new(sets: Vec<MigrationSet>) -> Self {
        Self { sets }
    }

    pub fn sets(&self) -> &[MigrationSet] {
        &self.sets
    }

    pub fn get(&self, name: &str) -> Option<&MigrationSet> {
        self.sets.iter().find(|s| s.name == name)
    }
}
