pub const BASE_MIGRATION: &str = r#"
CREATE TABLE IF NOT EXISTS candidates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    keyword TEXT NOT NULL UNIQUE,
    party TEXT NOT NULL UNIQUE,
    votes INTEGER,
    votes_percentage REAL
);

CREATE TABLE IF NOT EXISTS forms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    county TEXT NOT NULL UNIQUE,
    registered_voters INTEGER NOT NULL,
    valid_votes INTEGER NOT NULL,
    spoilt_votes INTEGER NOT NULL,
    voter_turnout REAL NOT NULL DEFAULT 0.0,
    odinga INTEGER NOT NULL DEFAULT 0,
    ruto INTEGER NOT NULL DEFAULT 0,
    wajackoyah INTEGER NOT NULL DEFAULT 0,
    mweure INTEGER NOT NULL DEFAULT 0
);
"#;
