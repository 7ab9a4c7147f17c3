//! Event log schema, embedded with include_str!
//!
//! Applied in order. The first entry creates the bookkeeping table and is
//! safe to re-run on every open.

pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
