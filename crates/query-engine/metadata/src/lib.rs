//! Static information about the database and the reporting formats served from it.

pub mod metadata;
