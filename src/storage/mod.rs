// Storage module: persistence adapter for assignments and analysed images.

pub mod sqlite;

pub use sqlite::SqliteStorage;
