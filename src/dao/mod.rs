/// Database model definitions.
pub mod models;
/// Repository translating poll operations into field-level store writes.
pub mod poll;
/// Poll record storage backends.
pub mod poll_store;
/// Storage abstraction layer for database operations.
pub mod storage;
