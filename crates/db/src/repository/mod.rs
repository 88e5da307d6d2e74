//! Repository functions — one function per database operation.
//!
//! Every function takes a `&DbPool` and returns a `Result<T, DbError>`.
//! No business logic at the SQL boundary — conversion to/from `engine`'s
//! domain types happens in `store::PgStore` and in `workflows::{to_row,
//! from_row}`.

pub mod documents;
pub mod files;
pub mod logs;
pub mod runs;
pub mod workflows;
