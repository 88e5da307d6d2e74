//! A single string id format used end-to-end for workflows and runs.
//!
//! The source system mixed raw strings with opaque document-store ids
//! (§9 redesign flag). Here every id is the simple (undashed) hex form of
//! a v4 UUID — 128 bits of randomness rendered as a plain string, stored
//! as plain `TEXT` columns end to end (see `db::store`) rather than a
//! native `uuid` column type, so the engine never has to know its ids are
//! UUIDs at all.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
