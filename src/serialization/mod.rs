//! Postcard-encoded records of self-play runs.
//!
//! A [`RunRecord`] stores, per applied move, the board before the move (as
//! parseable symbol text), the swap, the total the search expected and the
//! points the cascade actually produced.

mod record;

pub use record::{
    RunMeta,
    StepRecord,
    RunRecord,
    SerializationError,
    now_unix_seconds,
    to_postcard_bytes,
    from_postcard_bytes,
    write_record_to_path,
    read_record_from_path,
};
