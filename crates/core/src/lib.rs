//! `plainjob-core` — turning job payloads into plain data.
//!
//! Producers hand over a [`Value`]: possibly shared, possibly cyclic, possibly
//! made of class instances with computed getters. [`normalize`] converts it to
//! a `serde_json::Value` that is safe to persist and send over the wire.

pub mod error;
pub mod normalize;
pub mod path;
pub mod value;

pub use error::{PayloadError, PayloadResult};
pub use normalize::{
    KeyOrder, MAX_DEPTH_MARKER, Normalizer, NormalizerConfig, circular_marker, normalize,
};
pub use path::PropertyPath;
pub use value::{ArrayRef, Class, ClassBuilder, Function, Getter, ObjectRef, Value};
