mod tracing;

pub use crate::tracing::{LogFormat, init_tracing, init_with, parse_level};
