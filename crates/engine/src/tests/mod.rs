//! Engine-level tests: indexing runs and retrieval behavior end to end.

mod fixtures;
mod retrieval;
