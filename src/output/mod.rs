//! Output module: persisting encoded results

pub mod writer;

pub use writer::ResultWriter;
