pub mod file_writer;
pub mod record;
pub mod registry;
pub mod writer_trait;

pub use file_writer::FileWriter;
pub use record::OutcomeRecord;
pub use registry::{split_scheme, WriterRegistry};
pub use writer_trait::OutcomeWriter;
