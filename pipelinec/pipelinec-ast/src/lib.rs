//! Data model of pipelinec: the pipeline document the UI produces, the
//! catalog snapshot it is compiled against, and the error types shared by
//! every stage.

pub mod catalog;
pub mod error;
pub mod pipeline;

pub use catalog::*;
pub use error::{Error, Errors, Reason, WithErrorInfo};
pub use pipeline::*;

pub type Result<T, E = Error> = core::result::Result<T, E>;
