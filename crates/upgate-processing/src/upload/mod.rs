//! Upload admission pipeline and its collaborator traits.

pub mod pipeline;
pub mod spool;
pub mod traits;

pub use pipeline::UploadAdmissionPipeline;
pub use spool::{Spool, SpoolError};
pub use traits::MalwareScanner;
