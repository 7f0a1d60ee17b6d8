//! Upgate Processing Library
//!
//! Upload admission: the checks an inbound file goes through before it may be
//! persisted, and the pipeline that runs them in order.

pub mod integrity;
pub mod sanitizer;
pub mod sniffer;
pub mod upload;
pub mod validator;

pub use integrity::IntegrityRecorder;
pub use sanitizer::NameSanitizer;
pub use sniffer::ContentSniffer;
pub use upload::{MalwareScanner, UploadAdmissionPipeline};
pub use validator::{MediaValidator, ValidationError};
