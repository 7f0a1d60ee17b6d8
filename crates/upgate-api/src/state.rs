//! Application state shared by all handlers.

use upgate_core::Config;
use upgate_services::UploadAdmissionPipeline;

#[cfg(feature = "clamav")]
use upgate_services::ClamAVService;

pub struct AppState {
    pub config: Config,
    pub pipeline: UploadAdmissionPipeline,
    /// Present when uploads are scanned by a clamd daemon; probed by `/health`.
    #[cfg(feature = "clamav")]
    pub clamav: Option<ClamAVService>,
}

impl AppState {
    pub fn new(config: Config, pipeline: UploadAdmissionPipeline) -> Self {
        Self {
            config,
            pipeline,
            #[cfg(feature = "clamav")]
            clamav: None,
        }
    }

    #[cfg(feature = "clamav")]
    pub fn with_clamav(mut self, clamav: ClamAVService) -> Self {
        self.clamav = Some(clamav);
        self
    }
}
