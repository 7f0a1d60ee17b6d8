//! Upload admission: rate limit → size → name → spool → sniff → scan → hash → store.
//!
//! Every stage either passes or short-circuits with a `RejectionReason`.
//! Internal failures (spool I/O, ephemeral store, storage backend) surface as
//! `AppError` and are never presented as a rejection.

use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;

use upgate_core::models::normalize_media_type;
use upgate_core::{
    AdmissionOutcome, AdmissionPolicy, AdmissionState, AppError, ErrorMetadata, LogLevel,
    QuotaMode, RejectionReason, ScanVerdict, StorageDescriptor, UploadRequest,
};
use upgate_infra::rate_limit::{RateLimitDecision, UploadRateLimiter};
use upgate_infra::store::EphemeralStore;
use upgate_storage::{Storage, StorageError, StoredObject};

use super::spool::{Spool, SpoolError};
use super::traits::MalwareScanner;
use crate::integrity::IntegrityRecorder;
use crate::sanitizer::NameSanitizer;
use crate::sniffer::ContentSniffer;
use crate::validator::{MediaValidator, ValidationError};

/// Why a stage stopped the admission.
#[derive(Debug)]
enum StageFailure {
    Rejected(RejectionReason),
    Internal(AppError),
}

impl From<RejectionReason> for StageFailure {
    fn from(reason: RejectionReason) -> Self {
        StageFailure::Rejected(reason)
    }
}

impl From<ValidationError> for StageFailure {
    fn from(err: ValidationError) -> Self {
        StageFailure::Rejected(err.into())
    }
}

impl From<AppError> for StageFailure {
    fn from(err: AppError) -> Self {
        StageFailure::Internal(err)
    }
}

impl From<std::io::Error> for StageFailure {
    fn from(err: std::io::Error) -> Self {
        StageFailure::Internal(AppError::Spool(err))
    }
}

impl From<SpoolError> for StageFailure {
    fn from(err: SpoolError) -> Self {
        match err {
            SpoolError::TooLarge { .. } => RejectionReason::FileTooLarge.into(),
            SpoolError::Interrupted { .. } | SpoolError::Truncated { .. } => {
                tracing::debug!(error = %err, "Upload stream incomplete");
                RejectionReason::Incomplete.into()
            }
            SpoolError::Io(source) => AppError::Spool(source).into(),
        }
    }
}

/// Ordered admission checks for inbound uploads.
///
/// Constructed once with its policy and collaborators, then shared across
/// requests. The only shared mutable state is the ephemeral store.
pub struct UploadAdmissionPipeline {
    policy: AdmissionPolicy,
    validator: MediaValidator,
    sanitizer: NameSanitizer,
    sniffer: ContentSniffer,
    rate_limiter: UploadRateLimiter,
    integrity: IntegrityRecorder,
    scanner: Arc<dyn MalwareScanner>,
    storage: Arc<dyn Storage>,
}

impl UploadAdmissionPipeline {
    pub fn new(
        policy: AdmissionPolicy,
        storage: Arc<dyn Storage>,
        scanner: Arc<dyn MalwareScanner>,
        store: Arc<dyn EphemeralStore>,
    ) -> Self {
        Self {
            validator: MediaValidator::new(policy.clone()),
            sanitizer: NameSanitizer::new(&policy),
            sniffer: ContentSniffer::new(policy.sniff_bytes),
            rate_limiter: UploadRateLimiter::new(
                store.clone(),
                policy.rate_limit_window,
                policy.rate_limit_quota,
            ),
            integrity: IntegrityRecorder::new(store, policy.hash_ttl),
            scanner,
            storage,
            policy,
        }
    }

    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    pub fn integrity(&self) -> &IntegrityRecorder {
        &self.integrity
    }

    /// Time until `identity` may upload again. Zero when no window is open.
    pub async fn retry_after(&self, identity: &str) -> Result<Duration, AppError> {
        Ok(self.rate_limiter.retry_after(identity).await?)
    }

    /// Decide whether the upload may be persisted, and persist it if so.
    #[tracing::instrument(
        skip(self, request),
        fields(identity = %request.identity, declared_filename = %request.declared_filename)
    )]
    pub async fn admit<R>(&self, request: UploadRequest<R>) -> Result<AdmissionOutcome, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let start = std::time::Instant::now();
        let mut state = AdmissionState::Received;

        match self.run(request, &mut state).await {
            Ok(descriptor) => {
                tracing::info!(
                    safe_name = %descriptor.safe_name,
                    size_bytes = descriptor.size,
                    media_type = %descriptor.media_type,
                    duration_ms = start.elapsed().as_millis(),
                    "Upload admitted"
                );
                Ok(AdmissionOutcome::Admitted(descriptor))
            }
            Err(StageFailure::Rejected(reason)) => {
                log_rejection(reason, state);
                Ok(AdmissionOutcome::Rejected(reason))
            }
            Err(StageFailure::Internal(err)) => {
                tracing::error!(
                    error_type = %err.error_type(),
                    error = %err.detailed_message(),
                    stage = %state,
                    "Upload admission failed"
                );
                Err(err)
            }
        }
    }

    async fn run<R>(
        &self,
        request: UploadRequest<R>,
        state: &mut AdmissionState,
    ) -> Result<StorageDescriptor, StageFailure>
    where
        R: AsyncRead + Unpin + Send,
    {
        let UploadRequest {
            identity,
            declared_filename,
            declared_content_type,
            declared_size,
            mut body,
        } = request;

        self.enforce_rate_limit(&identity).await?;

        self.validator.validate_declared_size(declared_size)?;
        *state = AdmissionState::SizeChecked;

        let extension = self.sanitizer.validated_extension(&declared_filename)?;
        let safe_name = NameSanitizer::generate(&extension);
        *state = AdmissionState::NameValidated;

        let mut spool = Spool::receive(&mut body, self.policy.max_file_size, declared_size).await?;

        let media_type = self.sniffer.sniff_reader(spool.rewind().await?).await?;
        if let Some(declared) = declared_content_type.as_deref() {
            if normalize_media_type(declared) != media_type {
                tracing::debug!(
                    declared_content_type = %declared,
                    sniffed_media_type = %media_type,
                    "Declared content type differs from sniffed type"
                );
            }
        }
        self.validator.validate_media_type(&media_type)?;
        if self.policy.require_extension_match {
            self.validator
                .validate_extension_media_type_match(&extension, &media_type)?;
        }
        *state = AdmissionState::TypeSniffed;

        self.scan(&mut spool).await?;
        *state = AdmissionState::Scanned;

        let hash = self
            .integrity
            .compute_and_record(spool.rewind().await?, &safe_name)
            .await?;
        *state = AdmissionState::HashRecorded;

        let stored = self.persist(&safe_name, &mut spool).await?;

        if self.policy.quota_mode == QuotaMode::ConsumeOnSuccess {
            if let Err(err) = self.rate_limiter.record(&identity).await {
                self.rollback(&safe_name, true).await;
                return Err(AppError::from(err).into());
            }
        }
        *state = AdmissionState::Admitted;

        Ok(StorageDescriptor {
            safe_name,
            storage_key: stored.key,
            size: stored.size,
            hash,
            media_type,
        })
    }

    async fn enforce_rate_limit(&self, identity: &str) -> Result<(), StageFailure> {
        let decision = match self.policy.quota_mode {
            QuotaMode::ConsumeOnAttempt => self.rate_limiter.check_and_record(identity).await,
            QuotaMode::ConsumeOnSuccess => self.rate_limiter.check(identity).await,
        }
        .map_err(AppError::from)?;

        match decision {
            RateLimitDecision::Allowed { .. } => Ok(()),
            RateLimitDecision::Exceeded { .. } => Err(RejectionReason::RateLimitExceeded.into()),
        }
    }

    async fn scan(&self, spool: &mut Spool) -> Result<(), StageFailure> {
        let timeout = self.policy.scan_timeout;
        let reader = spool.rewind().await?;

        let verdict = match tokio::time::timeout(timeout, self.scanner.scan(reader)).await {
            Ok(verdict) => verdict,
            Err(_) => ScanVerdict::Unavailable(format!(
                "scan did not complete within {} ms",
                timeout.as_millis()
            )),
        };

        match verdict {
            ScanVerdict::Clean => Ok(()),
            ScanVerdict::Infected(signature) => {
                tracing::warn!(signature = %signature, "Malware detected in upload");
                Err(RejectionReason::ContainsMalware.into())
            }
            ScanVerdict::Unavailable(reason) => {
                tracing::error!(reason = %reason, "Malware scanner unavailable, rejecting upload");
                Err(RejectionReason::SecurityCheckFailed.into())
            }
        }
    }

    /// Hand the spool to storage and narrow the stored object's permissions.
    /// Anything that goes wrong removes the partial object and the hash record.
    async fn persist(&self, safe_name: &str, spool: &mut Spool) -> Result<StoredObject, StageFailure> {
        let expected = spool.size();
        let reader = spool.rewind().await?;

        let result = async {
            let stored = self.storage.save(safe_name, reader).await?;
            self.storage
                .set_permissions(&stored.key, self.policy.file_mode)
                .await?;
            Ok::<_, StorageError>(stored)
        }
        .await;

        match result {
            Ok(stored) if stored.size == expected => Ok(stored),
            Ok(stored) => {
                self.rollback(safe_name, true).await;
                Err(AppError::Storage(format!(
                    "stored {} bytes for {} but received {}",
                    stored.size, safe_name, expected
                ))
                .into())
            }
            Err(err) => {
                // An existing object under this name is not ours to delete
                let owns_object = !matches!(err, StorageError::AlreadyExists(_));
                self.rollback(safe_name, owns_object).await;
                Err(AppError::Storage(err.to_string()).into())
            }
        }
    }

    async fn rollback(&self, safe_name: &str, delete_object: bool) {
        if delete_object {
            if let Err(e) = self.storage.delete(safe_name).await {
                tracing::error!(
                    safe_name = %safe_name,
                    error = %e,
                    "Failed to remove partially stored upload"
                );
            }
        }
        if let Err(e) = self.integrity.forget(safe_name).await {
            tracing::error!(
                safe_name = %safe_name,
                error = %e,
                "Failed to drop integrity record"
            );
        }
    }
}

fn log_rejection(reason: RejectionReason, state: AdmissionState) {
    match reason.log_level() {
        LogLevel::Debug => tracing::debug!(
            code = reason.error_code(),
            stage = %state,
            "Upload rejected"
        ),
        LogLevel::Warn => tracing::warn!(
            code = reason.error_code(),
            stage = %state,
            "Upload rejected"
        ),
        LogLevel::Error => tracing::error!(
            code = reason.error_code(),
            stage = %state,
            "Upload rejected"
        ),
    }
}
