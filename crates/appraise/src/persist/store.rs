//! Saving and loading price models.
//!
//! [`ModelStore`] writes models atomically (temporary file in the target
//! directory, then rename) and retries transient I/O failures according to
//! its [`RetryPolicy`]. Decoding failures are never retried.

use std::io::{ErrorKind, Write};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::native::{DeserializeError, FormatFlags, FormatHeader, NativeCodec};
use super::schema::{JsonEnvelope, Payload, PriceModelSchema};
use crate::error::{Error, Result};
use crate::features::FeatureSchema;
use crate::model::PriceModel;

/// On-disk encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFormat {
    /// Header plus Postcard payload.
    #[default]
    Binary,
    /// Pretty-printed JSON, for inspection.
    Json,
}

impl ModelFormat {
    /// Detect the format from leading bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(super::native::MAGIC) {
            return Some(Self::Binary);
        }
        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Some(Self::Json),
            _ => None,
        }
    }
}

// =============================================================================
// RetryPolicy
// =============================================================================

/// Retry schedule for transient I/O failures.
///
/// Only [`ErrorKind::Interrupted`], [`ErrorKind::WouldBlock`] and
/// [`ErrorKind::TimedOut`] are retried. The backoff doubles after every
/// failed attempt, capped at `max_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. At least 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// A single attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn is_transient(kind: ErrorKind) -> bool {
        matches!(kind, ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut)
    }

    /// Run `f` until it succeeds, fails permanently, or attempts run out.
    pub fn run<T>(&self, operation: &str, mut f: impl FnMut() -> std::io::Result<T>) -> std::io::Result<T> {
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;
        loop {
            match f() {
                Ok(v) => return Ok(v),
                Err(e) if Self::is_transient(e.kind()) && attempt < self.max_attempts => {
                    tracing::warn!(
                        operation,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "transient I/O failure, retrying"
                    );
                    std::thread::sleep(backoff);
                    backoff = (backoff * 2).min(self.max_backoff);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// =============================================================================
// ModelStore
// =============================================================================

/// Saves and loads [`PriceModel`]s.
///
/// ```no_run
/// use appraise::{FeatureSchema, ModelFormat, ModelStore};
/// # fn demo(model: &appraise::PriceModel) -> appraise::Result<()> {
/// let store = ModelStore::default();
/// store.save(model, "model.aprs")?;
/// let loaded = store.load("model.aprs", &FeatureSchema::standard())?;
///
/// ModelStore::default().with_format(ModelFormat::Json).save(&loaded, "model.json")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelStore {
    format: ModelFormat,
    retry: RetryPolicy,
}

impl ModelStore {
    pub fn new(format: ModelFormat, retry: RetryPolicy) -> Self {
        Self { format, retry }
    }

    /// Format used by [`save`](Self::save). Loading detects the format.
    pub fn with_format(mut self, format: ModelFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn format(&self) -> ModelFormat {
        self.format
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Encode `model` in this store's format.
    pub fn encode(&self, model: &PriceModel) -> Result<Vec<u8>> {
        let schema = PriceModelSchema::from(model);
        match self.format {
            ModelFormat::Binary => {
                let mut header = FormatHeader::new(model.n_features() as u32, model.forest().n_trees() as u32);
                if model.scaler().is_some() {
                    header.flags.set(FormatFlags::NORMALIZED);
                }
                Ok(NativeCodec::new().serialize(header, &Payload::V1(schema))?)
            }
            ModelFormat::Json => {
                let envelope = JsonEnvelope {
                    format: JsonEnvelope::FORMAT.to_string(),
                    version: super::native::CURRENT_VERSION_MAJOR,
                    model: schema,
                };
                Ok(serde_json::to_vec_pretty(&envelope).map_err(super::SerializeError::from)?)
            }
        }
    }

    /// Decode a model from bytes in either format.
    ///
    /// # Errors
    ///
    /// [`Error::CorruptModel`] for anything that is not a structurally valid
    /// model.
    pub fn decode(bytes: &[u8]) -> Result<PriceModel> {
        Ok(decode_model(bytes)?)
    }

    /// Write `model` to `path`, replacing any existing file atomically.
    pub fn save(&self, model: &PriceModel, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.encode(model)?;
        self.retry.run("save", || write_atomic(path, &bytes))?;
        tracing::info!(
            path = %path.display(),
            bytes = bytes.len(),
            format = ?self.format,
            n_trees = model.forest().n_trees(),
            "model saved"
        );
        Ok(())
    }

    /// Read a model from `path` and check it was trained on `expected`.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the file cannot be read
    /// - [`Error::CorruptModel`] if it is not a valid model
    /// - [`Error::SchemaMismatch`] if its feature schema differs from `expected`
    pub fn load(&self, path: impl AsRef<Path>, expected: &FeatureSchema) -> Result<PriceModel> {
        let path = path.as_ref();
        let bytes = self.retry.run("load", || std::fs::read(path))?;
        let model = Self::decode(&bytes)?;

        if model.schema() != expected {
            return Err(Error::SchemaMismatch {
                expected: describe(expected),
                found: describe(model.schema()),
            });
        }
        tracing::debug!(path = %path.display(), n_trees = model.forest().n_trees(), "model loaded");
        Ok(model)
    }
}

fn decode_model(bytes: &[u8]) -> std::result::Result<PriceModel, DeserializeError> {
    match ModelFormat::detect(bytes) {
        Some(ModelFormat::Binary) => {
            let (header, payload): (FormatHeader, Payload) = NativeCodec::new().deserialize(bytes)?;
            let Payload::V1(schema) = payload;
            let model = PriceModel::try_from(schema)?;

            if header.num_features as usize != model.n_features()
                || header.num_trees as usize != model.forest().n_trees()
            {
                return Err(DeserializeError::CorruptPayload("header disagrees with payload".into()));
            }
            if header.flags.contains(FormatFlags::NORMALIZED) != model.scaler().is_some() {
                return Err(DeserializeError::CorruptPayload(
                    "normalization flag disagrees with payload".into(),
                ));
            }
            Ok(model)
        }
        Some(ModelFormat::Json) => {
            let envelope: JsonEnvelope = serde_json::from_slice(bytes)?;
            if envelope.format != JsonEnvelope::FORMAT {
                return Err(DeserializeError::NotAModel);
            }
            if envelope.version != super::native::CURRENT_VERSION_MAJOR {
                return Err(DeserializeError::UnsupportedVersion {
                    major: envelope.version,
                    minor: 0,
                });
            }
            PriceModel::try_from(envelope.model)
        }
        None => Err(DeserializeError::NotAModel),
    }
}

/// Feature names plus the target, for schema mismatch reports.
fn describe(schema: &FeatureSchema) -> Vec<String> {
    let mut names = schema.feature_names();
    names.push(format!("-> {}", schema.target()));
    names
}

/// Write to a temporary file next to `path`, then rename it into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn detect_format() {
        assert_eq!(ModelFormat::detect(b"APRS\x01"), Some(ModelFormat::Binary));
        assert_eq!(ModelFormat::detect(b"  \n{\"format\""), Some(ModelFormat::Json));
        assert_eq!(ModelFormat::detect(b"BSTR"), None);
        assert_eq!(ModelFormat::detect(b""), None);
    }

    #[test]
    fn retry_recovers_from_transient_errors() {
        let calls = Cell::new(0);
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        };
        let result = policy.run("test", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(std::io::Error::from(ErrorKind::Interrupted))
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn retry_gives_up() {
        let calls = Cell::new(0);
        let policy = RetryPolicy {
            initial_backoff: Duration::ZERO,
            ..Default::default()
        };
        let result: std::io::Result<()> = policy.run("test", || {
            calls.set(calls.get() + 1);
            Err(std::io::Error::from(ErrorKind::TimedOut))
        });
        assert_eq!(result.unwrap_err().kind(), ErrorKind::TimedOut);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: std::io::Result<()> = RetryPolicy::default().run("test", || {
            calls.set(calls.get() + 1);
            Err(std::io::Error::from(ErrorKind::NotFound))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn atomic_write_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.aprs");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        // No temporary files left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn garbage_is_corrupt() {
        assert!(matches!(ModelStore::decode(b"hello"), Err(Error::CorruptModel(_))));
        assert!(matches!(ModelStore::decode(b"{\"format\": 1}"), Err(Error::CorruptModel(_))));
    }
}
