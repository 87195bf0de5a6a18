use thiserror::Error;

/// Error taxonomy for the label driver.
///
/// Each variant corresponds to one of the documented failure kinds. Fatal
/// classification lives on the variant via [`DriverError::is_fatal`] rather
/// than as a parallel type, so call sites never have to keep the two in sync.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("job document invalid: {0}")]
    JobDocumentInvalid(String),

    #[error("template not found for slot {0}")]
    TemplateNotFound(i64),

    #[error("barcode template missing for selector {0}")]
    BarcodeTemplateMissing(i64),

    #[error("serial device unavailable: {0}")]
    SerialUnavailable(String),

    #[error("directive malformed: {0}")]
    DirectiveMalformed(String),

    #[error("render geometry out of bounds: {0}")]
    RenderGeometry(String),

    #[error("unknown variable: {0}")]
    UnknownVariable(i64),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("storage error: {0}")]
    StorageError(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DriverError {
    /// Errors that must abort the current print job and report `Error printing`
    /// to the client. Everything else is recovered from: logged, and the
    /// interpreter (or resolver, or content engine) continues.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DriverError::JobDocumentInvalid(_)
                | DriverError::TemplateNotFound(_)
                | DriverError::SerialUnavailable(_)
                | DriverError::MalformedEnvelope(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
