/// Error types for diff generation.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("file too large to diff: {0} bytes")]
    FileTooLarge(usize),

    #[error("file is binary")]
    BinaryFile,

    #[error("invalid encoding")]
    InvalidEncoding,

    #[error("empty content")]
    EmptyContent,
}
