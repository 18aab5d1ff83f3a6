/// An error type for the io module.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(std::path::PathBuf),

    /// Invalid file extension.
    #[error("File does not have a valid extension: {0}")]
    InvalidFileExtension(std::path::PathBuf),

    /// Error to open the file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// Malformed PFM header.
    #[error("Malformed PFM header: {0}")]
    MalformedPfmHeader(String),

    /// The raster has a channel count that is not supported.
    #[error("Unsupported number of channels: {0}")]
    UnsupportedChannels(usize),

    /// The file ends before the end of the pixel payload.
    #[error("Truncated payload: expected {expected} bytes, got {got}")]
    TruncatedPayload {
        /// Number of bytes of the payload.
        expected: usize,
        /// Number of bytes available.
        got: usize,
    },

    /// Error to create the image.
    #[error("Failed to create image. {0}")]
    ImageCreationError(#[from] depthcloud_image::ImageError),

    /// Error to decode the image.
    #[error("Failed to decode the image. {0}")]
    ImageDecodeError(#[from] image::ImageError),

    /// The decoded image has a pixel format that cannot be used as a depth raster.
    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),
}
