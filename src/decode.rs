//! Image decoding seam.

/// Decodes fetched bytes into the consumer's image type.
///
/// The crate mandates no image format or pixel representation: the decoder is
/// the integration point with whatever toolkit owns the images. Returning
/// `None` marks the payload as malformed; the request is dropped silently and
/// the worker moves on to the next item.
///
/// Decoding runs on a blocking-capable thread, never on the caller's context,
/// so implementations are free to be CPU-heavy. A panicking decoder is
/// contained and treated the same as a malformed payload.
pub trait ImageDecoder: Send + Sync + 'static {
    /// Decoded image type handed to the delivery listener.
    type Image: Send + 'static;

    /// Decode `bytes` into an image, or `None` if the payload is malformed.
    fn decode(&self, bytes: &[u8]) -> Option<Self::Image>;
}
