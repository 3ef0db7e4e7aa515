mod dispatcher;
mod encode;
#[cfg(test)]
pub(crate) mod mock;
mod multipart;
mod transport;
#[cfg(test)]
mod tests;

pub use dispatcher::UploadDispatcher;
pub use encode::{encode_jpeg, UploadArtifact};
pub use multipart::MultipartForm;
pub use transport::{FrameTransport, HttpTransport, UploadReceipt};
