pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use stub::StubDepthBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractDepthBackend;
