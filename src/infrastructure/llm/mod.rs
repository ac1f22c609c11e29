pub mod moonshot;
pub mod sse;

pub use moonshot::MoonshotLlm;
