pub mod media;
pub mod session;
