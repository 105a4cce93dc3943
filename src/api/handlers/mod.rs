//! # API 处理器

pub mod capabilities;
pub mod credentials;
pub mod session;
pub mod system;
