pub mod animation;
pub mod blob;
pub mod encode;
pub mod error;
pub mod geometry;
pub mod image;
pub mod metadata;
pub mod processor;
