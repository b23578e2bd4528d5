pub mod classify;
pub mod import;
pub mod label;
pub mod review;
pub mod summary;
pub mod train;
