pub mod batch;
pub mod check;
pub mod show;
pub mod validate;
