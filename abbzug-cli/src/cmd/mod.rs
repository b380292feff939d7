pub mod build;
pub mod newsite;
pub mod serve;
