pub(crate) mod config;
pub(crate) mod docker;
pub(crate) mod git;
pub(crate) mod hostname;
pub(crate) mod process;
pub(crate) mod tag;
pub(crate) mod tasks;
pub(crate) mod template;

pub mod cli;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub(crate) type Result<T, E = BoxError> = std::result::Result<T, E>;
