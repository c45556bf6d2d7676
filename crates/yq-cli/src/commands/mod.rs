//! CLI command implementations

pub(crate) mod common;
pub(crate) mod erase;
pub(crate) mod init;
pub(crate) mod list;
pub(crate) mod platforms;
pub(crate) mod rebase;
pub(crate) mod run;
pub(crate) mod vnext;
