//! # Commands / 命令

pub mod run;
