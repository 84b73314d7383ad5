//! # Core Module / 核心模块
//!
//! This module contains the core functionality of Runner Matrix: the data
//! model, configuration, descriptor mutation, metric extraction, the retry
//! controller and the project/batch orchestration built on top of them.
//!
//! 此模块包含 Runner Matrix 的核心功能：数据模型、配置、描述文件修改、
//! 指标提取、重试控制，以及在其之上构建的项目/批处理编排。

pub mod batch;
pub mod config;
pub mod descriptor;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod retry;

// Re-exports
pub use batch::BatchCoordinator;
pub use errors::ProjectError;
pub use models::{ResultGroup, TestRunResult};
pub use orchestrator::ProjectOrchestrator;
