//! # File System Operations Module / 文件系统操作模块
//!
//! This module provides the file system walks the batch needs: listing
//! candidate project directories, discovering every build descriptor of a
//! multi-module project, and recreating output directories from scratch.
//!
//! 此模块提供批处理所需的文件系统操作：列出候选项目目录、
//! 发现多模块项目中的所有构建描述文件，以及重新创建输出目录。

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of a build descriptor.
pub const DESCRIPTOR_FILE: &str = "pom.xml";

/// Directory the build tool writes its output to.
pub const BUILD_OUTPUT_DIR: &str = "target";

/// Lists the immediate subdirectories of `root`, sorted by path.
///
/// # Arguments
/// * `root` - Directory containing one subdirectory per candidate project
///
/// # Returns
/// The subdirectories, or an error if `root` cannot be read
pub fn list_subdirectories(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(root)
        .with_context(|| format!("Failed to read directory: {}", root.display()))?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list {}", root.display()))?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Finds every build descriptor below `project_root`.
///
/// The root descriptor always comes first; the module descriptors follow in
/// lexicographic path order. Build output and hidden directories are not
/// searched. The root descriptor is returned first even if it does not
/// exist, so callers can report it as missing.
pub fn discover_descriptors(project_root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let root_descriptor = project_root.join(DESCRIPTOR_FILE);
    let mut modules = Vec::new();
    collect_descriptors(project_root, &mut modules)?;
    modules.retain(|path| path != &root_descriptor);
    modules.sort();

    let mut descriptors = Vec::with_capacity(modules.len() + 1);
    descriptors.push(root_descriptor);
    descriptors.extend(modules);
    Ok(descriptors)
}

fn collect_descriptors(dir: &Path, found: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if ty.is_dir() {
            if name.starts_with('.') || name == BUILD_OUTPUT_DIR {
                continue;
            }
            collect_descriptors(&entry.path(), found)?;
        } else if ty.is_file() && name == DESCRIPTOR_FILE {
            found.push(entry.path());
        }
    }
    Ok(())
}

/// Recreates `dir` as an empty directory, removing any previous contents.
pub fn recreate_dir(dir: &Path) -> Result<()> {
    fs_extra::dir::create_all(dir, true)
        .with_context(|| format!("Failed to recreate directory: {}", dir.display()))?;
    Ok(())
}

/// Gets the absolute path from a potentially relative path.
///
/// # Arguments
/// * `path` - Path to canonicalize
///
/// # Returns
/// Canonicalized absolute path, or an error if the path doesn't exist
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).with_context(|| format!("Failed to resolve path: {}", path.display()))
}
