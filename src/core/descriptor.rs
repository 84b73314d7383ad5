//! # Descriptor Mutation Module / 描述文件修改模块
//!
//! Rewrites a project's `pom.xml` files so the test runner plugin uses a given
//! release with one fresh fork per module (`forkCount=1`, `reuseForks=false`).
//!
//! 重写项目的 `pom.xml` 文件，使测试运行器插件使用指定版本，
//! 并为每个模块使用一个全新的 fork。

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::errors::ProjectError;
use crate::core::models::Project;
use crate::infra::fs::discover_descriptors;
use crate::infra::xml::{Document, Element};

pub const RUNNER_GROUP_ID: &str = "org.apache.maven.plugins";
pub const RUNNER_ARTIFACT_ID: &str = "maven-surefire-plugin";

/// Fork isolation settings written into every runner declaration.
pub const FORK_SETTINGS: [(&str, &str); 2] = [("forkCount", "1"), ("reuseForks", "false")];

/// Whether a descriptor is the project's root or one of its modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorRole {
    Root,
    Module,
}

/// What a mutation did to a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Existing runner declarations were rewritten.
    Updated { declarations: usize },
    /// A new declaration was added to the root descriptor.
    Inserted,
    /// A module without its own declaration; it inherits the root's.
    Inherited,
}

impl MutationOutcome {
    pub fn changed(self) -> bool {
        !matches!(self, MutationOutcome::Inherited)
    }
}

/// Applies the runner version and fork settings to a parsed descriptor.
///
/// Every declaration in a `plugins` list is rewritten. The root only counts
/// as declaring the runner when one sits in `build/plugins` or
/// `build/pluginManagement/plugins`; otherwise a declaration is inserted.
///
/// 将运行器版本和 fork 设置应用到已解析的描述文件。
pub fn mutate_document(
    doc: &mut Document,
    role: DescriptorRole,
    target_version: &str,
) -> Result<MutationOutcome, AmbiguousSections> {
    let root = doc.root_mut();

    let mut declarations = 0;
    for_each_runner_declaration(root, &mut |plugin| {
        configure_runner(plugin, target_version);
        declarations += 1;
    });
    match role {
        DescriptorRole::Module if declarations > 0 => {
            return Ok(MutationOutcome::Updated { declarations });
        }
        DescriptorRole::Module => return Ok(MutationOutcome::Inherited),
        // A profile-only declaration does not bind the runner when the
        // profile is inactive, so the root needs one at build scope.
        DescriptorRole::Root if has_build_scope_declaration(root) => {
            return Ok(MutationOutcome::Updated { declarations });
        }
        DescriptorRole::Root => {}
    }

    let sections = count_plugin_sections(root);
    if sections > 1 {
        return Err(AmbiguousSections(sections));
    }

    let mut plugin = Element::new("plugin")
        .with_child(Element::with_text("groupId", RUNNER_GROUP_ID))
        .with_child(Element::with_text("artifactId", RUNNER_ARTIFACT_ID));
    configure_runner(&mut plugin, target_version);

    root.ensure_child("build")
        .ensure_child("plugins")
        .append_child(plugin);
    Ok(MutationOutcome::Inserted)
}

/// More than one `build/plugins` section exists; carries how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmbiguousSections(pub usize);

/// Reads, mutates and persists one descriptor file.
///
/// Module descriptors that inherit the runner are left untouched on disk.
pub fn mutate_descriptor(
    path: &Path,
    role: DescriptorRole,
    target_version: &str,
) -> Result<MutationOutcome, ProjectError> {
    let content = fs::read_to_string(path).map_err(|e| ProjectError::io(path, e))?;
    let mut doc = Document::parse(&content).map_err(|source| ProjectError::Descriptor {
        path: path.to_path_buf(),
        source,
    })?;

    let outcome = mutate_document(&mut doc, role, target_version).map_err(|AmbiguousSections(sections)| {
        ProjectError::AmbiguousBuildSection {
            descriptor: path.to_path_buf(),
            sections,
        }
    })?;

    if outcome.changed() {
        fs::write(path, doc.to_xml_string()).map_err(|e| ProjectError::io(path, e))?;
    }
    Ok(outcome)
}

/// Switches every descriptor of `project` to `target_version`.
///
/// The root descriptor is processed first, then the modules in path order.
pub fn apply_variant(
    project: &Project,
    target_version: &str,
) -> Result<Vec<(PathBuf, MutationOutcome)>, ProjectError> {
    let descriptors =
        discover_descriptors(project.root()).map_err(|e| ProjectError::io(project.root(), e))?;

    let mut outcomes = Vec::with_capacity(descriptors.len());
    for (index, path) in descriptors.into_iter().enumerate() {
        let role = if index == 0 {
            if !path.is_file() {
                return Err(ProjectError::MissingDescriptor { path });
            }
            DescriptorRole::Root
        } else {
            DescriptorRole::Module
        };
        let outcome = mutate_descriptor(&path, role, target_version)?;
        debug!("{}: {:?}", path.display(), outcome);
        outcomes.push((path, outcome));
    }
    Ok(outcomes)
}

fn is_runner_plugin(plugin: &Element) -> bool {
    let artifact_matches = plugin.child_text("artifactId").as_deref() == Some(RUNNER_ARTIFACT_ID);
    let group_matches = match plugin.child_text("groupId") {
        Some(group) => group == RUNNER_GROUP_ID,
        None => true,
    };
    artifact_matches && group_matches
}

/// Visits every runner `plugin` element that sits directly in a `plugins` list.
fn for_each_runner_declaration(element: &mut Element, visit: &mut dyn FnMut(&mut Element)) {
    let in_plugin_list = element.is("plugins");
    for child in element.elements_mut() {
        if in_plugin_list && child.is("plugin") && is_runner_plugin(child) {
            visit(child);
        } else {
            for_each_runner_declaration(child, visit);
        }
    }
}

/// Whether the root declares the runner in `build/plugins` or
/// `build/pluginManagement/plugins`.
fn has_build_scope_declaration(root: &Element) -> bool {
    let Some(build) = root.child("build") else {
        return false;
    };
    let managed = build.child("pluginManagement").and_then(|m| m.child("plugins"));
    [build.child("plugins"), managed]
        .into_iter()
        .flatten()
        .any(|plugins| plugins.elements().any(|p| p.is("plugin") && is_runner_plugin(p)))
}

/// Counts `plugins` lists that are direct children of a `build` element.
fn count_plugin_sections(element: &Element) -> usize {
    let own = if element.is("build") {
        element.elements().filter(|e| e.is("plugins")).count()
    } else {
        0
    };
    own + element.elements().map(count_plugin_sections).sum::<usize>()
}

fn configure_runner(plugin: &mut Element, target_version: &str) {
    plugin.ensure_child("version").set_text(target_version);
    let configuration = plugin.ensure_child("configuration");
    for (key, value) in FORK_SETTINGS {
        configuration.ensure_child(key).set_text(value);
    }
}
