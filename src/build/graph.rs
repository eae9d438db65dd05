//! Task registry.
//!
//! [`TaskGraph`] holds every registered task node and resolves a task
//! selection (leaf names, aggregates, filters) into a [`RunPlan`].

use crate::build::{DependencyKind, GraphError, RunPlan, TaskKind, TaskNode};
use std::collections::HashSet;

/// Registered task nodes.
#[derive(Debug, Default, Clone)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
}

impl TaskGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self { nodes: vec![] }
    }

    /// The pipeline's task graph.
    ///
    /// | task           | edges                                                   |
    /// |----------------|---------------------------------------------------------|
    /// | `inject`       | requires `copy:html`, after every bundle and copy task  |
    /// | `build:styles` | requires `styles`, `css:vendors`                        |
    /// | `build:js`     | requires `js:vendors`, `js:app`                         |
    /// | `build:html`   | requires the copy tasks and `inject`                    |
    /// | `default`      | requires every leaf                                     |
    /// | `build`        | requires `default`                                      |
    pub fn standard() -> Self {
        let nodes = vec![
            TaskNode::leaf(TaskKind::Styles, "Compile, prefix and minify style sources"),
            TaskNode::leaf(TaskKind::VendorCss, "Concatenate and minify vendor stylesheets"),
            TaskNode::leaf(TaskKind::VendorJs, "Concatenate vendor scripts"),
            TaskNode::leaf(TaskKind::AppJs, "Concatenate application scripts"),
            TaskNode::leaf(TaskKind::CopyHtml, "Copy HTML entry files"),
            TaskNode::leaf(TaskKind::CopyImages, "Copy images"),
            TaskNode::leaf(TaskKind::CopyFonts, "Copy fonts"),
            TaskNode::leaf(TaskKind::Inject, "Inject bundle references into copied HTML")
                .requires("copy:html")
                .after("styles")
                .after("css:vendors")
                .after("js:vendors")
                .after("js:app")
                .after("copy:images")
                .after("copy:fonts"),
            TaskNode::group("build:styles", &["styles", "css:vendors"], "Build stylesheets"),
            TaskNode::group("build:js", &["js:vendors", "js:app"], "Build scripts"),
            TaskNode::group(
                "build:html",
                &["copy:html", "copy:images", "copy:fonts", "inject"],
                "Copy assets and inject references",
            ),
            TaskNode::group(
                "default",
                &[
                    "styles",
                    "js:vendors",
                    "js:app",
                    "css:vendors",
                    "copy:html",
                    "copy:images",
                    "copy:fonts",
                    "inject",
                ],
                "Run the full pipeline",
            ),
            TaskNode::group("build", &["default"], "Alias of default"),
        ];

        Self { nodes }
    }

    /// Register a task.
    pub fn register(&mut self, node: TaskNode) -> Result<(), GraphError> {
        if self.get(&node.name).is_some() {
            return Err(GraphError::Duplicate(node.name));
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Look up a task by name.
    pub fn get(&self, name: &str) -> Option<&TaskNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// All registered tasks, in registration order.
    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    /// Check that every edge points at a registered task and that the
    /// graph is acyclic.
    pub fn validate(&self) -> Result<(), GraphError> {
        for node in &self.nodes {
            for dep in &node.dependencies {
                if self.get(&dep.task).is_none() {
                    return Err(GraphError::UnknownDependency {
                        task: node.name.clone(),
                        dependency: dep.task.clone(),
                    });
                }
            }
        }

        let mut all = RunPlan::new();
        for node in &self.nodes {
            all.add_task(node.clone());
        }
        all.build_order().map(|_| ())
    }

    /// Resolve selected names into a plan of leaf tasks.
    ///
    /// A selection is a task name or a filter understood by
    /// [`TaskNode::matches_filter`]. `Requires` edges are followed
    /// transitively; `After` edges are not. Aggregates are expanded and
    /// left out of the plan.
    pub fn plan<S: AsRef<str>>(&self, selection: &[S]) -> Result<RunPlan, GraphError> {
        self.validate()?;

        let mut selected: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = Vec::new();

        for item in selection {
            let item = item.as_ref();
            if self.get(item).is_some() {
                stack.push(item);
                continue;
            }
            let matched: Vec<&str> = self
                .nodes
                .iter()
                .filter(|n| n.matches_filter(item))
                .map(|n| n.name.as_str())
                .collect();
            if matched.is_empty() {
                return Err(GraphError::UnknownTask(item.to_string()));
            }
            stack.extend(matched);
        }

        while let Some(name) = stack.pop() {
            if !selected.insert(name) {
                continue;
            }
            if let Some(node) = self.get(name) {
                stack.extend(
                    node.dependencies
                        .iter()
                        .filter(|d| d.kind == DependencyKind::Requires)
                        .map(|d| d.task.as_str()),
                );
            }
        }

        let mut plan = RunPlan::new();
        for node in &self.nodes {
            if !node.is_group() && selected.contains(node.name.as_str()) {
                plan.add_task(node.clone());
            }
        }

        Ok(plan)
    }
}
