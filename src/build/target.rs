//! Task node definitions.
//!
//! A task node is a named unit of work with typed dependency edges. A
//! [`RunPlan`] is the set of leaf nodes selected for one invocation.

use crate::build::GraphError;
use std::collections::{HashMap, HashSet};

/// Type of work a task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Compile style sources into the app stylesheet
    Styles,
    /// Concatenate (and minify) the vendor stylesheet manifest
    VendorCss,
    /// Concatenate the vendor script manifest
    VendorJs,
    /// Concatenate first-party scripts
    AppJs,
    /// Copy HTML entry files
    CopyHtml,
    /// Copy images
    CopyImages,
    /// Copy fonts
    CopyFonts,
    /// Inject bundle references into copied HTML
    Inject,
    /// Aggregate of other tasks; performs no work itself
    Group,
}

impl TaskKind {
    /// Canonical task name for leaf kinds.
    pub fn task_name(&self) -> Option<&'static str> {
        match self {
            TaskKind::Styles => Some("styles"),
            TaskKind::VendorCss => Some("css:vendors"),
            TaskKind::VendorJs => Some("js:vendors"),
            TaskKind::AppJs => Some("js:app"),
            TaskKind::CopyHtml => Some("copy:html"),
            TaskKind::CopyImages => Some("copy:images"),
            TaskKind::CopyFonts => Some("copy:fonts"),
            TaskKind::Inject => Some("inject"),
            TaskKind::Group => None,
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.task_name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "group"),
        }
    }
}

/// How a dependency edge constrains its task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// Selecting the task pulls the dependency into the run
    Requires,
    /// Ordering only, when both tasks are part of the run
    After,
}

/// A typed dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    /// Name of the task depended upon
    pub task: String,
    /// Edge semantics
    pub kind: DependencyKind,
}

/// A named unit of work.
#[derive(Debug, Clone)]
pub struct TaskNode {
    /// Unique task name (e.g., "css:vendors")
    pub name: String,
    /// What the task does
    pub kind: TaskKind,
    /// One-line description for `--list`
    pub description: String,
    /// Dependency edges
    pub dependencies: Vec<Dependency>,
}

impl TaskNode {
    /// Create a leaf task named after its kind.
    pub fn leaf(kind: TaskKind, description: impl Into<String>) -> Self {
        let name = kind.task_name().unwrap_or("group").to_string();
        Self { name, kind, description: description.into(), dependencies: vec![] }
    }

    /// Create an aggregate task requiring each member.
    pub fn group(name: impl Into<String>, members: &[&str], description: impl Into<String>) -> Self {
        let dependencies = members
            .iter()
            .map(|m| Dependency { task: m.to_string(), kind: DependencyKind::Requires })
            .collect();
        Self { name: name.into(), kind: TaskKind::Group, description: description.into(), dependencies }
    }

    /// Add a `Requires` edge.
    pub fn requires(mut self, task: impl Into<String>) -> Self {
        self.dependencies.push(Dependency { task: task.into(), kind: DependencyKind::Requires });
        self
    }

    /// Add an `After` edge.
    pub fn after(mut self, task: impl Into<String>) -> Self {
        self.dependencies.push(Dependency { task: task.into(), kind: DependencyKind::After });
        self
    }

    /// Whether this node is an aggregate.
    pub fn is_group(&self) -> bool {
        self.kind == TaskKind::Group
    }

    /// Names of `Requires` dependencies.
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .filter(|d| d.kind == DependencyKind::Requires)
            .map(|d| d.task.as_str())
    }

    /// Check if this task matches a filter string.
    ///
    /// Supports an exact name ("copy:html"), a namespace ("copy" or
    /// "copy:*") and a name wildcard ("*:vendors").
    pub fn matches_filter(&self, filter: &str) -> bool {
        if self.name == filter {
            return true;
        }

        match (self.name.split_once(':'), filter.split_once(':')) {
            (Some((ns, _)), None) => ns == filter,
            (Some((ns, leaf)), Some((ns_pat, leaf_pat))) => {
                (ns_pat == "*" || ns_pat == ns) && (leaf_pat == "*" || leaf_pat == leaf)
            }
            _ => false,
        }
    }
}

/// The leaf tasks selected for one run, with ordering information.
#[derive(Debug, Default, Clone)]
pub struct RunPlan {
    /// Selected tasks in registration order
    tasks: Vec<TaskNode>,
}

impl RunPlan {
    /// Create a new empty plan.
    pub fn new() -> Self {
        Self { tasks: vec![] }
    }

    /// Add a task to the plan.
    pub fn add_task(&mut self, task: TaskNode) {
        self.tasks.push(task);
    }

    /// Get all tasks in the plan.
    pub fn tasks(&self) -> &[TaskNode] {
        &self.tasks
    }

    /// Get the number of tasks in the plan.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Whether a task with this name is part of the plan.
    pub fn contains(&self, name: &str) -> bool {
        self.tasks.iter().any(|t| t.name == name)
    }

    /// Edges restricted to tasks inside the plan.
    fn local_deps(&self) -> HashMap<&str, Vec<&str>> {
        let names: HashSet<&str> = self.tasks.iter().map(|t| t.name.as_str()).collect();
        self.tasks
            .iter()
            .map(|t| {
                let deps = t
                    .dependencies
                    .iter()
                    .map(|d| d.task.as_str())
                    .filter(|d| names.contains(d))
                    .collect();
                (t.name.as_str(), deps)
            })
            .collect()
    }

    /// Get tasks in execution order (dependencies before dependents).
    ///
    /// Returns an error if there are circular dependencies.
    pub fn build_order(&self) -> Result<Vec<&TaskNode>, GraphError> {
        let deps = self.local_deps();
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut visiting = HashSet::new();

        for task in &self.tasks {
            self.visit_task(task, &deps, &mut visited, &mut visiting, &mut result)?;
        }

        Ok(result)
    }

    fn visit_task<'a>(
        &'a self,
        task: &'a TaskNode,
        deps: &HashMap<&str, Vec<&str>>,
        visited: &mut HashSet<String>,
        visiting: &mut HashSet<String>,
        result: &mut Vec<&'a TaskNode>,
    ) -> Result<(), GraphError> {
        if visited.contains(&task.name) {
            return Ok(());
        }

        if visiting.contains(&task.name) {
            return Err(GraphError::Cycle(task.name.clone()));
        }

        visiting.insert(task.name.clone());

        for dep_name in deps.get(task.name.as_str()).map(|v| v.as_slice()).unwrap_or(&[]) {
            if let Some(dep) = self.tasks.iter().find(|t| t.name == *dep_name) {
                self.visit_task(dep, deps, visited, visiting, result)?;
            }
        }

        visiting.remove(&task.name);
        visited.insert(task.name.clone());
        result.push(task);

        Ok(())
    }

    /// Group tasks into dependency levels.
    ///
    /// Every task's in-plan dependencies sit in earlier levels, so the
    /// tasks of one level may run concurrently.
    pub fn levels(&self) -> Result<Vec<Vec<&TaskNode>>, GraphError> {
        if self.tasks.is_empty() {
            return Ok(vec![]);
        }

        let deps = self.local_deps();
        let mut level_of: HashMap<&str, usize> = HashMap::new();
        let mut remaining: Vec<&str> = self.tasks.iter().map(|t| t.name.as_str()).collect();
        let mut current_level = 0;

        while !remaining.is_empty() {
            let this_level: Vec<&str> = remaining
                .iter()
                .copied()
                .filter(|id| {
                    deps.get(id)
                        .map(|d| d.iter().all(|dep| level_of.contains_key(dep)))
                        .unwrap_or(true)
                })
                .collect();

            if this_level.is_empty() {
                return Err(GraphError::Cycle(remaining[0].to_string()));
            }

            for &id in &this_level {
                level_of.insert(id, current_level);
            }
            remaining.retain(|id| !level_of.contains_key(id));
            current_level += 1;
        }

        let mut result: Vec<Vec<&TaskNode>> = vec![Vec::new(); current_level];
        for task in &self.tasks {
            if let Some(&level) = level_of.get(task.name.as_str()) {
                result[level].push(task);
            }
        }

        Ok(result)
    }

    /// Every task in the plan that transitively depends on `name`.
    pub fn dependents_of(&self, name: &str) -> HashSet<String> {
        let deps = self.local_deps();
        let mut found: HashSet<String> = HashSet::new();
        let mut frontier = vec![name.to_string()];

        while let Some(current) = frontier.pop() {
            for (task, task_deps) in &deps {
                if task_deps.contains(&current.as_str()) && found.insert(task.to_string()) {
                    frontier.push(task.to_string());
                }
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_of(tasks: Vec<TaskNode>) -> RunPlan {
        let mut plan = RunPlan::new();
        for t in tasks {
            plan.add_task(t);
        }
        plan
    }

    #[test]
    fn test_task_kind_display() {
        assert_eq!(TaskKind::Styles.to_string(), "styles");
        assert_eq!(TaskKind::VendorCss.to_string(), "css:vendors");
        assert_eq!(TaskKind::VendorJs.to_string(), "js:vendors");
        assert_eq!(TaskKind::AppJs.to_string(), "js:app");
        assert_eq!(TaskKind::CopyHtml.to_string(), "copy:html");
        assert_eq!(TaskKind::Inject.to_string(), "inject");
        assert_eq!(TaskKind::Group.to_string(), "group");
    }

    #[test]
    fn test_task_node_leaf_and_edges() {
        let node = TaskNode::leaf(TaskKind::Inject, "inject bundles")
            .requires("copy:html")
            .after("js:app");

        assert_eq!(node.name, "inject");
        assert_eq!(node.dependencies.len(), 2);
        assert_eq!(node.required().collect::<Vec<_>>(), vec!["copy:html"]);
        assert!(!node.is_group());
    }

    #[test]
    fn test_task_node_group() {
        let node = TaskNode::group("build:js", &["js:vendors", "js:app"], "scripts");
        assert!(node.is_group());
        assert_eq!(node.required().count(), 2);
    }

    #[test]
    fn test_matches_filter() {
        let node = TaskNode::leaf(TaskKind::CopyHtml, "");
        assert!(node.matches_filter("copy:html"));
        assert!(node.matches_filter("copy"));
        assert!(node.matches_filter("copy:*"));
        assert!(node.matches_filter("*:html"));
        assert!(!node.matches_filter("js"));
        assert!(!node.matches_filter("*:fonts"));

        let inject = TaskNode::leaf(TaskKind::Inject, "");
        assert!(inject.matches_filter("inject"));
        assert!(!inject.matches_filter("inject:*"));
    }

    #[test]
    fn test_build_order_respects_edges() {
        let plan = plan_of(vec![
            TaskNode::leaf(TaskKind::Inject, "").requires("copy:html").after("js:app"),
            TaskNode::leaf(TaskKind::AppJs, ""),
            TaskNode::leaf(TaskKind::CopyHtml, ""),
        ]);

        let order: Vec<_> = plan.build_order().unwrap().iter().map(|t| t.name.as_str()).collect();
        let pos = |n: &str| order.iter().position(|x| *x == n).unwrap();
        assert_eq!(order.len(), 3);
        assert!(pos("copy:html") < pos("inject"));
        assert!(pos("js:app") < pos("inject"));
    }

    #[test]
    fn test_after_edge_outside_plan_is_ignored() {
        let plan = plan_of(vec![
            TaskNode::leaf(TaskKind::CopyHtml, ""),
            TaskNode::leaf(TaskKind::Inject, "").requires("copy:html").after("styles"),
        ]);

        let levels = plan.levels().unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0][0].name, "copy:html");
        assert_eq!(levels[1][0].name, "inject");
    }

    #[test]
    fn test_levels_group_independent_tasks() {
        let plan = plan_of(vec![
            TaskNode::leaf(TaskKind::Styles, ""),
            TaskNode::leaf(TaskKind::VendorJs, ""),
            TaskNode::leaf(TaskKind::CopyHtml, ""),
            TaskNode::leaf(TaskKind::Inject, "")
                .requires("copy:html")
                .after("styles")
                .after("js:vendors"),
        ]);

        let levels = plan.levels().unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].len(), 3);
        assert_eq!(levels[1].len(), 1);
    }

    #[test]
    fn test_cycle_detected() {
        let a = TaskNode::leaf(TaskKind::Styles, "").after("inject");
        let b = TaskNode::leaf(TaskKind::Inject, "").after("styles");
        let plan = plan_of(vec![a, b]);

        assert!(matches!(plan.build_order(), Err(GraphError::Cycle(_))));
        assert!(matches!(plan.levels(), Err(GraphError::Cycle(_))));
    }

    #[test]
    fn test_dependents_of_is_transitive() {
        let plan = plan_of(vec![
            TaskNode::leaf(TaskKind::CopyHtml, ""),
            TaskNode::leaf(TaskKind::Inject, "").requires("copy:html"),
            TaskNode::leaf(TaskKind::Styles, "").after("inject"),
            TaskNode::leaf(TaskKind::AppJs, ""),
        ]);

        let dependents = plan.dependents_of("copy:html");
        assert!(dependents.contains("inject"));
        assert!(dependents.contains("styles"));
        assert!(!dependents.contains("js:app"));
    }

    #[test]
    fn test_empty_plan() {
        let plan = RunPlan::new();
        assert!(plan.is_empty());
        assert!(plan.levels().unwrap().is_empty());
        assert!(plan.build_order().unwrap().is_empty());
    }
}
