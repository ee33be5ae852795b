//! 依赖图与循环依赖检测

use crate::builder::DefinitionSet;
use infrastructure_common::DependencyError;
use std::collections::{HashMap, HashSet};

/// 依赖图节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraphNode {
    /// 服务标识
    pub id: String,
    /// 依赖的服务标识
    pub dependencies: Vec<String>,
}

/// 循环依赖检测器
pub trait CircularDependencyDetector: Send + Sync {
    /// 检测循环依赖
    fn detect_circular_dependencies(&self, graph: &[DependencyGraphNode]) -> Result<(), DependencyError>;

    /// 构建依赖图
    fn build_dependency_graph(&self, definitions: &DefinitionSet) -> Vec<DependencyGraphNode>;
}

/// 默认循环依赖检测器
///
/// 依赖边包括服务引用、标签成员、工厂属性中的引用和别名目标。
#[derive(Debug, Default)]
pub struct DefaultCircularDependencyDetector;

impl CircularDependencyDetector for DefaultCircularDependencyDetector {
    fn detect_circular_dependencies(&self, graph: &[DependencyGraphNode]) -> Result<(), DependencyError> {
        let nodes: HashMap<&str, &DependencyGraphNode> =
            graph.iter().map(|node| (node.id.as_str(), node)).collect();
        let mut visited = HashSet::new();
        let mut path = Vec::new();

        for node in graph {
            if !visited.contains(node.id.as_str()) {
                self.dfs_check(&node.id, &nodes, &mut visited, &mut path)?;
            }
        }

        Ok(())
    }

    fn build_dependency_graph(&self, definitions: &DefinitionSet) -> Vec<DependencyGraphNode> {
        definitions
            .iter()
            .filter(|definition| definition.is_instantiable() || definition.alias.is_some())
            .map(|definition| {
                let mut dependencies: Vec<String> = Vec::new();
                let mut add = |id: &str| {
                    if !dependencies.iter().any(|d| d == id) {
                        dependencies.push(id.to_string());
                    }
                };

                if let Some(target) = &definition.alias {
                    add(target);
                }
                for injection in definition.injections.values() {
                    injection.services().into_iter().for_each(&mut add);
                    for tag in injection.tags() {
                        definitions.tagged(tag).iter().for_each(|id| add(id));
                    }
                }

                DependencyGraphNode {
                    id: definition.id.clone(),
                    dependencies,
                }
            })
            .collect()
    }
}

impl DefaultCircularDependencyDetector {
    fn dfs_check<'a>(
        &self,
        current: &'a str,
        nodes: &HashMap<&'a str, &'a DependencyGraphNode>,
        visited: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
    ) -> Result<(), DependencyError> {
        if let Some(position) = path.iter().position(|id| *id == current) {
            let mut cycle: Vec<String> = path[position..].iter().map(|id| id.to_string()).collect();
            cycle.push(current.to_string());
            return Err(DependencyError::CircularDependency { cycle });
        }

        if visited.contains(current) {
            return Ok(());
        }

        // 图外的标识（直接设置的实例）没有依赖
        let Some(node) = nodes.get(current).copied() else {
            return Ok(());
        };

        path.push(current);
        for dependency in &node.dependencies {
            self.dfs_check(dependency, nodes, visited, path)?;
        }
        path.pop();
        visited.insert(current);

        Ok(())
    }
}
