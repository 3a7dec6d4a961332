use crate::overrides::OverrideTables;
use crate::schema::Schema;
use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use smol_str::SmolStr;
use std::collections::HashMap;

/// Strongly connected components of the schema reference graph
///
/// Edge A -> B means A mentions B: a record through one of its field
/// alternatives, a union through one of its subtypes. Skipped and special
/// types are leaves and never join a component.
#[derive(Debug, Clone, Default)]
pub struct CycleIndex {
    component: HashMap<SmolStr, usize>,
    /// Components with more than one member or a self edge
    cyclic: Vec<bool>,
}

impl CycleIndex {
    pub fn build(schema: &Schema, overrides: &OverrideTables) -> Self {
        let mut graph = DiGraph::<SmolStr, ()>::new();
        let mut name_to_node = HashMap::new();

        for name in schema.types.keys() {
            let node = graph.add_node(name.clone());
            name_to_node.insert(name.clone(), node);
        }

        let mut self_edges = Vec::new();
        for (name, ty) in schema.iter() {
            if overrides.is_skipped(name) || overrides.special(name).is_some() {
                continue;
            }
            let source = name_to_node[name];
            let targets = ty
                .fields
                .iter()
                .flat_map(|f| f.type_refs())
                .map(|r| r.base)
                .chain(ty.subtypes.iter().cloned());

            for target in targets {
                if let Some(&target_node) = name_to_node.get(&target) {
                    if target_node == source {
                        self_edges.push(name.clone());
                    }
                    graph.update_edge(source, target_node, ());
                }
            }
        }

        let mut component = HashMap::new();
        let mut cyclic = Vec::new();
        for (index, members) in tarjan_scc(&graph).into_iter().enumerate() {
            cyclic.push(members.len() > 1);
            for node in members {
                component.insert(graph[node].clone(), index);
            }
        }
        for name in self_edges {
            if let Some(&index) = component.get(&name) {
                cyclic[index] = true;
            }
        }

        let index = Self { component, cyclic };
        tracing::debug!(
            cycles = index.cyclic.iter().filter(|c| **c).count(),
            "computed reference cycles"
        );
        index
    }

    /// Whether both names lie on a common reference cycle
    pub fn same_cycle(&self, a: &str, b: &str) -> bool {
        match (self.component.get(a), self.component.get(b)) {
            (Some(x), Some(y)) => x == y && self.cyclic[*x],
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Schema {
        Schema::load_from_file("tests/fixtures/schema.json").expect("load schema")
    }

    #[test]
    fn test_message_cycle() {
        let index = CycleIndex::build(&fixture(), &OverrideTables::default());

        assert!(index.same_cycle("Message", "Message"));
        assert!(index.same_cycle("Message", "MaybeInaccessibleMessage"));
        assert!(!index.same_cycle("Message", "User"));
        assert!(!index.same_cycle("Owner", "Owner"));
    }

    #[test]
    fn test_skipped_types_do_not_link() {
        let schema = Schema::from_json(
            r#"{"types": {
                "A": {"name": "A", "fields": [{"name": "b", "types": ["B"], "required": true}]},
                "B": {"name": "B", "fields": [{"name": "a", "types": ["A"], "required": true}]}
            }}"#,
        )
        .expect("schema");

        let index = CycleIndex::build(&schema, &OverrideTables::default());
        assert!(index.same_cycle("A", "B"));

        let overrides = OverrideTables::from_kdl("skip \"B\"").expect("overrides");
        let index = CycleIndex::build(&schema, &overrides);
        assert!(!index.same_cycle("A", "B"));
    }
}
