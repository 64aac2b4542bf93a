use forge_core::ObjectTree;
use forge_model::ObjectRef;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

fn node(label: usize) -> ObjectRef {
    ObjectRef::new(Arc::new(label))
}

fn label(object: &ObjectRef) -> usize {
    object.downcast_ref::<usize>().copied().unwrap_or(usize::MAX)
}

/// Tree where node `i + 1` hangs under `raw[i] % (i + 1)`
fn random_tree(raw: &[usize]) -> (ObjectTree, Vec<ObjectRef>, Vec<Option<usize>>) {
    let nodes: Vec<_> = (0..=raw.len()).map(node).collect();
    let mut parents = vec![None];
    let mut tree = ObjectTree::new();
    for (i, r) in raw.iter().enumerate() {
        let parent = r % (i + 1);
        tree.add_node(&nodes[parent], nodes[i + 1].clone());
        parents.push(Some(parent));
    }
    (tree, nodes, parents)
}

#[test]
fn test_single_node_tree() {
    let root = node(0);
    let tree = ObjectTree::new();
    let order: Vec<_> = tree.post_order(&root).iter().map(label).collect();
    assert_eq!(order, vec![0]);
    assert!(tree.is_empty());
}

#[test]
fn test_deep_chain_is_visited_leaf_first() {
    let (tree, nodes, _) = random_tree(&[0, 1, 2, 3, 4]);
    let order: Vec<_> = tree.post_order(&nodes[0]).iter().map(label).collect();
    assert_eq!(order, vec![5, 4, 3, 2, 1, 0]);
}

proptest! {
    #[test]
    fn test_post_order_of_random_trees(raw in prop::collection::vec(any::<usize>(), 0..40)) {
        let (tree, nodes, parents) = random_tree(&raw);
        let order: Vec<_> = tree.post_order(&nodes[0]).iter().map(label).collect();

        prop_assert_eq!(order.len(), nodes.len());
        let position: HashMap<usize, usize> =
            order.iter().enumerate().map(|(at, label)| (*label, at)).collect();
        prop_assert_eq!(position.len(), nodes.len());

        for (child, parent) in parents.iter().enumerate() {
            if let Some(parent) = parent {
                prop_assert!(position[&child] < position[parent]);
            }
        }

        for parent in &nodes {
            let siblings: Vec<_> = tree.children(parent).iter().map(|c| position[&label(c)]).collect();
            prop_assert!(siblings.windows(2).all(|pair| pair[0] < pair[1]));
        }
        prop_assert_eq!(order.last().copied(), Some(0));
    }
}
