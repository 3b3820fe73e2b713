use std::collections::BTreeMap;
use std::ops::ControlFlow;

use quantbvh3d::utils::AvlTree;

#[test]
fn random_operations_match_btree_map() {
    let mut rng = oorandom::Rand32::new(1234);
    let mut tree = AvlTree::new();
    let mut reference = BTreeMap::new();

    for step in 0..5000 {
        let key = rng.rand_range(0..500);
        let value = rng.rand_u32();

        match rng.rand_range(0..4) {
            0 => {
                let inserted = tree.insert(key, value).is_ok();
                assert_eq!(inserted, !reference.contains_key(&key));
                let _ = reference.entry(key).or_insert(value);
            }
            1 => assert_eq!(tree.update(key, value), reference.insert(key, value)),
            2 => assert_eq!(tree.remove(&key), reference.remove(&key)),
            _ => assert_eq!(tree.get(&key), reference.get(&key)),
        }

        if step % 100 == 0 {
            tree.assert_balanced();
        }
    }

    tree.assert_balanced();
    assert_eq!(tree.len(), reference.len());
    assert!(tree.iter().eq(reference.iter()));

    // The height of an AVL tree is at most about 1.44 * log2(n + 2).
    let bound = 1.45 * ((tree.len() + 2) as f32).log2();
    assert!((tree.height() as f32) <= bound);
}

#[test]
fn enumerate_until_a_key_is_found() {
    let mut tree = AvlTree::new();
    for name in ["delta", "alpha", "echo", "charlie", "bravo"] {
        let _ = tree.insert(name.to_string(), name.len());
    }

    let mut visited = Vec::new();
    let found = tree.enumerate_forward(|key, len| {
        visited.push(key.clone());
        if key.starts_with('c') {
            ControlFlow::Break(*len)
        } else {
            ControlFlow::Continue(())
        }
    });

    assert_eq!(found, ControlFlow::Break(7));
    assert_eq!(visited, ["alpha", "bravo", "charlie"]);

    let mut last = None;
    let found = tree.enumerate_backward(|key, _| {
        last = Some(key.clone());
        ControlFlow::<()>::Break(())
    });
    assert!(found.is_break());
    assert_eq!(last.as_deref(), Some("echo"));
}

#[test]
fn remove_everything() {
    let mut tree = AvlTree::new();
    for i in 0..200u32 {
        let _ = tree.insert(i.wrapping_mul(37) % 200, i);
    }
    assert_eq!(tree.len(), 200);

    for i in (0..200u32).rev() {
        assert!(tree.remove(&i).is_some());
        tree.assert_balanced();
    }

    assert!(tree.is_empty());
    assert_eq!(tree.height(), 0);
    assert_eq!(tree.first_key_value(), None);
}
