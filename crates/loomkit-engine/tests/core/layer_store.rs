use loomkit_core::{EngineError, LayerId};
use loomkit_engine::{LayerKind, LayerStore, SurfaceKey, SurfacePool};
use proptest::prelude::*;

fn store_with(n: usize) -> (LayerStore, SurfacePool, Vec<LayerId>) {
    let mut store = LayerStore::new(4, 4);
    let mut pool = SurfacePool::new(4, 4, 0).unwrap();
    let ids = (0..n)
        .map(|_| store.create(LayerKind::Raster, None, &mut pool).unwrap().id)
        .collect();
    (store, pool, ids)
}

fn orders(store: &LayerStore) -> Vec<usize> {
    store.layers().iter().map(|l| l.order).collect()
}

#[test]
fn test_reorder_non_permutation_is_atomic() {
    let (mut store, _pool, ids) = store_with(3);
    let before: Vec<_> = store.layers().iter().map(|l| (l.id, l.order)).collect();

    let err = store.reorder(&[ids[2], ids[0]]).unwrap_err();
    assert!(matches!(err.as_engine(), Some(EngineError::InvalidOrder { .. })));
    let err = store.reorder(&[ids[2], ids[0], ids[0]]).unwrap_err();
    assert!(matches!(err.as_engine(), Some(EngineError::InvalidOrder { .. })));

    let after: Vec<_> = store.layers().iter().map(|l| (l.id, l.order)).collect();
    assert_eq!(before, after);
}

#[test]
fn test_reorder_applies_permutation() {
    let (mut store, _pool, ids) = store_with(3);
    store.reorder(&[ids[2], ids[0], ids[1]]).unwrap();
    assert_eq!(store.ids(), vec![ids[2], ids[0], ids[1]]);
    assert_eq!(store.layer(ids[2]).unwrap().order, 0);
}

#[test]
fn test_delete_only_layer_clears_active() {
    let (mut store, mut pool, ids) = store_with(1);
    store.delete(ids[0], &mut pool).unwrap();
    assert_eq!(store.active_id(), None);
    assert!(store.is_empty());
    assert_eq!(pool.stats().active, 0);
}

#[test]
fn test_delete_group_keeps_layers() {
    let (mut store, _pool, ids) = store_with(2);
    let group = store.create_group("g", &ids).unwrap();
    store.delete_group(group).unwrap();
    assert_eq!(store.len(), 2);
    assert!(store.group_of(ids[0]).is_none());
}

#[test]
fn test_tool_layer_skips_locked() {
    let (mut store, mut pool, _) = store_with(0);
    let first = store
        .get_or_create_tool_layer("chain", LayerKind::Raster, &mut pool)
        .unwrap();
    store.set_locked(first, true).unwrap();
    let second = store
        .get_or_create_tool_layer("chain", LayerKind::Raster, &mut pool)
        .unwrap();
    assert_ne!(first, second);
    assert!(pool.contains(&SurfaceKey::Layer(second)));
}

#[test]
fn test_locking_advances_revision() {
    let (mut store, _pool, ids) = store_with(1);
    let before = store.revision();
    store.set_locked(ids[0], true).unwrap();
    assert!(store.revision() > before);
    assert!(store.layer(ids[0]).unwrap().locked);

    // unchanged value is not a change
    let locked = store.revision();
    store.set_locked(ids[0], true).unwrap();
    assert_eq!(store.revision(), locked);
}

#[test]
fn test_unknown_layer_errors() {
    let (mut store, mut pool, _) = store_with(1);
    let ghost = LayerId::new();
    assert!(store.set_visible(ghost, false).is_err());
    assert!(store.move_up(ghost).is_err());
    assert!(store.duplicate(ghost, &mut pool).is_err());
}

#[derive(Debug, Clone)]
enum Op {
    Create,
    Delete(usize),
    Up(usize),
    Down(usize),
    Top(usize),
    Bottom(usize),
    Duplicate(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Create),
        any::<usize>().prop_map(Op::Delete),
        any::<usize>().prop_map(Op::Up),
        any::<usize>().prop_map(Op::Down),
        any::<usize>().prop_map(Op::Top),
        any::<usize>().prop_map(Op::Bottom),
        any::<usize>().prop_map(Op::Duplicate),
    ]
}

proptest! {
    #[test]
    fn prop_order_stays_dense(ops in prop::collection::vec(op(), 1..40)) {
        let (mut store, mut pool, _) = store_with(2);
        for op in ops {
            let ids = store.ids();
            let pick = |i: usize| ids.get(i % ids.len().max(1)).copied();
            match op {
                Op::Create => { store.create(LayerKind::Raster, None, &mut pool).unwrap(); }
                Op::Delete(i) => if let Some(id) = pick(i) { store.delete(id, &mut pool).unwrap(); },
                Op::Up(i) => if let Some(id) = pick(i) { store.move_up(id).unwrap(); },
                Op::Down(i) => if let Some(id) = pick(i) { store.move_down(id).unwrap(); },
                Op::Top(i) => if let Some(id) = pick(i) { store.move_to_top(id).unwrap(); },
                Op::Bottom(i) => if let Some(id) = pick(i) { store.move_to_bottom(id).unwrap(); },
                Op::Duplicate(i) => if let Some(id) = pick(i) { store.duplicate(id, &mut pool).unwrap(); },
            }
            let expected: Vec<usize> = (0..store.len()).collect();
            prop_assert_eq!(orders(&store), expected);
            prop_assert_eq!(pool.stats().active, store.len());
            if let Some(active) = store.active_id() {
                prop_assert!(store.get(active).is_some());
            } else {
                prop_assert!(store.is_empty());
            }
        }
    }
}
