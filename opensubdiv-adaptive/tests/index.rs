//! Tests for the Index newtype wrapper.

use opensubdiv_adaptive::Index;

#[test]
fn test_index_from_u32() {
    let idx = Index::from(42u32);
    assert_eq!(idx.0, 42);
}

#[test]
fn test_index_into_u32() {
    let idx = Index(42);
    let value: u32 = idx.into();
    assert_eq!(value, 42);
}

#[test]
fn test_index_from_usize() {
    let idx = Index::from(100usize);
    assert_eq!(idx.0, 100);
}

#[test]
fn test_index_into_usize() {
    let idx = Index(100);
    let value: usize = idx.into();
    assert_eq!(value, 100);
    assert_eq!(idx.get(), 100);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "does not fit into 32 bits")]
fn test_index_from_oversized_usize() {
    let _ = Index::from(u32::MAX as usize + 1);
}

#[test]
fn test_index_debug_and_display() {
    let idx = Index(42);
    assert_eq!(format!("{:?}", idx), "Index(42)");
    assert_eq!(idx.to_string(), "42");
}

#[test]
fn test_index_ordering() {
    let idx1 = Index(1);
    let idx2 = Index(2);
    let idx3 = Index(2);

    assert!(idx1 < idx2);
    assert!(idx2 > idx1);
    assert!(idx2 <= idx3);
    assert!(idx2 >= idx3);
    assert_eq!(Index::default(), Index(0));
}

#[test]
fn test_index_hash() {
    use std::collections::HashMap;

    let mut map = HashMap::new();
    map.insert(Index(1), "one");
    map.insert(Index(2), "two");

    assert_eq!(map.get(&Index(1)), Some(&"one"));
    assert_eq!(map.get(&Index(2)), Some(&"two"));
    assert_eq!(map.get(&Index(3)), None);
}

#[test]
fn test_index_slice_cast() {
    // `Index` is a transparent `u32` and can be viewed as such.
    let raw = [0u32, 4, 5, 1];
    let indices: &[Index] = bytemuck::cast_slice(&raw);
    assert_eq!(indices, &[Index(0), Index(4), Index(5), Index(1)]);
}
