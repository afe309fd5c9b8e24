// ResourceManager behavior as seen by consumers holding Resource handles.
//
// Invariants exercised:
// - Identity: handles for one key observe the same payload allocation.
// - Counting: reference_count(k) equals the number of live handles for k.
// - Visibility: a set() is observed by every handle's next acquisition,
//   including handles obtained before the entry had data.
// - Finality: Final entries reject every further mutation and keep data.
// - Fallback: entries without data report *Fallback states and expose the
//   fallback payload, both through handles and through state().
// - Sweep: free() is the only way entries disappear.
use resource_cache::ResourceDataState::{Final, Mutable, NotFound};
use resource_cache::{
    ResourceError, ResourceKey, ResourceManager, ResourcePolicy, ResourceState,
};
use std::rc::Rc;

#[derive(Debug, PartialEq)]
struct Shader {
    source: &'static str,
}

fn shader(source: &'static str) -> Option<Shader> {
    Some(Shader { source })
}

// Test: two handles for one key share the payload and the count tracks them.
#[test]
fn handles_share_payload_and_count() {
    let mut m = ResourceManager::new();
    m.set("mesh.cube", Some(vec![1.0f32, 2.0, 3.0]), Mutable)
        .unwrap();

    let mut a = m.get("mesh.cube");
    let mut b = m.get("mesh.cube");
    assert_eq!(m.reference_count("mesh.cube"), 2);
    assert!(std::ptr::eq(a.data(), b.data()));

    let c = a.clone();
    assert_eq!(m.reference_count("mesh.cube"), 3);
    drop(c);
    drop(b);
    assert_eq!(m.reference_count("mesh.cube"), 1);
    assert_eq!(a.data().len(), 3);
}

// Test: Mutable then Final; later mutation is rejected and nothing changes.
#[test]
fn final_seals_entry() {
    let mut m = ResourceManager::new();
    let mut r = m.get("shader.basic");
    m.set("shader.basic", shader("v1"), Mutable).unwrap();
    m.set("shader.basic", shader("v2"), Final).unwrap();
    assert_eq!(r.state(), ResourceState::Final);
    assert_eq!(r.data().source, "v2");

    let change = m.last_change();
    let err = m.set("shader.basic", shader("v3"), Mutable).unwrap_err();
    assert!(matches!(err, ResourceError::InvalidState { .. }));
    assert_eq!(
        err.to_string(),
        format!(
            "cannot change already final resource {} (state Final)",
            ResourceKey::new("shader.basic")
        )
    );
    assert_eq!(m.last_change(), change);
    assert_eq!(m.state("shader.basic"), ResourceState::Final);

    let mut fresh = m.get("shader.basic");
    assert_eq!(fresh.data().source, "v2");
}

// Test: a handle obtained before any set observes the data afterwards.
#[test]
fn stale_handle_resynchronizes() {
    let mut m = ResourceManager::new();
    let mut early = m.get("font.mono");
    assert!(!early.is_available());

    m.set("font.mono", Some(String::from("glyphs")), Mutable)
        .unwrap();
    assert!(early.is_available());
    assert_eq!(early.data(), "glyphs");

    m.set("font.mono", Some(String::from("glyphs v2")), Mutable)
        .unwrap();
    assert_eq!(early.data(), "glyphs v2");
}

// Test: NotFound with a registered fallback.
#[test]
fn not_found_uses_fallback() {
    let mut m = ResourceManager::new();
    m.set_fallback(Shader { source: "magenta" });
    m.set("shader.missing", None, NotFound).unwrap();

    assert_eq!(m.state("shader.missing"), ResourceState::NotFoundFallback);
    let mut r = m.get("shader.missing");
    assert_eq!(r.state(), ResourceState::NotFoundFallback);
    assert!(r.is_available());
    assert_eq!(r.data().source, "magenta");
    let fallback = m.fallback().unwrap();
    assert!(Rc::ptr_eq(&r.data_rc().unwrap(), &fallback));
}

// Test: dropping every handle leaves the entry until free(); Final survives free().
#[test]
fn drop_then_free() {
    let mut m = ResourceManager::new();
    let a = m.get("tex.a");
    let b = a.clone();
    m.set("tex.a", Some(1u32), Mutable).unwrap();
    let f = m.get("tex.final");
    m.set("tex.final", Some(2u32), Final).unwrap();

    drop(a);
    drop(b);
    drop(f);
    assert_eq!(m.reference_count("tex.a"), 0);
    assert!(m.contains("tex.a"));
    assert!(m.contains("tex.final"));

    assert_eq!(m.free(), 1);
    assert!(!m.contains("tex.a"));
    assert!(m.contains("tex.final"));
    assert_eq!(m.state("tex.a"), ResourceState::NotLoaded);
}

// Test: the concrete scenario from start to fallback.
#[test]
fn shader_basic_scenario() {
    let mut m = ResourceManager::new();
    let mut r = m.get("shader.basic");
    assert_eq!(r.state(), ResourceState::NotLoaded);
    assert!(!r.is_available());

    m.set("shader.basic", shader("ptr"), Mutable).unwrap();
    assert_eq!(r.state(), ResourceState::Mutable);
    assert!(r.is_available());
    let installed = r.data_rc().unwrap();
    assert_eq!(installed.source, "ptr");

    m.set_fallback(Shader { source: "ptrF" });
    m.set("shader.basic", None, NotFound).unwrap();
    assert_eq!(r.state(), ResourceState::NotFoundFallback);
    assert_eq!(r.data().source, "ptrF");
}

// Test: Loading with and without a fallback; cancelling a load.
#[test]
fn loading_states_and_cancel() {
    let mut m: ResourceManager<u8> = ResourceManager::new();
    let mut r = m.get("mesh.big");
    m.mark_loading("mesh.big").unwrap();
    assert_eq!(r.state(), ResourceState::Loading);
    assert!(!r.is_available());

    m.set_fallback(0);
    assert_eq!(r.state(), ResourceState::LoadingFallback);
    assert_eq!(*r.data(), 0);

    m.mark_not_found("mesh.big").unwrap();
    assert_eq!(r.state(), ResourceState::NotFoundFallback);

    m.clear_fallback();
    assert_eq!(r.state(), ResourceState::NotFound);
    assert_eq!(
        r.try_data(),
        Err(ResourceError::Unavailable {
            key: ResourceKey::new("mesh.big")
        })
    );
}

// Test: a snapshot taken before replacement stays valid after it.
#[test]
fn old_snapshot_outlives_replacement() {
    let mut m = ResourceManager::new();
    m.set("a", Some(String::from("old")), Mutable).unwrap();
    let mut r = m.get("a");
    let old = r.data_rc().unwrap();
    m.set("a", Some(String::from("new")), Mutable).unwrap();
    assert_eq!(*old, "old");
    assert_eq!(r.data(), "new");
}

// Test: resident entries survive free() with no handles.
#[test]
fn resident_entries_survive_free() {
    let mut m = ResourceManager::new();
    m.set_with_policy("ui.atlas", Some(1), Mutable, ResourcePolicy::Resident)
        .unwrap();
    assert_eq!(m.free(), 0);
    assert_eq!(m.state("ui.atlas"), ResourceState::Mutable);
}

// Test: handles keep working after the manager itself is dropped.
#[test]
fn handles_outlive_manager() {
    let mut m = ResourceManager::new();
    m.set("a", Some(5), Final).unwrap();
    let mut r = m.get("a");
    drop(m);
    assert_eq!(r.state(), ResourceState::Final);
    assert_eq!(*r.data(), 5);
}
