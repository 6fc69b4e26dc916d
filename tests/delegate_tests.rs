//! Binding scripted callables to native events and firing them.

mod common;

use common::{Recorder, World, failing, hit_params, overlap_params, panicking};
use scriptbridge::{
    BindingError, BridgeConfig, DelegateReturnPolicy, ScriptClass, ScriptFunction, ScriptValue,
};
use scriptbridge_core::{BroadcastResult, NativeValue, ObjectHandle, PropertyBuffer};

fn multicast_len(world: &World, handle: ObjectHandle, event: &str) -> usize {
    match world.object(handle).property(event) {
        Some(NativeValue::MulticastDelegate(delegate)) => delegate.len(),
        _ => 0,
    }
}

// =============================================================================
// Explicit binding
// =============================================================================

#[test]
fn bound_handlers_receive_converted_arguments() {
    let world = World::new();
    let hero_handle = world.spawn_actor("hero");
    let ally_handle = world.spawn_actor("ally");
    let hero = world.runtime.wrap(hero_handle).unwrap();
    let ally = world.runtime.wrap(ally_handle).unwrap();
    let recorder = Recorder::new();

    let bound = world
        .runtime
        .binder()
        .bind(&hero, "OnHit", &recorder.shared("on_hit"), true)
        .unwrap();
    assert!(bound);

    let result = world
        .object(hero_handle)
        .fire_event("OnHit", &mut hit_params(12.5, Some(ally_handle)))
        .unwrap();
    assert_eq!(result, BroadcastResult { delivered: 1, failed: 0 });
    assert_eq!(
        recorder.calls(),
        vec![vec![ScriptValue::Float(12.5), ScriptValue::Object(ally)]]
    );
}

#[test]
fn missing_events_fail_only_when_asked() {
    let world = World::new();
    let hero = world.runtime.wrap(world.spawn_actor("hero")).unwrap();
    let handler = Recorder::new().shared("handler");
    let binder = world.runtime.binder();

    let err = binder.bind(&hero, "NoSuchEvent", &handler, true).unwrap_err();
    assert!(matches!(err, BindingError::EventNotFound { ref event, .. } if event == "NoSuchEvent"));
    assert!(!binder.bind(&hero, "NoSuchEvent", &handler, false).unwrap());

    let err = binder.bind(&hero, "Health", &handler, true).unwrap_err();
    assert!(matches!(err, BindingError::NotAnEvent { .. }));
    assert!(!binder.bind(&hero, "Health", &handler, false).unwrap());

    assert!(world.runtime.delegates().is_empty());
}

#[test]
fn binding_through_a_delegate_property() {
    let world = World::new();
    let handle = world.spawn_actor("hero");
    let hero = world.runtime.wrap(handle).unwrap();
    let recorder = Recorder::new();

    let ScriptValue::Property(on_hit) = world.runtime.get_attribute(&hero, "OnHit").unwrap() else {
        panic!("expected a delegate property");
    };
    assert!(on_hit.is_multicast());
    assert_eq!(on_hit.property(), "OnHit");

    assert!(
        world
            .runtime
            .binder()
            .bind_property(&on_hit, &recorder.shared("on_hit"))
            .unwrap()
    );
    world
        .object(handle)
        .fire_event("OnHit", &mut hit_params(1.0, None))
        .unwrap();
    assert_eq!(recorder.calls(), vec![vec![ScriptValue::Float(1.0), ScriptValue::None]]);
}

#[test]
fn destroyed_targets_cannot_be_bound() {
    let world = World::new();
    let handle = world.spawn_actor("hero");
    let hero = world.runtime.wrap(handle).unwrap();
    world.heap.destroy(handle);

    let err = world
        .runtime
        .binder()
        .bind(&hero, "OnHit", &Recorder::new().shared("h"), true)
        .unwrap_err();
    assert!(matches!(err, BindingError::InvalidTarget));
}

// =============================================================================
// Multicast and single-cast
// =============================================================================

#[test]
fn multicast_binding_is_idempotent_per_handler() {
    let world = World::new();
    let handle = world.spawn_actor("hero");
    let hero = world.runtime.wrap(handle).unwrap();
    let first = Recorder::new();
    let second = Recorder::new();
    let first_handler = first.shared("first");
    let binder = world.runtime.binder();

    binder.bind(&hero, "OnHit", &first_handler, true).unwrap();
    binder.bind(&hero, "OnHit", &first_handler, true).unwrap();
    assert_eq!(multicast_len(&world, handle, "OnHit"), 1);
    assert_eq!(world.runtime.delegates().handles_for(handle), 1);

    binder.bind(&hero, "OnHit", &second.shared("second"), true).unwrap();
    assert_eq!(multicast_len(&world, handle, "OnHit"), 2);

    let result = world
        .object(handle)
        .fire_event("OnHit", &mut hit_params(3.0, None))
        .unwrap();
    assert_eq!(result.delivered, 2);
    assert_eq!(first.count(), 1);
    assert_eq!(second.count(), 1);
}

#[test]
fn single_cast_binding_replaces_the_previous_handler() {
    let world = World::new();
    let handle = world.spawn_actor("hero");
    let hero = world.runtime.wrap(handle).unwrap();
    let old = Recorder::new();
    let new = Recorder::new();
    let binder = world.runtime.binder();

    binder.bind(&hero, "OnDeath", &old.shared("old"), true).unwrap();
    binder.bind(&hero, "OnDeath", &new.shared("new"), true).unwrap();

    let result = world
        .object(handle)
        .fire_event("OnDeath", &mut PropertyBuffer::zeroed(0))
        .unwrap();
    assert_eq!(result, BroadcastResult { delivered: 1, failed: 0 });
    assert_eq!(old.count(), 0);
    assert_eq!(new.count(), 1);
}

// =============================================================================
// Error containment
// =============================================================================

#[test]
fn failing_handlers_are_contained() {
    let world = World::new();
    let handle = world.spawn_actor("hero");
    let hero = world.runtime.wrap(handle).unwrap();
    let survivor = Recorder::new();
    let binder = world.runtime.binder();

    binder.bind(&hero, "OnHit", &failing("a_raises"), true).unwrap();
    binder.bind(&hero, "OnHit", &panicking("b_panics"), true).unwrap();
    binder.bind(&hero, "OnHit", &survivor.shared("c_survives"), true).unwrap();

    let result = world
        .object(handle)
        .fire_event("OnHit", &mut hit_params(5.0, None))
        .unwrap();
    assert_eq!(result, BroadcastResult { delivered: 1, failed: 2 });
    assert_eq!(survivor.count(), 1);
    // The lock is not left behind by the failed handlers.
    assert!(!world.runtime.lock().is_locked());
}

#[test]
fn fires_fail_once_the_runtime_is_gone() {
    let World { heap, runtime, classes } = World::new();
    let handle = heap.spawn(&classes.actor, "hero");
    let hero = runtime.wrap(handle).unwrap();
    let recorder = Recorder::new();
    runtime.binder().bind(&hero, "OnHit", &recorder.shared("h"), true).unwrap();

    drop(hero);
    drop(runtime);

    let result = heap
        .get(handle)
        .unwrap()
        .fire_event("OnHit", &mut hit_params(1.0, None))
        .unwrap();
    assert_eq!(result, BroadcastResult { delivered: 0, failed: 1 });
    assert_eq!(recorder.count(), 0);
}

// =============================================================================
// Return values
// =============================================================================

#[test]
fn handler_results_are_discarded_by_default() {
    let world = World::new();
    let handle = world.spawn_actor("hero");
    let hero = world.runtime.wrap(handle).unwrap();
    let handler = Recorder::new().handler("h", ScriptValue::Bool(true)).shared();
    world.runtime.binder().bind(&hero, "OnHit", &handler, true).unwrap();

    let mut params = hit_params(1.0, None);
    world.object(handle).fire_event("OnHit", &mut params).unwrap();
    assert_eq!(params.get(2).and_then(NativeValue::as_bool), Some(false));
}

#[test]
fn handler_results_can_be_written_back() {
    let world = World::with_config(
        BridgeConfig::default().with_delegate_returns(DelegateReturnPolicy::WriteBack),
    );
    let handle = world.spawn_actor("hero");
    let hero = world.runtime.wrap(handle).unwrap();
    let handler = Recorder::new().handler("h", ScriptValue::Bool(true)).shared();
    world.runtime.binder().bind(&hero, "OnHit", &handler, true).unwrap();

    let mut params = hit_params(1.0, None);
    let result = world.object(handle).fire_event("OnHit", &mut params).unwrap();
    assert!(result.is_ok());
    assert_eq!(params.get(2).and_then(NativeValue::as_bool), Some(true));

    // A result that does not convert counts as a failed delivery.
    let bad = Recorder::new().handler("bad", ScriptValue::str("yes")).shared();
    world.runtime.binder().bind(&hero, "OnHit", &bad, true).unwrap();
    let result = world
        .object(handle)
        .fire_event("OnHit", &mut hit_params(1.0, None))
        .unwrap();
    assert_eq!(result, BroadcastResult { delivered: 1, failed: 1 });
}

// =============================================================================
// Annotations and autobind
// =============================================================================

#[test]
fn annotated_callables_bind_to_events_and_components() {
    let world = World::new();
    let (owner, mesh) = world.spawn_actor_with_mesh("hero");
    let hero = world.runtime.wrap(owner).unwrap();
    let hits = Recorder::new();
    let activations = Recorder::new();

    let class = ScriptClass::new("HeroScript")
        .with_method(
            hits.handler("handle_hit", ScriptValue::None)
                .with_attribute("native_event", "OnHit")
                .shared(),
        )
        .with_method(
            activations
                .handler("handle_activation", ScriptValue::None)
                .with_attribute("native_event", "Mesh.OnActivated")
                .shared(),
        )
        .with_method(ScriptFunction::new("helper", |_| Ok(ScriptValue::None)).shared());

    assert_eq!(world.runtime.binder().bind_by_annotation(&hero, &class).unwrap(), 2);

    world
        .object(owner)
        .fire_event("OnHit", &mut hit_params(2.0, None))
        .unwrap();
    world
        .object(mesh)
        .fire_event("OnActivated", &mut PropertyBuffer::zeroed(0))
        .unwrap();
    assert_eq!(hits.count(), 1);
    assert_eq!(activations.count(), 1);
    assert_eq!(world.runtime.delegates().handles_for(mesh), 1);
}

#[test]
fn annotation_errors_are_collected() {
    let world = World::new();
    let (owner, _mesh) = world.spawn_actor_with_mesh("hero");
    let hero = world.runtime.wrap(owner).unwrap();
    let good = Recorder::new();

    let annotated = |name: &str, annotation: ScriptValue| {
        ScriptFunction::new(name, |_| Ok(ScriptValue::None))
            .with_attribute("native_event", annotation)
            .shared()
    };

    // One bad annotation is reported as itself.
    let class = ScriptClass::new("OneBad")
        .with_method(annotated("a", ScriptValue::str("Turret.OnActivated")));
    let err = world.runtime.binder().bind_by_annotation(&hero, &class).unwrap_err();
    assert!(matches!(
        err,
        BindingError::ComponentNotFound { ref component, .. } if component == "Turret"
    ));

    // Several are collected; the good one is still bound.
    let class = ScriptClass::new("ManyBad")
        .with_method(annotated("a", ScriptValue::str("A.B.C")))
        .with_method(annotated("b", ScriptValue::from(7)))
        .with_method(annotated("c", ScriptValue::str("NoSuchEvent")))
        .with_method(
            good.handler("d", ScriptValue::None)
                .with_attribute("native_event", "OnHit")
                .shared(),
        );
    let err = world.runtime.binder().bind_by_annotation(&hero, &class).unwrap_err();
    let BindingError::Multiple(errors) = err else {
        panic!("expected several errors, got {err:?}");
    };
    assert_eq!(errors.len(), 3);
    assert!(matches!(errors[0], BindingError::InvalidAnnotation { .. }));
    assert!(matches!(errors[1], BindingError::AnnotationNotString { .. }));
    assert!(matches!(errors[2], BindingError::EventNotFound { .. }));

    world
        .object(owner)
        .fire_event("OnHit", &mut hit_params(2.0, None))
        .unwrap();
    assert_eq!(good.count(), 1);
}

#[test]
fn autobind_follows_the_naming_convention() {
    let world = World::new();
    let hero_handle = world.spawn_actor("hero");
    let other_handle = world.spawn_actor("other");
    let hero = world.runtime.wrap(hero_handle).unwrap();
    let other = world.runtime.wrap(other_handle).unwrap();
    let overlaps = Recorder::new();
    let ignored = Recorder::new();

    let class = ScriptClass::new("HeroScript")
        .with_method(overlaps.shared("on_actor_begin_overlap"))
        .with_method(ignored.shared("on_teleport"))
        .with_method(ignored.shared("begin_overlap"));

    assert_eq!(world.runtime.binder().autobind(&hero, &class).unwrap(), 1);

    world
        .object(hero_handle)
        .fire_event("ActorBeginOverlap", &mut overlap_params(Some(other_handle)))
        .unwrap();
    assert_eq!(overlaps.calls(), vec![vec![ScriptValue::Object(other)]]);
    assert_eq!(ignored.count(), 0);
}

// =============================================================================
// Lifetime
// =============================================================================

#[test]
fn destroying_the_target_drops_its_handles() {
    let world = World::new();
    let hero_handle = world.spawn_actor("hero");
    let ally_handle = world.spawn_actor("ally");
    let hero = world.runtime.wrap(hero_handle).unwrap();
    let ally = world.runtime.wrap(ally_handle).unwrap();
    let handler = Recorder::new().shared("h");
    let binder = world.runtime.binder();

    binder.bind(&hero, "OnHit", &handler, true).unwrap();
    binder.bind(&hero, "OnDeath", &handler, true).unwrap();
    binder.bind(&ally, "OnHit", &handler, true).unwrap();
    assert_eq!(world.runtime.delegates().handles_for(hero_handle), 1);
    assert_eq!(world.runtime.delegates().len(), 2);

    world.heap.destroy(hero_handle);
    assert_eq!(world.runtime.delegates().handles_for(hero_handle), 0);
    assert_eq!(world.runtime.delegates().len(), 1);
}
