//! Native world shared by the integration tests.
//!
//! ```text
//! Damageable (interface)
//! Component        Active, OnActivated
//! Actor            Health, Team, Tags, Scores, Friend, Squad, Spawner, Blueprint, Rival
//!                  ActorBeginOverlap, OnHit, OnDeath
//!                  Describe, Greet, TakeDamage, Relabel
//! Pawn : Actor     Speed, Greet (overrides Actor.Greet), implements Damageable
//! Crate            plain class, unrelated to Actor
//! ```

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use scriptbridge::{
    BridgeConfig, ScriptCallable, ScriptError, ScriptFunction, ScriptRuntime, ScriptValue,
};
use scriptbridge_core::{
    EnumUnderlying, FunctionSignature, NativeClass, NativeFunction, NativeObject, NativeValue,
    ObjectHandle, ObjectHeap, PropertyBuffer, PropertyKind,
};
use scriptbridge_registry::{EnumInfo, NativeRegistry};

pub struct Classes {
    pub damageable: Arc<NativeClass>,
    pub component: Arc<NativeClass>,
    pub actor: Arc<NativeClass>,
    pub pawn: Arc<NativeClass>,
    pub crate_class: Arc<NativeClass>,
}

pub struct World {
    pub heap: Arc<ObjectHeap>,
    pub runtime: ScriptRuntime,
    pub classes: Classes,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    pub fn with_config(config: BridgeConfig) -> Self {
        let classes = classes();
        let mut registry = NativeRegistry::new();
        registry
            .register_enum(
                EnumInfo::new("ETeam", EnumUnderlying::UInt8)
                    .value("Red", 0)
                    .value("Blue", 1),
            )
            .unwrap();
        for class in [
            &classes.damageable,
            &classes.component,
            &classes.actor,
            &classes.pawn,
            &classes.crate_class,
        ] {
            registry.register_class(Arc::clone(class)).unwrap();
        }

        let heap = Arc::new(ObjectHeap::new());
        let runtime = ScriptRuntime::with_config(Arc::clone(&heap), registry, config);
        Self { heap, runtime, classes }
    }

    pub fn spawn_actor(&self, name: &str) -> ObjectHandle {
        self.heap.spawn(&self.classes.actor, name)
    }

    pub fn object(&self, handle: ObjectHandle) -> Arc<NativeObject> {
        self.heap.get(handle).unwrap()
    }

    pub fn spawn_pawn(&self, name: &str) -> ObjectHandle {
        self.heap.spawn(&self.classes.pawn, name)
    }

    /// An actor with a `Mesh` component.
    pub fn spawn_actor_with_mesh(&self, name: &str) -> (ObjectHandle, ObjectHandle) {
        let owner = self.spawn_actor(name);
        let mesh = self.heap.spawn_subobject(&self.classes.component, "Mesh", owner);
        (owner, mesh)
    }
}

pub fn overlap_signature() -> Arc<FunctionSignature> {
    Arc::new(
        FunctionSignature::new("ActorBeginOverlap")
            .param("Other", PropertyKind::object("Actor")),
    )
}

pub fn hit_signature() -> Arc<FunctionSignature> {
    Arc::new(
        FunctionSignature::new("OnHit")
            .param("Damage", PropertyKind::Float)
            .param("Instigator", PropertyKind::object("Actor"))
            .returns(PropertyKind::Bool),
    )
}

fn classes() -> Classes {
    let damageable = NativeClass::builder("Damageable").interface().build();

    let component = NativeClass::builder("Component")
        .property("Active", PropertyKind::Bool)
        .event(
            "OnActivated",
            PropertyKind::MulticastDelegate(Arc::new(FunctionSignature::new("OnActivated"))),
        )
        .build();

    let actor = NativeClass::builder("Actor")
        .property("Health", PropertyKind::Int32)
        .property("Team", PropertyKind::enumeration("ETeam", EnumUnderlying::UInt8))
        .property("Tags", PropertyKind::array(PropertyKind::String))
        .property("Scores", PropertyKind::map(PropertyKind::String, PropertyKind::Int32))
        .property("Friend", PropertyKind::object("Actor"))
        .property("Squad", PropertyKind::set(PropertyKind::Name))
        .property("Spawner", PropertyKind::class_of("Actor"))
        .property("Blueprint", PropertyKind::array(PropertyKind::Byte))
        .property("Rival", PropertyKind::interface("Damageable"))
        .event("ActorBeginOverlap", PropertyKind::MulticastDelegate(overlap_signature()))
        .event("OnHit", PropertyKind::MulticastDelegate(hit_signature()))
        .event(
            "OnDeath",
            PropertyKind::Delegate(Arc::new(FunctionSignature::new("OnDeath"))),
        )
        .function(NativeFunction::new(
            "Describe",
            FunctionSignature::new("Describe")
                .out_param("Name", PropertyKind::String)
                .out_param("Alive", PropertyKind::Bool)
                .returns(PropertyKind::Int32),
            |ctx| {
                let name = ctx.this().name().to_owned();
                let health = ctx.this().property("Health").and_then(|v| v.as_i32()).unwrap_or(0);
                ctx.set_param("Name", name)?;
                ctx.set_param("Alive", health > 0)?;
                ctx.set_return(health)
            },
        ))
        .function(NativeFunction::new(
            "Greet",
            FunctionSignature::new("Greet").returns(PropertyKind::String),
            |ctx| ctx.set_return(String::from("actor")),
        ))
        .function(
            NativeFunction::new(
                "TakeDamage",
                FunctionSignature::new("TakeDamage")
                    .param("Amount", PropertyKind::Int32)
                    .param("Team", PropertyKind::enumeration("ETeam", EnumUnderlying::UInt8))
                    .returns(PropertyKind::Int32),
                |ctx| {
                    let amount: i32 = ctx.param("Amount")?;
                    let team = ctx.param_value("Team")?.as_enum().unwrap_or(-1);
                    let health = ctx
                        .this()
                        .property("Health")
                        .and_then(|v| v.as_i32())
                        .unwrap_or(0);
                    let remaining = health - amount;
                    ctx.this().set_property("Health", NativeValue::Int32(remaining))?;
                    ctx.this().set_property("Team", NativeValue::Enum(team))?;
                    ctx.set_return(remaining)
                },
            )
            .with_default("Amount", "1")
            .with_default("Team", "Blue"),
        )
        .function(NativeFunction::new(
            "Relabel",
            FunctionSignature::new("Relabel")
                .param("Label", PropertyKind::String)
                .param("Tags", PropertyKind::array(PropertyKind::String))
                .param("Weight", PropertyKind::Int32),
            |ctx| {
                let tags = ctx.param_value("Tags")?.clone();
                let weight: i32 = ctx.param("Weight")?;
                ctx.this().set_property("Tags", tags)?;
                ctx.this().set_property("Health", NativeValue::Int32(weight))
            },
        ))
        .build();

    let pawn = NativeClass::builder("Pawn")
        .extends(&actor)
        .implements(damageable.hash())
        .property("Speed", PropertyKind::Float)
        .function(NativeFunction::new(
            "Greet",
            FunctionSignature::new("Greet").returns(PropertyKind::String),
            |ctx| ctx.set_return(String::from("pawn")),
        ))
        .build();

    let crate_class = NativeClass::builder("Crate").property("Weight", PropertyKind::Float).build();

    Classes {
        damageable,
        component,
        actor,
        pawn,
        crate_class,
    }
}

// ============================================================================
// Scripted handlers
// ============================================================================

/// Records every call's arguments.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Vec<ScriptValue>>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler that records its arguments and returns `result`.
    pub fn handler(&self, name: &str, result: ScriptValue) -> ScriptFunction {
        let calls = Arc::clone(&self.calls);
        ScriptFunction::new(name, move |args| {
            calls.lock().push(args.to_vec());
            Ok(result.clone())
        })
    }

    pub fn shared(&self, name: &str) -> Arc<dyn ScriptCallable> {
        self.handler(name, ScriptValue::None).shared()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<Vec<ScriptValue>> {
        self.calls.lock().clone()
    }
}

pub fn failing(name: &str) -> Arc<dyn ScriptCallable> {
    ScriptFunction::new(name, |_| {
        Err(ScriptError::value_error("handler rejected the event"))
    })
    .shared()
}

pub fn panicking(name: &str) -> Arc<dyn ScriptCallable> {
    ScriptFunction::new(name, |_| panic!("handler blew up")).shared()
}

/// Parameter block for an `OnHit` fire.
pub fn hit_params(damage: f32, instigator: Option<ObjectHandle>) -> PropertyBuffer {
    let signature = hit_signature();
    let mut params = PropertyBuffer::for_layout(signature.params());
    params.set(0, NativeValue::Float(damage));
    params.set(1, NativeValue::Object(instigator));
    params
}

pub fn overlap_params(other: Option<ObjectHandle>) -> PropertyBuffer {
    let signature = overlap_signature();
    let mut params = PropertyBuffer::for_layout(signature.params());
    params.set(0, NativeValue::Object(other));
    params
}
