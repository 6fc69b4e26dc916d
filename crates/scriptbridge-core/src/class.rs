//! Reflected native classes.
//!
//! A [`NativeClass`] has single inheritance, a list of implemented
//! interfaces, a property layout that extends its super class's layout, and
//! its own functions. Classes are immutable once built and shared as
//! `Arc<NativeClass>`.
//!
//! ```
//! use scriptbridge_core::{NativeClass, PropertyKind, TypeHash};
//!
//! let actor = NativeClass::builder("Actor")
//!     .property("Health", PropertyKind::Int32)
//!     .build();
//! let pawn = NativeClass::builder("Pawn")
//!     .extends(&actor)
//!     .property("Speed", PropertyKind::Float)
//!     .build();
//!
//! assert!(pawn.is_child_of(TypeHash::from_name("Actor")));
//! assert_eq!(pawn.find_property("Speed").map(|p| p.index), Some(1));
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use bitflags::bitflags;

use crate::{NativeFunction, PropertyDescriptor, PropertyFlags, PropertyKind, TypeHash};

/// Name of the built-in class every class object is an instance of.
pub const METACLASS_NAME: &str = "Class";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClassFlags: u32 {
        const INTERFACE = 1 << 0;
        const ABSTRACT = 1 << 1;
    }
}

pub struct NativeClass {
    name: String,
    hash: TypeHash,
    flags: ClassFlags,
    super_class: Option<Arc<NativeClass>>,
    interfaces: Vec<TypeHash>,
    properties: Vec<PropertyDescriptor>,
    functions: Vec<Arc<NativeFunction>>,
}

impl NativeClass {
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::new(name)
    }

    /// The class of class objects.
    pub fn metaclass() -> &'static Arc<NativeClass> {
        static METACLASS: OnceLock<Arc<NativeClass>> = OnceLock::new();
        METACLASS.get_or_init(|| ClassBuilder::new(METACLASS_NAME).build())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash(&self) -> TypeHash {
        self.hash
    }

    pub fn flags(&self) -> ClassFlags {
        self.flags
    }

    pub fn is_interface(&self) -> bool {
        self.flags.contains(ClassFlags::INTERFACE)
    }

    pub fn super_class(&self) -> Option<&Arc<NativeClass>> {
        self.super_class.as_ref()
    }

    /// Iterate this class and its ancestors, most derived first.
    pub fn hierarchy(&self) -> impl Iterator<Item = &NativeClass> {
        std::iter::successors(Some(self), |class| class.super_class.as_deref())
    }

    /// Whether this class is `class` or derives from it.
    pub fn is_child_of(&self, class: TypeHash) -> bool {
        self.hierarchy().any(|c| c.hash == class)
    }

    /// Whether this class or an ancestor declares `interface`.
    pub fn implements_interface(&self, interface: TypeHash) -> bool {
        self.hierarchy().any(|c| c.interfaces.contains(&interface))
    }

    /// Every property, inherited ones first, in slot order.
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub fn find_property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Functions declared on this class (not inherited ones).
    pub fn functions(&self) -> &[Arc<NativeFunction>] {
        &self.functions
    }

    /// Find a function by name, searching ancestors after this class.
    pub fn find_function(&self, name: &str) -> Option<Arc<NativeFunction>> {
        self.hierarchy()
            .flat_map(|c| c.functions.iter())
            .find(|f| f.name() == name)
            .cloned()
    }
}

impl fmt::Debug for NativeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeClass")
            .field("name", &self.name)
            .field("super", &self.super_class.as_ref().map(|s| s.name()))
            .field("properties", &self.properties.len())
            .field("functions", &self.functions.len())
            .finish()
    }
}

/// Builder for [`NativeClass`].
pub struct ClassBuilder {
    name: String,
    flags: ClassFlags,
    super_class: Option<Arc<NativeClass>>,
    interfaces: Vec<TypeHash>,
    properties: Vec<(String, PropertyKind, PropertyFlags)>,
    functions: Vec<NativeFunction>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: ClassFlags::empty(),
            super_class: None,
            interfaces: Vec::new(),
            properties: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn extends(mut self, super_class: &Arc<NativeClass>) -> Self {
        self.super_class = Some(Arc::clone(super_class));
        self
    }

    pub fn implements(mut self, interface: TypeHash) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn interface(mut self) -> Self {
        self.flags |= ClassFlags::INTERFACE | ClassFlags::ABSTRACT;
        self
    }

    pub fn property(self, name: impl Into<String>, kind: PropertyKind) -> Self {
        self.property_with_flags(name, kind, PropertyFlags::empty())
    }

    pub fn property_with_flags(
        mut self,
        name: impl Into<String>,
        kind: PropertyKind,
        flags: PropertyFlags,
    ) -> Self {
        self.properties.push((name.into(), kind, flags));
        self
    }

    /// Declare an event property scripts may bind to.
    pub fn event(self, name: impl Into<String>, kind: PropertyKind) -> Self {
        self.property_with_flags(name, kind, PropertyFlags::BLUEPRINT_ASSIGNABLE)
    }

    pub fn function(mut self, function: NativeFunction) -> Self {
        self.functions.push(function);
        self
    }

    /// Lay out properties after the inherited ones and link overrides to the
    /// functions they override.
    pub fn build(self) -> Arc<NativeClass> {
        let hash = TypeHash::from_name(&self.name);
        let mut properties = self
            .super_class
            .as_ref()
            .map(|s| s.properties.clone())
            .unwrap_or_default();
        let base = properties.len();
        for (offset, (name, kind, flags)) in self.properties.into_iter().enumerate() {
            properties.push(
                PropertyDescriptor::new(name, kind)
                    .at(base + offset)
                    .with_flags(flags),
            );
        }

        let super_class = self.super_class;
        let functions = self
            .functions
            .into_iter()
            .map(|function| {
                let overridden = super_class
                    .as_ref()
                    .and_then(|s| s.find_function(function.name()));
                Arc::new(function.attach(hash, overridden))
            })
            .collect();

        Arc::new(NativeClass {
            name: self.name,
            hash,
            flags: self.flags,
            super_class,
            interfaces: self.interfaces,
            properties,
            functions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FunctionSignature;

    fn noop(name: &str) -> NativeFunction {
        NativeFunction::new(name, FunctionSignature::new(name), |_| Ok(()))
    }

    #[test]
    fn layout_extends_super() {
        let base = NativeClass::builder("Base")
            .property("A", PropertyKind::Int32)
            .property("B", PropertyKind::String)
            .build();
        let derived = NativeClass::builder("Derived")
            .extends(&base)
            .property("C", PropertyKind::Bool)
            .build();

        let names: Vec<_> = derived
            .properties()
            .iter()
            .map(|p| (p.name.as_str(), p.index))
            .collect();
        assert_eq!(names, vec![("A", 0), ("B", 1), ("C", 2)]);
        assert!(base.find_property("C").is_none());
    }

    #[test]
    fn hierarchy_and_interfaces() {
        let damageable = TypeHash::from_name("Damageable");
        let base = NativeClass::builder("Base").implements(damageable).build();
        let derived = NativeClass::builder("Derived").extends(&base).build();
        let other = NativeClass::builder("Other").build();

        assert!(derived.is_child_of(base.hash()));
        assert!(derived.is_child_of(derived.hash()));
        assert!(!base.is_child_of(derived.hash()));
        assert!(derived.implements_interface(damageable));
        assert!(!other.implements_interface(damageable));
        assert_eq!(derived.hierarchy().count(), 2);
    }

    #[test]
    fn overrides_link_to_super_function() {
        let base = NativeClass::builder("Base")
            .function(noop("Tick"))
            .function(noop("Jump"))
            .build();
        let derived = NativeClass::builder("Derived").extends(&base).function(noop("Tick")).build();

        let tick = derived.find_function("Tick").unwrap();
        assert_eq!(tick.owner(), derived.hash());
        let overridden = tick.super_function().unwrap();
        assert_eq!(overridden.owner(), base.hash());
        assert!(overridden.super_function().is_none());

        let jump = derived.find_function("Jump").unwrap();
        assert_eq!(jump.owner(), base.hash());
    }

    #[test]
    fn metaclass_is_shared() {
        assert!(Arc::ptr_eq(NativeClass::metaclass(), NativeClass::metaclass()));
        assert_eq!(NativeClass::metaclass().name(), METACLASS_NAME);
    }

    #[test]
    fn interface_flag() {
        let iface = NativeClass::builder("Damageable").interface().build();
        assert!(iface.is_interface());
        assert!(iface.flags().contains(ClassFlags::ABSTRACT));
    }
}
