//! Parameter blocks shared by native functions and delegate types.

use crate::{PropertyDescriptor, PropertyFlags, PropertyKind};

/// Ordered parameter descriptors of a function or delegate type.
///
/// Each descriptor's `index` is its slot in the parameter block. The builder
/// assigns indices in declaration order; [`FunctionSignature::from_params`]
/// accepts explicit layouts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionSignature {
    name: String,
    params: Vec<PropertyDescriptor>,
    parms_size: usize,
}

impl FunctionSignature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            parms_size: 0,
        }
    }

    /// Build a signature from descriptors with explicit slot indices.
    pub fn from_params(
        name: impl Into<String>,
        params: Vec<PropertyDescriptor>,
        parms_size: usize,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            parms_size,
        }
    }

    /// Append an input parameter.
    pub fn param(self, name: impl Into<String>, kind: PropertyKind) -> Self {
        self.push(name, kind, PropertyFlags::PARM)
    }

    /// Append an out parameter.
    pub fn out_param(self, name: impl Into<String>, kind: PropertyKind) -> Self {
        self.push(name, kind, PropertyFlags::PARM | PropertyFlags::OUT_PARM)
    }

    /// Append a parameter with explicit flags. `PARM` is always added.
    pub fn param_with_flags(
        self,
        name: impl Into<String>,
        kind: PropertyKind,
        flags: PropertyFlags,
    ) -> Self {
        self.push(name, kind, flags | PropertyFlags::PARM)
    }

    /// Append the return slot.
    pub fn returns(self, kind: PropertyKind) -> Self {
        self.push(
            "ReturnValue",
            kind,
            PropertyFlags::PARM | PropertyFlags::OUT_PARM | PropertyFlags::RETURN_PARM,
        )
    }

    fn push(mut self, name: impl Into<String>, kind: PropertyKind, flags: PropertyFlags) -> Self {
        let index = self.parms_size;
        self.params
            .push(PropertyDescriptor::new(name, kind).at(index).with_flags(flags));
        self.parms_size += 1;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[PropertyDescriptor] {
        &self.params
    }

    /// Number of slots in the parameter block.
    pub fn parms_size(&self) -> usize {
        self.parms_size
    }

    pub fn find(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn return_param(&self) -> Option<&PropertyDescriptor> {
        self.params.iter().find(|p| p.is_return())
    }

    pub fn in_params(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.params.iter().filter(|p| p.is_in_param())
    }
}
