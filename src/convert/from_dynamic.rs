//! Script value → native slot.

use std::sync::Arc;

use scriptbridge_core::{
    NativeStruct, NativeValue, PropertyBuffer, PropertyDescriptor, PropertyKind, SoftObjectPtr,
};

use super::PropertyConverter;
use crate::{ConversionError, ObjectProxy, ScriptValue};

fn mismatch(value: &ScriptValue, kind: &PropertyKind) -> ConversionError {
    ConversionError::Mismatch {
        value: value.type_name(),
        kind: kind.to_string(),
    }
}

/// Numeric conversion: integer targets wrap to their width, float sources
/// truncate toward zero first (saturating), float targets round to nearest.
fn numeric_from_dynamic(value: &ScriptValue, kind: &PropertyKind) -> Option<NativeValue> {
    let (int, float) = match value {
        ScriptValue::Int(v) => (*v, *v as f64),
        ScriptValue::Float(v) => (*v as i128, *v),
        _ => return None,
    };
    Some(match kind {
        PropertyKind::Int32 => NativeValue::Int32(int as i32),
        PropertyKind::UInt32 => NativeValue::UInt32(int as u32),
        PropertyKind::Int64 => NativeValue::Int64(int as i64),
        PropertyKind::UInt64 => NativeValue::UInt64(int as u64),
        PropertyKind::Byte => NativeValue::Byte(int as u8),
        PropertyKind::Enum { underlying, .. } => NativeValue::Enum(underlying.truncate(int as i64)),
        PropertyKind::Float => NativeValue::Float(float as f32),
        PropertyKind::Double => NativeValue::Double(float),
        _ => return None,
    })
}

/// The null value of a reference kind.
fn null_reference(kind: &PropertyKind) -> Option<NativeValue> {
    Some(match kind {
        PropertyKind::ObjectRef { .. } => NativeValue::Object(None),
        PropertyKind::ClassRef { .. } => NativeValue::Class(None),
        PropertyKind::SoftObjectRef { .. } => NativeValue::SoftObject(SoftObjectPtr::default()),
        PropertyKind::WeakObjectRef { .. } => NativeValue::WeakObject(None),
        PropertyKind::InterfaceRef { .. } => NativeValue::Interface(None),
        _ => return None,
    })
}

impl PropertyConverter<'_> {
    /// Write `value` into the slot `descriptor` addresses in `buffer`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn from_dynamic(
        &self,
        value: &ScriptValue,
        descriptor: &PropertyDescriptor,
        buffer: &mut PropertyBuffer,
    ) -> Result<(), ConversionError> {
        let slot = buffer
            .value_mut(descriptor.index, &descriptor.kind)
            .ok_or(ConversionError::MissingSlot {
                index: descriptor.index,
            })?;
        self.value_from_dynamic(value, &descriptor.kind, slot)
    }

    /// Convert `value` into `slot`, which holds (or will hold) a value of `kind`.
    ///
    /// Scalar and reference writes leave `slot` untouched on failure. Container
    /// writes may fail midway; the container is still rehashed and valid.
    pub fn value_from_dynamic(
        &self,
        value: &ScriptValue,
        kind: &PropertyKind,
        slot: &mut NativeValue,
    ) -> Result<(), ConversionError> {
        if let PropertyKind::Struct { struct_type } = kind
            && let Some(converter) = self.structs.get(*struct_type)
        {
            let mut data = match slot {
                NativeValue::Struct(data) if data.struct_type() == *struct_type => data.clone(),
                _ => NativeStruct::new(*struct_type),
            };
            converter.from_dynamic(value, &mut data)?;
            *slot = NativeValue::Struct(data);
            return Ok(());
        }

        match value {
            ScriptValue::Bool(v) if matches!(kind, PropertyKind::Bool) => {
                *slot = NativeValue::Bool(*v);
            }
            ScriptValue::Int(_) | ScriptValue::Float(_) => {
                *slot = numeric_from_dynamic(value, kind).ok_or_else(|| mismatch(value, kind))?;
            }
            ScriptValue::Str(v) => {
                *slot = match kind {
                    PropertyKind::String => NativeValue::String(v.clone()),
                    PropertyKind::Text => NativeValue::Text(v.clone()),
                    PropertyKind::Name => NativeValue::Name(v.clone()),
                    _ => return Err(mismatch(value, kind)),
                };
            }
            ScriptValue::Bytes(bytes) | ScriptValue::ByteArray(bytes) => {
                let PropertyKind::Array(element) = kind else {
                    return Err(mismatch(value, kind));
                };
                if **element != PropertyKind::Byte {
                    return Err(mismatch(value, kind));
                }
                if let NativeValue::Array(array) = slot.materialize(kind) {
                    array.copy_from_bytes(bytes);
                }
            }
            ScriptValue::List(items) | ScriptValue::Tuple(items) => {
                let PropertyKind::Array(element) = kind else {
                    return Err(mismatch(value, kind));
                };
                let NativeValue::Array(array) = slot.materialize(kind) else {
                    return Err(mismatch(value, kind));
                };
                array.resize(items.len());
                for (index, item) in items.iter().enumerate() {
                    array
                        .with_element_mut(index, |target| {
                            self.value_from_dynamic(item, element, target)
                        })
                        .ok_or(ConversionError::MissingSlot { index })??;
                }
            }
            ScriptValue::Dict(dict) => {
                let PropertyKind::Map(key_kind, value_kind) = kind else {
                    return Err(mismatch(value, kind));
                };
                let NativeValue::Map(map) = slot.materialize(kind) else {
                    return Err(mismatch(value, kind));
                };
                map.empty_values();
                let result = dict.iter().try_for_each(|(key, item)| {
                    let position = map.add_default_value_needs_rehash();
                    let (native_key, native_value) = map
                        .pair_mut(position)
                        .ok_or(ConversionError::MissingSlot { index: position })?;
                    self.value_from_dynamic(key, key_kind, native_key)?;
                    self.value_from_dynamic(item, value_kind, native_value)
                });
                map.rehash();
                result?;
            }
            ScriptValue::Set(set) => {
                let PropertyKind::Set(element) = kind else {
                    return Err(mismatch(value, kind));
                };
                let NativeValue::Set(native) = slot.materialize(kind) else {
                    return Err(mismatch(value, kind));
                };
                native.empty_elements();
                let result = set.iter().try_for_each(|item| {
                    let position = native.add_default_value_needs_rehash();
                    let target = native
                        .element_mut(position)
                        .ok_or(ConversionError::MissingSlot { index: position })?;
                    self.value_from_dynamic(item, element, target)
                });
                native.rehash();
                result?;
            }
            ScriptValue::Object(proxy) => {
                *slot = self.object_from_dynamic(proxy, kind)?;
            }
            ScriptValue::None => {
                *slot = null_reference(kind).ok_or_else(|| mismatch(value, kind))?;
            }
            ScriptValue::Bool(_) | ScriptValue::Callable(_) | ScriptValue::Property(_) => {
                return Err(mismatch(value, kind));
            }
        }
        Ok(())
    }

    /// Check a proxy against a reference kind and produce the reference.
    fn object_from_dynamic(
        &self,
        proxy: &Arc<ObjectProxy>,
        kind: &PropertyKind,
    ) -> Result<NativeValue, ConversionError> {
        let object = proxy.native().ok_or(ConversionError::InvalidProxy)?;
        let class = object.class();
        let handle = Some(object.handle());
        let not_assignable = || ConversionError::NotAssignable {
            class: class.name().to_owned(),
            kind: kind.to_string(),
        };

        match kind {
            PropertyKind::ObjectRef { class: expected } => {
                if expected.is_empty()
                    || class.is_child_of(*expected)
                    || class.implements_interface(*expected)
                {
                    Ok(NativeValue::Object(handle))
                } else {
                    Err(not_assignable())
                }
            }
            PropertyKind::WeakObjectRef { class: expected } => {
                if expected.is_empty() || class.is_child_of(*expected) {
                    Ok(NativeValue::WeakObject(handle))
                } else {
                    Err(not_assignable())
                }
            }
            PropertyKind::SoftObjectRef { class: expected } => {
                if !expected.is_empty() && !class.is_child_of(*expected) {
                    return Err(not_assignable());
                }
                let path = self
                    .heap()
                    .path_name(object.handle())
                    .ok_or(ConversionError::InvalidProxy)?;
                Ok(NativeValue::SoftObject(SoftObjectPtr { handle, path }))
            }
            PropertyKind::ClassRef { meta_class } => {
                let represented = object
                    .represented_class()
                    .ok_or_else(|| ConversionError::NotAClass {
                        object: object.name().to_owned(),
                    })?;
                if meta_class.is_empty() || represented.is_child_of(*meta_class) {
                    Ok(NativeValue::Class(handle))
                } else {
                    Err(ConversionError::NotAssignable {
                        class: represented.name().to_owned(),
                        kind: kind.to_string(),
                    })
                }
            }
            PropertyKind::InterfaceRef { interface } => {
                if class.implements_interface(*interface) {
                    Ok(NativeValue::Interface(handle))
                } else {
                    Err(not_assignable())
                }
            }
            _ => Err(ConversionError::Mismatch {
                value: "object",
                kind: kind.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use scriptbridge_core::{EnumUnderlying, NativeClass, ObjectHeap, TypeHash};

    use super::*;
    use crate::{ObjectProxyCache, ScriptDict, ScriptSet, StructConverter, StructConverters};

    struct Fixture {
        proxies: ObjectProxyCache,
        structs: StructConverters,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                proxies: ObjectProxyCache::new(Arc::new(ObjectHeap::new())),
                structs: StructConverters::new(),
            }
        }

        fn converter(&self) -> PropertyConverter<'_> {
            PropertyConverter::new(&self.proxies, &self.structs)
        }

        fn write(
            &self,
            value: ScriptValue,
            kind: PropertyKind,
        ) -> Result<NativeValue, ConversionError> {
            let mut slot = NativeValue::Zeroed;
            self.converter().value_from_dynamic(&value, &kind, &mut slot)?;
            Ok(slot)
        }
    }

    #[test]
    fn integers_wrap_to_width() {
        let fixture = Fixture::new();
        assert!(matches!(
            fixture.write(ScriptValue::Int(-1), PropertyKind::UInt32),
            Ok(NativeValue::UInt32(u32::MAX))
        ));
        assert!(matches!(
            fixture.write(ScriptValue::Int(300), PropertyKind::Byte),
            Ok(NativeValue::Byte(44))
        ));
        assert!(matches!(
            fixture.write(ScriptValue::Int(i128::from(u64::MAX)), PropertyKind::UInt64),
            Ok(NativeValue::UInt64(u64::MAX))
        ));
        assert!(matches!(
            fixture.write(
                ScriptValue::Int(258),
                PropertyKind::enumeration("Team", EnumUnderlying::UInt8),
            ),
            Ok(NativeValue::Enum(2))
        ));
    }

    #[test]
    fn floats_truncate_into_integers() {
        let fixture = Fixture::new();
        assert!(matches!(
            fixture.write(ScriptValue::Float(-2.9), PropertyKind::Int32),
            Ok(NativeValue::Int32(-2))
        ));
        assert!(matches!(
            fixture.write(ScriptValue::Int(3), PropertyKind::Double),
            Ok(NativeValue::Double(v)) if v == 3.0
        ));
        assert!(matches!(
            fixture.write(ScriptValue::Float(0.1), PropertyKind::Float),
            Ok(NativeValue::Float(v)) if v == 0.1f32
        ));
    }

    #[test]
    fn category_mismatches() {
        let fixture = Fixture::new();
        let cases = [
            (ScriptValue::Bool(true), PropertyKind::Int32),
            (ScriptValue::Int(1), PropertyKind::Bool),
            (ScriptValue::str("x"), PropertyKind::Int32),
            (ScriptValue::None, PropertyKind::Int32),
            (ScriptValue::Bytes(vec![1]), PropertyKind::array(PropertyKind::Int32)),
            (ScriptValue::List(vec![]), PropertyKind::String),
        ];
        for (value, kind) in cases {
            let err = fixture.write(value, kind.clone()).unwrap_err();
            assert!(matches!(err, ConversionError::Mismatch { .. }), "{kind}: {err}");
        }
    }

    #[test]
    fn strings_go_into_text_and_name() {
        let fixture = Fixture::new();
        assert!(matches!(
            fixture.write(ScriptValue::str("hi"), PropertyKind::Text),
            Ok(NativeValue::Text(s)) if s == "hi"
        ));
        assert!(matches!(
            fixture.write(ScriptValue::str("Root"), PropertyKind::Name),
            Ok(NativeValue::Name(s)) if s == "Root"
        ));
    }

    #[test]
    fn sequences_resize_the_array() {
        let fixture = Fixture::new();
        let kind = PropertyKind::array(PropertyKind::Int32);
        let mut slot = NativeValue::Array(scriptbridge_core::NativeArray::from_values(
            &PropertyKind::Int32,
            vec![NativeValue::Int32(9); 5],
        ));
        let value = ScriptValue::Tuple(vec![ScriptValue::Int(1), ScriptValue::Int(2)]);
        fixture.converter().value_from_dynamic(&value, &kind, &mut slot).unwrap();

        let NativeValue::Array(array) = slot else {
            panic!("expected an array");
        };
        let items: Vec<i32> = array.iter().filter_map(|v| v.as_i32()).collect();
        assert_eq!(items, vec![1, 2]);
    }

    #[test]
    fn dict_keys_are_deduplicated_by_rehash() {
        let fixture = Fixture::new();
        let kind = PropertyKind::map(PropertyKind::Name, PropertyKind::Int32);
        let dict: ScriptDict = [("a", 1), ("b", 2)].into_iter().collect();
        let NativeValue::Map(map) = fixture.write(ScriptValue::Dict(dict), kind).unwrap() else {
            panic!("expected a map");
        };
        assert!(!map.needs_rehash());
        assert_eq!(map.len(), 2);
        assert_eq!(map.find(&NativeValue::Name("b".into())).and_then(NativeValue::as_i32), Some(2));
    }

    #[test]
    fn failed_map_element_leaves_a_valid_map() {
        let fixture = Fixture::new();
        let kind = PropertyKind::map(PropertyKind::String, PropertyKind::Int32);
        let mut dict = ScriptDict::new();
        dict.insert(ScriptValue::str("ok"), ScriptValue::Int(1)).unwrap();
        dict.insert(ScriptValue::str("bad"), ScriptValue::str("nope")).unwrap();

        let mut slot = NativeValue::Zeroed;
        let err = fixture
            .converter()
            .value_from_dynamic(&ScriptValue::Dict(dict), &kind, &mut slot)
            .unwrap_err();
        assert!(matches!(err, ConversionError::Mismatch { .. }));
        let NativeValue::Map(map) = slot else {
            panic!("expected a map");
        };
        assert!(!map.needs_rehash());
        assert_eq!(
            map.find(&NativeValue::String("ok".into())).and_then(NativeValue::as_i32),
            Some(1)
        );
    }

    #[test]
    fn sets_convert_element_wise() {
        let fixture = Fixture::new();
        let set: ScriptSet = [1, 2, 3].into_iter().collect();
        let NativeValue::Set(native) = fixture
            .write(ScriptValue::Set(set), PropertyKind::set(PropertyKind::Int64))
            .unwrap()
        else {
            panic!("expected a set");
        };
        assert_eq!(native.len(), 3);
        assert!(native.contains(&NativeValue::Int64(2)));
    }

    #[test]
    fn object_assignability() {
        let fixture = Fixture::new();
        let actor = NativeClass::builder("Actor").build();
        let pawn = NativeClass::builder("Pawn").extends(&actor).build();
        let widget = NativeClass::builder("Widget").build();
        let heap = fixture.proxies.heap();
        let pawn_proxy = fixture.proxies.get_or_create(heap.spawn(&pawn, "pawn")).unwrap();
        let widget_proxy = fixture.proxies.get_or_create(heap.spawn(&widget, "widget")).unwrap();

        assert!(matches!(
            fixture.write(ScriptValue::Object(pawn_proxy.clone()), PropertyKind::object("Actor")),
            Ok(NativeValue::Object(Some(h))) if h == pawn_proxy.handle()
        ));

        let mut slot = NativeValue::Object(Some(pawn_proxy.handle()));
        let err = fixture
            .converter()
            .value_from_dynamic(
                &ScriptValue::Object(widget_proxy),
                &PropertyKind::object("Actor"),
                &mut slot,
            )
            .unwrap_err();
        assert!(matches!(err, ConversionError::NotAssignable { .. }));
        assert!(matches!(slot, NativeValue::Object(Some(h)) if h == pawn_proxy.handle()));
    }

    #[test]
    fn class_references_need_a_class_object() {
        let fixture = Fixture::new();
        let actor = NativeClass::builder("Actor").build();
        let pawn = NativeClass::builder("Pawn").extends(&actor).build();
        let heap = fixture.proxies.heap();
        let pawn_class = fixture.proxies.get_or_create(heap.class_object(&pawn)).unwrap();
        let instance = fixture.proxies.get_or_create(heap.spawn(&pawn, "pawn")).unwrap();

        assert!(matches!(
            fixture.write(ScriptValue::Object(pawn_class.clone()), PropertyKind::class_of("Actor")),
            Ok(NativeValue::Class(Some(_)))
        ));
        assert!(matches!(
            fixture.write(ScriptValue::Object(instance), PropertyKind::class_of("Actor")),
            Err(ConversionError::NotAClass { .. })
        ));
        assert!(matches!(
            fixture.write(ScriptValue::Object(pawn_class), PropertyKind::class_of("Widget")),
            Err(ConversionError::NotAssignable { .. })
        ));
    }

    #[test]
    fn interfaces_and_soft_references() {
        let fixture = Fixture::new();
        let damageable = TypeHash::from_name("Damageable");
        let actor = NativeClass::builder("Actor").implements(damageable).build();
        let heap = fixture.proxies.heap();
        let owner = heap.spawn(&actor, "Level");
        let child = heap.spawn_subobject(&actor, "Crate", owner);
        let proxy = fixture.proxies.get_or_create(child).unwrap();

        assert!(matches!(
            fixture.write(
                ScriptValue::Object(proxy.clone()),
                PropertyKind::interface("Damageable"),
            ),
            Ok(NativeValue::Interface(Some(_)))
        ));
        assert!(matches!(
            fixture.write(ScriptValue::Object(proxy.clone()), PropertyKind::interface("Usable")),
            Err(ConversionError::NotAssignable { .. })
        ));
        assert!(matches!(
            fixture.write(
                ScriptValue::Object(proxy),
                PropertyKind::SoftObjectRef {
                    class: actor.hash(),
                },
            ),
            Ok(NativeValue::SoftObject(ptr)) if ptr.path == "Level.Crate"
        ));
    }

    #[test]
    fn dead_proxies_are_rejected() {
        let fixture = Fixture::new();
        let actor = NativeClass::builder("Actor").build();
        let handle = fixture.proxies.heap().spawn(&actor, "hero");
        let proxy = fixture.proxies.get_or_create(handle).unwrap();
        fixture.proxies.heap().destroy(handle);

        assert!(matches!(
            fixture.write(ScriptValue::Object(proxy), PropertyKind::object("Actor")),
            Err(ConversionError::InvalidProxy)
        ));
    }

    #[test]
    fn none_clears_references() {
        let fixture = Fixture::new();
        let descriptor = PropertyDescriptor::new("Target", PropertyKind::object("Actor"));
        let mut buffer = PropertyBuffer::zeroed(1);
        buffer.set(0, NativeValue::Object(Some(scriptbridge_core::ObjectHandle::new(3, 1))));
        fixture
            .converter()
            .from_dynamic(&ScriptValue::None, &descriptor, &mut buffer)
            .unwrap();
        assert!(matches!(buffer.get(0), Some(NativeValue::Object(None))));
    }

    struct Pair;

    impl StructConverter for Pair {
        fn to_dynamic(&self, value: &NativeStruct) -> Result<ScriptValue, ConversionError> {
            Ok(ScriptValue::Bytes(value.data().to_vec()))
        }

        fn from_dynamic(
            &self,
            value: &ScriptValue,
            target: &mut NativeStruct,
        ) -> Result<(), ConversionError> {
            let (Some(a), Some(b)) = (
                value.as_sequence().and_then(|s| s.first()).and_then(ScriptValue::as_int),
                value.as_sequence().and_then(|s| s.get(1)).and_then(ScriptValue::as_int),
            ) else {
                return Err(ConversionError::Struct {
                    message: "expected two integers".into(),
                });
            };
            *target.data_mut() = vec![a as u8, b as u8];
            Ok(())
        }
    }

    #[test]
    fn registered_struct_converters_take_any_value() {
        let fixture = Fixture::new();
        let pair = TypeHash::from_name("Pair");
        fixture.structs.register(pair, Arc::new(Pair));
        let kind = PropertyKind::Struct { struct_type: pair };

        let slot = fixture
            .write(ScriptValue::Tuple(vec![ScriptValue::Int(4), ScriptValue::Int(5)]), kind.clone())
            .unwrap();
        assert!(matches!(&slot, NativeValue::Struct(s) if s.data() == [4, 5]));
        assert_eq!(
            fixture.converter().value_to_dynamic(&kind, &slot).unwrap(),
            ScriptValue::Bytes(vec![4, 5])
        );
        assert!(matches!(
            fixture.write(ScriptValue::str("x"), kind),
            Err(ConversionError::Struct { .. })
        ));
    }
}
