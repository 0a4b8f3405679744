// Classes built into the engine: Object, RefCounted, Resource and the
// Engine singleton class.

use crate::class_db::{ClassInfo, NativeMethod, PropertyDesc};
use crate::dictionary::Dictionary;
use crate::error::CallError;
use crate::object::{self, Object, ObjectRef};
use crate::packed::PackedStringArray;
use crate::string::{GString, StringName};
use crate::variant::{Variant, VariantType};

const RESOURCE_PATH_META: &str = "__resource_path";

fn object_class() -> ClassInfo {
    use VariantType as T;
    let mut c = ClassInfo::core("Object", None, true);
    c.method(NativeMethod::new("get_class", &[], Some(T::String), true, |o, _| {
        Ok(Variant::from(o.class_name().as_str()))
    }));
    c.method(NativeMethod::new("is_class", &[T::String], Some(T::Bool), true, |o, a| {
        Ok(Variant::Bool(o.is_class(&a[0].to_string_name())))
    }));
    c.method(NativeMethod::new("get_instance_id", &[], Some(T::Int), true, |o, _| {
        Ok(Variant::Int(o.id().0 as i64))
    }));
    c.method(NativeMethod::new(
        "has_method",
        &[T::StringName],
        Some(T::Bool),
        true,
        |o, a| Ok(Variant::Bool(o.has_method(&a[0].to_string_name()))),
    ));
    c.method(NativeMethod::new("set", &[T::StringName, T::Nil], None, false, |o, a| {
        o.set(&a[0].to_string_name(), &a[1]);
        Ok(Variant::Nil)
    }));
    c.method(NativeMethod::new("get", &[T::StringName], Some(T::Nil), true, |o, a| {
        Ok(o.get(&a[0].to_string_name()).unwrap_or_default())
    }));
    c.method(NativeMethod::new(
        "set_meta",
        &[T::StringName, T::Nil],
        None,
        false,
        |o, a| {
            o.set_meta(&a[0].to_string_name(), a[1].clone());
            Ok(Variant::Nil)
        },
    ));
    c.method(NativeMethod::new(
        "get_meta",
        &[T::StringName, T::Nil],
        Some(T::Nil),
        true,
        |o, a| Ok(o.get_meta(&a[0].to_string_name()).unwrap_or_else(|| a[1].clone())),
    ).with_defaults(vec![Variant::Nil]));
    c.method(NativeMethod::new("has_meta", &[T::StringName], Some(T::Bool), true, |o, a| {
        Ok(Variant::Bool(o.has_meta(&a[0].to_string_name())))
    }));
    c.method(NativeMethod::new("to_string", &[], Some(T::String), false, |o, _| {
        Ok(Variant::from(o.to_display_string()))
    }));
    c.constants.insert(StringName::new("NOTIFICATION_POSTINITIALIZE"), 0);
    c.constants.insert(StringName::new("NOTIFICATION_PREDELETE"), 1);
    c
}

fn ref_counted_class() -> ClassInfo {
    let mut c = ClassInfo::core("RefCounted", Some("Object"), true);
    c.ref_counted = true;
    c.method(NativeMethod::new(
        "get_reference_count",
        &[],
        Some(VariantType::Int),
        true,
        |o, _| Ok(Variant::Int(i64::from(o.reference_count()))),
    ));
    c
}

fn resource_path(o: &Object) -> Variant {
    o.get_meta(&StringName::new(RESOURCE_PATH_META))
        .unwrap_or_else(|| Variant::String(GString::new()))
}

fn resource_class() -> ClassInfo {
    let mut c = ClassInfo::core("Resource", Some("RefCounted"), true);
    c.ref_counted = true;
    c.method(NativeMethod::new(
        "set_path",
        &[VariantType::String],
        None,
        false,
        |o, a| {
            o.set_meta(&StringName::new(RESOURCE_PATH_META), a[0].clone());
            Ok(Variant::Nil)
        },
    ));
    c.method(NativeMethod::new(
        "get_path",
        &[],
        Some(VariantType::String),
        true,
        |o, _| Ok(resource_path(o)),
    ));
    c.property(
        PropertyDesc::new(VariantType::String, "resource_path"),
        "set_path",
        "get_path",
    );
    c
}

/// Version dictionary reported by `Engine.get_version_info()`.
pub fn version_info() -> Dictionary {
    let d = Dictionary::new();
    let major = i64::from(gdhost_sys::VERSION_MAJOR);
    let minor = i64::from(gdhost_sys::VERSION_MINOR);
    let patch = i64::from(gdhost_sys::VERSION_PATCH);
    let entries = [
        ("major", Variant::Int(major)),
        ("minor", Variant::Int(minor)),
        ("patch", Variant::Int(patch)),
        ("hex", Variant::Int((major << 16) | (minor << 8) | patch)),
        ("status", Variant::from("stable")),
        ("build", Variant::from("gdhost")),
        (
            "string",
            Variant::from(format!("{major}.{minor}.{patch}.stable")),
        ),
    ];
    for (k, v) in entries {
        d.set(Variant::from(k), v);
    }
    d
}

fn engine_class() -> ClassInfo {
    use VariantType as T;
    let mut c = ClassInfo::core("Engine", Some("Object"), false);
    c.method(NativeMethod::new(
        "get_version_info",
        &[],
        Some(T::Dictionary),
        true,
        |_, _| Ok(Variant::Dictionary(version_info())),
    ));
    c.method(NativeMethod::new(
        "has_singleton",
        &[T::StringName],
        Some(T::Bool),
        true,
        |_, a| Ok(Variant::Bool(object::has_singleton(&a[0].to_string_name()))),
    ));
    c.method(NativeMethod::new(
        "get_singleton",
        &[T::StringName],
        Some(T::Object),
        true,
        |_, a| {
            let found = object::singleton(&a[0].to_string_name()).ok_or(CallError::InvalidArgument {
                argument: 0,
                expected: T::StringName,
            })?;
            Ok(Variant::Object(ObjectRef::new(&found)))
        },
    ));
    c.method(NativeMethod::new(
        "get_singleton_list",
        &[],
        Some(T::PackedStringArray),
        true,
        |_, _| {
            let names: PackedStringArray = object::singleton_names()
                .iter()
                .map(GString::from)
                .collect();
            Ok(Variant::PackedStringArray(names))
        },
    ));
    c
}

pub(crate) fn core_classes() -> Vec<ClassInfo> {
    vec![
        object_class(),
        ref_counted_class(),
        resource_class(),
        engine_class(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_version_info() {
        let engine = object::singleton(&StringName::new("Engine")).expect("engine");
        let info = engine
            .call(&StringName::new("get_version_info"), &[])
            .expect("call");
        let dict = info.as_dictionary().expect("dictionary").clone();
        assert_eq!(
            dict.get(&Variant::from("major")),
            Some(Variant::Int(i64::from(gdhost_sys::VERSION_MAJOR)))
        );
        let has = engine
            .call(
                &StringName::new("has_singleton"),
                &[&Variant::from("Engine")],
            )
            .expect("call");
        assert_eq!(has, Variant::Bool(true));
    }

    #[test]
    fn refcounted_reports_count() {
        let obj = crate::class_db::instantiate(&StringName::new("RefCounted")).expect("ok");
        let held = Variant::from(&obj);
        let count = obj
            .call(&StringName::new("get_reference_count"), &[])
            .expect("call");
        assert_eq!(count, Variant::Int(1));
        drop(held);
    }
}
