// Machine-readable description of the engine surface (`gdhost dump-api`).
//
// Lists, for the running build: the header version, the native size of every
// struct extensions may allocate, every builtin kind with its methods and
// their hashes, the utility functions, and the classes in the class database
// with their methods, constants, properties and signals. Extension authors
// generate bindings from it; the hashes are the ones `classdb_get_method_bind`
// and the ptr lookups check.

use gdhost_core::class_db::{self, ClassApi, MethodBind};
use gdhost_core::VariantType;
use gdhost_core::variant::{builtin_methods_of, utility_functions};
use indexmap::IndexMap;
use serde::Serialize;

use crate::interface::native_struct_size;

#[derive(Debug, Serialize)]
pub struct ApiHeader {
    pub version_major: u32,
    pub version_minor: u32,
    pub version_patch: u32,
    pub version_full_name: String,
}

#[derive(Debug, Serialize)]
pub struct ApiArgument {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Serialize)]
pub struct ApiMethod {
    pub name: String,
    pub hash: u32,
    pub is_const: bool,
    pub is_static: bool,
    pub is_vararg: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub arguments: Vec<ApiArgument>,
}

#[derive(Debug, Serialize)]
pub struct ApiBuiltinClass {
    pub name: String,
    pub size: u64,
    pub methods: Vec<ApiMethod>,
}

#[derive(Debug, Serialize)]
pub struct ApiProperty {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub setter: String,
    pub getter: String,
}

#[derive(Debug, Serialize)]
pub struct ApiClass {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inherits: Option<String>,
    pub api_type: &'static str,
    pub instantiable: bool,
    pub methods: Vec<ApiMethod>,
    pub constants: IndexMap<String, i64>,
    pub properties: Vec<ApiProperty>,
    pub signals: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiDump {
    pub header: ApiHeader,
    pub native_struct_sizes: IndexMap<String, u64>,
    pub builtin_classes: Vec<ApiBuiltinClass>,
    pub utility_functions: Vec<ApiMethod>,
    pub classes: Vec<ApiClass>,
}

fn type_name(ty: VariantType) -> String {
    if ty == VariantType::Nil {
        "Variant".to_owned()
    } else {
        ty.name().to_owned()
    }
}

fn arguments(list: &[(&str, VariantType)]) -> Vec<ApiArgument> {
    list.iter()
        .map(|(name, ty)| ApiArgument {
            name: (*name).to_owned(),
            ty: type_name(*ty),
        })
        .collect()
}

fn class_method(bind: &dyn MethodBind) -> ApiMethod {
    ApiMethod {
        name: bind.name().to_string(),
        hash: bind.hash(),
        is_const: bind.is_const(),
        is_static: false,
        is_vararg: bind.is_vararg(),
        return_type: bind.has_return().then(|| type_name(bind.argument_type(-1))),
        arguments: (0..bind.argument_count())
            .map(|i| ApiArgument {
                name: format!("arg{i}"),
                ty: type_name(bind.argument_type(i as i32)),
            })
            .collect(),
    }
}

pub fn dump() -> ApiDump {
    let header = ApiHeader {
        version_major: gdhost_sys::VERSION_MAJOR,
        version_minor: gdhost_sys::VERSION_MINOR,
        version_patch: gdhost_sys::VERSION_PATCH,
        version_full_name: gdhost_sys::VERSION_STRING.to_string_lossy().into_owned(),
    };

    let mut native_struct_sizes = IndexMap::new();
    for name in ["Variant", "ObjectID", "CallError"] {
        native_struct_sizes.insert(name.to_owned(), native_struct_size(name));
    }

    let builtin_classes = VariantType::ALL
        .iter()
        .filter(|ty| !matches!(ty, VariantType::Nil | VariantType::Object))
        .map(|&ty| ApiBuiltinClass {
            name: ty.name().to_owned(),
            size: native_struct_size(ty.name()),
            methods: builtin_methods_of(ty)
                .iter()
                .map(|m| ApiMethod {
                    name: m.name.to_string(),
                    hash: m.hash,
                    is_const: m.is_const,
                    is_static: m.is_static,
                    is_vararg: m.is_vararg,
                    return_type: m.return_type.map(type_name),
                    arguments: arguments(m.arguments),
                })
                .collect(),
        })
        .collect();

    let utility_functions = utility_functions()
        .iter()
        .map(|f| ApiMethod {
            name: f.name.to_string(),
            hash: f.hash,
            is_const: false,
            is_static: true,
            is_vararg: f.is_vararg,
            return_type: f.return_type.map(type_name),
            arguments: arguments(f.arguments),
        })
        .collect();

    let classes = class_db::class_list()
        .iter()
        .filter_map(class_db::class_info)
        .map(|info| ApiClass {
            name: info.name.to_string(),
            inherits: info.parent.as_ref().map(ToString::to_string),
            api_type: match info.api {
                ClassApi::Core => "core",
                ClassApi::Extension => "extension",
            },
            instantiable: info.instantiable,
            methods: info.methods.values().map(|m| class_method(&***m)).collect(),
            constants: info
                .constants
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            properties: info
                .properties
                .values()
                .map(|p| ApiProperty {
                    name: p.desc.name.to_string(),
                    ty: type_name(p.desc.ty),
                    setter: p.setter.to_string(),
                    getter: p.getter.to_string(),
                })
                .collect(),
            signals: info.signals.keys().map(ToString::to_string).collect(),
        })
        .collect();

    ApiDump {
        header,
        native_struct_sizes,
        builtin_classes,
        utility_functions,
        classes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_covers_builtins_utilities_and_core_classes() {
        let api = dump();
        assert_eq!(api.header.version_major, gdhost_sys::VERSION_MAJOR);
        assert!(api.native_struct_sizes["Variant"] > 0);
        let vector2 = api
            .builtin_classes
            .iter()
            .find(|c| c.name == "Vector2")
            .expect("Vector2");
        assert_eq!(vector2.size, 8);
        assert!(api.utility_functions.iter().any(|f| f.name == "lerp"));
        let object = api.classes.iter().find(|c| c.name == "Object").expect("Object");
        assert_eq!(object.api_type, "core");
        let get_class = object.methods.iter().find(|m| m.name == "get_class").expect("get_class");
        assert_eq!(get_class.return_type.as_deref(), Some("String"));
    }

    #[test]
    fn dump_serializes_to_json() {
        let json = serde_json::to_value(dump()).unwrap();
        assert!(json["builtin_classes"].as_array().is_some_and(|a| !a.is_empty()));
        assert!(json["header"]["version_full_name"].is_string());
    }
}
