// Method binds backed by extension callbacks.
//
// `ExtensionMethodBind` wraps the `ExtensionClassMethodInfo` an extension
// passes to `classdb_register_extension_class_method`. Argument types,
// argument metadata and default arguments are queried once at registration
// and cached, so later lookups never call back into the extension. The
// signature hash is computed from the cached types exactly as engine-native
// methods compute theirs.
//
// Dynamic calls go through `prepare_arguments` (arity, defaults,
// conversion) and then the extension's `call_func`; ptrcalls go to
// `ptrcall_func`, or fall back to the dynamic path when the extension only
// supplied `call_func`. Static methods receive a null instance.

use std::ffi::c_void;
use std::ptr;

use gdhost_core::class_db::{MethodBind, prepare_arguments};
use gdhost_core::error::CallError;
use gdhost_core::object::Object;
use gdhost_core::variant::native;
use gdhost_core::{ForeignPtr, StringName, Variant, VariantType};
use gdhost_sys::{
    self as sys, ClassInstancePtr, ConstTypePtr, ConstVariantPtr, ExtensionClassMethodCall,
    ExtensionClassMethodInfo, ExtensionClassMethodPtrCall, TypePtr,
};
use smallvec::SmallVec;

use crate::interface::c_str;

pub struct ExtensionMethodBind {
    name: StringName,
    userdata: ForeignPtr,
    call_func: ExtensionClassMethodCall,
    ptrcall_func: Option<ExtensionClassMethodPtrCall>,
    flags: u32,
    arguments: Vec<VariantType>,
    /// Index 0 is the return value, then one entry per argument.
    metadata: Vec<u32>,
    return_type: Option<VariantType>,
    defaults: Vec<Variant>,
    hash: u32,
}

// The userdata is an opaque token owned by the extension.
unsafe impl Send for ExtensionMethodBind {}
unsafe impl Sync for ExtensionMethodBind {}

fn checked_type(raw: sys::VariantType, name: &StringName, argument: i32) -> VariantType {
    VariantType::from_raw(raw).unwrap_or_else(|| {
        gdhost_core::err_print!(
            "method '{name}' reports invalid type {raw} for argument {argument}; using Variant"
        );
        VariantType::Nil
    })
}

impl ExtensionMethodBind {
    /// Read and cache everything the bind needs from `info`.
    ///
    /// # Safety
    /// `info` must be fully initialized; its callbacks must be valid to call
    /// with `method_userdata`, and `default_arguments` must hold
    /// `default_argument_count` pointers to live Variants.
    pub unsafe fn from_info(info: &ExtensionClassMethodInfo) -> Result<Self, String> {
        let name = unsafe { c_str(info.name) }
            .ok_or_else(|| "method name is null or not valid UTF-8".to_owned())?;
        let name = StringName::new(name);
        let call_func = info
            .call_func
            .ok_or_else(|| format!("method '{name}' has no call function"))?;
        let userdata = info.method_userdata;
        let argc = i32::try_from(info.argument_count)
            .map_err(|_| format!("method '{name}' declares too many arguments"))?;

        let type_of = |index: i32| match info.get_argument_type_func {
            Some(f) => checked_type(unsafe { f(userdata, index) }, &name, index),
            None => VariantType::Nil,
        };
        let metadata_of = |index: i32| match info.get_argument_metadata_func {
            Some(f) => unsafe { f(userdata, index) },
            None => sys::METHOD_ARGUMENT_METADATA_NONE,
        };

        let return_type = (info.has_return_value != 0).then(|| type_of(-1));
        let arguments: Vec<VariantType> = (0..argc).map(type_of).collect();
        let metadata: Vec<u32> = (-1..argc).map(metadata_of).collect();

        let mut defaults = Vec::with_capacity(info.default_argument_count as usize);
        if info.default_argument_count > 0 && info.default_arguments.is_null() {
            return Err(format!("method '{name}' declares default arguments but passes none"));
        }
        for i in 0..info.default_argument_count as usize {
            let slot = unsafe { *info.default_arguments.add(i) };
            match unsafe { slot.cast::<Variant>().as_ref() } {
                Some(value) => defaults.push(value.clone()),
                None => return Err(format!("default argument {i} of method '{name}' is null")),
            }
        }
        if defaults.len() > arguments.len() {
            return Err(format!("method '{name}' has more defaults than arguments"));
        }

        let flags = info.method_flags;
        let raw_args: Vec<u32> = arguments.iter().map(|t| t.raw()).collect();
        let hash = sys::method_signature_hash(
            return_type.map(VariantType::raw),
            &raw_args,
            flags & sys::METHOD_FLAG_CONST != 0,
            flags & sys::METHOD_FLAG_VARARG != 0,
        );

        Ok(Self {
            name,
            userdata: ForeignPtr(userdata),
            call_func,
            ptrcall_func: info.ptrcall_func,
            flags,
            arguments,
            metadata,
            return_type,
            defaults,
            hash,
        })
    }

    pub fn is_static(&self) -> bool {
        self.flags & sys::METHOD_FLAG_STATIC != 0
    }

    fn instance_for(&self, object: &Object) -> Result<ClassInstancePtr, CallError> {
        if self.is_static() {
            return Ok(ptr::null_mut());
        }
        object
            .extension_instance()
            .map(|ext| ext.instance.get())
            .ok_or(CallError::InstanceIsNull)
    }
}

impl MethodBind for ExtensionMethodBind {
    fn name(&self) -> &StringName {
        &self.name
    }

    fn hash(&self) -> u32 {
        self.hash
    }

    fn argument_count(&self) -> usize {
        self.arguments.len()
    }

    fn argument_type(&self, index: i32) -> VariantType {
        if index < 0 {
            return self.return_type.unwrap_or(VariantType::Nil);
        }
        self.arguments
            .get(index as usize)
            .copied()
            .unwrap_or(VariantType::Nil)
    }

    fn argument_metadata(&self, index: i32) -> u32 {
        usize::try_from(index + 1)
            .ok()
            .and_then(|i| self.metadata.get(i).copied())
            .unwrap_or(sys::METHOD_ARGUMENT_METADATA_NONE)
    }

    fn has_return(&self) -> bool {
        self.return_type.is_some()
    }

    fn is_const(&self) -> bool {
        self.flags & sys::METHOD_FLAG_CONST != 0
    }

    fn is_vararg(&self) -> bool {
        self.flags & sys::METHOD_FLAG_VARARG != 0
    }

    fn default_arguments(&self) -> &[Variant] {
        &self.defaults
    }

    fn call(&self, object: &Object, args: &[&Variant]) -> Result<Variant, CallError> {
        let prepared = prepare_arguments(self, args)?;
        let instance = self.instance_for(object)?;
        let pointers: SmallVec<[ConstVariantPtr; 8]> = prepared
            .iter()
            .map(|v| ptr::from_ref(v).cast::<c_void>())
            .collect();
        // The extension assigns into a Nil it does not have to drop.
        let mut ret = Variant::Nil;
        let mut error = sys::CallError::OK;
        unsafe {
            (self.call_func)(
                self.userdata.get(),
                instance,
                pointers.as_ptr(),
                pointers.len() as sys::GdInt,
                ptr::from_mut(&mut ret).cast(),
                &mut error,
            );
        }
        CallError::from_sys(&error)?;
        Ok(ret)
    }

    unsafe fn ptrcall(&self, object: &Object, args: *const ConstTypePtr, ret: TypePtr) {
        if self.is_vararg() {
            gdhost_core::err_print!("vararg method '{}' has no ptrcall form", self.name);
            return;
        }
        let instance = match self.instance_for(object) {
            Ok(instance) => instance,
            Err(e) => {
                gdhost_core::err_print!("ptrcall to '{}' failed: {e}", self.name);
                return;
            }
        };
        if let Some(ptrcall) = self.ptrcall_func {
            unsafe { ptrcall(self.userdata.get(), instance, args, ret) };
            return;
        }
        let values: SmallVec<[Variant; 8]> = self
            .arguments
            .iter()
            .enumerate()
            .map(|(i, ty)| unsafe { native::read(*ty, *args.add(i)) })
            .collect();
        let refs: SmallVec<[&Variant; 8]> = values.iter().collect();
        match self.call(object, &refs) {
            Ok(value) => {
                if let Some(rt) = self.return_type {
                    unsafe { native::write(rt, ret, value) };
                }
            }
            Err(e) => gdhost_core::err_print!("ptrcall to '{}' failed: {e}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::c_char;

    use super::*;

    unsafe extern "C" fn sum_call(
        _userdata: *mut c_void,
        _instance: ClassInstancePtr,
        args: *const ConstVariantPtr,
        count: sys::GdInt,
        r_return: sys::VariantPtr,
        _r_error: *mut sys::CallError,
    ) {
        let mut total = 0;
        for i in 0..count as usize {
            total += unsafe { &*(*args.add(i)).cast::<Variant>() }.to_int();
        }
        unsafe { *r_return.cast::<Variant>() = Variant::Int(total) };
    }

    unsafe extern "C" fn int_types(_userdata: *mut c_void, _argument: i32) -> sys::VariantType {
        sys::VARIANT_TYPE_INT
    }

    unsafe extern "C" fn bad_types(_userdata: *mut c_void, _argument: i32) -> sys::VariantType {
        999
    }

    fn info(name: *const c_char, flags: u32) -> ExtensionClassMethodInfo {
        ExtensionClassMethodInfo {
            name,
            method_userdata: ptr::null_mut(),
            call_func: Some(sum_call),
            ptrcall_func: None,
            method_flags: flags,
            argument_count: 2,
            has_return_value: 1,
            get_argument_type_func: Some(int_types),
            get_argument_info_func: None,
            get_argument_metadata_func: None,
            default_argument_count: 0,
            default_arguments: ptr::null(),
        }
    }

    #[test]
    fn caches_signature_and_hash() {
        let bind = unsafe { ExtensionMethodBind::from_info(&info(c"sum".as_ptr(), sys::METHOD_FLAG_CONST)) }
            .expect("valid");
        assert_eq!(bind.name().as_str(), "sum");
        assert_eq!(bind.argument_count(), 2);
        assert_eq!(bind.argument_type(0), VariantType::Int);
        assert_eq!(bind.argument_type(-1), VariantType::Int);
        assert!(bind.is_const() && !bind.is_vararg() && !bind.is_static());
        let expected = sys::method_signature_hash(
            Some(sys::VARIANT_TYPE_INT),
            &[sys::VARIANT_TYPE_INT, sys::VARIANT_TYPE_INT],
            true,
            false,
        );
        assert_eq!(bind.hash(), expected);
    }

    #[test]
    fn defaults_fill_trailing_arguments() {
        let five = Variant::Int(5);
        let defaults: [ConstVariantPtr; 1] = [ptr::from_ref(&five).cast()];
        let mut raw = info(c"sum".as_ptr(), sys::METHOD_FLAG_STATIC);
        raw.default_argument_count = 1;
        raw.default_arguments = defaults.as_ptr();
        let bind = unsafe { ExtensionMethodBind::from_info(&raw) }.expect("valid");
        let object = gdhost_core::object::create(StringName::new("Object"), false);
        let result = bind.call(&object, &[&Variant::Int(2)]);
        assert_eq!(result, Ok(Variant::Int(7)));
        assert_eq!(
            bind.call(&object, &[]),
            Err(CallError::TooFewArguments { expected: 1 })
        );
        gdhost_core::object::destroy(object.id());
    }

    #[test]
    fn non_static_method_needs_an_extension_instance() {
        let bind = unsafe { ExtensionMethodBind::from_info(&info(c"sum".as_ptr(), 0)) }.expect("valid");
        let object = gdhost_core::object::create(StringName::new("Object"), false);
        let (a, b) = (Variant::Int(1), Variant::Int(2));
        assert_eq!(bind.call(&object, &[&a, &b]), Err(CallError::InstanceIsNull));
        gdhost_core::object::destroy(object.id());
    }

    #[test]
    fn invalid_types_and_missing_names_are_rejected() {
        assert!(unsafe { ExtensionMethodBind::from_info(&info(ptr::null(), 0)) }.is_err());
        let mut raw = info(c"odd".as_ptr(), 0);
        raw.get_argument_type_func = Some(bad_types);
        let (bind, reports) = gdhost_core::diag::capture(|| unsafe { ExtensionMethodBind::from_info(&raw) });
        let bind = bind.expect("falls back to Variant");
        assert_eq!(bind.argument_type(0), VariantType::Nil);
        assert_eq!(reports.len(), 3);
    }
}
