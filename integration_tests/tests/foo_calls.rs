// End-to-end calls into the sample extension's `Foo` class.
//
// Each test opens the extension in-process, constructs `Foo` through the
// interface table, and drives its methods through both the dynamic
// (`object_method_bind_call`) and native (`object_method_bind_ptrcall`)
// paths. Allocation balance is checked against the extension's own
// instance counter and the engine's object database.

use gdhost_core::class_db;
use gdhost_core::{StringName, Variant, diag, object};
use gdhost_sys as sys;
use integration_tests::{
    PTRCALL_UNTOUCHED, SampleHost, answer_hash, call, construct, destroy, get_value_hash,
    method_bind, ptrcall_int, serial, set_value_hash, sum_hash,
};

const VALUES: [i64; 4] = [0, 1, -1, i64::MAX];

#[test]
fn value_round_trips_through_call() {
    let _guard = serial();
    let _host = SampleHost::start();

    let foo = construct(c"Foo");
    assert!(!foo.is_null());
    let set = method_bind(c"Foo", c"set_value", set_value_hash().into());
    let get = method_bind(c"Foo", c"get_value", get_value_hash().into());
    assert!(!set.is_null() && !get.is_null());

    for value in VALUES {
        let (ret, error) = call(set, foo, &[Variant::Int(value)]);
        assert!(error.is_ok(), "set_value({value}) failed: {}", error.error);
        assert_eq!(ret, Variant::Nil);
        let (ret, error) = call(get, foo, &[]);
        assert!(error.is_ok());
        assert_eq!(ret, Variant::Int(value));
    }
    destroy(foo);
}

#[test]
fn value_round_trips_through_ptrcall() {
    let _guard = serial();
    let _host = SampleHost::start();

    let foo = construct(c"Foo");
    let set = method_bind(c"Foo", c"set_value", set_value_hash().into());
    let get = method_bind(c"Foo", c"get_value", get_value_hash().into());

    for value in VALUES {
        ptrcall_int(set, foo, &[value]);
        assert_eq!(ptrcall_int(get, foo, &[]), value);
    }
    destroy(foo);
}

#[test]
fn call_and_ptrcall_share_the_instance() {
    let _guard = serial();
    let _host = SampleHost::start();

    let foo = construct(c"Foo");
    let set = method_bind(c"Foo", c"set_value", set_value_hash().into());
    let get = method_bind(c"Foo", c"get_value", get_value_hash().into());

    ptrcall_int(set, foo, &[17]);
    assert_eq!(call(get, foo, &[]).0, Variant::Int(17));
    call(set, foo, &[Variant::Int(-5)]);
    assert_eq!(ptrcall_int(get, foo, &[]), -5);
    destroy(foo);
}

#[test]
fn object_call_and_property_access_reach_the_extension() {
    let _guard = serial();
    let _host = SampleHost::start();

    let foo = class_db::instantiate(&StringName::new("Foo")).expect("instantiate Foo");
    assert!(foo.is_class(&StringName::new("Object")));
    foo.call(&StringName::new("set_value"), &[&Variant::Int(3)])
        .expect("set_value");
    assert_eq!(
        foo.call(&StringName::new("get_value"), &[]).expect("get_value"),
        Variant::Int(3)
    );

    assert!(foo.set(&StringName::new("value"), &Variant::Int(11)));
    assert_eq!(foo.get(&StringName::new("value")), Some(Variant::Int(11)));

    // Strict conversion of a whole float to the declared int argument.
    foo.call(&StringName::new("set_value"), &[&Variant::Float(4.0)])
        .expect("set_value(4.0)");
    assert_eq!(foo.get(&StringName::new("value")), Some(Variant::Int(4)));

    object::destroy(foo.id());
}

#[test]
fn wrong_argument_count_is_reported_to_the_caller() {
    let _guard = serial();
    let _host = SampleHost::start();

    let foo = construct(c"Foo");
    let set = method_bind(c"Foo", c"set_value", set_value_hash().into());
    let (_, error) = call(set, foo, &[]);
    assert_eq!(error.error, sys::CALL_ERROR_TOO_FEW_ARGUMENTS);
    let (_, error) = call(set, foo, &[Variant::Int(1), Variant::Int(2)]);
    assert_eq!(error.error, sys::CALL_ERROR_TOO_MANY_ARGUMENTS);
    destroy(foo);
}

#[test]
fn static_method_receives_no_instance() {
    let _guard = serial();
    let _host = SampleHost::start();

    let foo = construct(c"Foo");
    let answer = method_bind(c"Foo", c"answer", answer_hash().into());
    assert!(!answer.is_null());
    let (ret, error) = call(answer, foo, &[]);
    assert!(error.is_ok());
    assert_eq!(ret, Variant::Int(42));
    destroy(foo);
}

#[test]
fn vararg_method_takes_any_count_and_refuses_ptrcall() {
    let _guard = serial();
    let _host = SampleHost::start();

    let foo = construct(c"Foo");
    let sum = method_bind(c"Foo", c"sum", sum_hash().into());
    assert!(!sum.is_null());

    let args = [Variant::Int(1), Variant::Int(2), Variant::Int(39)];
    let (ret, error) = call(sum, foo, &args);
    assert!(error.is_ok());
    assert_eq!(ret, Variant::Int(42));
    assert_eq!(call(sum, foo, &[]).0, Variant::Int(0));

    let (ret, reports) = diag::capture(|| ptrcall_int(sum, foo, &[1, 2]));
    assert_eq!(ret, PTRCALL_UNTOUCHED);
    assert_eq!(reports.len(), 1);
    destroy(foo);
}

#[test]
fn mismatched_hash_yields_null_and_one_report() {
    let _guard = serial();
    let _host = SampleHost::start();

    let wrong = i64::from(get_value_hash() ^ 1);
    let (bind, reports) = diag::capture(|| method_bind(c"Foo", c"get_value", wrong));
    assert!(bind.is_null());
    assert_eq!(reports.len(), 1);
    assert!(reports[0].message.contains("Foo::get_value"));

    // The same mismatch is not reported again.
    let (bind, reports) = diag::capture(|| method_bind(c"Foo", c"get_value", wrong));
    assert!(bind.is_null());
    assert!(reports.is_empty());

    // The correct hash still resolves.
    assert!(!method_bind(c"Foo", c"get_value", get_value_hash().into()).is_null());
}

#[test]
fn calls_on_a_destroyed_object_fail_cleanly() {
    let _guard = serial();
    let _host = SampleHost::start();

    let foo = construct(c"Foo");
    let get = method_bind(c"Foo", c"get_value", get_value_hash().into());
    destroy(foo);
    let (ret, error) = call(get, foo, &[]);
    assert_eq!(error.error, sys::CALL_ERROR_INSTANCE_IS_NULL);
    assert_eq!(ret, Variant::Nil);
}

#[test]
fn instances_are_balanced() {
    let _guard = serial();
    let _host = SampleHost::start();

    let extension_before = gdhost_test_extension::live_instances();
    let objects_before = object::live_count();

    let objects: Vec<_> = (0..8)
        .map(|i| if i % 2 == 0 { construct(c"Foo") } else { construct(c"FooChild") })
        .collect();
    assert!(objects.iter().all(|o| !o.is_null()));
    assert_eq!(gdhost_test_extension::live_instances(), extension_before + 8);
    assert_eq!(object::live_count(), objects_before + 8);

    for o in objects {
        destroy(o);
    }
    assert_eq!(gdhost_test_extension::live_instances(), extension_before);
    assert_eq!(object::live_count(), objects_before);
}

#[test]
fn child_instances_inherit_parent_methods() {
    let _guard = serial();
    let _host = SampleHost::start();

    let child = class_db::instantiate(&StringName::new("FooChild")).expect("instantiate FooChild");
    assert_eq!(child.class_name(), StringName::new("FooChild"));
    assert!(child.is_class(&StringName::new("Foo")));
    child
        .call(&StringName::new("set_value"), &[&Variant::Int(i64::MAX)])
        .expect("set_value");
    assert_eq!(
        child.call(&StringName::new("get_value"), &[]).expect("get_value"),
        Variant::Int(i64::MAX)
    );
    object::destroy(child.id());
}
