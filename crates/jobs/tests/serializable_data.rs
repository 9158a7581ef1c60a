//! Job payloads are stored as plain data.
//!
//! Each test builds a job from a producer-shaped payload (class instances with
//! getters, dates, cyclic graphs) and checks the `data` the job keeps.

use chrono::{TimeZone, Utc};
use serde_json::json;

use plainjob_core::{ArrayRef, Class, KeyOrder, NormalizerConfig, ObjectRef, Value};
use plainjob_jobs::{Job, JobConfig};
use plainjob_observability::LogConfig;

fn setup() {
    plainjob_observability::init_with(&LogConfig::for_tests());
}

fn order_class() -> Class {
    Class::builder("Order")
        .getter("totalPrice", |_| Value::Int(42))
        .build()
}

fn new_order() -> ObjectRef {
    ObjectRef::instance(&order_class()).with("code", 123)
}

fn job_with(data: impl Into<Value>) -> Job {
    Job::new(JobConfig::new("test", data)).unwrap()
}

#[test]
fn getters_are_converted_to_plain_properties() {
    setup();
    let job = job_with(new_order());

    assert_eq!(job.data(), &json!({"code": 123, "totalPrice": 42}));
}

#[test]
fn getters_are_converted_to_plain_properties_nested() {
    setup();
    let job = job_with(Value::object([("order", new_order())]));

    assert_eq!(
        job.data(),
        &json!({"order": {"code": 123, "totalPrice": 42}})
    );
}

#[test]
fn getters_are_converted_to_plain_properties_nested_array() {
    setup();
    let job = job_with(Value::object([("orders", Value::array([new_order()]))]));

    assert_eq!(
        job.data(),
        &json!({"orders": [{"code": 123, "totalPrice": 42}]})
    );
}

#[test]
fn handles_dates() {
    setup();
    let date = Utc.with_ymd_and_hms(2020, 3, 1, 10, 0, 0).unwrap();

    assert_eq!(job_with(date).data(), &json!("2020-03-01T10:00:00.000Z"));
    assert_eq!(
        job_with(Value::object([("createdAt", date)])).data(),
        &json!({"createdAt": "2020-03-01T10:00:00.000Z"})
    );
}

#[test]
fn handles_objects_with_cycles() {
    setup();
    let parent = ObjectRef::new().with("name", "parent");
    let child = ObjectRef::new().with("name", "child").with("parent", Value::Null);
    parent.set("child", child.clone());
    child.set("parent", parent.clone());

    let job = job_with(parent.clone());
    assert_eq!(
        job.data(),
        &json!({
            "name": "parent",
            "child": {"name": "child", "parent": "[circular *child.parent]"}
        })
    );
    parent.clear();
}

#[test]
fn handles_objects_with_deep_cycles() {
    setup();
    let parent = ObjectRef::new().with("name", "parent");
    let child4 = ObjectRef::new().with("name", "child4").with("parent", parent.clone());
    let child3 = ObjectRef::new().with("name", "child3").with("child4", child4);
    let child2 = ObjectRef::new().with("name", "child2").with("child3", child3);
    let child1 = ObjectRef::new().with("name", "child1").with("child2", child2);
    parent.set("child1", child1);

    let job = job_with(parent.clone());
    assert_eq!(
        job.data(),
        &json!({
            "name": "parent",
            "child1": {
                "name": "child1",
                "child2": {
                    "name": "child2",
                    "child3": {
                        "name": "child3",
                        "child4": {
                            "name": "child4",
                            "parent": "[circular *child1.child2.child3.child4.parent]"
                        }
                    }
                }
            }
        })
    );
    parent.clear();
}

#[test]
fn handles_class_instances_with_cycles() {
    setup();
    let parent_class = Class::builder("Parent").build();
    let child_class = Class::builder("Child").build();

    let parent = ObjectRef::instance(&parent_class).with("name", "parent");
    let child = ObjectRef::instance(&child_class)
        .with("name", "child")
        .with("parent", Value::Undefined);
    parent.set("child", child.clone());
    child.set("parent", parent.clone());

    let job = job_with(parent.clone());
    assert_eq!(
        job.data(),
        &json!({
            "name": "parent",
            "child": {"name": "child", "parent": "[circular *child.parent]"}
        })
    );
    parent.clear();
}

#[test]
fn data_is_normalized_once_at_construction() {
    setup();
    let order = new_order();
    let job = job_with(order.clone());

    order.set("code", 999);
    assert_eq!(job.data()["code"], json!(123));
}

#[test]
fn cyclic_arrays_in_payload() {
    setup();
    let tags = ArrayRef::new();
    tags.push("urgent");
    tags.push(tags.clone());

    let job = job_with(Value::object([("tags", tags.clone())]));
    assert_eq!(job.data(), &json!({"tags": ["urgent", "[circular *tags[1]]"]}));
    tags.clear();
}

#[test]
fn normalizer_config_is_applied() {
    setup();
    let config = JobConfig::new("test", new_order().with("alpha", 1)).with_normalizer(
        NormalizerConfig::default()
            .with_key_order(KeyOrder::Sorted)
            .with_max_depth(0),
    );
    let job = Job::new(config).unwrap();

    let keys: Vec<&String> = job.data().as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["alpha", "code", "totalPrice"]);

    let nested = Job::new(
        JobConfig::new("test", Value::object([("order", new_order())]))
            .with_normalizer(NormalizerConfig::default().with_max_depth(0)),
    )
    .unwrap();
    assert_eq!(nested.data(), &json!({"order": "[max depth reached]"}));
}

#[test]
fn completed_result_is_normalized() {
    setup();
    let mut job = job_with(Value::Null);
    job.start().unwrap();
    job.complete(Value::object([("order", new_order())])).unwrap();

    assert_eq!(
        job.result(),
        Some(&json!({"order": {"code": 123, "totalPrice": 42}}))
    );
}

#[test]
fn jobs_can_be_built_on_other_threads() {
    setup();
    let order = new_order();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let payload = order.clone();
            std::thread::spawn(move || job_with(payload))
        })
        .collect();

    for handle in handles {
        let job = handle.join().unwrap();
        assert_eq!(job.data(), &json!({"code": 123, "totalPrice": 42}));
    }
}
