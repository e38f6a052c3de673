use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use serde_json::json;
use vmbind::*;

fn recorder() -> (ChangeCallback, Rc<RefCell<Vec<Change>>>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let callback: ChangeCallback = Rc::new(move |c: &Change| sink.borrow_mut().push(c.clone()));
    (callback, log)
}

fn paths(log: &Rc<RefCell<Vec<Change>>>) -> Vec<String> {
    log.borrow().iter().map(|c| c.path.clone()).collect()
}

#[test]
fn test_observe_twice_with_same_callback_notifies_once() {
    let data = Value::from(json!({"user": {"name": "ann"}, "tags": ["a"]}));
    let (callback, log) = recorder();
    observe(&data, Rc::clone(&callback)).unwrap();
    observe(&data, callback).unwrap();

    let user = data.get_property("user");
    user.as_object().unwrap().set("name", Value::from("bob")).unwrap();
    data.get_property("tags").as_list().unwrap().push(Value::from("b")).unwrap();

    assert_eq!(paths(&log), vec!["user.name", "tags.length"]);
}

#[test]
fn test_two_callbacks_both_fire() {
    let data = Value::from(json!({"n": 1}));
    let (first, first_log) = recorder();
    let (second, second_log) = recorder();
    observe(&data, first).unwrap();
    observe(&data, second).unwrap();

    data.as_object().unwrap().set("n", Value::from(2)).unwrap();
    assert_eq!(first_log.borrow().len(), 1);
    assert_eq!(second_log.borrow().len(), 1);
}

#[test]
fn test_unchanged_write_is_silent() {
    let data = Value::from(json!({"n": 1, "s": "x"}));
    let (callback, log) = recorder();
    observe(&data, callback).unwrap();
    let object = data.as_object().unwrap();

    assert!(!object.set("n", Value::from(1)).unwrap());
    assert!(!object.set("s", Value::from("x")).unwrap());
    assert!(log.borrow().is_empty());

    assert!(object.set("n", Value::from("1")).unwrap());
    assert_eq!(paths(&log), vec!["n"]);
}

#[test]
fn test_new_key_notifies() {
    let data = Value::from(json!({}));
    let (callback, log) = recorder();
    observe(&data, callback).unwrap();

    data.as_object().unwrap().set("fresh", Value::from(true)).unwrap();
    assert_eq!(
        log.borrow()[0],
        Change {
            path: "fresh".to_string(),
            key: "fresh".to_string(),
            value: Value::from(true),
        }
    );
}

#[test]
fn test_list_mutators_notify_length_once() {
    let data = Value::from(json!({"items": [3, 1, 2]}));
    let (callback, log) = recorder();
    observe(&data, callback).unwrap();
    let items = data.get_property("items");
    let list = items.as_list().unwrap();

    list.push(Value::from(4)).unwrap();
    assert_eq!(log.borrow().len(), 1);
    assert_eq!(log.borrow()[0].value, Value::from(4));

    list.pop();
    list.shift();
    list.unshift(Value::from(0)).unwrap();
    list.splice(1, 1, vec![Value::from(7), Value::from(8)]).unwrap();
    list.reverse();
    list.sort();
    assert_eq!(log.borrow().len(), 7);
    assert!(paths(&log).iter().all(|p| p == "items.length"));
}

#[test]
fn test_concat_returns_unobserved_copy() {
    let data = Value::from(json!({"items": [1]}));
    let (callback, log) = recorder();
    observe(&data, callback).unwrap();
    let items = data.get_property("items");

    let joined = items.as_list().unwrap().concat(&[Value::from(2)]);
    assert_eq!(joined.len(), 2);
    assert!(!joined.is_observed());
    assert!(log.borrow().is_empty());
}

#[test]
fn test_pushed_objects_are_observed() {
    let data = Value::from(json!({"rows": []}));
    let (callback, log) = recorder();
    observe(&data, callback).unwrap();
    let rows = data.get_property("rows");
    let row = Value::from(json!({"done": false}));

    rows.as_list().unwrap().push(row.clone()).unwrap();
    row.as_object().unwrap().set("done", Value::from(true)).unwrap();

    assert_eq!(paths(&log), vec!["rows.length", "rows.0.done"]);
}

#[test]
fn test_replaced_subtree_is_observed() {
    let data = Value::from(json!({"user": {"name": "ann"}}));
    let (callback, log) = recorder();
    observe(&data, callback).unwrap();

    let next = Value::from(json!({"name": "bob"}));
    data.as_object().unwrap().set("user", next.clone()).unwrap();
    next.as_object().unwrap().set("name", Value::from("cy")).unwrap();

    assert_eq!(paths(&log), vec!["user", "user.name"]);
}

#[test]
fn test_function_properties_are_silent() {
    let data = Value::from(json!({}));
    let (callback, log) = recorder();
    observe(&data, callback).unwrap();

    let f = Value::builtin("f", 0, |_| Ok(Value::Null));
    assert!(data.as_object().unwrap().set("f", f).unwrap());
    assert!(log.borrow().is_empty());
}

#[test]
fn test_cyclic_graph_is_rejected() {
    let object = ObservedObject::new();
    object.insert_unobserved("me", Value::Object(object.clone()));
    let (callback, _) = recorder();

    let err = observe(&Value::Object(object), callback).unwrap_err();
    assert!(matches!(err, ObserveError::Cyclic { .. }));
}

#[test]
fn test_cyclic_write_is_rejected_and_cell_kept() {
    let data = Value::from(json!({"child": {}}));
    let (callback, log) = recorder();
    observe(&data, callback).unwrap();
    let child = data.get_property("child");

    let err = child.as_object().unwrap().set("parent", data.clone()).unwrap_err();
    assert!(matches!(err, ObserveError::Cyclic { ref path } if path == "child.parent"));
    assert!(!child.as_object().unwrap().contains_key("parent"));
    assert!(log.borrow().is_empty());
}

#[test]
fn test_shared_subtree_is_not_a_cycle() {
    let shared = Value::from(json!({"n": 1}));
    let root = Value::object([("a", shared.clone()), ("b", shared.clone())]);
    let (callback, log) = recorder();
    observe(&root, callback).unwrap();

    // One attachment per callback: the first path reached wins.
    shared.as_object().unwrap().set("n", Value::from(2)).unwrap();
    assert_eq!(paths(&log), vec!["a.n"]);
}

#[test]
fn test_callback_reads_stored_value() {
    let data = Value::from(json!({"items": []}));
    let items = data.get_property("items");
    let reader = items.clone();
    let lengths = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&lengths);
    observe(
        &data,
        Rc::new(move |_: &Change| {
            sink.borrow_mut().push(reader.as_list().map(|l| l.len()).unwrap_or(0))
        }),
    )
    .unwrap();

    items.as_list().unwrap().push(Value::from("x")).unwrap();
    items.as_list().unwrap().push(Value::from("y")).unwrap();
    assert_eq!(*lengths.borrow(), vec![1, 2]);
}
