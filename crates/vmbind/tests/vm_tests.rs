use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use vmbind::binding::CHANGE_EVENT;
use vmbind::*;

const FORM: &str = r#"<div id=app vm-controller="app">
  <p id=p vm-html="msg"></p>
  <input id=i vm-value="msg">
</div>"#;

fn element(vm: &Vm, id: &str) -> NodeId {
    vm.document().get_element_by_id(id).unwrap()
}

fn text(vm: &Vm, id: &str) -> String {
    vm.document().text_content(element(vm, id))
}

fn flush_counter(vm: &mut Vm, name: &str) -> Rc<Cell<usize>> {
    let flushes = Rc::new(Cell::new(0));
    let seen = Rc::clone(&flushes);
    vm.add_observe_listener(name, move |_| seen.set(seen.get() + 1)).unwrap();
    flushes
}

fn set(data: &Value, key: &str, value: Value) {
    data.as_object().unwrap().set(key, value).unwrap();
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

// ═══════════════════════════════════════════════════════════════════════
// Scheduling
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_burst_of_writes_flushes_once() {
    let mut vm = Vm::new(Document::parse(FORM));
    let data = vm.define("app", Value::from(json!({"msg": "a"}))).unwrap();
    vm.run_until_idle().unwrap();
    let flushes = flush_counter(&mut vm, "app");

    for n in 0..10 {
        set(&data, "msg", Value::from(n));
    }
    assert_eq!(vm.pending_tasks(), 1);
    vm.run_until_idle().unwrap();

    assert_eq!(flushes.get(), 1);
    assert_eq!(text(&vm, "p"), "9");
}

#[test]
fn test_flush_is_a_trailing_debounce() {
    let mut vm = Vm::new(Document::parse(FORM));
    let data = vm.define("app", Value::from(json!({"msg": "a"}))).unwrap();
    vm.run_until_idle().unwrap();
    let flushes = flush_counter(&mut vm, "app");

    set(&data, "msg", Value::from("b"));
    vm.advance(ms(30)).unwrap();
    set(&data, "msg", Value::from("c"));
    vm.advance(ms(30)).unwrap();
    assert_eq!(flushes.get(), 0);
    assert_eq!(text(&vm, "p"), "a");

    vm.advance(ms(20)).unwrap();
    assert_eq!(flushes.get(), 1);
    assert_eq!(text(&vm, "p"), "c");
}

#[test]
fn test_flush_delay_from_json_config() {
    let config = VmConfig::from_json(r#"{"flush_delay_ms": 10, "scan_delay_ms": 0}"#).unwrap();
    let mut vm = Vm::with_config(Document::parse(FORM), config);
    let data = vm.define("app", Value::from(json!({"msg": "a"}))).unwrap();
    vm.run_until_idle().unwrap();

    set(&data, "msg", Value::from("b"));
    vm.advance(ms(9)).unwrap();
    assert_eq!(text(&vm, "p"), "a");
    vm.advance(ms(1)).unwrap();
    assert_eq!(text(&vm, "p"), "b");
}

#[test]
fn test_list_push_updates_length_after_one_flush() {
    let mut vm = Vm::new(Document::parse(
        r#"<div vm-controller="todo"><span id=n vm-html="items.length"></span></div>"#,
    ));
    let data = vm.define("todo", Value::from(json!({"items": [1, 2, 3]}))).unwrap();
    vm.run_until_idle().unwrap();
    assert_eq!(text(&vm, "n"), "3");
    let flushes = flush_counter(&mut vm, "todo");

    data.get_property("items").as_list().unwrap().push(Value::from(4)).unwrap();
    vm.run_until_idle().unwrap();

    assert_eq!(flushes.get(), 1);
    assert_eq!(text(&vm, "n"), "4");
}

// ═══════════════════════════════════════════════════════════════════════
// Two-Way Binding
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_typing_updates_data_without_echo() {
    let mut vm = Vm::new(Document::parse(FORM));
    let data = vm.define("app", Value::from(json!({"msg": "hi"}))).unwrap();
    vm.run_until_idle().unwrap();
    let input = element(&vm, "i");
    assert_eq!(vm.document().value(input), "hi");

    let echoes = Rc::new(Cell::new(0));
    let count = Rc::clone(&echoes);
    vm.document_mut().on(
        input,
        CHANGE_EVENT,
        Rc::new(move |_: &Document, _: &Event| count.set(count.get() + 1)),
    );

    vm.input(input, "typed");
    assert_eq!(data.get_property("msg"), Value::from("typed"));
    vm.run_until_idle().unwrap();
    assert_eq!(text(&vm, "p"), "typed");
    assert_eq!(vm.document().value(input), "typed");
    assert_eq!(echoes.get(), 0);

    set(&data, "msg", Value::from("pushed"));
    vm.run_until_idle().unwrap();
    assert_eq!(vm.document().value(input), "pushed");
    assert_eq!(echoes.get(), 1);
}

#[test]
fn test_edit_back_to_shown_value_does_not_swallow_next_write() {
    let mut vm = Vm::new(Document::parse(FORM));
    let data = vm.define("app", Value::from(json!({"msg": "x"}))).unwrap();
    vm.run_until_idle().unwrap();
    let input = element(&vm, "i");

    vm.input(input, "y");
    vm.input(input, "x");
    vm.run_until_idle().unwrap();
    assert_eq!(vm.document().value(input), "x");

    set(&data, "msg", Value::from("q"));
    vm.run_until_idle().unwrap();
    assert_eq!(vm.document().value(input), "q");
    assert_eq!(text(&vm, "p"), "q");
}

#[test]
fn test_program_write_wins_over_edit_in_same_window() {
    let mut vm = Vm::new(Document::parse(FORM));
    let data = vm.define("app", Value::from(json!({"msg": "x"}))).unwrap();
    vm.run_until_idle().unwrap();
    let input = element(&vm, "i");

    vm.input(input, "y");
    set(&data, "msg", Value::from("z"));
    vm.run_until_idle().unwrap();
    assert_eq!(vm.document().value(input), "z");
}

#[test]
fn test_prefilled_input_seeds_empty_data() {
    let mut vm = Vm::new(Document::parse(
        r#"<div vm-controller="app"><input id=i value="draft" vm-value="note"><b id=b vm-html="note"></b></div>"#,
    ));
    let data = vm.define("app", Value::from(json!({"note": ""}))).unwrap();
    vm.run_until_idle().unwrap();

    assert_eq!(data.get_property("note"), Value::from("draft"));
    assert_eq!(vm.document().value(element(&vm, "i")), "draft");
    assert_eq!(text(&vm, "b"), "draft");
}

#[test]
fn test_radio_group_via_clicks() {
    let mut vm = Vm::new(Document::parse(
        r#"<form vm-controller="prefs">
             <input type=radio name=color value=red id=red vm-value="color">
             <input type=radio name=color value=green id=green vm-value="color">
           </form>"#,
    ));
    let data = vm.define("prefs", Value::from(json!({"color": "red"}))).unwrap();
    vm.run_until_idle().unwrap();
    let (red, green) = (element(&vm, "red"), element(&vm, "green"));
    assert!(vm.document().checked(red));
    assert!(!vm.document().checked(green));

    vm.click(green);
    assert_eq!(data.get_property("color"), Value::from("green"));
    vm.run_until_idle().unwrap();
    assert!(!vm.document().checked(red));
    assert!(vm.document().checked(green));

    set(&data, "color", Value::from("red"));
    vm.run_until_idle().unwrap();
    assert!(vm.document().checked(red));
    assert!(!vm.document().checked(green));
}

#[test]
fn test_checkbox_group_via_clicks() {
    let mut vm = Vm::new(Document::parse(
        r#"<div vm-controller="tags">
             <input type=checkbox name=t value=a id=a vm-value="tags">
             <input type=checkbox name=t value=b id=b vm-value="tags">
           </div>"#,
    ));
    let data = vm.define("tags", Value::from(json!({"tags": ["a"]}))).unwrap();
    vm.run_until_idle().unwrap();
    let (a, b) = (element(&vm, "a"), element(&vm, "b"));
    assert!(vm.document().checked(a));
    assert!(!vm.document().checked(b));

    vm.click(b);
    assert_eq!(data.get_property("tags").to_json(), json!(["a", "b"]));
    vm.click(a);
    assert_eq!(data.get_property("tags").to_json(), json!(["b"]));
    vm.run_until_idle().unwrap();
    assert!(!vm.document().checked(a));
    assert!(vm.document().checked(b));
}

#[test]
fn test_select_change_writes_back() {
    let mut vm = Vm::new(Document::parse(
        r#"<div vm-controller="app"><select id=s vm-value="size"><option>s<option>m<option>l</select><b id=b vm-html="size"></b></div>"#,
    ));
    let data = vm.define("app", Value::from(json!({"size": "m"}))).unwrap();
    vm.run_until_idle().unwrap();
    let select = element(&vm, "s");
    assert_eq!(vm.document().value(select), "m");

    vm.select(select, "l");
    vm.run_until_idle().unwrap();
    assert_eq!(data.get_property("size"), Value::from("l"));
    assert_eq!(text(&vm, "b"), "l");
}

// ═══════════════════════════════════════════════════════════════════════
// Events, Styles and Attributes
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_click_handler_mutates_data() {
    let mut vm = Vm::new(Document::parse(
        r#"<div vm-controller="counter">
             <button id=inc vm-on-click="|e| self.count += 1">+</button>
             <span id=out vm-html="count" vm-css-color='if count > 1 { "red" } else { "black" }'></span>
           </div>"#,
    ));
    vm.define("counter", Value::from(json!({"count": 0}))).unwrap();
    vm.run_until_idle().unwrap();
    let (inc, out) = (element(&vm, "inc"), element(&vm, "out"));

    vm.click(inc);
    vm.click(inc);
    vm.run_until_idle().unwrap();
    assert_eq!(text(&vm, "out"), "2");
    assert_eq!(vm.document().style(out, "color").as_deref(), Some("red"));
}

#[test]
fn test_handler_swap_follows_data() {
    let mut vm = Vm::new(Document::parse(
        r#"<div vm-controller="app"><a id=a vm-on-click="handler"></a></div>"#,
    ));
    let data = vm.define("app", Value::from(json!({"hits": []}))).unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    let (first, second) = (Rc::clone(&log), Rc::clone(&log));
    set(&data, "handler", Value::builtin("first", 1, move |_| {
        first.borrow_mut().push("first");
        Ok(Value::Undefined)
    }));
    vm.update("app").unwrap();
    vm.run_until_idle().unwrap();
    let a = element(&vm, "a");

    vm.click(a);
    set(&data, "handler", Value::builtin("second", 1, move |_| {
        second.borrow_mut().push("second");
        Ok(Value::Undefined)
    }));
    vm.update("app").unwrap();
    vm.run_until_idle().unwrap();
    vm.click(a);

    assert_eq!(*log.borrow(), vec!["first", "second"]);
    assert_eq!(vm.document().listener_count(a, "click"), 1);
}

#[test]
fn test_attr_binding_toggles_property() {
    let mut vm = Vm::new(Document::parse(
        r#"<div vm-controller="app"><button id=go vm-attr-disabled="busy" vm-attr-data-state="state">go</button></div>"#,
    ));
    let data = vm.define("app", Value::from(json!({"busy": true, "state": "idle"}))).unwrap();
    vm.run_until_idle().unwrap();
    let go = element(&vm, "go");
    assert_eq!(vm.document().property(go, "disabled"), Some(&Value::Bool(true)));
    assert_eq!(vm.document().attribute(go, "data-state"), Some("idle"));

    set(&data, "busy", Value::from(false));
    vm.run_until_idle().unwrap();
    assert_eq!(vm.document().property(go, "disabled"), Some(&Value::Bool(false)));
}

// ═══════════════════════════════════════════════════════════════════════
// Structure
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_removed_element_is_swept() {
    let mut vm = Vm::new(Document::parse(FORM));
    let data = vm.define("app", Value::from(json!({"msg": "a"}))).unwrap();
    vm.run_until_idle().unwrap();
    assert_eq!(vm.controller_count("app"), 2);

    let p = element(&vm, "p");
    vm.remove_element(p);
    vm.run_until_idle().unwrap();
    assert_eq!(vm.controller_count("app"), 1);

    set(&data, "msg", Value::from("b"));
    vm.run_until_idle().unwrap();
    assert_eq!(vm.document().value(element(&vm, "i")), "b");
}

#[test]
fn test_detached_element_is_dead_under_both_strategies() {
    for liveness in [Liveness::Arena, Liveness::Markup] {
        let mut vm = Vm::with_config(Document::parse(FORM), VmConfig::default().with_liveness(liveness));
        vm.define("app", Value::from(json!({"msg": "a"}))).unwrap();
        vm.run_until_idle().unwrap();

        let p = element(&vm, "p");
        vm.document_mut().detach(p);
        assert_eq!(vm.sweep("app").unwrap(), 1, "{:?}", liveness);
        assert_eq!(vm.controller_count("app"), 1);
    }
}

#[test]
fn test_injected_markup_is_bound() {
    let mut vm = Vm::new(Document::parse(
        r#"<div vm-controller="app"><p id=p vm-html="msg"></p><div id=slot></div></div>"#,
    ));
    let data = vm.define("app", Value::from(json!({"msg": "a"}))).unwrap();
    vm.run_until_idle().unwrap();

    let slot = element(&vm, "slot");
    vm.inject_html(slot, r#"<em id=late vm-html='msg + "!"'></em>"#);
    vm.run_until_idle().unwrap();
    assert_eq!(vm.controller_count("app"), 2);
    assert_eq!(text(&vm, "late"), "a!");

    set(&data, "msg", Value::from("b"));
    vm.run_until_idle().unwrap();
    assert_eq!(text(&vm, "late"), "b!");
}

#[test]
fn test_rendered_markup_is_scanned() {
    let mut vm = Vm::new(Document::parse(
        r#"<div vm-controller="app"><div id=host vm-html="markup"></div><b id=n vm-html="n"></b></div>"#,
    ));
    vm.define(
        "app",
        Value::from(json!({"markup": "<button id=go vm-on-click=\"|e| self.n += 1\">go</button>", "n": 0})),
    )
    .unwrap();
    vm.run_until_idle().unwrap();

    let go = element(&vm, "go");
    vm.click(go);
    vm.run_until_idle().unwrap();
    assert_eq!(text(&vm, "n"), "1");
}

#[test]
fn test_rerender_drops_replaced_bindings_in_same_flush() {
    let mut vm = Vm::new(Document::parse(
        r#"<div vm-controller="app"><div id=host vm-html="markup"></div></div>"#,
    ));
    let data = vm
        .define(
            "app",
            Value::from(json!({"markup": "<input id=inner vm-value=\"msg\">", "msg": "m"})),
        )
        .unwrap();
    vm.run_until_idle().unwrap();
    assert_eq!(vm.controller_count("app"), 2);
    let flushes = flush_counter(&mut vm, "app");

    set(&data, "markup", Value::from("<i>plain</i>"));
    vm.run_until_idle().unwrap();
    assert_eq!(flushes.get(), 1);
    assert_eq!(vm.controller_count("app"), 1);
}

#[test]
fn test_page_templates_are_includable() {
    let mut vm = Vm::new(Document::parse(
        r#"<script type="text/template" id="row"><li><%= self %></li></script>
           <div vm-controller="list"><ul id=ul vm-html="items.length"><script type="text/template"><% for item in items { %><% include("row", item); %><% } %></script></ul></div>"#,
    ));
    let data = vm.define("list", Value::from(json!({"items": ["a"]}))).unwrap();
    vm.run_until_idle().unwrap();
    let ul = element(&vm, "ul");
    assert_eq!(vm.document().inner_html(ul), "<li>a</li>");

    data.get_property("items").as_list().unwrap().push(Value::from("b")).unwrap();
    vm.run_until_idle().unwrap();
    assert_eq!(vm.document().inner_html(ul), "<li>a</li><li>b</li>");
}

#[test]
fn test_nested_controllers_keep_their_own_data() {
    let mut vm = Vm::new(Document::parse(
        r#"<div vm-controller="outer"><p id=o vm-html="title"></p>
             <section vm-controller="inner"><p id=n vm-html="title"></p></section>
           </div>"#,
    ));
    assert_eq!(vm.controller_names(), vec!["outer".to_string(), "inner".to_string()]);

    vm.define("outer", Value::from(json!({"title": "out"}))).unwrap();
    vm.define("inner", Value::from(json!({"title": "in"}))).unwrap();
    vm.run_until_idle().unwrap();

    assert_eq!(text(&vm, "o"), "out");
    assert_eq!(text(&vm, "n"), "in");
    assert_eq!(vm.controller_count("outer"), 1);
    assert_eq!(vm.controller_count("inner"), 1);
}

#[test]
fn test_redefine_rebinds_to_new_data() {
    let mut vm = Vm::new(Document::parse(FORM));
    let first = vm.define("app", Value::from(json!({"msg": "first"}))).unwrap();
    vm.run_until_idle().unwrap();

    let second = vm.define("app", Value::from(json!({"msg": "second"}))).unwrap();
    vm.run_until_idle().unwrap();
    assert_eq!(text(&vm, "p"), "second");
    assert_eq!(vm.controller_count("app"), 2);
    assert_eq!(vm.document().listener_count(element(&vm, "i"), "input"), 1);

    set(&first, "msg", Value::from("stale"));
    assert_eq!(vm.pending_tasks(), 0);
    vm.run_until_idle().unwrap();
    assert_eq!(text(&vm, "p"), "second");

    vm.input(element(&vm, "i"), "typed");
    assert_eq!(second.get_property("msg"), Value::from("typed"));
    assert_eq!(first.get_property("msg"), Value::from("stale"));
}

#[test]
fn test_redefine_with_same_data_attaches_once() {
    let mut vm = Vm::new(Document::parse(FORM));
    let data = vm.define("app", Value::from(json!({"msg": "a"}))).unwrap();
    vm.define("app", data.clone()).unwrap();
    vm.run_until_idle().unwrap();
    assert_eq!(data.as_object().unwrap().subscriber_count(), 1);

    let flushes = flush_counter(&mut vm, "app");
    set(&data, "msg", Value::from("b"));
    vm.run_until_idle().unwrap();
    assert_eq!(flushes.get(), 1);
    assert_eq!(text(&vm, "p"), "b");
}

#[test]
fn test_data_hooks_are_callable_from_handlers() {
    let mut vm = Vm::new(Document::parse(
        r#"<div vm-controller="app"><a id=a vm-on-click="|e| self.__update__()"></a></div>"#,
    ));
    vm.define("app", Value::from(json!({}))).unwrap();
    vm.run_until_idle().unwrap();
    let flushes = flush_counter(&mut vm, "app");

    vm.click(element(&vm, "a"));
    assert_eq!(vm.pending_tasks(), 1);
    vm.run_until_idle().unwrap();
    assert_eq!(flushes.get(), 1);
}

#[test]
fn test_unknown_controller_errors() {
    let mut vm = Vm::new(Document::parse(FORM));
    assert!(matches!(
        vm.add_observe_listener("ghost", |_| {}),
        Err(VmError::UnknownController { .. })
    ));
    assert!(matches!(vm.sweep("ghost"), Err(VmError::UnknownController { .. })));
    assert!(vm.data("ghost").is_none());
}
