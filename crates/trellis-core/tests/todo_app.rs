//! A keyed todo list driven through the public API and the in-memory host.

use trellis_core::*;

#[derive(Clone, Debug, PartialEq)]
struct Todo {
    id: u32,
    label: String,
    done: bool,
}

enum Msg {
    Add(String),
    Toggle(u32),
    Remove(u32),
    Reverse,
}

fn reduce(todos: &Vec<Todo>, msg: &Msg) -> Vec<Todo> {
    let mut next = todos.clone();
    match msg {
        Msg::Add(label) => {
            let id = todos.iter().map(|t| t.id).max().unwrap_or(0) + 1;
            next.push(Todo {
                id,
                label: label.clone(),
                done: false,
            });
        }
        Msg::Toggle(id) => {
            if let Some(todo) = next.iter_mut().find(|t| t.id == *id) {
                todo.done = !todo.done;
            }
        }
        Msg::Remove(id) => next.retain(|t| t.id != *id),
        Msg::Reverse => next.reverse(),
    }
    next
}

fn todo_item(_hooks: &mut Hooks<'_>, props: &Props) -> RenderResult {
    let label = props.get_str("label").unwrap_or_default().to_string();
    let done = matches!(props.get("done"), Some(PropValue::Bool(true)));
    let id = props.get_str("data-id").unwrap_or_default().to_string();

    let mut toggle = h("span").child(label);
    if let Some(cb) = props.callback("on_toggle") {
        toggle = toggle.on("click", move || cb());
    }
    let mut remove = h("button").attr("class", "remove").child("x");
    if let Some(cb) = props.callback("on_remove") {
        remove = remove.on("click", move || cb());
    }

    Ok(h("li")
        .attr("data-id", id)
        .attr("class", if done { "done" } else { "pending" })
        .with_children(vec![toggle.into(), remove.into()])
        .into())
}

fn todo_app(hooks: &mut Hooks<'_>, _props: &Props) -> RenderResult {
    let initial = vec![
        Todo {
            id: 1,
            label: "write".into(),
            done: false,
        },
        Todo {
            id: 2,
            label: "test".into(),
            done: false,
        },
    ];
    let (todos, dispatch) = hooks.use_reducer(reduce, initial)?;
    let (draft, set_draft) = hooks.use_state(String::from("ship"))?;

    let items: Vec<Node> = todos
        .iter()
        .map(|todo| {
            let (on_toggle, on_remove) = (dispatch.clone(), dispatch.clone());
            let id = todo.id;
            Element::component(todo_item)
                .key(id.to_string())
                .attr("data-id", id.to_string())
                .attr("label", todo.label.as_str())
                .attr("done", todo.done)
                .on("on_toggle", move || {
                    on_toggle.dispatch(Msg::Toggle(id));
                })
                .on("on_remove", move || {
                    on_remove.dispatch(Msg::Remove(id));
                })
                .into()
        })
        .collect();

    let add = {
        let dispatch = dispatch.clone();
        move || {
            dispatch.dispatch(Msg::Add(draft.clone()));
            set_draft.update(|d| format!("{d}!"));
        }
    };
    let reverse = move || {
        dispatch.dispatch(Msg::Reverse);
    };

    let left = todos.iter().filter(|t| !t.done).count();
    Ok(h("section")
        .with_children(vec![
            h("h1").child(format!("{left} left")).into(),
            h("ul").with_children(items).into(),
            h("button").attr("id", "add").on("click", add).child("add").into(),
            h("button").attr("id", "reverse").on("click", reverse).child("reverse").into(),
        ])
        .into())
}

fn mount() -> (Root<MemoryHost>, MemNode, OpLog) {
    let _ = env_logger::builder().is_test(true).try_init();
    let host = MemoryHost::new();
    let log = host.op_log();
    let container = MemNode::container();
    let root = create_container(host, container.clone());
    assert!(root.render(Element::component(todo_app)).is_committed());
    (root, container, log)
}

fn item(container: &MemNode, id: &str) -> MemNode {
    container.find_by_attr("data-id", id).unwrap()
}

fn labels(container: &MemNode) -> Vec<String> {
    container
        .find_by_tag("ul")
        .unwrap()
        .children()
        .iter()
        .map(|li| li.find_by_tag("span").unwrap().text_content())
        .collect()
}

#[test]
fn test_initial_render() {
    let (_root, container, log) = mount();
    assert_eq!(labels(&container), ["write", "test"]);
    assert_eq!(container.find_by_tag("h1").unwrap().text_content(), "2 left");
    // everything but the final insertion is built detached
    let mutations = log.mutations();
    assert_eq!(mutations.len(), 1);
    assert!(matches!(mutations[0], HostOp::AppendChild { parent: 0, .. }));
}

#[test]
fn test_toggle_keeps_host_nodes() {
    let (_root, container, _log) = mount();
    let li = item(&container, "1");
    assert!(li.find_by_tag("span").unwrap().click());

    let after = item(&container, "1");
    assert_eq!(after, li);
    assert_eq!(
        after.attribute("class"),
        Some(PropValue::Str("done".into()))
    );
    assert_eq!(container.find_by_tag("h1").unwrap().text_content(), "1 left");
}

#[test]
fn test_add_and_remove() {
    let (root, container, log) = mount();
    let second = item(&container, "2");

    container.find_by_attr("id", "add").unwrap().click();
    assert_eq!(labels(&container), ["write", "test", "ship"]);
    container.find_by_attr("id", "add").unwrap().click();
    assert_eq!(labels(&container), ["write", "test", "ship", "ship!"]);
    assert_eq!(item(&container, "2"), second);

    log.take();
    item(&container, "1")
        .find_by_attr("class", "remove")
        .unwrap()
        .click();
    assert_eq!(labels(&container), ["test", "ship", "ship!"]);
    assert!(
        log.mutations()
            .iter()
            .any(|op| matches!(op, HostOp::RemoveChild { .. }))
    );
    root.inspect(|r| {
        let stats = r.last_commit_stats().unwrap();
        assert!(stats.fibers_freed > 0);
        assert_eq!(stats.fibers_allocated, 0);
    });
}

#[test]
fn test_reverse_moves_without_recreating() {
    let (_root, container, log) = mount();
    container.find_by_attr("id", "add").unwrap().click();
    let before: Vec<MemNode> = container.find_by_tag("ul").unwrap().children();
    log.take();

    container.find_by_attr("id", "reverse").unwrap().click();
    assert_eq!(labels(&container), ["ship", "test", "write"]);

    let after = container.find_by_tag("ul").unwrap().children();
    assert_eq!(after, before.into_iter().rev().collect::<Vec<_>>());
    let ops = log.take();
    assert!(!ops.iter().any(|op| matches!(
        op,
        HostOp::CreateInstance { .. } | HostOp::CreateText { .. }
    )));
}

#[test]
fn test_failed_render_keeps_app_interactive() {
    let (root, container, _log) = mount();
    let markup = container.to_markup();

    let outcome = root.render(Element::component(|_hooks, _props| {
        Err(anyhow::anyhow!("backend unavailable").into())
    }));
    assert!(outcome.is_aborted());
    assert!(
        outcome
            .error()
            .map(|e| std::error::Error::source(e).is_some())
            .unwrap_or(false)
    );
    assert_eq!(container.to_markup(), markup);

    container.find_by_attr("id", "add").unwrap().click();
    assert_eq!(labels(&container).len(), 3);
}
