#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use crate::element::Props;
    use crate::error::{HookError, RenderError, WorkLoopError};
    use crate::fiber::{FiberId, FiberNode, WorkTag};
    use crate::hooks::ScheduleUpdate;
    use crate::memory::{HostOp, MemNode, MemoryHost, OpLog};
    use crate::root::{FiberRootNode, Root, RootOptions, create_container_with};
    use crate::update_queue::*;
    use crate::work_loop::RenderOutcome;
    use crate::{Dispatch, Element, Node, h};

    fn setup_with(options: RootOptions) -> (Root<MemoryHost>, MemNode, OpLog) {
        let _ = env_logger::builder().is_test(true).try_init();
        let host = MemoryHost::new();
        let log = host.op_log();
        let container = MemNode::container();
        let root = create_container_with(host, container.clone(), options);
        (root, container, log)
    }

    fn setup() -> (Root<MemoryHost>, MemNode, OpLog) {
        setup_with(RootOptions::default())
    }

    type Slot<S> = Rc<RefCell<Option<Dispatch<S>>>>;

    /// `<p>{count}</p>` component that leaks its setter into `slot`.
    fn counter(slot: Slot<i32>) -> Element {
        Element::component(move |hooks, _props| {
            let (count, set_count) = hooks.use_state(0)?;
            *slot.borrow_mut() = Some(set_count);
            Ok(h("p").child(count).into())
        })
    }

    fn dispatcher<S: 'static>(slot: &Slot<S>) -> Dispatch<S> {
        slot.borrow().clone().unwrap()
    }

    #[test]
    fn test_double_buffer_duality() {
        let (root, _container, _log) = setup();
        assert!(root.render(h("div")).is_committed());

        let first = root.inspect(|r| {
            let current = r.current();
            let alternate = r.fiber(current).unwrap().alternate.unwrap();
            assert_eq!(r.fiber(alternate).unwrap().alternate, Some(current));
            assert_eq!(r.work_in_progress(), None);
            assert_eq!(r.finished_work(), None);
            (current, alternate)
        });

        assert!(root.render(h("span")).is_committed());
        root.inspect(|r| {
            assert_eq!(r.current(), first.1);
            assert_eq!(r.fiber(r.current()).unwrap().alternate, Some(first.0));
        });
    }

    #[test]
    fn test_process_update_queue_is_pure() {
        let update = || create_update(Action::updater(|n: &i32| n * 10));
        let base = 4;
        let a = process_update_queue(base, Some(update()));
        let b = process_update_queue(base, Some(update()));
        assert_eq!(a, b);
        assert_eq!(a.memoized_state, 40);
        assert_eq!(base, 4);
        assert_eq!(process_update_queue(base, None).memoized_state, 4);
    }

    #[test]
    fn test_last_write_wins() {
        let mut queue = create_update_queue::<i32>();
        enqueue_update(&mut queue, create_update(Action::Replace(1)));
        enqueue_update(&mut queue, create_update(Action::Replace(2)));
        assert_eq!(queue.take_pending().len(), 1);

        enqueue_update(&mut queue, create_update(Action::updater(|n: &i32| n + 1)));
        enqueue_update(&mut queue, create_update(Action::Replace(7)));
        let folded = process_update_list(0, queue.take_pending());
        assert_eq!(folded.memoized_state, 7);
        assert!(!queue.has_pending());
    }

    #[test]
    fn test_ordered_queue_folds_left_to_right() {
        let mut queue = UpdateQueue::with_mode(QueueMode::Ordered);
        enqueue_update(&mut queue, create_update(Action::updater(|n: &i32| n + 1)));
        enqueue_update(&mut queue, create_update(Action::updater(|n: &i32| n + 1)));
        enqueue_update(&mut queue, create_update(Action::Replace(10)));
        enqueue_update(&mut queue, create_update(Action::updater(|n: &i32| n * 2)));
        assert_eq!(process_update_list(0, queue.take_pending()).memoized_state, 20);
    }

    #[test]
    fn test_mount_then_dispatch() {
        let (root, container, _log) = setup();
        let slot: Slot<i32> = Rc::default();
        assert!(root.render(counter(slot.clone())).is_committed());
        assert_eq!(container.to_markup(), "<p>0</p>");

        let outcome = dispatcher(&slot).update(|n| n + 1);
        assert!(outcome.is_committed());
        assert_eq!(container.to_markup(), "<p>1</p>");
    }

    #[test]
    fn test_replacement_vs_updater() {
        let (root, container, _log) = setup();
        let slot: Slot<i32> = Rc::default();
        root.render(counter(slot.clone()));

        dispatcher(&slot).set(5);
        assert_eq!(container.text_content(), "5");
        dispatcher(&slot).update(|n| n * 3);
        assert_eq!(container.text_content(), "15");
    }

    #[test]
    fn test_hook_positional_identity() {
        let (root, _container, _log) = setup();
        let seen: Rc<RefCell<Vec<(Dispatch<i32>, Dispatch<String>)>>> = Rc::default();
        let record = seen.clone();
        root.render(Element::component(move |hooks, _props| {
            let (count, set_count) = hooks.use_state(0)?;
            let (label, set_label) = hooks.use_state(String::from("x"))?;
            record.borrow_mut().push((set_count, set_label));
            Ok(h("p").child(format!("{label}{count}")).into())
        }));

        let (first_count, first_label) = seen.borrow()[0].clone();
        first_count.set(1);
        first_label.set("y".to_string());

        let seen = seen.borrow();
        assert_eq!(seen.len(), 3);
        for (count, label) in seen.iter() {
            assert_eq!(count, &first_count);
            assert_eq!(label, &first_label);
        }
    }

    #[test]
    fn test_root_state_is_replaced() {
        let (root, container, _log) = setup();
        root.render(h("a"));
        root.render(h("b"));
        assert_eq!(container.to_markup(), "<b></b>");
        root.inspect(|r| {
            assert!(matches!(r.root_state(), Some(Node::Element(e)) if e.element_type.name() == "b"));
        });
    }

    #[test]
    fn test_update_on_unmounted_fiber_is_unreachable() {
        let (root, container, log) = setup();
        let slot: Slot<i32> = Rc::default();
        root.render(counter(slot.clone()));
        let count = root.inspect(|r| r.fiber_count());

        root.render(Node::Empty);
        assert_eq!(container.to_markup(), "");
        log.take();

        let outcome = dispatcher(&slot).set(3);
        assert!(matches!(outcome, RenderOutcome::Unreachable));
        assert!(log.is_empty());
        root.inspect(|r| assert!(r.fiber_count() < count));
    }

    #[test]
    fn test_unknown_fiber_is_unreachable() {
        let (root, _container, _log) = setup();
        root.render(h("div"));
        let outcome = root.schedule_update_on_fiber(crate::FiberId::default());
        assert!(matches!(outcome, RenderOutcome::Unreachable));
    }

    #[test]
    fn test_update_after_root_dropped_is_unreachable() {
        let (root, container, log) = setup();
        let slot: Slot<i32> = Rc::default();
        root.render(counter(slot.clone()));
        drop(root);
        log.take();

        let outcome = dispatcher(&slot).set(5);
        assert!(matches!(outcome, RenderOutcome::Unreachable));
        assert_eq!(container.to_markup(), "<p>0</p>");
        assert!(log.is_empty());
    }

    struct NoScheduler;

    impl ScheduleUpdate for NoScheduler {
        fn schedule_update_on_fiber(&self, _fiber: FiberId) -> RenderOutcome {
            RenderOutcome::Unreachable
        }
    }

    #[test]
    fn test_live_fiber_outside_root_is_unreachable() {
        let host = MemoryHost::new();
        let log = host.op_log();
        let mut root = FiberRootNode::new(
            host,
            MemNode::container(),
            RootOptions::default(),
            Rc::new(NoScheduler),
            Rc::default(),
        );
        let stray = root
            .fibers
            .alloc_persistent(FiberNode::new(WorkTag::HostRoot, Rc::new(Props::default()), None));
        let mut child = FiberNode::new(WorkTag::HostComponent, Rc::new(Props::default()), None);
        child.return_fiber = Some(stray);
        let child = root.fibers.alloc_persistent(child);

        assert!(matches!(root.schedule_update_on_fiber(child), RenderOutcome::Unreachable));
        assert_eq!(root.commit_count(), 0);
        assert!(root.fibers.contains(child));
        assert!(log.is_empty());
    }

    #[test]
    fn test_abort_retains_current_tree() {
        let (root, container, log) = setup();
        root.render(h("ul").with_children(vec![h("li").child("a").into()]));
        let (current, fibers) = root.inspect(|r| (r.current(), r.fiber_count()));
        log.take();

        let outcome = root.render(Element::component(|_hooks, _props| {
            Err(anyhow::anyhow!("boom"))?
        }));

        match outcome {
            RenderOutcome::Aborted(WorkLoopError::Render { source, .. }) => {
                assert!(matches!(source, RenderError::Component(_)));
            }
            other => panic!("expected render error, got {other:?}"),
        }
        assert_eq!(container.to_markup(), "<ul><li>a</li></ul>");
        assert!(log.mutations().is_empty());
        root.inspect(|r| {
            assert_eq!(r.current(), current);
            assert_eq!(r.work_in_progress(), None);
            assert_eq!(r.fiber_count(), fibers);
        });

        // the root recovers on the next update
        assert!(root.render(h("p")).is_committed());
        assert_eq!(container.to_markup(), "<p></p>");
    }

    #[test]
    fn test_panicking_component_aborts() {
        let (root, container, _log) = setup();
        root.render(h("div").child("ok"));
        let outcome = root.render(Element::component(|_hooks, _props| -> crate::RenderResult {
            panic!("component exploded")
        }));
        match outcome {
            RenderOutcome::Aborted(WorkLoopError::Panicked { message }) => {
                assert!(message.contains("component exploded"));
            }
            other => panic!("expected panic abort, got {other:?}"),
        }
        assert_eq!(container.to_markup(), "<div>ok</div>");
    }

    #[test]
    fn test_hook_count_change_aborts() {
        let (root, container, _log) = setup();
        let extra = Rc::new(Cell::new(false));
        let flag = extra.clone();
        let element = Element::component(move |hooks, _props| {
            let (a, _) = hooks.use_state(1)?;
            if flag.get() {
                hooks.use_state(2)?;
            }
            Ok(h("i").child(a).into())
        });

        assert!(root.render(element.clone()).is_committed());
        extra.set(true);
        let outcome = root.render(element.clone());
        assert!(matches!(
            outcome.error(),
            Some(WorkLoopError::Render {
                source: RenderError::Hook(HookError::RenderedMoreHooks { index: 1 }),
                ..
            })
        ));
        assert_eq!(container.to_markup(), "<i>1</i>");

        extra.set(false);
        assert!(root.render(element).is_committed());
    }

    #[test]
    fn test_hook_type_change_aborts() {
        let (root, _container, _log) = setup();
        let as_text = Rc::new(Cell::new(false));
        let flag = as_text.clone();
        let element = Element::component(move |hooks, _props| {
            if flag.get() {
                hooks.use_state(String::new())?;
            } else {
                hooks.use_state(0u8)?;
            }
            Ok(Node::Empty)
        });
        root.render(element.clone());
        as_text.set(true);
        let outcome = root.render(element);
        assert!(matches!(
            outcome.error(),
            Some(WorkLoopError::Render {
                source: RenderError::Hook(HookError::TypeMismatch { index: 0, .. }),
                ..
            })
        ));
    }

    #[test]
    fn test_nested_update_limit() {
        let (root, _container, _log) = setup_with(RootOptions::default().with_nested_update_limit(5));
        let renders = Rc::new(Cell::new(0));
        let counter = renders.clone();
        let outcome = root.render(Element::component(move |hooks, _props| {
            counter.set(counter.get() + 1);
            let (n, set_n) = hooks.use_state(0)?;
            let deferred = set_n.set(n + 1);
            assert!(matches!(deferred, RenderOutcome::Deferred));
            Ok(Node::Empty)
        }));

        assert!(matches!(
            outcome,
            RenderOutcome::Aborted(WorkLoopError::NestedUpdateLimit { limit: 5 })
        ));
        assert_eq!(renders.get(), 6);
        assert_eq!(root.flush_deferred().map(|o| o.is_committed()), None);
    }

    #[test]
    fn test_dispatch_during_inspect_is_deferred() {
        let (root, container, _log) =
            setup_with(RootOptions::default().with_queue_mode(QueueMode::Ordered));
        let slot: Slot<i32> = Rc::default();
        root.render(counter(slot.clone()));

        let set_count = dispatcher(&slot);
        root.inspect(|_| {
            for _ in 0..3 {
                assert!(matches!(set_count.update(|n| n + 1), RenderOutcome::Deferred));
            }
        });
        assert_eq!(container.text_content(), "3");
    }

    #[test]
    fn test_last_write_wins_through_root() {
        let (root, container, _log) = setup();
        let slot: Slot<i32> = Rc::default();
        root.render(counter(slot.clone()));

        let set_count = dispatcher(&slot);
        root.inspect(|_| {
            set_count.update(|n| n + 1);
            set_count.update(|n| n + 1);
            set_count.set(9);
        });
        assert_eq!(container.text_content(), "9");
    }

    #[test]
    fn test_update_container_while_rendering_is_rejected() {
        let (root, _container, _log) = setup();
        let handle: Rc<RefCell<Option<Root<MemoryHost>>>> = Rc::default();
        let rejected = Rc::new(Cell::new(false));
        *handle.borrow_mut() = Some(root.clone());

        let (inner, seen) = (handle.clone(), rejected.clone());
        let outcome = root.render(Element::component(move |_hooks, _props| {
            if let Some(root) = inner.borrow().as_ref() {
                seen.set(matches!(root.render(h("nope")), RenderOutcome::Rejected));
            }
            Ok(h("yes").into())
        }));
        handle.borrow_mut().take();

        assert!(outcome.is_committed());
        assert!(rejected.get());
    }

    #[test]
    fn test_keyed_reorder_moves_nodes() {
        let (root, container, log) = setup();
        let list = |keys: &[&str]| {
            h("ul").with_children(keys.iter().map(|k| h("li").key(*k).child(*k).into()))
        };
        root.render(list(&["a", "b", "c"]));
        let before = container.find_by_tag("ul").unwrap().children();
        log.take();

        root.render(list(&["c", "a", "b"]));
        let after = container.find_by_tag("ul").unwrap().children();
        assert_eq!(container.to_markup(), "<ul><li>c</li><li>a</li><li>b</li></ul>");
        assert_eq!(after[0], before[2]);
        assert_eq!(after[1], before[0]);
        assert_eq!(after[2], before[1]);

        let ops = log.take();
        assert!(!ops.iter().any(|op| matches!(op, HostOp::CreateInstance { .. })));
        assert_eq!(
            ops.iter()
                .filter(|op| matches!(op, HostOp::AppendChild { .. } | HostOp::InsertBefore { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_keyed_insert_in_middle() {
        let (root, container, log) = setup();
        let list = |keys: &[&str]| {
            h("ul").with_children(keys.iter().map(|k| h("li").key(*k).child(*k).into()))
        };
        root.render(list(&["a", "c"]));
        log.take();
        root.render(list(&["a", "b", "c"]));
        assert_eq!(container.to_markup(), "<ul><li>a</li><li>b</li><li>c</li></ul>");
        assert!(
            log.mutations()
                .iter()
                .any(|op| matches!(op, HostOp::InsertBefore { .. }))
        );
    }

    #[test]
    fn test_empty_holes_keep_positions() {
        let (root, container, _log) = setup();
        root.render(Node::list(vec![h("a").into(), Node::Empty, h("c").into()]));
        let c = container.find_by_tag("c").unwrap();
        root.render(Node::list(vec![h("a").into(), h("b").into(), h("c").into()]));
        assert_eq!(container.to_markup(), "<a></a><b></b><c></c>");
        assert_eq!(container.find_by_tag("c").unwrap(), c);
    }

    #[test]
    fn test_removed_children_are_freed() {
        let (root, container, _log) = setup();
        let items = |n: usize| h("ol").with_children((0..n).map(|i| h("li").child(i.to_string()).into()));
        root.render(items(4));
        let grown = root.inspect(|r| r.fiber_count());

        root.render(items(1));
        assert_eq!(container.to_markup(), "<ol><li>0</li></ol>");
        root.inspect(|r| {
            assert!(r.fiber_count() < grown);
            assert!(r.last_commit_stats().unwrap().fibers_freed >= 6);
        });
    }

    #[test]
    fn test_text_and_attribute_updates() {
        let (root, container, log) = setup();
        root.render(h("p").attr("class", "a").child("one"));
        log.take();
        root.render(h("p").attr("class", "b").child("two"));

        assert_eq!(container.to_markup(), r#"<p class="b">two</p>"#);
        let ops = log.mutations();
        assert!(ops.iter().any(|op| matches!(op, HostOp::CommitUpdate { .. })));
        assert!(ops.iter().any(|op| matches!(op, HostOp::CommitTextUpdate { text, .. } if text == "two")));
        assert_eq!(ops.len(), 2);
    }

    #[test]
    fn test_type_change_replaces_node() {
        let (root, container, _log) = setup();
        root.render(h("div").child(h("span").child("x")));
        root.render(h("div").child(h("em").child("x")));
        assert_eq!(container.to_markup(), "<div><em>x</em></div>");
    }

    fn labelled(label: &str) -> Element {
        let label = label.to_string();
        Element::component(move |hooks, _props| {
            let (renders, _) = hooks.use_state(0u8)?;
            Ok(h("p").attr("n", renders.to_string()).child(label.clone()).into())
        })
    }

    #[test]
    fn test_reused_component_runs_latest_closure() {
        let (root, container, _log) = setup();
        root.render(labelled("first"));
        let p = container.find_by_tag("p").unwrap();

        root.render(labelled("second"));
        root.render(labelled("third"));
        assert_eq!(container.to_markup(), r#"<p n="0">third</p>"#);
        assert_eq!(container.find_by_tag("p").unwrap(), p);

        let list = |a: &str, b: &str| {
            Node::list(vec![
                labelled(a).key("a").into(),
                labelled(b).key("b").into(),
            ])
        };
        root.render(list("one", "two"));
        root.render(list("uno", "dos"));
        assert_eq!(container.to_markup(), r#"<p n="0">uno</p><p n="0">dos</p>"#);
    }

    #[test]
    fn test_duplicate_keys_drop_shadowed_child() {
        let (root, container, _log) = setup();
        let li = |t: &str| Node::from(h("li").key("x").child(t.to_string()));
        root.render(h("ul").with_children(vec![li("a"), li("b")]));
        assert_eq!(container.to_markup(), "<ul><li>a</li><li>b</li></ul>");

        root.render(h("ul").with_children(vec![li("c")]));
        assert_eq!(container.to_markup(), "<ul><li>c</li></ul>");
        root.inspect(|r| {
            assert!(r.last_commit_stats().unwrap().fibers_freed >= 2);
        });

        root.render(h("ul"));
        assert_eq!(container.to_markup(), "<ul></ul>");
    }

    #[test]
    fn test_reducer_hook() {
        let (root, container, _log) = setup();
        let slot: Rc<RefCell<Option<crate::ReducerDispatch<i32, &'static str>>>> = Rc::default();
        let leak = slot.clone();
        root.render(Element::component(move |hooks, _props| {
            let (n, dispatch) = hooks.use_reducer(
                |n: &i32, action: &&'static str| match *action {
                    "inc" => n + 1,
                    "dec" => n - 1,
                    _ => *n,
                },
                10,
            )?;
            *leak.borrow_mut() = Some(dispatch);
            Ok(h("b").child(n).into())
        }));

        let dispatch = slot.borrow().clone().unwrap();
        dispatch.dispatch("inc");
        dispatch.dispatch("inc");
        dispatch.dispatch("dec");
        assert_eq!(container.text_content(), "11");
    }

    #[test]
    fn test_component_children_are_placed_in_order() {
        let (root, container, _log) = setup();
        let show = Rc::new(Cell::new(false));
        let flag = show.clone();
        let middle = Element::component(move |_hooks, _props| {
            Ok(if flag.get() {
                Node::list(vec![h("x").into(), h("y").into()])
            } else {
                Node::Empty
            })
        });
        let tree = h("div").with_children(vec![h("a").into(), middle.into(), h("z").into()]);

        root.render(tree.clone());
        assert_eq!(container.to_markup(), "<div><a></a><z></z></div>");
        show.set(true);
        root.render(tree);
        assert_eq!(container.to_markup(), "<div><a></a><x></x><y></y><z></z></div>");
    }
}
