use baton::prelude::*;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

fn pool_loop(threads: usize) -> EventLoop {
    let config = Config::builder().num_threads(threads).build().unwrap();
    EventLoop::new(config).unwrap()
}

fn counting_callback(hits: &Rc<Cell<usize>>) -> Value {
    let hits = hits.clone();
    Value::Function(Function::new(move |args| {
        assert!(args.is_empty(), "print callback gets no arguments on success");
        hits.set(hits.get() + 1);
        Ok(Value::Undefined)
    }))
}

#[test]
fn test_run_sync_prints_and_returns() {
    let (output, captured) = Output::capture();
    let hello = HelloBindings::new(output);
    let ev = EventLoop::cooperative().unwrap();

    let ret = hello.print_sync(&ev, &["hello".into()]).unwrap();
    assert!(ret.is_undefined());
    assert_eq!(captured.contents(), "hello");
    assert_eq!(ev.liveness().registrations(), 0);
}

#[test]
fn test_submit_returns_before_output_and_callback() {
    let (output, captured) = Output::capture();
    let hello = HelloBindings::new(output);
    let ev = pool_loop(2);
    let hits = Rc::new(Cell::new(0));

    hello
        .print(&ev, &["hello".into(), counting_callback(&hits)])
        .unwrap();

    assert_eq!(hits.get(), 0);
    assert_eq!(ev.outstanding(), 1);

    ev.run().unwrap();

    assert_eq!(captured.contents(), "hello");
    assert_eq!(hits.get(), 1);
    assert_eq!(ev.outstanding(), 0);
}

#[test]
fn test_non_string_payload_is_rejected_synchronously() {
    let (output, captured) = Output::capture();
    let hello = HelloBindings::new(output);
    let ev = pool_loop(1);
    let hits = Rc::new(Cell::new(0));

    let err = hello
        .print(&ev, &[Value::Number(42.0), counting_callback(&hits)])
        .unwrap_err();

    assert!(err.is_invalid_argument());
    assert_eq!(err.to_string(), "first argument must be a string");

    ev.run().unwrap();
    assert_eq!(hits.get(), 0);
    assert!(captured.is_empty());
    assert_eq!(ev.liveness().registrations(), 0);
    if cfg!(feature = "telemetry") {
        assert_eq!(ev.metrics().tasks_submitted, 0);
    }
}

#[test]
fn test_failing_callback_reaches_fault_channel_without_leaking() {
    let (output, captured) = Output::capture();
    let hello = HelloBindings::new(output);

    for ev in [pool_loop(2), EventLoop::cooperative().unwrap()] {
        let throws = Value::Function(Function::new(|_| Err("callback exploded".into())));
        hello.print(&ev, &["x".into(), throws]).unwrap();

        let err = ev.run().unwrap_err();
        assert!(err.is_callback_failure());
        assert_eq!(err.to_string(), "callback failed: callback exploded");

        assert_eq!(ev.outstanding(), 0);
        assert_eq!(ev.liveness().registrations(), ev.liveness().releases());
        assert_eq!(ev.fault_count(), 1);
    }

    assert_eq!(captured.contents(), "xx");
}

#[test]
fn test_fault_handler_keeps_the_loop_running() {
    let ev = pool_loop(2);
    let faults = Rc::new(RefCell::new(Vec::new()));
    let f = faults.clone();
    ev.set_fault_handler(move |err| f.borrow_mut().push(err.to_string()));

    let delivered = Rc::new(Cell::new(0));
    for i in 0..6u32 {
        let delivered = delivered.clone();
        ev.submit(i, |n| Ok::<_, BoxError>(n), move |n| {
            delivered.set(delivered.get() + 1);
            if n? % 2 == 0 {
                return Err::<(), BoxError>("even".into());
            }
            Ok(())
        })
        .unwrap();
    }

    ev.run().unwrap();
    assert_eq!(delivered.get(), 6);
    assert_eq!(faults.borrow().len(), 3);
    assert_eq!(ev.fault_count(), 3);
    if cfg!(feature = "telemetry") {
        assert_eq!(ev.metrics().callback_failures, 3);
    }
}

#[test]
fn test_fault_handler_can_uninstall_itself() {
    let ev = Rc::new(EventLoop::cooperative().unwrap());
    let calls = Rc::new(Cell::new(0));
    let (c, weak) = (calls.clone(), Rc::downgrade(&ev));
    ev.set_fault_handler(move |_| {
        c.set(c.get() + 1);
        if let Some(ev) = weak.upgrade() {
            ev.clear_fault_handler();
        }
    });

    for name in ["first", "second"] {
        ev.submit(name, |n| Ok::<_, BoxError>(n), |n| {
            Err::<(), BoxError>(n?.into())
        })
        .unwrap();
    }

    let err = ev.run().unwrap_err();
    assert!(err.is_callback_failure());
    assert_eq!(err.to_string(), "callback failed: second");
    assert_eq!(calls.get(), 1);
    assert_eq!(ev.fault_count(), 2);
    assert_eq!(ev.outstanding(), 0);
}

#[test]
fn test_panicking_callback_is_a_callback_failure() {
    let ev = EventLoop::cooperative().unwrap();
    ev.submit((), |_| Ok::<_, BoxError>(()), |_| -> std::result::Result<(), BoxError> {
        panic!("callback panicked")
    })
    .unwrap();

    let err = ev.run().unwrap_err();
    assert!(err.is_callback_failure());
    assert_eq!(ev.outstanding(), 0);
    assert_eq!(ev.panic_count(), 1);
}

#[test]
fn test_thousand_concurrent_submits_echo_their_payloads() {
    let ev = pool_loop(4);
    let results: Rc<RefCell<HashMap<TaskId, String>>> = Rc::new(RefCell::new(HashMap::new()));
    let mut expected = HashMap::new();

    for i in 0..1000 {
        let payload = format!("payload-{i}");
        let results = results.clone();
        let slot = Rc::new(Cell::new(None));
        let s = slot.clone();
        let handle = ev
            .submit(payload.clone(), |p: String| Ok::<_, BoxError>(p), move |out| {
                let id = s.get().expect("handle id recorded before delivery");
                results.borrow_mut().insert(id, out?);
                Ok::<_, BoxError>(())
            })
            .unwrap();
        slot.set(Some(handle.id()));
        expected.insert(handle.id(), payload);
    }

    assert_eq!(ev.outstanding(), 1000);
    ev.run().unwrap();

    let results = results.borrow();
    assert_eq!(results.len(), 1000);
    assert_eq!(*results, expected);

    if cfg!(feature = "telemetry") {
        let metrics = ev.metrics();
        assert_eq!(metrics.tasks_submitted, 1000);
        assert_eq!(metrics.tasks_completed, 1000);
    }
    assert_eq!(ev.liveness().registrations(), 1000);
    assert_eq!(ev.liveness().releases(), 1000);
}

#[test]
fn test_each_completion_follows_its_own_submission() {
    let ev = pool_loop(4);
    let submitted = Rc::new(RefCell::new(Vec::new()));
    let order = Rc::new(RefCell::new(Vec::new()));

    for i in 0..20u64 {
        let submitted_at = submitted.clone();
        let order = order.clone();
        ev.submit(
            i,
            move |n| {
                // later tasks finish first
                std::thread::sleep(Duration::from_millis(20 - n));
                Ok::<_, BoxError>(n)
            },
            move |n| {
                let n = n?;
                assert!(submitted_at.borrow().contains(&n));
                order.borrow_mut().push(n);
                Ok::<_, BoxError>(())
            },
        )
        .unwrap();
        submitted.borrow_mut().push(i);
    }

    ev.run().unwrap();
    let mut seen = order.borrow().clone();
    seen.sort_unstable();
    assert_eq!(seen, (0..20).collect::<Vec<_>>());
}

#[test]
fn test_handle_tracks_lifecycle() {
    let ev = pool_loop(1);
    let (tx, rx) = crossbeam_channel::bounded::<()>(0);

    let handle = ev
        .submit(
            (),
            move |_| {
                // hold the worker until the test has observed Running
                let _ = rx.recv();
                Ok::<_, BoxError>(())
            },
            |_| Ok::<_, BoxError>(()),
        )
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while handle.state() != TaskState::Running && Instant::now() < deadline {
        std::thread::yield_now();
    }
    assert_eq!(handle.state(), TaskState::Running);
    assert!(!handle.is_delivered());

    tx.send(()).unwrap();
    ev.run().unwrap();

    assert_eq!(handle.state(), TaskState::Completed);
    assert!(handle.is_finished());
    assert!(handle.is_delivered());
}

#[test]
fn test_cooperative_work_waits_for_next_turn() {
    let (output, captured) = Output::capture();
    let hello = HelloBindings::new(output);
    let ev = EventLoop::cooperative().unwrap();
    let hits = Rc::new(Cell::new(0));

    hello
        .print(&ev, &["later".into(), counting_callback(&hits)])
        .unwrap();
    hello.print_sync(&ev, &["now ".into()]).unwrap();

    assert_eq!(captured.contents(), "now ");
    assert_eq!(ev.turn().unwrap(), 1);
    assert_eq!(captured.contents(), "now later");
    assert_eq!(hits.get(), 1);
}

#[test]
fn test_callbacks_can_submit_more_work() {
    let (output, captured) = Output::capture();
    let hello = Rc::new(HelloBindings::new(output));
    let ev = Rc::new(EventLoop::cooperative().unwrap());

    let h = hello.clone();
    let inner_loop = ev.clone();
    let chain = Value::Function(Function::new(move |_| {
        h.print_sync(&inner_loop, &["order\n".into()])?;
        Ok(Value::Undefined)
    }));

    hello.print(&ev, &["Sometimes the ".into(), chain]).unwrap();
    hello.print_sync(&ev, &["doesn't matter. ".into()]).unwrap();

    ev.run().unwrap();
    assert_eq!(captured.contents(), "doesn't matter. Sometimes the order\n");
}

#[test]
fn test_nested_async_print_keeps_loop_alive() {
    let (output, captured) = Output::capture();
    let hello = Rc::new(HelloBindings::new(output));
    let ev = Rc::new(EventLoop::cooperative().unwrap());

    let h = hello.clone();
    let inner_loop = ev.clone();
    let chain = Value::Function(Function::new(move |_| {
        let done = Value::Function(Function::new(|_| Ok(Value::Undefined)));
        h.print_either(&inner_loop, &["second".into(), done])?;
        Ok(Value::Undefined)
    }));

    hello.print_either(&ev, &["first ".into(), chain]).unwrap();
    ev.run().unwrap();

    assert_eq!(captured.contents(), "first second");
    assert_eq!(ev.outstanding(), 0);
    assert_eq!(ev.liveness().registrations(), 2);
}

#[test]
fn test_shutdown_still_delivers_submitted_work() {
    let ev = pool_loop(2);
    let hits = Rc::new(Cell::new(0));
    let h = hits.clone();
    ev.submit((), |_| Ok::<_, BoxError>(()), move |_| {
        h.set(h.get() + 1);
        Ok::<_, BoxError>(())
    })
    .unwrap();

    ev.shutdown();
    assert!(matches!(
        ev.submit((), |_| Ok::<_, BoxError>(()), |_| Ok::<_, BoxError>(())),
        Err(Error::Shutdown)
    ));

    ev.run().unwrap();
    assert_eq!(hits.get(), 1);
}

#[test]
fn test_points_through_handles() {
    let mut points = Points::new();
    let p = points
        .construct(&[Value::Number(3.0), Value::Number(1.0)])
        .unwrap();
    assert_eq!(points.x(p).unwrap(), 3.0);
    assert_eq!(points.y(p).unwrap(), 1.0);

    let p2 = points
        .construct(&[Value::Number(1.0), Value::Number(1.0)])
        .unwrap();
    let norm = points.normalized(p2).unwrap();
    assert_eq!((points.x(norm).unwrap() * 1000.0).floor() / 1000.0, 0.707);
    assert_eq!((points.y(norm).unwrap() * 1000.0).floor() / 1000.0, 0.707);

    let bits = norm.to_bits();
    points.release(norm).unwrap();
    assert!(points
        .x(baton::memory::Handle::from_bits(bits))
        .unwrap_err()
        .is_invalid_argument());
}

#[test]
fn test_config_from_env_defaults() {
    // nothing in the test environment sets BATON_*
    if std::env::var_os(Config::ENV_NUM_THREADS).is_none()
        && std::env::var_os(Config::ENV_SCHEDULING).is_none()
        && std::env::var_os(Config::ENV_THREAD_PREFIX).is_none()
    {
        let config = Config::from_env().unwrap();
        assert_eq!(config.scheduling_model, SchedulingModel::ThreadPool);
        assert_eq!(config.thread_name_prefix, "baton-worker");
    }
}
