//! Deferred printing: the async print is submitted first but lands second.
//!
//! Prints `doesn't matter. Sometimes the order` three times, once per way of
//! reaching the bindings. Runs cooperatively unless `BATON_SCHEDULING` says
//! otherwise; on a thread pool the two halves of a line may swap.

use baton::prelude::*;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

fn then(f: impl Fn() -> baton::Result<Value> + 'static) -> Value {
    Value::Function(Function::new(move |_| Ok(f()?)))
}

fn main() -> baton::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::from_env()?;
    if std::env::var_os(Config::ENV_SCHEDULING).is_none() {
        config.scheduling_model = SchedulingModel::Cooperative;
    }
    let ev = Rc::new(EventLoop::new(config)?);
    let hello = Rc::new(HelloBindings::stdout());

    // print, then printSync from the callback
    {
        let (h, cx) = (hello.clone(), ev.clone());
        hello.print(
            &ev,
            &[
                "Sometimes the ".into(),
                then(move || h.print_sync(&cx, &["order\n".into()])),
            ],
        )?;
        hello.print_sync(&ev, &["doesn't matter. ".into()])?;
    }

    // run the first round to completion so the rounds don't interleave
    ev.run()?;

    {
        let (h, cx) = (hello.clone(), ev.clone());
        hello.print_either(
            &ev,
            &[
                "Sometimes the ".into(),
                then(move || {
                    let done = Value::Function(Function::new(|_| Ok(Value::Undefined)));
                    h.print_either(&cx, &["order\n".into(), done])
                }),
            ],
        )?;
        hello.print_either(&ev, &["doesn't matter. ".into()])?;
    }

    ev.run()?;

    // the same thing without the host bindings
    let cx = ev.clone();
    ev.submit(
        "Sometimes the ".to_string(),
        |text: String| {
            print!("{text}");
            Ok::<_, BoxError>(())
        },
        move |_| {
            cx.run_sync("order\n", |text: &str| {
                print!("{text}");
                Ok::<_, BoxError>(())
            })
        },
    )?;
    ev.run_sync("doesn't matter. ", |text: &str| {
        print!("{text}");
        Ok::<_, BoxError>(())
    })?;

    ev.run()?;

    tracing::info!(metrics = ?ev.metrics(), "done");
    Ok(())
}
