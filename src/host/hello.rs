//! Greeting and print bindings.
//!
//! `print_sync` and `print` validate their positional arguments exactly like
//! the host expects and raise the same messages; `print_either` is the thin
//! wrapper that picks one of them based on whether a callback was given.

use super::output::Output;
use super::value::Value;
use crate::error::{BoxError, Error, Result};
use crate::runtime::EventLoop;

#[derive(Debug, Clone)]
pub struct HelloBindings {
    output: Output,
}

impl HelloBindings {
    pub fn new(output: Output) -> Self {
        Self { output }
    }

    pub fn stdout() -> Self {
        Self::new(Output::stdout())
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    /// `hello()` → `"world"`
    pub fn hello(&self, _args: &[Value]) -> Result<Value> {
        Ok(Value::from("world"))
    }

    /// `printSync(string)`
    pub fn print_sync(&self, cx: &EventLoop, args: &[Value]) -> Result<Value> {
        if args.len() != 1 {
            return Err(Error::invalid_argument("must provide one argument"));
        }
        let Some(text) = args[0].as_str() else {
            return Err(Error::invalid_argument("argument must be a string"));
        };

        let output = self.output.clone();
        cx.run_sync(text.to_owned(), move |text: String| output.write_str(&text))?;
        Ok(Value::Undefined)
    }

    /// `print(string, callback)`
    ///
    /// The callback is invoked with no arguments once the text has been
    /// written, or with a single error value if writing failed.
    pub fn print(&self, cx: &EventLoop, args: &[Value]) -> Result<Value> {
        if args.len() != 2 {
            return Err(Error::invalid_argument("must provide a string and a callback"));
        }
        let Some(text) = args[0].as_str() else {
            return Err(Error::invalid_argument("first argument must be a string"));
        };
        let Some(callback) = args[1].as_function() else {
            return Err(Error::invalid_argument("second argument must be a function"));
        };

        let callback = callback.clone();
        let output = self.output.clone();
        cx.submit(
            text.to_owned(),
            move |text: String| output.write_str(&text),
            move |written: Result<()>| -> std::result::Result<(), BoxError> {
                let args = match written {
                    Ok(()) => Vec::new(),
                    Err(e) => vec![Value::Error(e.to_string())],
                };
                callback.call(&args).map(drop)
            },
        )?;

        Ok(Value::Undefined)
    }

    /// `print(string, [callback])`: async when a callback is given, sync
    /// otherwise.
    pub fn print_either(&self, cx: &EventLoop, args: &[Value]) -> Result<Value> {
        let text = match args.first() {
            Some(v @ Value::String(_)) if v.is_truthy() => v.clone(),
            _ => {
                return Err(Error::invalid_argument(
                    "string must be specified and must be a string",
                ))
            }
        };

        match args.get(1) {
            Some(cb) if cb.is_truthy() => {
                if !cb.is_function() {
                    return Err(Error::invalid_argument("callback argument must be a function"));
                }
                self.print(cx, &[text, cb.clone()])
            }
            _ => self.print_sync(cx, &[text]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Function;
    use std::cell::Cell;
    use std::rc::Rc;

    fn setup() -> (EventLoop, HelloBindings, crate::host::Capture) {
        let (output, captured) = Output::capture();
        (
            EventLoop::cooperative().unwrap(),
            HelloBindings::new(output),
            captured,
        )
    }

    fn noop() -> Value {
        Value::Function(Function::new(|_| Ok(Value::Undefined)))
    }

    fn message(err: Error) -> String {
        match err {
            Error::InvalidArgument(msg) => msg,
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_hello_returns_world() {
        let (_, hello, _) = setup();
        match hello.hello(&[]).unwrap() {
            Value::String(s) => assert_eq!(s, "world"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_print_sync_validation() {
        let (ev, hello, captured) = setup();

        assert_eq!(message(hello.print_sync(&ev, &[]).unwrap_err()), "must provide one argument");
        assert_eq!(
            message(hello.print_sync(&ev, &["a".into(), "b".into()]).unwrap_err()),
            "must provide one argument"
        );
        assert_eq!(
            message(hello.print_sync(&ev, &[Value::Number(42.0)]).unwrap_err()),
            "argument must be a string"
        );
        assert!(captured.is_empty());

        hello.print_sync(&ev, &["hello".into()]).unwrap();
        assert_eq!(captured.contents(), "hello");
    }

    #[test]
    fn test_print_validation() {
        let (ev, hello, captured) = setup();

        assert_eq!(
            message(hello.print(&ev, &["x".into()]).unwrap_err()),
            "must provide a string and a callback"
        );
        assert_eq!(
            message(hello.print(&ev, &[Value::Number(42.0), noop()]).unwrap_err()),
            "first argument must be a string"
        );
        assert_eq!(
            message(hello.print(&ev, &["x".into(), "y".into()]).unwrap_err()),
            "second argument must be a function"
        );

        assert_eq!(ev.liveness().registrations(), 0);
        assert!(captured.is_empty());
    }

    #[test]
    fn test_print_calls_back_with_no_arguments() {
        let (ev, hello, captured) = setup();
        let argc = Rc::new(Cell::new(None));
        let a = argc.clone();
        let cb = Value::Function(Function::new(move |args| {
            a.set(Some(args.len()));
            Ok(Value::Undefined)
        }));

        hello.print(&ev, &["hello".into(), cb]).unwrap();
        assert!(captured.is_empty());
        assert_eq!(argc.get(), None);

        ev.run().unwrap();
        assert_eq!(captured.contents(), "hello");
        assert_eq!(argc.get(), Some(0));
    }

    #[test]
    fn test_print_either_dispatch() {
        let (ev, hello, captured) = setup();

        assert_eq!(
            message(hello.print_either(&ev, &[]).unwrap_err()),
            "string must be specified and must be a string"
        );
        assert_eq!(
            message(hello.print_either(&ev, &["".into()]).unwrap_err()),
            "string must be specified and must be a string"
        );
        assert_eq!(
            message(hello.print_either(&ev, &["a".into(), Value::Number(1.0)]).unwrap_err()),
            "callback argument must be a function"
        );

        hello.print_either(&ev, &["sync ".into(), Value::Undefined]).unwrap();
        assert_eq!(captured.contents(), "sync ");
        assert_eq!(ev.outstanding(), 0);

        hello.print_either(&ev, &["async".into(), noop()]).unwrap();
        assert_eq!(ev.outstanding(), 1);
        ev.run().unwrap();
        assert_eq!(captured.contents(), "sync async");
    }
}
