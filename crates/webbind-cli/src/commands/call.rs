//! `webbind call`: exercise a binding without a window
//!
//! Runs the headless engine with a few demo bindings and plays the part of
//! page script calling one of them.

use anyhow::bail;
use clap::Args;
use webbind_core::{BindResult, Completion, Engine, HeadlessEngine, Status, Variadic, Webview};

#[derive(Debug, Args)]
pub struct CallArgs {
    /// Bound name to call: echo, sum or fail
    pub name: String,
    /// JSON array of arguments
    #[arg(long, default_value = "[]")]
    pub args: String,
}

/// Bind `echo(string, int)`, `sum(string, ...int)` and `fail()`
pub fn bind_demo<E: Engine + 'static>(webview: &Webview<E>) -> BindResult<()> {
    webview.bind("echo", |s: String, _n: i64| -> Result<String, String> { Ok(s) })?;
    webview.bind("sum", |_label: String, nums: Variadic<i64>| -> Result<i64, String> {
        Ok(nums.iter().sum())
    })?;
    webview.bind("fail", || -> Result<(), String> { Err("someError".to_string()) })?;
    Ok(())
}

/// Call `name` once and return how the promise settled
pub fn call_once(name: &str, request: &str) -> anyhow::Result<Completion> {
    let webview = Webview::new(HeadlessEngine::new(false));
    bind_demo(&webview)?;

    let pending = webview.engine().call(name, request);
    webview.terminate();
    webview.run();
    Ok(pending.recv()?)
}

pub fn execute(args: CallArgs) -> anyhow::Result<()> {
    let completion = call_once(&args.name, &args.args)?;
    match completion.status {
        Status::Ok => {
            println!("{}", completion.payload);
            Ok(())
        }
        Status::Error => bail!("{} rejected: {}", args.name, completion.payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo() {
        let c = call_once("echo", r#"["hi", 2]"#).unwrap();
        assert_eq!(c.status, Status::Ok);
        assert_eq!(c.payload, r#""hi""#);
    }

    #[test]
    fn test_sum_variadic() {
        assert_eq!(call_once("sum", r#"["n"]"#).unwrap().payload, "0");
        assert_eq!(call_once("sum", r#"["n", 4, 5]"#).unwrap().payload, "9");
    }

    #[test]
    fn test_fail_rejects() {
        let c = call_once("fail", "[]").unwrap();
        assert_eq!(c.status, Status::Error);
        assert_eq!(c.payload, r#""someError""#);
    }

    #[test]
    fn test_bad_arguments_reject() {
        let c = call_once("echo", r#"["hi", "two"]"#).unwrap();
        assert_eq!(c.status, Status::Error);

        let c = call_once("echo", "{}").unwrap();
        assert_eq!(c.status, Status::Error);
    }

    #[test]
    fn test_unknown_name() {
        let c = call_once("nope", "[]").unwrap();
        assert_eq!(c.status, Status::Error);
    }
}
