// SPDX-License-Identifier: Apache-2.0

//! In-process stand-ins for the external tools, used by unit tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::outcome::Suite;
use crate::scanner::TestCase;
use crate::tools::{ToolInvocation, ToolOutput, ToolRunner};
use crate::tv_error::TvError;

type Handler = Box<dyn Fn(&ToolInvocation) -> ToolOutput>;

/// Dispatches on `ToolInvocation::description` and records every call so
/// tests can assert which tools ran and how often.
#[derive(Default)]
pub struct FakeToolRunner {
    handlers: HashMap<String, Handler>,
    calls: RefCell<Vec<ToolInvocation>>,
}

impl FakeToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(
        mut self,
        description: &str,
        handler: impl Fn(&ToolInvocation) -> ToolOutput + 'static,
    ) -> Self {
        self.handlers
            .insert(description.to_string(), Box::new(handler));
        self
    }

    pub fn calls(&self, description: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|i| i.description == description)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.calls.borrow().clone()
    }
}

impl ToolRunner for FakeToolRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, TvError> {
        self.calls.borrow_mut().push(invocation.clone());
        match self.handlers.get(&invocation.description) {
            Some(handler) => Ok(handler(invocation)),
            None => Err(TvError::ToolSpawn {
                description: invocation.description.clone(),
                message: "no fake tool registered".to_string(),
            }),
        }
    }
}

pub fn exit_with(code: i32, stdout: &str, stderr: &str) -> ToolOutput {
    ToolOutput {
        exit_code: Some(code),
        timed_out: false,
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    }
}

pub fn timed_out() -> ToolOutput {
    ToolOutput {
        exit_code: None,
        timed_out: true,
        stdout: String::new(),
        stderr: String::new(),
    }
}

/// Transpile handler that writes `ir` as `x.ll` into the invocation's
/// working directory and prints the plugin's success marker.
pub fn transpile_ok(ir: &'static str) -> impl Fn(&ToolInvocation) -> ToolOutput {
    move |invocation| {
        let dir = invocation
            .current_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::write(dir.join("x.ll"), ir).unwrap();
        // Real g++ fails to link a test file without main after the plugin ran.
        exit_with(
            1,
            "TRANSPILED SUCCESSFULLY\n",
            "undefined reference to `main'\n",
        )
    }
}

pub fn transpile_declined() -> impl Fn(&ToolInvocation) -> ToolOutput {
    |_| exit_with(1, "", "sorry, unimplemented: GIMPLE_SWITCH\n")
}

/// Writes `contents` to the path following `-o` in the invocation.
pub fn write_output_arg(
    contents: &'static str,
    output: ToolOutput,
) -> impl Fn(&ToolInvocation) -> ToolOutput {
    move |invocation| {
        let args = invocation.args_lossy();
        let index = args.iter().position(|a| a == "-o").unwrap();
        std::fs::write(&args[index + 1], contents).unwrap();
        output.clone()
    }
}

pub fn write_case(dir: &Path, name: &str, contents: &str, suite: Suite) -> TestCase {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    TestCase {
        ordinal: crate::scanner::parse_ordinal(name).unwrap(),
        path,
        suite,
    }
}
