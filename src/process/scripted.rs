// In-memory runner for unit tests: canned responses keyed by argv.

use std::cell::RefCell;
use std::collections::HashMap;

use super::{Output, Result, Runner};

#[derive(Debug, Default)]
pub(crate) struct ScriptedRunner {
    responses: RefCell<HashMap<String, Output>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Respond to `args` (space-joined) with `output` from now on.
    pub(crate) fn on(self, args: &str, output: Output) -> Self {
        self.set(args, output);
        self
    }

    pub(crate) fn set(&self, args: &str, output: Output) {
        self.responses.borrow_mut().insert(args.to_string(), output);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub(crate) fn was_called(&self, args: &str) -> bool {
        self.calls.borrow().iter().any(|c| c == args)
    }

    /// A repository on `main` tracking `origin/main`, clean, with one commit.
    pub(crate) fn clean_repo() -> Self {
        Self::new()
            .on("--version", Output::ok("git version 2.43.0\n"))
            .on("rev-parse --show-toplevel", Output::ok("/work/repo\n"))
            .on("remote", Output::ok("origin\n"))
            .on("rev-parse --abbrev-ref HEAD", Output::ok("main\n"))
            .on("status --porcelain -uall", Output::ok(""))
            .on(
                "rev-parse --abbrev-ref --symbolic-full-name @{u}",
                Output::ok("origin/main\n"),
            )
            .on("rev-list --count HEAD..@{u}", Output::ok("0\n"))
            .on("rev-list --count @{u}..HEAD", Output::ok("0\n"))
            .on(
                "log --pretty=format:%h %ad | %s (%an) --date=relative --max-count=10",
                Output::ok("abc1234 2 hours ago | Initial commit (Test User)"),
            )
    }
}

impl Runner for ScriptedRunner {
    fn run(&self, args: &[&str]) -> Result<Output> {
        let key = args.join(" ");
        self.calls.borrow_mut().push(key.clone());
        Ok(self
            .responses
            .borrow()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Output::failed(format!("unscripted command: git {key}"))))
    }
}
