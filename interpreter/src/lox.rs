use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use losk_core::{Scanner, Token};

use crate::error::Error;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::printer::AstPrinter;
use crate::resolver::Resolver;

/// Outcome of a single [`Lox::run`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStatus {
    had_error: bool,
    had_runtime_error: bool,
}

impl RunStatus {
    /// A lexical, syntax or resolution error was reported. Nothing was executed.
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Process exit code for a script that finished with this status, `None` on success.
    pub fn exit_code(&self) -> Option<i32> {
        if self.had_error {
            Some(65)
        } else if self.had_runtime_error {
            Some(70)
        } else {
            None
        }
    }
}

/// A session running source text through scanning, parsing, resolution and execution.
///
/// Globals defined by one run stay visible to the following runs, which is what the REPL relies
/// on. The error flags are reset at the start of every run.
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use interpreter::Lox;
///
/// let out = Rc::new(RefCell::new(Vec::<u8>::new()));
/// let mut lox = Lox::new(out.clone(), out.clone());
///
/// lox.run("fun square(x) { return x * x; }");
/// let status = lox.run("print square(4);");
///
/// assert_eq!(status.exit_code(), None);
/// assert_eq!(out.borrow().as_slice(), b"16\n");
/// ```
pub struct Lox {
    scanner: Scanner,
    interpreter: Interpreter,
    stderr: Rc<RefCell<dyn Write>>,
    status: RunStatus,
    debug_parse: bool,
}

impl Lox {
    pub fn new(stdout: Rc<RefCell<dyn Write>>, stderr: Rc<RefCell<dyn Write>>) -> Self {
        Lox {
            scanner: Scanner::new(),
            interpreter: Interpreter::new(stdout),
            stderr,
            status: RunStatus::default(),
            debug_parse: false,
        }
    }

    /// When enabled, every parsed program is written to the error sink in prefix form before it
    /// runs.
    pub fn set_debug_parse(&mut self, enabled: bool) {
        self.debug_parse = enabled;
    }

    pub fn run(&mut self, src: &str) -> RunStatus {
        self.status = RunStatus::default();

        let (tokens, scan_errors) = {
            let mut stream = self.scanner.scan_tokens(src);
            let tokens: Vec<Token> = stream.by_ref().collect();
            (tokens, stream.take_errors())
        };
        tracing::debug!(tokens = tokens.len(), errors = scan_errors.len(), "scanned");

        // Scanning errors are reported, but parsing still runs to surface syntax errors too
        for err in scan_errors {
            self.report(Error::from(err));
        }

        let stmts = match Parser::new(&tokens).parse() {
            Ok(stmts) => stmts,
            Err(errs) => {
                errs.into_iter().for_each(|err| self.report(err));
                return self.status;
            }
        };

        if self.status.had_error {
            return self.status;
        }

        if self.debug_parse {
            let mut stderr = RefCell::borrow_mut(&self.stderr);
            for stmt in &stmts.0 {
                if let Err(io_err) = writeln!(stderr, "{}", AstPrinter.print(stmt)) {
                    tracing::error!("failed to write parsed program: {}", io_err);
                    break;
                }
            }
        }

        let resolved = match Resolver::new(&mut self.interpreter).resolve(stmts) {
            Ok(resolved) => resolved,
            Err(errs) => {
                errs.into_iter().for_each(|err| self.report(err));
                return self.status;
            }
        };

        if let Err(err) = self.interpreter.interpret(&resolved) {
            self.report(err);
        }

        self.status
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    fn report(&mut self, err: Error) {
        if err.is_static() {
            self.status.had_error = true;
        } else {
            self.status.had_runtime_error = true;
        }

        tracing::debug!(line = err.line(), static_error = err.is_static(), "{}", err);
        if let Err(io_err) = writeln!(RefCell::borrow_mut(&self.stderr), "{}", err) {
            tracing::error!("failed to write diagnostic: {}", io_err);
        }
    }
}
