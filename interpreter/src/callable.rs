use std::cell::RefCell;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use ahash::AHashMap;

use crate::ast::FunctionDecl;
use crate::env::Environment;
use crate::error::Error;
use crate::interpreter::{Flow, Interpreter};
use crate::value::Value;

/// Name of the method that runs when a class is called.
pub(crate) const INITIALIZER: &str = "init";

#[derive(Debug, PartialEq, Clone, Copy)]
pub(crate) enum CallableType {
    Native,
    Function,
    Class,
}

pub(crate) trait Callable {
    fn ty(&self) -> CallableType {
        CallableType::Function
    }

    fn name(&self) -> &str;
    fn arity(&self) -> usize;

    /// Invokes the callable. The interpreter has already checked that `args` holds exactly
    /// `arity()` values.
    fn call(self: Rc<Self>, interpreter: &mut Interpreter, args: Vec<Value>)
        -> Result<Value, Error>;

    // This is a bit hacky, but a superclass has to be recovered from a plain value
    fn as_class(self: Rc<Self>) -> Option<Rc<Class>> {
        None
    }
}

impl Debug for dyn Callable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{:?} {}>", self.ty(), self.name())
    }
}

pub(crate) type BoxedFunction = Box<dyn Fn(&[Value]) -> Result<Value, Error>>;

// `Native` bridges the native rust calls and the Losk interpreter environment.
// This implements callable and all of these trait objects will live in the global namespace.
pub(crate) struct Native {
    func: BoxedFunction,
    name: String,
    arity: usize,
}

impl Native {
    pub(crate) fn new(func: BoxedFunction, name: &str, arity: usize) -> Self {
        Self {
            func,
            name: String::from(name),
            arity,
        }
    }
}

impl Callable for Native {
    fn ty(&self) -> CallableType {
        CallableType::Native
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn call(self: Rc<Self>, _: &mut Interpreter, args: Vec<Value>) -> Result<Value, Error> {
        (self.func)(&args)
    }
}

/// Seconds since the Unix epoch.
pub(crate) fn clock() -> Native {
    let func: BoxedFunction = Box::new(|_| {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Ok(Value::Num(since_epoch.as_secs_f64()))
    });
    Native::new(func, "clock", 0)
}

/// A user function: the shared declaration plus the frame that was current when it was
/// declared. Methods bound to an instance get one more frame on top holding `this`.
pub(crate) struct Function {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl Function {
    pub(crate) fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Function {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub(crate) fn bind(&self, instance: Rc<RefCell<Instance>>) -> Function {
        let mut env = Environment::with(Rc::clone(&self.closure));
        env.define("this", Value::Instance(instance));

        Function {
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(env)),
            is_initializer: self.is_initializer,
        }
    }

    fn this(&self) -> Value {
        self.closure
            .borrow()
            .get_at(0, "this")
            .unwrap_or(Value::Nil)
    }
}

// Closures can reach the function itself through their frames, so only the name is printed
impl Debug for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

impl Callable for Function {
    fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(self: Rc<Self>, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Error> {
        // The new frame hangs off the closure, not off the caller's frame
        let mut env = Environment::with(Rc::clone(&self.closure));
        for (param, arg) in self.declaration.params.iter().zip(args) {
            env.define(&param.lexeme, arg);
        }

        let flow = interpreter.execute_block(&self.declaration.body, Rc::new(RefCell::new(env)))?;

        if self.is_initializer {
            return Ok(self.this());
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

pub(crate) struct Class {
    name: String,
    superclass: Option<Rc<Class>>,
    methods: AHashMap<String, Rc<Function>>,
}

impl Class {
    pub(crate) fn new(
        name: &str,
        superclass: Option<Rc<Class>>,
        methods: AHashMap<String, Rc<Function>>,
    ) -> Rc<Self> {
        Rc::new(Class {
            name: name.to_string(),
            superclass,
            methods,
        })
    }

    pub(crate) fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(fun) = self.methods.get(name) {
            Some(Rc::clone(fun))
        } else if let Some(superclass) = &self.superclass {
            superclass.find_method(name)
        } else {
            None
        }
    }
}

impl Debug for Class {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<class {}>", self.name)
    }
}

impl Callable for Class {
    fn ty(&self) -> CallableType {
        CallableType::Class
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> usize {
        match self.find_method(INITIALIZER) {
            Some(init) => init.arity(),
            _ => 0,
        }
    }

    fn call(self: Rc<Self>, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Error> {
        let instance = Instance::new(Rc::clone(&self));
        if let Some(init) = self.find_method(INITIALIZER) {
            Rc::new(init.bind(Rc::clone(&instance))).call(interpreter, args)?;
        }

        Ok(Value::Instance(instance))
    }

    fn as_class(self: Rc<Self>) -> Option<Rc<Class>> {
        Some(self)
    }
}

pub(crate) struct Instance {
    class: Rc<Class>,
    fields: AHashMap<String, Value>,
}

impl Instance {
    pub(crate) fn new(class: Rc<Class>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Instance {
            class,
            fields: AHashMap::new(),
        }))
    }

    /// Fields shadow methods. A method found on the class is bound to `instance` on access.
    pub(crate) fn get(instance: &Rc<RefCell<Self>>, name: &str) -> Option<Value> {
        let field = instance.borrow().fields.get(name).cloned();
        if field.is_some() {
            return field;
        }

        let class = Rc::clone(&instance.borrow().class);
        class
            .find_method(name)
            .map(|method| Value::Callable(Rc::new(method.bind(Rc::clone(instance)))))
    }

    pub(crate) fn set(&mut self, name: &str, value: Value) {
        self.fields.insert(String::from(name), value);
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{} instance>", self.class.name)
    }
}

impl Display for Instance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} instance", self.class.name)
    }
}
