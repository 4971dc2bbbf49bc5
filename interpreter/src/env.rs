use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;

use crate::value::Value;

/// A scope frame. Frames are shared through `Rc<RefCell<_>>`: a closure keeps the frame it was
/// created in alive after the block that created it is gone, and several closures may capture
/// and mutate the same frame.
#[derive(Debug, Default)]
pub(crate) struct Environment {
    enclosing: Option<Rc<RefCell<Environment>>>,
    values: AHashMap<String, Value>,
}

#[derive(Debug, PartialEq)]
pub(crate) struct UndefinedVariable;

impl Environment {
    pub(crate) fn new() -> Self {
        Environment::default()
    }

    pub(crate) fn with(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            enclosing: Some(enclosing),
            values: AHashMap::new(),
        }
    }

    /// Binds `name` in this frame, replacing any previous binding of the same name.
    pub(crate) fn define(&mut self, name: &str, value: Value) {
        self.values.insert(String::from(name), value);
    }

    /// Looks `name` up in this frame, then in every enclosing frame.
    pub(crate) fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned().or_else(|| {
            self.enclosing
                .as_ref()
                .and_then(|parent| parent.borrow().get(name))
        })
    }

    pub(crate) fn assign(&mut self, name: &str, value: Value) -> Result<(), UndefinedVariable> {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => match &self.enclosing {
                Some(parent) => parent.borrow_mut().assign(name, value),
                None => Err(UndefinedVariable),
            },
        }
    }

    /// Reads `name` from the frame exactly `dist` links away. Frames in between and beyond are
    /// not searched.
    pub(crate) fn get_at(&self, dist: usize, name: &str) -> Option<Value> {
        self.frame(dist, |frame| frame.values.get(name).cloned()).flatten()
    }

    pub(crate) fn assign_at(
        &mut self,
        dist: usize,
        name: &str,
        value: Value,
    ) -> Result<(), UndefinedVariable> {
        self.frame_mut(dist, |frame| frame.values.get_mut(name).map(|slot| *slot = value))
            .flatten()
            .ok_or(UndefinedVariable)
    }

    // Runs `f` on the frame `dist` links up the chain, `None` if the chain is shorter than that
    fn frame<R>(&self, dist: usize, f: impl FnOnce(&Environment) -> R) -> Option<R> {
        if dist == 0 {
            return Some(f(self));
        }

        match &self.enclosing {
            Some(parent) => parent.borrow().frame(dist - 1, f),
            None => None,
        }
    }

    fn frame_mut<R>(&mut self, dist: usize, f: impl FnOnce(&mut Environment) -> R) -> Option<R> {
        if dist == 0 {
            return Some(f(self));
        }

        match &self.enclosing {
            Some(parent) => parent.borrow_mut().frame_mut(dist - 1, f),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::env::{Environment, UndefinedVariable};
    use crate::value::Value;

    fn chain(depth: usize) -> Vec<Rc<RefCell<Environment>>> {
        let mut frames = vec![Rc::new(RefCell::new(Environment::new()))];
        for _ in 0..depth {
            let parent = frames[frames.len() - 1].clone();
            frames.push(Rc::new(RefCell::new(Environment::with(parent))));
        }
        frames
    }

    #[test]
    fn test_define_overwrites() {
        let mut env = Environment::new();
        env.define("answer", Value::from("unknown"));
        env.define("answer", Value::from(42));

        assert_eq!(env.get("answer"), Some(Value::from(42)));
        assert_eq!(env.get("question"), None);
    }

    #[test]
    fn test_assign_requires_a_binding() {
        let frames = chain(2);
        let innermost = &frames[2];

        assert_eq!(
            innermost.borrow_mut().assign("x", Value::Nil),
            Err(UndefinedVariable)
        );

        frames[0].borrow_mut().define("x", Value::from(1));
        innermost.borrow_mut().assign("x", Value::from(2)).unwrap();
        assert_eq!(frames[0].borrow().get("x"), Some(Value::from(2)));
    }

    #[test]
    fn test_addressed_access() {
        let frames = chain(3);
        frames[0].borrow_mut().define("x", Value::from("global"));
        frames[2].borrow_mut().define("x", Value::from("shadow"));
        let innermost = &frames[3];

        assert_eq!(innermost.borrow().get("x"), Some(Value::from("shadow")));
        assert_eq!(innermost.borrow().get_at(1, "x"), Some(Value::from("shadow")));
        assert_eq!(innermost.borrow().get_at(3, "x"), Some(Value::from("global")));

        // Nothing is searched around the addressed frame
        assert_eq!(innermost.borrow().get_at(0, "x"), None);
        assert_eq!(innermost.borrow().get_at(2, "x"), None);
        assert_eq!(innermost.borrow().get_at(4, "x"), None);

        innermost
            .borrow_mut()
            .assign_at(3, "x", Value::from(false))
            .unwrap();
        assert_eq!(frames[0].borrow().get("x"), Some(Value::from(false)));
        assert_eq!(frames[2].borrow().get("x"), Some(Value::from("shadow")));
        assert_eq!(
            innermost.borrow_mut().assign_at(2, "x", Value::Nil),
            Err(UndefinedVariable)
        );
    }

    #[test]
    fn test_shared_frame_sees_writes_from_every_holder() {
        let shared = Rc::new(RefCell::new(Environment::new()));
        shared.borrow_mut().define("count", Value::from(0));
        let first = Environment::with(shared.clone());
        let mut second = Environment::with(shared.clone());

        second.assign_at(1, "count", Value::from(5)).unwrap();
        assert_eq!(first.get_at(1, "count"), Some(Value::from(5)));
    }
}
