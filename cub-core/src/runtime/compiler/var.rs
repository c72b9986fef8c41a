//! Variable scopes and register allocation

use super::Compiler;
use std::collections::HashMap;

/// One level of variable visibility. The global scope is the first; each
/// function body pushes another.
#[derive(Debug, Default)]
pub struct Scope {
    variables: HashMap<String, usize>,
    /// Registers allocated while this scope was innermost, hidden ones included
    owned: Vec<usize>,
}

impl Scope {
    pub fn get(&self, name: &str) -> Option<usize> {
        self.variables.get(name).copied()
    }

    /// Variable bound to `register` in this scope
    pub fn name_of(&self, register: usize) -> Option<&str> {
        self.variables
            .iter()
            .find_map(|(name, &index)| (index == register).then_some(name.as_str()))
    }

    pub fn owned(&self) -> &[usize] {
        &self.owned
    }
}

impl Compiler {
    /// Register for `name`, searching from the innermost scope outwards
    pub(crate) fn lookup(&self, name: &str) -> Option<usize> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Existing register for `name`, or a new one in the innermost scope.
    /// The flag is true when the register was just allocated.
    pub(crate) fn register(&mut self, name: &str) -> (usize, bool) {
        match self.lookup(name) {
            Some(index) => (index, false),
            None => (self.declare_local(name), true),
        }
    }

    /// Always allocates, shadowing outer scopes
    pub(crate) fn declare_local(&mut self, name: &str) -> usize {
        let index = self.allocate_register();
        if let Some(scope) = self.scopes.last_mut() {
            scope.variables.insert(name.to_string(), index);
        }
        index
    }

    /// Unnamed register owned by the innermost scope
    pub(crate) fn allocate_register(&mut self) -> usize {
        let index = self.next_register;
        self.next_register += 1;
        if let Some(scope) = self.scopes.last_mut() {
            scope.owned.push(index);
        }
        index
    }

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// The global scope is never popped
    pub(crate) fn pop_scope(&mut self) -> Scope {
        if self.scopes.len() > 1 {
            self.scopes.pop().unwrap_or_default()
        } else {
            Scope::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::compiler::Compiler;

    #[test]
    fn test_register_new_then_existing() {
        let mut compiler = Compiler::new();
        assert_eq!(compiler.register("x"), (0, true));
        assert_eq!(compiler.register("x"), (0, false));
        assert_eq!(compiler.register("y"), (1, true));
    }

    #[test]
    fn test_inner_scope_sees_outer() {
        let mut compiler = Compiler::new();
        let outer = compiler.declare_local("x");
        compiler.push_scope();
        assert_eq!(compiler.lookup("x"), Some(outer));
        let local = compiler.declare_local("y");
        let scope = compiler.pop_scope();
        assert_eq!(scope.owned(), &[local]);
        assert_eq!(compiler.lookup("y"), None);
    }

    #[test]
    fn test_global_name_of_register() {
        let mut compiler = Compiler::new();
        let x = compiler.declare_local("x");
        let hidden = compiler.allocate_register();
        compiler.push_scope();
        let local = compiler.declare_local("y");
        assert_eq!(compiler.variable_name(x), Some("x"));
        assert_eq!(compiler.variable_name(hidden), None);
        // only top-level variables have names after the run
        assert_eq!(compiler.variable_name(local), None);
    }

    #[test]
    fn test_global_scope_survives_pop() {
        let mut compiler = Compiler::new();
        compiler.declare_local("x");
        compiler.pop_scope();
        assert!(compiler.lookup("x").is_some());
    }
}
