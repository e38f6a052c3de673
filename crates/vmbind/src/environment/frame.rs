//! RAII scope guard for automatic frame cleanup

use super::Environment;

/// Pops the frame it pushed when dropped, including on early `?` return.
///
/// # Example
///
/// ```
/// use vmbind::{Environment, Value};
///
/// let mut env = Environment::new();
/// env.define("data", Value::Null);
///
/// {
///     let mut scope = env.scope_guard();
///     scope.define("item", Value::from("a"));
///     assert!(scope.contains("data"));
/// }
/// assert!(!env.contains("item"));
/// ```
pub struct ScopeGuard<'a> {
    env: &'a mut Environment,
}

impl Environment {
    /// Push a frame now and pop it when the guard drops.
    pub fn scope_guard(&mut self) -> ScopeGuard<'_> {
        self.push_frame();
        ScopeGuard { env: self }
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.env.pop_frame();
    }
}

impl std::ops::Deref for ScopeGuard<'_> {
    type Target = Environment;

    fn deref(&self) -> &Self::Target {
        self.env
    }
}

impl std::ops::DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BindingMode, Value};

    #[test]
    fn test_guard_restores_depth_after_error_path() {
        fn failing(env: &mut Environment) -> Result<(), String> {
            let mut scope = env.scope_guard();
            scope.define("tmp", Value::from(1));
            Err("bail".to_string())
        }

        let mut env = Environment::new();
        assert!(failing(&mut env).is_err());
        assert_eq!(env.depth(), 1);
        assert!(!env.contains("tmp"));
    }

    #[test]
    fn test_nested_guards_shadow_and_restore() {
        let mut env = Environment::new();
        env.define("index", Value::from(0));
        {
            let mut outer = env.scope_guard();
            outer.define("index", Value::from(1));
            {
                let mut inner = outer.scope_guard();
                inner.define("index", Value::from(2));
                assert_eq!(inner.get("index"), Some(&Value::from(2)));
            }
            assert_eq!(outer.get("index"), Some(&Value::from(1)));
        }
        assert_eq!(env.get("index"), Some(&Value::from(0)));
    }

    #[test]
    fn test_assignment_through_guard_persists() {
        let mut env = Environment::new();
        env.define_with_mode("total", Value::from(1), BindingMode::Mutable);
        {
            let mut scope = env.scope_guard();
            scope.assign("total", Value::from(5)).unwrap();
        }
        assert_eq!(env.get("total"), Some(&Value::from(5)));
    }
}
