//! Application context configuration

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::template::TemplateOptions;
use crate::EvalContext;

/// How the lifecycle manager decides that a bound element is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    /// The element id still resolves and is attached below a root
    /// element of its controller.
    #[default]
    Arena,
    /// The element's marker attribute still appears in the markup of
    /// the controller's root elements.
    Markup,
}

/// Settings of a [`Vm`](crate::Vm).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Debounce window between a data change and the controller flush
    pub flush_delay_ms: u64,
    /// Delay between a scan and controller instantiation
    pub scan_delay_ms: u64,
    /// Liveness strategy for the sweep
    pub liveness: Liveness,
    /// Interpreter call depth limit
    pub max_call_depth: usize,
    /// Interpreter loop iteration limit
    pub max_loop_iterations: usize,
    /// Tasks `run_until_idle` executes before giving up
    pub max_idle_tasks: usize,
    /// Engine-wide template defaults
    pub template: TemplateOptions,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            flush_delay_ms: 50,
            scan_delay_ms: 50,
            liveness: Liveness::Arena,
            max_call_depth: 256,
            max_loop_iterations: 100_000,
            max_idle_tasks: 10_000,
            template: TemplateOptions::default(),
        }
    }
}

impl VmConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the flush debounce window.
    pub fn with_flush_delay(mut self, ms: u64) -> Self {
        self.flush_delay_ms = ms;
        self
    }

    /// Set the scan settle delay.
    pub fn with_scan_delay(mut self, ms: u64) -> Self {
        self.scan_delay_ms = ms;
        self
    }

    /// Set the liveness strategy.
    pub fn with_liveness(mut self, liveness: Liveness) -> Self {
        self.liveness = liveness;
        self
    }

    /// Set the interpreter call depth limit.
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Set the interpreter loop limit.
    pub fn with_max_loop_iterations(mut self, limit: usize) -> Self {
        self.max_loop_iterations = limit;
        self
    }

    /// Set the `run_until_idle` task limit.
    pub fn with_max_idle_tasks(mut self, limit: usize) -> Self {
        self.max_idle_tasks = limit;
        self
    }

    /// Set the engine-wide template defaults.
    pub fn with_template(mut self, template: TemplateOptions) -> Self {
        self.template = template;
        self
    }

    pub(crate) fn flush_delay(&self) -> Duration {
        Duration::from_millis(self.flush_delay_ms)
    }

    pub(crate) fn scan_delay(&self) -> Duration {
        Duration::from_millis(self.scan_delay_ms)
    }

    /// Interpreter limits derived from this configuration.
    pub fn eval_context(&self) -> EvalContext {
        EvalContext::with_max_call_depth(self.max_call_depth).loop_limit(self.max_loop_iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = VmConfig::default();
        assert_eq!(config.flush_delay_ms, 50);
        assert_eq!(config.scan_delay_ms, 50);
        assert_eq!(config.liveness, Liveness::Arena);
        assert_eq!(config.eval_context().max_loop_iterations, 100_000);
    }

    #[test]
    fn test_from_json_partial() {
        let config = VmConfig::from_json(
            r#"{"flush_delay_ms": 10, "liveness": "markup", "template": {"open_tag": "{{", "close_tag": "}}"}}"#,
        )
        .unwrap();
        assert_eq!(config.flush_delay(), Duration::from_millis(10));
        assert_eq!(config.liveness, Liveness::Markup);
        assert_eq!(config.max_idle_tasks, 10_000);
        assert_eq!(config.template.open_tag, "{{");
        assert!(config.template.escape);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(VmConfig::from_json("{\"liveness\": \"psychic\"}").is_err());
    }

    #[test]
    fn test_builders() {
        let config = VmConfig::new()
            .with_flush_delay(1)
            .with_scan_delay(2)
            .with_max_call_depth(8)
            .with_max_loop_iterations(9)
            .with_max_idle_tasks(3)
            .with_liveness(Liveness::Markup);
        assert_eq!(config.scan_delay(), Duration::from_millis(2));
        assert_eq!(config.eval_context().max_call_depth, 8);
        assert_eq!(config.max_idle_tasks, 3);
    }
}
