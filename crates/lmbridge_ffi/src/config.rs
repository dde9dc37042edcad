//! Bridge configuration.

/// What happens after a managed callback faults inside a native call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultPolicy {
    /// Log the fault and abort the process.
    #[default]
    Abort,
    /// Log the fault, answer the engine with the baseline ordering, and
    /// surface the fault from the marshaler once the native call returns.
    Sentinel,
}

/// Configuration for a [`crate::ComparatorRegistry`].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Policy applied to callback faults.
    pub fault_policy: FaultPolicy,

    /// Emit a `trace` event for every relayed message line.
    pub trace_relay_lines: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            fault_policy: FaultPolicy::Abort,
            trace_relay_lines: false,
        }
    }
}

impl BridgeConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fault policy.
    #[must_use]
    pub const fn fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    /// Enables or disables tracing of relayed lines.
    #[must_use]
    pub const fn trace_relay_lines(mut self, enabled: bool) -> Self {
        self.trace_relay_lines = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.fault_policy, FaultPolicy::Abort);
        assert!(!config.trace_relay_lines);
    }

    #[test]
    fn builder_pattern() {
        let config = BridgeConfig::new()
            .fault_policy(FaultPolicy::Sentinel)
            .trace_relay_lines(true);

        assert_eq!(config.fault_policy, FaultPolicy::Sentinel);
        assert!(config.trace_relay_lines);
    }
}
