//! Runtime configuration.

/// What happens to the value a scripted handler returns from a native event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DelegateReturnPolicy {
    /// Fire-and-forget: the return value is dropped.
    #[default]
    Discard,
    /// Convert the return value into the signature's return slot.
    WriteBack,
}

/// Bridge configuration.
///
/// ```
/// use scriptbridge::{BridgeConfig, DelegateReturnPolicy};
///
/// let config = BridgeConfig::default()
///     .with_event_attribute("handles")
///     .with_delegate_returns(DelegateReturnPolicy::WriteBack);
/// assert_eq!(config.super_keyword, "__super");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Named argument that redirects a call to the overridden implementation.
    pub super_keyword: String,
    /// Attribute scripted callables carry to name the event they handle.
    pub event_attribute: String,
    /// Name prefix that marks a callable for automatic binding.
    pub autobind_prefix: String,
    pub delegate_returns: DelegateReturnPolicy,
    /// Log each backtrace line of a contained scripting error.
    pub log_backtraces: bool,
    /// Catch panics raised by scripted handlers during event delivery.
    pub contain_panics: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            super_keyword: "__super".to_string(),
            event_attribute: "native_event".to_string(),
            autobind_prefix: "on_".to_string(),
            delegate_returns: DelegateReturnPolicy::Discard,
            log_backtraces: true,
            contain_panics: true,
        }
    }
}

impl BridgeConfig {
    pub fn with_super_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.super_keyword = keyword.into();
        self
    }

    pub fn with_event_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.event_attribute = attribute.into();
        self
    }

    pub fn with_autobind_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.autobind_prefix = prefix.into();
        self
    }

    pub fn with_delegate_returns(mut self, policy: DelegateReturnPolicy) -> Self {
        self.delegate_returns = policy;
        self
    }

    pub fn with_log_backtraces(mut self, enabled: bool) -> Self {
        self.log_backtraces = enabled;
        self
    }

    pub fn with_contain_panics(mut self, enabled: bool) -> Self {
        self.contain_panics = enabled;
        self
    }
}
