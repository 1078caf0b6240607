//! Execution-context capability
//!
//! Every leaf action compiles to a method call on an execution context.
//! Which object that is, and how calls on it are spelled, is injected
//! through [`AgentTarget`] rather than hard-coded into the generators.

/// The object generated programs invoke automation actions on
pub trait AgentTarget: Send + Sync {
    /// Identifier of the context object in the generated program
    fn handle(&self) -> &str;

    /// Awaited method call on the context
    fn call(&self, method: &str, args: &[String]) -> String {
        format!("await {}.{}({})", self.handle(), method, args.join(", "))
    }

    /// Boolean evaluation of a natural-language condition
    fn condition(&self, prompt: &str) -> String {
        self.call("aiBoolean", &[prompt.to_string()])
    }
}

/// A context object bound to a plain variable name
#[derive(Debug, Clone)]
pub struct NamedAgent {
    name: String,
}

impl NamedAgent {
    /// Context object called `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for NamedAgent {
    fn default() -> Self {
        Self::new("agent")
    }
}

impl AgentTarget for NamedAgent {
    fn handle(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_agent_calls() {
        let agent = NamedAgent::default();
        assert_eq!(
            agent.call("aiTap", &["\"login\"".to_string()]),
            "await agent.aiTap(\"login\")"
        );
        assert_eq!(
            agent.condition("\"is logged in\""),
            "await agent.aiBoolean(\"is logged in\")"
        );
    }

    #[test]
    fn test_custom_handle() {
        let agent = NamedAgent::new("ctx");
        assert_eq!(agent.call("aiQuery", &[]), "await ctx.aiQuery()");
    }
}
