//! Runtime abstraction over the process environment, so configuration can be
//! tested without touching real environment variables.

use std::env;

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    fn env_var(&self, key: &str) -> Result<String, env::VarError>;
}

pub struct RealRuntime;

impl Runtime for RealRuntime {
    #[tracing::instrument(skip(self))]
    fn env_var(&self, key: &str) -> Result<String, env::VarError> {
        env::var(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_runtime_env_var() {
        // PATH is set in every test environment we run in
        assert!(RealRuntime.env_var("PATH").is_ok());
        assert_eq!(
            RealRuntime.env_var("TRELLOCTL_SURELY_UNSET_VARIABLE"),
            Err(env::VarError::NotPresent)
        );
    }
}
