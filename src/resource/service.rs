//! Service resource - reload nginx after fragments change

use anyhow::{Context, Result};
use declarative::CommandOutput;
use std::process::Command;

use super::{ApplyContext, ApplyResult, Resource, ResourceState};

/// The nginx reload, run once as a post-apply action
#[derive(Debug, Clone)]
pub struct NginxService {
    pub program: String,
    pub args: Vec<String>,
}

impl NginxService {
    pub fn new(program: &str, args: &[String]) -> Self {
        Self {
            program: program.to_string(),
            args: args.to_vec(),
        }
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn reload(&self) -> Result<CommandOutput> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .with_context(|| format!("Failed to execute {}", self.command_line()))?;
        Ok(CommandOutput::from(output))
    }
}

impl Resource for NginxService {
    fn id(&self) -> String {
        "service:nginx".to_string()
    }

    fn description(&self) -> String {
        format!("Reload nginx ({})", self.command_line())
    }

    fn resource_type(&self) -> &'static str {
        "service"
    }

    fn current_state(&self) -> Result<ResourceState> {
        Ok(ResourceState::Present { details: None })
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present {
            details: Some("reloaded".to_string()),
        }
    }

    fn needs_apply(&self) -> Result<bool> {
        // only ever scheduled when a notifying fragment changed
        Ok(true)
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        let output = self.reload()?;
        if output.success {
            log::info!("reloaded nginx with '{}'", self.command_line());
            Ok(ApplyResult::Modified)
        } else {
            Ok(ApplyResult::Failed {
                error: format!(
                    "'{}' failed: {}",
                    self.command_line(),
                    output.stderr_str().trim()
                ),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let svc = NginxService::new("nginx", &["-s".to_string(), "reload".to_string()]);
        assert_eq!(svc.command_line(), "nginx -s reload");
        assert_eq!(svc.description(), "Reload nginx (nginx -s reload)");
        assert!(svc.needs_apply().unwrap());
    }

    #[test]
    fn test_dry_run_skips() {
        let svc = NginxService::new("/nonexistent/nginx", &[]);
        let mut ctx = ApplyContext::new(true, false);
        assert!(matches!(
            svc.apply(&mut ctx).unwrap(),
            ApplyResult::Skipped { .. }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_reload_success_and_failure() {
        let mut ctx = ApplyContext::default();
        assert!(matches!(
            NginxService::new("true", &[]).apply(&mut ctx).unwrap(),
            ApplyResult::Modified
        ));
        assert!(matches!(
            NginxService::new("false", &[]).apply(&mut ctx).unwrap(),
            ApplyResult::Failed { .. }
        ));
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let svc = NginxService::new("/nonexistent/nginx", &[]);
        assert!(svc.apply(&mut ApplyContext::default()).is_err());
    }
}
