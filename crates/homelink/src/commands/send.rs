//! Command workflows: parse steps, dispatch, wait for the outcome.

use std::sync::Arc;
use std::time::Duration;

use owo_colors::OwoColorize;
use serde_json::Value;

use homelink_core::{Command, Dispatcher, EntityId, Workflow, WorkflowStatus};

use crate::cli::{GlobalOpts, SendArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(args: &SendArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let steps = args
        .steps
        .iter()
        .map(|raw| parse_step(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let step_count = steps.len();

    let config = util::hub_config(global)?;
    let client = util::hub_client(global)?;
    let dispatcher = Dispatcher::new(Arc::new(client), config.command_cooldown);

    let workflow = Workflow::new(
        format!("cli:{}", args.device),
        EntityId::new(&args.device),
        steps,
    );
    let mut handle = dispatcher.dispatch(workflow)?;

    let status = tokio::time::timeout(
        Duration::from_secs(args.wait),
        handle.wait_terminal(),
    )
    .await
    .map_err(|_| CliError::WorkflowTimeout {
        seconds: args.wait,
    })?;

    let colored = output::should_color(&global.color);
    match status {
        WorkflowStatus::Succeeded => {
            if !global.quiet {
                let mark = if colored {
                    "ok".green().to_string()
                } else {
                    "ok".to_string()
                };
                println!("{mark}: {step_count} step(s) applied to {}", args.device);
            }
            Ok(())
        }
        WorkflowStatus::Failed { step, error } => {
            if !global.quiet && colored {
                eprintln!("{}", "failed".red());
            }
            Err(CliError::WorkflowFailed {
                step,
                reason: error,
            })
        }
        other => Err(CliError::Api {
            message: format!("workflow ended without a terminal status ({other:?})"),
        }),
    }
}

// ── Step syntax ──────────────────────────────────────────────────────

/// Parse one step: `action` or `action:key=value,key=value`.
///
/// Values are typed by shape: `true`/`false` become booleans, integers and
/// floats become numbers, anything else stays a string.
fn parse_step(raw: &str) -> Result<Command, CliError> {
    let (action, params) = match raw.split_once(':') {
        Some((action, params)) => (action, Some(params)),
        None => (raw, None),
    };

    if action.is_empty() {
        return Err(CliError::Validation {
            field: "step".into(),
            reason: format!("missing action in '{raw}'"),
        });
    }

    let mut command = Command::new(action);
    if let Some(params) = params {
        for pair in params.split(',').filter(|p| !p.is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(CliError::Validation {
                    field: "step".into(),
                    reason: format!("expected key=value, got '{pair}'"),
                });
            };
            if key.is_empty() {
                return Err(CliError::Validation {
                    field: "step".into(),
                    reason: format!("empty parameter name in '{raw}'"),
                });
            }
            command = command.with_param(key, parse_value(value));
        }
    }
    Ok(command)
}

fn parse_value(raw: &str) -> Value {
    if let Ok(flag) = raw.parse::<bool>() {
        return Value::from(flag);
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = raw.parse::<f64>() {
        return Value::from(float);
    }
    Value::from(raw)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_action() {
        let cmd = parse_step("turn_on").unwrap();
        assert_eq!(cmd.action, "turn_on");
        assert!(cmd.params.is_empty());
    }

    #[test]
    fn action_with_typed_params() {
        let cmd = parse_step("set_brightness:brightness=70,fade=true,mode=night").unwrap();
        assert_eq!(cmd.action, "set_brightness");
        assert_eq!(cmd.params.get("brightness"), Some(&json!(70)));
        assert_eq!(cmd.params.get("fade"), Some(&json!(true)));
        assert_eq!(cmd.params.get("mode"), Some(&json!("night")));
    }

    #[test]
    fn float_params_stay_numeric() {
        let cmd = parse_step("set_sensitivity:sensitivity=0.8").unwrap();
        assert_eq!(cmd.params.get("sensitivity"), Some(&json!(0.8)));
    }

    #[test]
    fn malformed_pairs_are_rejected() {
        assert!(parse_step(":brightness=70").is_err());
        assert!(parse_step("set_brightness:brightness").is_err());
        assert!(parse_step("set_brightness:=70").is_err());
    }
}
