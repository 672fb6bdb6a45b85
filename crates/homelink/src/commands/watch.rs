//! Live session: follow connectivity, state changes, and motion activity.

use std::time::Duration;

use owo_colors::{AnsiColors, OwoColorize};
use tokio::sync::broadcast;

use homelink_core::{ConnectivityState, Session};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut session = Session::new(util::hub_config(global)?)?;
    let mut connectivity = session.connectivity();
    let mut changes = session.changes();
    session.connect().await?;

    let colored = output::should_color(&global.color);
    if !global.quiet {
        println!(
            "{} {} devices loaded, watching for changes (Ctrl-C to stop)",
            Session::clock_display(),
            session.store().len()
        );
    }

    let deadline = args
        .duration
        .map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));

    loop {
        let until_deadline = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            () = until_deadline => break,
            changed = connectivity.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *connectivity.borrow_and_update();
                report_connectivity(&session, state, colored, global.quiet);
            }
            outcome = changes.recv() => match outcome {
                Ok(outcome) => {
                    if !global.quiet && !outcome.changed.is_empty() {
                        let ids: Vec<&str> =
                            outcome.changed.iter().map(|id| id.as_str()).collect();
                        println!(
                            "[{}] changed: {}",
                            session.uptime_display(),
                            ids.join(", ")
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "display lagged behind push channel");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    if !global.quiet {
        println!(
            "{} session up {}, {} motion event(s), {} malformed frame(s) dropped",
            Session::clock_display(),
            session.uptime_display(),
            session.motion_edges(),
            session.malformed_payloads()
        );
    }

    session.disconnect().await;
    Ok(())
}

fn report_connectivity(session: &Session, state: ConnectivityState, colored: bool, quiet: bool) {
    if quiet {
        return;
    }
    let color = match state {
        ConnectivityState::Online => AnsiColors::Green,
        ConnectivityState::Connecting => AnsiColors::Yellow,
        ConnectivityState::Offline => AnsiColors::Red,
    };
    let label = state.to_string();
    let label = if colored {
        label.color(color).to_string()
    } else {
        label
    };
    println!("[{}] hub {}", session.uptime_display(), label);
}
