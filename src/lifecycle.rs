use std::fmt;

use thiserror::Error;
use tracing::{error, info};

use crate::{
    traits::{Tunnel, TunnelError},
    wireguard::InterfaceConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    PreUp,
    Up,
    PostUp,
    PreDown,
    Down,
    PostDown,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Hook::PreUp => "pre-up",
            Hook::Up => "up",
            Hook::PostUp => "post-up",
            Hook::PreDown => "pre-down",
            Hook::Down => "down",
            Hook::PostDown => "post-down",
        })
    }
}

pub const UP_SEQUENCE: [Hook; 3] = [Hook::PreUp, Hook::Up, Hook::PostUp];
pub const DOWN_SEQUENCE: [Hook; 3] = [Hook::PreDown, Hook::Down, Hook::PostDown];

/// One hook of a sequence and whether it completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub hook: Hook,
    pub committed: bool,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("probing interface {iface}: {source}")]
    Probe {
        iface: String,
        #[source]
        source: TunnelError,
    },
    #[error("{hook} failed for {iface}: {source}")]
    Hook {
        hook: Hook,
        iface: String,
        #[source]
        source: TunnelError,
        steps: Vec<Step>,
    },
}

impl LifecycleError {
    pub fn hook(&self) -> Option<Hook> {
        match self {
            LifecycleError::Hook { hook, .. } => Some(*hook),
            LifecycleError::Probe { .. } => None,
        }
    }

    /// Steps of the aborted sequence. Empty when the probe failed.
    pub fn steps(&self) -> &[Step] {
        match self {
            LifecycleError::Hook { steps, .. } => steps,
            LifecycleError::Probe { .. } => &[],
        }
    }
}

/// Number of leading hooks that completed.
pub fn committed(steps: &[Step]) -> usize {
    steps.iter().take_while(|s| s.committed).count()
}

enum Target<'a> {
    Up(&'a InterfaceConfig),
    Down(&'a str),
}

impl Target<'_> {
    fn name(&self) -> &str {
        match self {
            Target::Up(c) => &c.name,
            Target::Down(n) => n,
        }
    }
}

async fn dispatch<T: Tunnel + ?Sized>(
    tunnel: &T,
    hook: Hook,
    target: &Target<'_>,
) -> Result<(), TunnelError> {
    match (hook, target) {
        (Hook::PreUp, Target::Up(c)) => tunnel.pre_up(c).await,
        (Hook::Up, Target::Up(c)) => tunnel.up(c).await,
        (Hook::PostUp, Target::Up(c)) => tunnel.post_up(c).await,
        (Hook::PreDown, t) => tunnel.pre_down(t.name()).await,
        (Hook::Down, t) => tunnel.down(t.name()).await,
        (Hook::PostDown, t) => tunnel.post_down(t.name()).await,
        (hook, t) => Err(TunnelError::Other(format!(
            "{hook} needs a full interface config for {}",
            t.name()
        ))),
    }
}

/// Runs the hooks in order, stopping at the first failure. Nothing that
/// already committed is undone.
async fn run<T: Tunnel + ?Sized>(
    tunnel: &T,
    sequence: &[Hook],
    target: Target<'_>,
) -> Result<Vec<Step>, LifecycleError> {
    let mut steps: Vec<Step> = sequence
        .iter()
        .map(|&hook| Step {
            hook,
            committed: false,
        })
        .collect();

    for i in 0..steps.len() {
        let hook = steps[i].hook;
        info!(%hook, iface = target.name(), "running hook");

        if let Err(source) = dispatch(tunnel, hook, &target).await {
            error!(%hook, iface = target.name(), "hook failed: {source}");
            return Err(LifecycleError::Hook {
                hook,
                iface: target.name().to_owned(),
                source,
                steps,
            });
        }
        steps[i].committed = true;
    }

    Ok(steps)
}

pub async fn is_up<T: Tunnel + ?Sized>(tunnel: &T, name: &str) -> Result<bool, LifecycleError> {
    tunnel
        .is_up(name)
        .await
        .map_err(|source| LifecycleError::Probe {
            iface: name.to_owned(),
            source,
        })
}

/// pre-up, up, post-up. A failure after `up` leaves the interface up.
pub async fn bring_up<T: Tunnel + ?Sized>(
    tunnel: &T,
    config: &InterfaceConfig,
) -> Result<Vec<Step>, LifecycleError> {
    run(tunnel, &UP_SEQUENCE, Target::Up(config)).await
}

/// pre-down, down, post-down, only if the interface is up. Returns `None`
/// when there was nothing to tear down.
pub async fn bring_down<T: Tunnel + ?Sized>(
    tunnel: &T,
    name: &str,
) -> Result<Option<Vec<Step>>, LifecycleError> {
    if !is_up(tunnel, name).await? {
        info!(iface = name, "interface is not up, skipping teardown");
        return Ok(None);
    }

    run(tunnel, &DOWN_SEQUENCE, Target::Down(name)).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_config, MockTunnel};

    #[tokio::test]
    async fn up_runs_hooks_in_order() {
        let tunnel = MockTunnel::default();
        let steps = bring_up(&tunnel, &sample_config("wg99")).await.unwrap();

        assert_eq!(tunnel.calls(), vec![Hook::PreUp, Hook::Up, Hook::PostUp]);
        assert_eq!(committed(&steps), 3);
        assert!(tunnel.is_up("wg99").await.unwrap());
    }

    #[tokio::test]
    async fn failure_aborts_remaining_hooks() {
        let tunnel = MockTunnel::failing(Hook::Up);
        let err = bring_up(&tunnel, &sample_config("wg99")).await.unwrap_err();

        assert_eq!(err.hook(), Some(Hook::Up));
        assert_eq!(tunnel.calls(), vec![Hook::PreUp, Hook::Up]);
        assert_eq!(
            err.steps().iter().map(|s| s.committed).collect::<Vec<_>>(),
            vec![true, false, false]
        );
        assert_eq!(committed(err.steps()), 1);
    }

    #[tokio::test]
    async fn post_up_failure_leaves_interface_up() {
        let tunnel = MockTunnel::failing(Hook::PostUp);
        let err = bring_up(&tunnel, &sample_config("wg99")).await.unwrap_err();

        assert_eq!(err.hook(), Some(Hook::PostUp));
        assert!(tunnel.is_up("wg99").await.unwrap());
    }

    #[tokio::test]
    async fn down_is_skipped_when_absent() {
        let tunnel = MockTunnel::default();
        assert!(bring_down(&tunnel, "wg99").await.unwrap().is_none());
        assert!(tunnel.calls().is_empty());
    }

    #[tokio::test]
    async fn down_runs_when_up() {
        let tunnel = MockTunnel::default();
        bring_up(&tunnel, &sample_config("wg99")).await.unwrap();

        let steps = bring_down(&tunnel, "wg99").await.unwrap().unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(&tunnel.calls()[3..], &[Hook::PreDown, Hook::Down, Hook::PostDown]);
        assert!(!tunnel.is_up("wg99").await.unwrap());
    }
}
