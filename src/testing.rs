//! In-memory tunnel used by unit tests.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::{
    lifecycle::Hook,
    service::keys::PrivateKey,
    session::{tests::sample_blob, SessionInfo},
    traits::{Tunnel, TunnelError},
    wireguard::{InterfaceConfig, DEFAULT_LOCAL_RESOLVER},
};

pub fn sample_config(name: &str) -> InterfaceConfig {
    let info = SessionInfo::decode(&sample_blob()).unwrap();
    let key = PrivateKey::from_bytes(&[3u8; 32]).unwrap();
    InterfaceConfig::with_port(name, &info, key, 51820, DEFAULT_LOCAL_RESOLVER, &[]).unwrap()
}

#[derive(Default)]
struct State {
    up: HashSet<String>,
    calls: Vec<Hook>,
    fail: Option<Hook>,
    probe_fails: bool,
    transfer_fails: bool,
    configured: Vec<InterfaceConfig>,
    counter: u64,
}

#[derive(Clone, Default)]
pub struct MockTunnel {
    state: Arc<Mutex<State>>,
}

impl MockTunnel {
    pub fn failing(hook: Hook) -> Self {
        let tunnel = Self::default();
        tunnel.fail_on(Some(hook));
        tunnel
    }

    pub fn fail_on(&self, hook: Option<Hook>) {
        self.state.lock().unwrap().fail = hook;
    }

    /// Makes every liveness check fail.
    pub fn break_probe(&self) {
        self.state.lock().unwrap().probe_fails = true;
    }

    /// Makes every counter read fail.
    pub fn break_transfer(&self) {
        self.state.lock().unwrap().transfer_fails = true;
    }

    pub fn calls(&self) -> Vec<Hook> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn configured(&self) -> Vec<InterfaceConfig> {
        self.state.lock().unwrap().configured.clone()
    }

    /// Simulates an interface left over by something outside the daemon.
    pub fn set_up(&self, name: &str) {
        self.state.lock().unwrap().up.insert(name.to_owned());
    }

    fn hook(&self, hook: Hook, name: &str) -> Result<(), TunnelError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(hook);
        if state.fail == Some(hook) {
            return Err(TunnelError::Other(format!("{hook} exploded")));
        }
        match hook {
            Hook::Up => {
                state.up.insert(name.to_owned());
            }
            Hook::Down => {
                state.up.remove(name);
            }
            _ => {}
        }
        Ok(())
    }
}

#[async_trait]
impl Tunnel for MockTunnel {
    async fn is_up(&self, name: &str) -> Result<bool, TunnelError> {
        let state = self.state.lock().unwrap();
        if state.probe_fails {
            return Err(TunnelError::Other(format!("probing {name} exploded")));
        }
        Ok(state.up.contains(name))
    }

    async fn pre_up(&self, config: &InterfaceConfig) -> Result<(), TunnelError> {
        self.state.lock().unwrap().configured.push(config.clone());
        self.hook(Hook::PreUp, &config.name)
    }

    async fn up(&self, config: &InterfaceConfig) -> Result<(), TunnelError> {
        self.hook(Hook::Up, &config.name)
    }

    async fn post_up(&self, config: &InterfaceConfig) -> Result<(), TunnelError> {
        self.hook(Hook::PostUp, &config.name)
    }

    async fn pre_down(&self, name: &str) -> Result<(), TunnelError> {
        self.hook(Hook::PreDown, name)
    }

    async fn down(&self, name: &str) -> Result<(), TunnelError> {
        self.hook(Hook::Down, name)
    }

    async fn post_down(&self, name: &str) -> Result<(), TunnelError> {
        self.hook(Hook::PostDown, name)
    }

    async fn transfer(&self, name: &str) -> Result<(u64, u64), TunnelError> {
        let mut state = self.state.lock().unwrap();
        if state.transfer_fails {
            return Err(TunnelError::Other(format!("counters of {name} exploded")));
        }
        if !state.up.contains(name) {
            return Err(TunnelError::NotUp(name.to_owned()));
        }
        state.counter += 100;
        Ok((state.counter, state.counter * 2))
    }
}

pub fn service(home: &std::path::Path, tunnel: &MockTunnel) -> crate::service::Service {
    crate::service::Service::with_tunnel(
        crate::status::StatusStore::in_home(home),
        Arc::new(tunnel.clone()),
        crate::wireguard::DEFAULT_INTERFACE.to_owned(),
        DEFAULT_LOCAL_RESOLVER,
    )
}

pub fn connect_request(id: u64) -> crate::service::ConnectRequest {
    crate::service::ConnectRequest {
        id,
        info: sample_blob(),
        keys: vec![vec![3u8; 32]],
        resolvers: vec![],
    }
}
