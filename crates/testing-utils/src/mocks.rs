//! Mock element implementations and cache stores
//!
//! [`ScriptedFactory`] builds elements whose action follows a fixed
//! [`Script`], and records what the dispatcher did with them in a shared
//! [`ScriptStats`]. [`FailingCacheStore`] is an in-memory store whose reads
//! and writes can be made to fail.

use async_trait::async_trait;
use elements_core::models::{CachePolicy, RequestContext};
use elements_core::traits::{CacheStats, CacheStore, Completion, Element, ElementFactory};
use elements_core::{ElementResult, ElementsError, ElementsResult};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a scripted element does when its action runs
#[derive(Debug, Clone)]
pub enum Script {
    /// Resolve immediately with this output
    Resolve(Value),
    /// Resolve with `{"seenConfig": <injected config>}`
    EchoConfig,
    /// Resolve with `{"seenPath": <request path>}`
    EchoRequest,
    /// Reject through the completion
    Reject(String),
    /// Return `Err` from `execute`
    Fail(String),
    /// Panic inside `execute`
    Panic(String),
    /// Drop the completion without settling it
    Drop,
    /// Never settle
    Hang,
    /// Sleep, then resolve. Late deliveries are counted.
    Delayed(Duration, Value),
}

/// Shared record of what happened to scripted elements
#[derive(Debug, Default)]
pub struct ScriptStats {
    created: AtomicUsize,
    invocations: AtomicUsize,
    late_deliveries: AtomicUsize,
    last_id: Mutex<Option<String>>,
    last_action: Mutex<Option<String>>,
    last_config: Mutex<Option<Value>>,
}

impl ScriptStats {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Results delivered after the dispatcher stopped waiting
    pub fn late_deliveries(&self) -> usize {
        self.late_deliveries.load(Ordering::SeqCst)
    }

    pub fn last_id(&self) -> Option<String> {
        self.last_id.lock().unwrap().clone()
    }

    pub fn last_action(&self) -> Option<String> {
        self.last_action.lock().unwrap().clone()
    }

    pub fn last_config(&self) -> Option<Value> {
        self.last_config.lock().unwrap().clone()
    }
}

/// Element factory driven by a [`Script`]
#[derive(Debug, Clone)]
pub struct ScriptedFactory {
    script: Script,
    actions: Option<Vec<String>>,
    create_error: Option<String>,
    config_error: Option<String>,
    stats: Arc<ScriptStats>,
}

impl ScriptedFactory {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            actions: None,
            create_error: None,
            config_error: None,
            stats: Arc::new(ScriptStats::default()),
        }
    }

    pub fn resolving(output: Value) -> Self {
        Self::new(Script::Resolve(output))
    }

    /// Only expose these action names. By default every `execute*` name is exposed.
    pub fn with_actions(mut self, actions: &[&str]) -> Self {
        self.actions = Some(actions.iter().map(|a| a.to_string()).collect());
        self
    }

    /// `create` fails with this message
    pub fn failing_create(mut self, message: &str) -> Self {
        self.create_error = Some(message.to_string());
        self
    }

    /// `set_config` fails with this message
    pub fn failing_config(mut self, message: &str) -> Self {
        self.config_error = Some(message.to_string());
        self
    }

    pub fn stats(&self) -> Arc<ScriptStats> {
        Arc::clone(&self.stats)
    }
}

impl ElementFactory for ScriptedFactory {
    fn create(&self, id: &str) -> ElementResult<Box<dyn Element>> {
        self.stats.created.fetch_add(1, Ordering::SeqCst);
        *self.stats.last_id.lock().unwrap() = Some(id.to_string());
        if let Some(message) = &self.create_error {
            anyhow::bail!("{message}");
        }
        Ok(Box::new(ScriptedElement {
            script: self.script.clone(),
            actions: self.actions.clone(),
            config_error: self.config_error.clone(),
            stats: Arc::clone(&self.stats),
            config: Value::Null,
            request: None,
        }))
    }
}

/// Element built by [`ScriptedFactory`]
pub struct ScriptedElement {
    script: Script,
    actions: Option<Vec<String>>,
    config_error: Option<String>,
    stats: Arc<ScriptStats>,
    config: Value,
    request: Option<Arc<RequestContext>>,
}

#[async_trait]
impl Element for ScriptedElement {
    fn set_config(&mut self, config: Value) -> ElementResult<()> {
        if let Some(message) = &self.config_error {
            anyhow::bail!("{message}");
        }
        *self.stats.last_config.lock().unwrap() = Some(config.clone());
        self.config = config;
        Ok(())
    }

    fn set_request(&mut self, request: Arc<RequestContext>) {
        self.request = Some(request);
    }

    fn has_action(&self, action: &str) -> bool {
        match &self.actions {
            Some(actions) => actions.iter().any(|a| a == action),
            None => action.starts_with("execute"),
        }
    }

    async fn execute(&self, action: &str, completion: Completion) -> ElementResult<()> {
        self.stats.invocations.fetch_add(1, Ordering::SeqCst);
        *self.stats.last_action.lock().unwrap() = Some(action.to_string());

        match &self.script {
            Script::Resolve(output) => {
                completion.resolve(output.clone());
            }
            Script::EchoConfig => {
                completion.resolve(json!({ "seenConfig": self.config }));
            }
            Script::EchoRequest => {
                let path = self.request.as_ref().map(|r| r.path.clone());
                completion.resolve(json!({ "seenPath": path }));
            }
            Script::Reject(message) => {
                completion.reject(anyhow::anyhow!("{message}"));
            }
            Script::Fail(message) => anyhow::bail!("{message}"),
            Script::Panic(message) => panic!("{message}"),
            Script::Drop => drop(completion),
            Script::Hang => std::future::pending::<()>().await,
            Script::Delayed(delay, output) => {
                tokio::time::sleep(*delay).await;
                if !completion.resolve(output.clone()) {
                    self.stats.late_deliveries.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
        Ok(())
    }
}

/// In-memory cache store with switchable failures
#[derive(Debug, Default)]
pub struct FailingCacheStore {
    fail_reads: bool,
    fail_writes: bool,
    entries: Mutex<HashMap<String, (Vec<u8>, CachePolicy)>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl FailingCacheStore {
    /// A store that never fails
    pub fn healthy() -> Self {
        Self::default()
    }

    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Self::default()
        }
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn failing_all() -> Self {
        Self {
            fail_reads: true,
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn stored_keys(&self) -> Vec<String> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }

    pub fn policy_for(&self, key: &str) -> Option<CachePolicy> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .map(|(_, policy)| policy.clone())
    }

    /// Stored value parsed as JSON
    pub fn stored_json(&self, key: &str) -> Option<Value> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .and_then(|(bytes, _)| serde_json::from_slice(bytes).ok())
    }
}

#[async_trait]
impl CacheStore for FailingCacheStore {
    async fn get(&self, key: &str) -> ElementsResult<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(ElementsError::cache_error("read refused"));
        }
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(key)
            .map(|(bytes, _)| bytes.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], policy: &CachePolicy) -> ElementsResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(ElementsError::cache_error("write refused"));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_vec(), policy.clone()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> ElementsResult<bool> {
        Ok(self.entries.lock().unwrap().remove(key).is_some())
    }

    async fn get_stats(&self) -> CacheStats {
        CacheStats {
            sets: self.writes() as u64,
            ..CacheStats::default()
        }
    }

    fn backend(&self) -> &'static str {
        "failing"
    }
}
