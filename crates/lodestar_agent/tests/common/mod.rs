//! Shared helpers for agent integration tests.

#![allow(dead_code, reason = "not every test file uses every helper")]

use async_trait::async_trait;
use lodestar_agent::{Agent, AgentError};
use lodestar_models::{MessageBag, Options};
use lodestar_platform::ModelResult;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// An agent returning queued results and recording what it was asked.
pub struct ScriptedAgent {
    name: String,
    results: Mutex<VecDeque<ModelResult>>,
    calls: Mutex<Vec<(MessageBag, Options)>>,
}

impl ScriptedAgent {
    pub fn new(name: &str) -> Arc<Self> {
        Self::with_results(name, Vec::new())
    }

    pub fn with_results(name: &str, results: impl IntoIterator<Item = ModelResult>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            results: Mutex::new(results.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(MessageBag, Options)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, messages: MessageBag, options: Options) -> Result<ModelResult, AgentError> {
        self.calls.lock().unwrap().push((messages, options));
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::runtime(format!("{} has no scripted result", self.name)))
    }
}
