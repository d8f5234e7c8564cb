// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Scripted clients for tests
//!
//! These clients never touch the network. [`ScriptedClient`] replays a queue of
//! outcomes in call order, which suits retry state-machine tests.
//! [`KeyedClient`] answers from a table keyed on prompt substrings, which keeps
//! its answers stable across repeated batch runs.

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

use crate::{
    InferenceClient,
    types::{CompletionRequest, FailureKind, InferenceOutcome},
};

/// One scripted reaction to a call
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Return this outcome
    Respond(InferenceOutcome),
    /// Panic with this message, simulating an unclassified fault
    Panic(String),
}

impl From<InferenceOutcome> for ScriptStep {
    fn from(outcome: InferenceOutcome) -> Self {
        Self::Respond(outcome)
    }
}

/// Client that replays scripted steps in order
///
/// Once the script runs out every call fails fatally.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    steps: Mutex<VecDeque<ScriptStep>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    /// Create a client from a sequence of steps
    pub fn new<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ScriptStep>,
    {
        Self {
            steps: Mutex::new(steps.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in call order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Models requested so far, in call order
    pub fn models(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.model).collect()
    }

    /// Number of calls received
    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Steps not yet consumed
    pub fn remaining(&self) -> usize {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn next_step(&self, request: &CompletionRequest) -> Option<ScriptStep> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

impl InferenceClient for ScriptedClient {
    #[allow(clippy::panic)]
    async fn complete(&self, request: &CompletionRequest) -> InferenceOutcome {
        // Locks are released inside next_step, so a scripted panic cannot poison them
        match self.next_step(request) {
            Some(ScriptStep::Respond(outcome)) => outcome,
            Some(ScriptStep::Panic(message)) => panic!("{message}"),
            None => InferenceOutcome::failure(FailureKind::Other, "script exhausted"),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Client that answers from a table of prompt substrings
///
/// The first entry whose key occurs in the prompt wins. Unmatched prompts get
/// the fallback outcome.
#[derive(Debug)]
pub struct KeyedClient {
    table: Vec<(String, InferenceOutcome)>,
    fallback: InferenceOutcome,
    calls: Mutex<usize>,
}

impl KeyedClient {
    /// Create a client from `(key, outcome)` pairs
    pub fn new<I, K>(table: I) -> Self
    where
        I: IntoIterator<Item = (K, InferenceOutcome)>,
        K: Into<String>,
    {
        Self {
            table: table.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            fallback: InferenceOutcome::failure(FailureKind::Other, "no scripted response"),
            calls: Mutex::new(0),
        }
    }

    /// Set the outcome for prompts matching no key
    pub fn with_fallback(mut self, fallback: InferenceOutcome) -> Self {
        self.fallback = fallback;
        self
    }

    /// Number of calls received
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl InferenceClient for KeyedClient {
    async fn complete(&self, request: &CompletionRequest) -> InferenceOutcome {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner) += 1;

        self.table
            .iter()
            .find(|(key, _)| request.prompt.contains(key.as_str()))
            .map_or_else(|| self.fallback.clone(), |(_, outcome)| outcome.clone())
    }

    fn name(&self) -> &'static str {
        "keyed"
    }
}
