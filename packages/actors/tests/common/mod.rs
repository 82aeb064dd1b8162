#![allow(dead_code)]

use std::collections::HashSet;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actors::{
    AgentExecutor, Collaborators, EventSink, ExecutionFuture, Pipeline, SinkFuture,
};
use pipeline_core::{ExecutionError, JobResult, JobSummary, PipelineConfig};
use serde_json::Value;
use tokio::sync::Semaphore;

/// One delivery seen by [`RecordingSink`].
#[derive(Debug, Clone)]
pub struct Recorded {
    /// `None` for broadcasts.
    pub scope: Option<String>,
    pub event: String,
    pub payload: Value,
}

/// Sink that remembers every delivery in order.
#[derive(Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<Recorded>>,
    reachable: Mutex<HashSet<String>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn connect(&self, scope: &str) {
        self.reachable.lock().unwrap().insert(scope.to_string());
    }

    pub fn all(&self) -> Vec<Recorded> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn named(&self, event: &str) -> Vec<Recorded> {
        self.all().into_iter().filter(|r| r.event == event).collect()
    }

    /// Job lists carried by every emission of a queue event, in order.
    pub fn queue_states(&self, event: &str) -> Vec<Vec<JobSummary>> {
        self.named(event)
            .into_iter()
            .map(|r| serde_json::from_value(r.payload["jobs"].clone()).unwrap())
            .collect()
    }

    /// `(event, job count)` for every queue emission, in delivery order.
    pub fn queue_trace(&self) -> Vec<(String, usize)> {
        self.all()
            .into_iter()
            .filter(|r| r.event.ends_with("_update") && r.payload.get("jobs").is_some())
            .map(|r| {
                let count = r.payload["jobs"].as_array().map_or(0, Vec::len);
                (r.event, count)
            })
            .collect()
    }

    fn record(&self, scope: Option<&str>, event: &str, payload: Value) {
        self.deliveries.lock().unwrap().push(Recorded {
            scope: scope.map(str::to_string),
            event: event.to_string(),
            payload,
        });
    }
}

impl EventSink for RecordingSink {
    fn emit_scoped<'a>(&'a self, scope_key: &'a str, event: &'a str, payload: Value) -> SinkFuture<'a> {
        Box::pin(async move { self.record(Some(scope_key), event, payload) })
    }

    fn emit_broadcast<'a>(&'a self, event: &'a str, payload: Value) -> SinkFuture<'a> {
        Box::pin(async move { self.record(None, event, payload) })
    }

    fn is_reachable(&self, scope_key: &str) -> bool {
        self.reachable.lock().unwrap().contains(scope_key)
    }

    fn reachable_count(&self) -> usize {
        self.reachable.lock().unwrap().len()
    }
}

#[derive(Default)]
struct Script {
    gate: Option<Arc<Semaphore>>,
    questions: Mutex<Vec<String>>,
    finished: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Agent with fixed answers.
///
/// `a+b` is summed, `fail-case` fails with a trace, `panic` panics, anything
/// else is echoed. A gated executor waits for [`ScriptedExecutor::release`]
/// before answering each question.
#[derive(Clone, Default)]
pub struct ScriptedExecutor {
    script: Arc<Script>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self {
            script: Arc::new(Script {
                gate: Some(Arc::new(Semaphore::new(0))),
                ..Default::default()
            }),
        }
    }

    /// Let `n` more executions finish.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.script.gate {
            gate.add_permits(n);
        }
    }

    /// Questions in the order execution started.
    pub fn questions(&self) -> Vec<String> {
        self.script.questions.lock().unwrap().clone()
    }

    pub fn finished(&self) -> usize {
        self.script.finished.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.script.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn shared(&self) -> Arc<dyn AgentExecutor> {
        Arc::new(self.clone())
    }
}

fn answer(question: &str) -> Result<JobResult, ExecutionError> {
    if question == "fail-case" {
        return Err(ExecutionError::with_trace(
            "agent could not answer",
            serde_json::json!({ "question": question, "step": "plan" }),
        ));
    }
    if question == "panic" {
        panic!("agent blew up");
    }
    if let Some((a, b)) = question.split_once('+') {
        if let (Ok(a), Ok(b)) = (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
            return Ok(JobResult::with_output(
                (a + b).to_string(),
                serde_json::json!({ "sum": a + b }),
            ));
        }
    }
    Ok(JobResult::new(format!("echo: {question}")))
}

impl AgentExecutor for ScriptedExecutor {
    fn execute(&self, question: &str) -> ExecutionFuture {
        let script = self.script.clone();
        let question = question.to_string();
        Box::pin(async move {
            script.questions.lock().unwrap().push(question.clone());
            let now = script.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            script.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(gate) = &script.gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
            tokio::task::yield_now().await;

            script.in_flight.fetch_sub(1, Ordering::SeqCst);
            script.finished.fetch_add(1, Ordering::SeqCst);
            answer(&question)
        })
    }
}

pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        clock_interval_secs: 0,
        ..Default::default()
    }
}

pub async fn start(
    executor: &ScriptedExecutor,
    sink: Arc<RecordingSink>,
) -> Result<Pipeline, Box<dyn Error>> {
    let pipeline = Pipeline::start(test_config(), Collaborators::new(executor.shared(), sink)).await?;
    Ok(pipeline)
}

pub async fn start_with(collaborators: Collaborators) -> Result<Pipeline, Box<dyn Error>> {
    let pipeline = Pipeline::start(test_config(), collaborators).await?;
    Ok(pipeline)
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> Result<(), Box<dyn Error>> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            return Err("condition not met within 2s".into());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    Ok(())
}

pub async fn flush(pipeline: &Pipeline) -> Result<(), Box<dyn Error>> {
    if pipeline.flush_events(Duration::from_secs(2)).await {
        Ok(())
    } else {
        Err("events were not flushed".into())
    }
}
