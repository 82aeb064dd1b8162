//! Demo agent wired into the console runner.

use std::time::Duration;

use actors::{ExecutionFuture, ExecutionResult, FnExecutor};
use pipeline_core::{ExecutionError, JobResult};

/// Answers `a+b`, `a-b`, `a*b` and `a/b`, sleeps on `sleep N`, fails on
/// anything starting with `fail`, and echoes the rest.
pub fn demo_agent() -> FnExecutor<impl Fn(String) -> ExecutionFuture + Send + Sync + 'static> {
    FnExecutor::new(|question: String| Box::pin(answer(question)))
}

async fn answer(question: String) -> ExecutionResult {
    tracing::debug!("Agent received: {}", question);

    if question.starts_with("fail") {
        return Err(ExecutionError::with_trace(
            "Intentional failure",
            serde_json::json!({ "question": question }),
        ));
    }

    if let Some(seconds) = question
        .strip_prefix("sleep ")
        .and_then(|s| s.trim().parse::<u64>().ok())
    {
        tokio::time::sleep(Duration::from_secs(seconds)).await;
        return Ok(JobResult::new(format!("Slept for {} seconds", seconds)));
    }

    if let Some(value) = arithmetic(&question)? {
        return Ok(JobResult::with_output(
            value.to_string(),
            serde_json::json!({ "value": value }),
        ));
    }

    Ok(JobResult::new(format!("You asked: {}", question)))
}

fn arithmetic(question: &str) -> Result<Option<f64>, ExecutionError> {
    let expr = question.trim_end_matches(['?', '=', ' ']);
    let Some(index) = expr.rfind(['+', '-', '*', '/']).filter(|&i| i > 0) else {
        return Ok(None);
    };
    let (lhs, rhs) = (expr[..index].trim(), expr[index + 1..].trim());
    let (Ok(a), Ok(b)) = (lhs.parse::<f64>(), rhs.parse::<f64>()) else {
        return Ok(None);
    };
    let value = match &expr[index..index + 1] {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        _ if b == 0.0 => return Err(ExecutionError::new("division by zero")),
        _ => a / b,
    };
    Ok(Some(value))
}
