//! Line-oriented console front end for the question pipeline.

use std::sync::Arc;

use actors::{Collaborators, Pipeline, SessionHub};
use pipeline_core::PipelineConfig;
use tokio::io::{AsyncBufReadExt, BufReader};

mod agent;
mod commands;

use commands::{Command, HELP};

const CONSOLE_SESSION: &str = "console";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = PipelineConfig::from_env();

    tracing_subscriber::fmt()
        .with_max_level(if config.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Initializing pipeline...");

    let hub = Arc::new(SessionHub::new());
    let mut events = hub.connect(CONSOLE_SESSION);
    tokio::spawn(async move {
        while let Some(message) = events.recv().await {
            println!("{}", message.to_json());
        }
    });

    let collaborators = Collaborators::new(Arc::new(agent::demo_agent()), hub.clone());
    let pipeline = Pipeline::start(config, collaborators).await?;

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => run(&pipeline, command).await,
            Err(e) => println!("error: {e}"),
        }
    }

    hub.disconnect(CONSOLE_SESSION);
    if let Err(e) = pipeline.shutdown().await {
        tracing::error!("Shutdown incomplete: {}", e);
    }
    Ok(())
}

async fn run(pipeline: &Pipeline, command: Command) {
    match command {
        Command::Ask(question) => match pipeline.push_job(&question).await {
            Ok(job) => println!("admitted {} ({})", job.id, job.status),
            Err(e) => println!("rejected: {e}"),
        },

        Command::List(queue) => {
            let jobs = pipeline.list(queue);
            println!("{queue}: {} job(s)", jobs.len());
            for job in jobs {
                let outcome = match (&job.result, &job.error) {
                    (Some(result), _) => format!(" => {}", result.answer),
                    (_, Some(error)) => format!(" !! {}", error.message),
                    _ => String::new(),
                };
                println!("  {} [{}] {}{}", job.id, job.status, job.question, outcome);
            }
        }

        Command::Remove(queue, id) => match pipeline.remove(queue, &id) {
            Some(job) => println!("removed {} from {queue}", job.id),
            None => println!("no job {id} in {queue}"),
        },

        Command::Notify {
            user,
            kind,
            priority,
            message,
        } => match pipeline.push_notification(&user, &message, kind, priority) {
            Ok(n) => println!(
                "notification {} for {} ({})",
                n.id,
                n.target_user,
                if n.delivered { "delivered" } else { "queued" }
            ),
            Err(e) => println!("rejected: {e}"),
        },

        Command::Pop(user) => match pipeline.pop_notification(&user) {
            Some(n) => println!("[{} {}] {}", n.priority, n.kind, n.message),
            None => println!("nothing for {user}"),
        },

        Command::Notifications(user) => {
            for n in pipeline.list_notifications(&user) {
                println!("  {} [{} {}] {}", n.id, n.priority, n.kind, n.message);
            }
        }

        Command::Stats => {
            let stats = pipeline.stats();
            println!(
                "todo={} running={} done={} dead={} notifications={} subscribers={}",
                stats.todo,
                stats.running,
                stats.done,
                stats.dead,
                stats.notifications,
                pipeline.subscriber_count()
            );
            if let Some(rate) = stats.success_rate() {
                println!("success rate {rate:.1}%");
            }
        }

        Command::Help => println!("{HELP}"),

        Command::Quit => {}
    }
}
