//! Console command parsing.

use pipeline_core::{JobId, NotificationKind, NotificationPriority, QueueName};

/// One line typed at the console.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ask(String),
    List(QueueName),
    Remove(QueueName, JobId),
    Notify {
        user: String,
        kind: NotificationKind,
        priority: NotificationPriority,
        message: String,
    },
    Pop(String),
    Notifications(String),
    Stats,
    Help,
    Quit,
}

pub const HELP: &str = "\
<question>                                     admit a question
/list <todo|run|done|dead>                     show a queue
/remove <queue> <id>                           delete a job
/notify <user> <kind> <priority> <message>     queue a notification
/pop <user>                                    take the oldest notification
/notifications <user>                          list pending notifications
/stats                                         queue counts
/quit                                          shut down";

impl std::str::FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Ask(line.to_string()));
        };

        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or_default();
        let mut arg = |what: &str| words.next().map(str::to_string).ok_or_else(|| format!("missing {what}"));

        let command = match name {
            "list" => Command::List(arg("queue")?.parse()?),
            "remove" => {
                let queue = arg("queue")?.parse()?;
                Command::Remove(queue, JobId::new(arg("job id")?))
            }
            "notify" => {
                let user = arg("user")?;
                let kind = arg("kind")?.parse()?;
                let priority = arg("priority")?.parse()?;
                let message = words.collect::<Vec<_>>().join(" ");
                if message.is_empty() {
                    return Err("missing message".to_string());
                }
                Command::Notify {
                    user,
                    kind,
                    priority,
                    message,
                }
            }
            "pop" => Command::Pop(arg("user")?),
            "notifications" => Command::Notifications(arg("user")?),
            "stats" => Command::Stats,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command /{other}")),
        };
        Ok(command)
    }
}
