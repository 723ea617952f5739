use chrono::Local;
use dialoguer::console::style;

pub enum CommandStatus {
    Success,
    Error,
    Warning,
    Info,
}

/// Timestamped status line on stderr. This is the tool's log stream: every
/// per-partition and per-record failure ends up here.
pub fn print_command_status(status: CommandStatus, message: &str) {
    let indicator = match &status {
        CommandStatus::Success => style("✓").green(),
        CommandStatus::Error => style("✗").red(),
        CommandStatus::Warning => style("!").yellow(),
        CommandStatus::Info => style("·").dim(),
    };
    let timestamp = style(Local::now().format("%Y/%m/%d %H:%M:%S").to_string()).dim();

    eprintln!("{timestamp} {indicator} {message}");
}
