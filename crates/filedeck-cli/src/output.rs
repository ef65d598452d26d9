//! Output formatting helpers.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use filedeck_core::{Notice, NoticeLevel};

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dimmed hint on stderr.
pub fn hint(msg: &str) {
    eprintln!("{}", msg.dimmed());
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print a section heading.
pub fn heading(title: &str) {
    println!("{}", title.bold());
}

/// Print a notice from a live view.
pub fn notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Info => eprintln!("{} {}", "•".cyan(), notice),
        NoticeLevel::Success => eprintln!("{} {}", "✓".green(), notice),
        NoticeLevel::Error => error(&notice.message),
    }
}

/// Print a value as compact JSON.
pub fn json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    println!("{}", json);
    Ok(())
}

/// Print a value as pretty-printed JSON.
pub fn json_pretty<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}
