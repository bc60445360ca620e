use chrono::SecondsFormat;
use lokimap_core::model::movement::MovementEntry;
use owo_colors::OwoColorize;

pub fn print_movements_human(entries: &[MovementEntry]) {
    for entry in entries {
        println!(
            "{} {} | {} | {} | {}",
            entry.start.to_rfc3339_opts(SecondsFormat::Millis, true),
            entry.user_name.cyan(),
            entry.service,
            entry.method,
            entry.duration.green(),
        );
    }
    println!("-- {} movements --", entries.len());
}
