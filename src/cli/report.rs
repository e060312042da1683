//! Terminal rendering of ledger snapshots.

use ansi_term::Colour::{Cyan, Green, Red, Yellow};
use chrono::{Local, NaiveDate};

use crate::ledger::{
    entities::{EntryKind, LedgerEntry},
    view::{EarningsSummary, LedgerView},
};

pub fn print_status(view: &LedgerView) {
    let state = if view.is_active {
        Green.bold().paint("mining")
    } else {
        Yellow.paint("idle")
    };
    println!("{} ({state})", Cyan.bold().paint(&view.display_name));
    if let Some(avatar) = &view.avatar_ref {
        println!("Avatar:        {avatar}");
    }
    println!("Balance:       {} points", Green.bold().paint(view.balance.to_string()));
    println!(
        "Today:         {} / {} ({:.1})",
        view.formatted_elapsed, view.formatted_goal, view.progress_percent
    );
    println!("Total earned:  {}", view.total_earned);
    println!("Total spent:   {}", view.total_spent);
    println!("Days active:   {}", view.days_active);
}

pub fn print_session_start(view: &LedgerView) {
    println!(
        "Mining started at {} of {}. Press Ctrl-C to stop.",
        view.formatted_elapsed, view.formatted_goal
    );
}

/// Redraws the progress line in place.
pub fn print_progress(view: &LedgerView) {
    print!(
        "\r{} {} / {} ({:.1})   ",
        Green.paint("Mining"),
        view.formatted_elapsed,
        view.formatted_goal,
        view.progress_percent
    );
}

pub fn print_rollover(date: NaiveDate) {
    println!();
    println!("{}", Yellow.paint(format!("New day {date}, progress starts over")));
}

pub fn print_goal_reached(entry: &LedgerEntry, view: &LedgerView) {
    println!();
    println!(
        "{} {}. {} point has been added, balance is {}.",
        Green.bold().paint("Congratulations!"),
        entry.description,
        entry.amount,
        view.balance
    );
}

pub fn print_session_stopped(view: &LedgerView) {
    println!();
    println!(
        "Mining stopped at {} of {}. Progress is saved for today.",
        view.formatted_elapsed, view.formatted_goal
    );
}

pub fn print_spent(entry: &LedgerEntry, balance: u64) {
    println!(
        "Spent {} points on {}. Remaining balance: {}",
        Red.paint(entry.amount.to_string()),
        entry.description,
        Green.bold().paint(balance.to_string())
    );
}

pub fn print_history(history: &[LedgerEntry], limit: usize) {
    if history.is_empty() {
        println!("No activity yet");
        return;
    }
    for entry in history.iter().take(limit) {
        let amount = match entry.kind {
            EntryKind::Earned => Green.paint(format!("+{}", entry.amount)),
            EntryKind::Spent => Red.paint(format!("-{}", entry.amount)),
        };
        println!(
            "{}  {:>5}  {}",
            entry.timestamp.with_timezone(&Local).format("%b %d %H:%M"),
            amount,
            entry.description
        );
    }
}

pub fn print_summary(summary: &EarningsSummary) {
    println!("Balance:        {}", Green.bold().paint(summary.balance.to_string()));
    println!("Total earned:   {}", summary.total_earned);
    println!("Total spent:    {}", summary.total_spent);
    println!("Days active:    {}", summary.days_active);
    println!("Average / day:  {:.1}", summary.average_per_day);
    println!();
    for day in &summary.recent_days {
        println!(
            "{}  {:>4}  {:>4}",
            day.date.format("%a %d"),
            Green.paint(format!("+{}", day.earned)),
            Red.paint(format!("-{}", day.spent))
        );
    }
}
