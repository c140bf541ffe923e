//! Terminal rendering for a negotiation run and its result card.

use chrono::DateTime;
use fixr_core::money::{format_inr, format_lakhs, format_percent};
use fixr_core::{Agent, FinalResult, RunEvent};

use crate::app::Notice;

/// Print what the user should see for `event`.
///
/// Offers and rounds already arrive as terminal lines; the structured
/// events only add the agent board when asked for.
pub fn print_event(event: &RunEvent, show_board: bool) {
    match event {
        RunEvent::Line(line) => println!("{line}"),
        RunEvent::Standings(agents) if show_board => print!("{}", board(agents)),
        _ => {}
    }
}

pub fn print_result_card(result: &FinalResult) {
    print!("{}", result_card(result));
}

pub fn print_notice(notice: &Notice) {
    println!();
    println!("{notice}");
}

/// One row per agent: current bid and personal best, in lakhs.
pub fn board(agents: &[Agent]) -> String {
    let mut out = format!("  {:<14} {:>8} {:>8}\n", "agent", "offer", "best");
    for agent in agents {
        out.push_str(&format!(
            "  {:<14} {:>8} {:>8}\n",
            agent.name,
            format_lakhs(agent.current_offer),
            format_lakhs(agent.best_offer)
        ));
    }
    out
}

// ── Result card ──

pub fn result_card(result: &FinalResult) -> String {
    let mut out = format!(
        "=== Negotiation complete ===\nYou saved {} ({}%)\n\n",
        format_inr(result.savings),
        format_percent(result.savings_percentage)
    );

    section(
        &mut out,
        "Original Offer",
        &[
            ("loan amount", format_inr(result.original_amount)),
            ("interest rate", result.interest_rate.clone()),
            ("tenure", result.tenure.clone()),
        ],
    );
    section(
        &mut out,
        "Negotiated Offer",
        &[
            ("loan amount", format_inr(result.new_amount)),
            ("interest rate", result.interest_rate.clone()),
            ("tenure", result.tenure.clone()),
        ],
    );
    section(
        &mut out,
        "Savings",
        &[
            ("total savings", format_inr(result.savings)),
            ("savings percentage", format!("{}%", format_percent(result.savings_percentage))),
            ("best provider", result.provider.clone()),
            ("product", result.product.clone()),
        ],
    );

    let mut details = vec![
        ("processed on", processed_on(&result.processed_at)),
        ("file", result.file_name.clone()),
    ];
    if let Some(note) = &result.note {
        details.push(("note", note.clone()));
    }
    section(&mut out, "Details", &details);
    out
}

fn section(out: &mut String, header: &str, rows: &[(&str, String)]) {
    out.push_str(header);
    out.push('\n');
    for (label, value) in rows {
        out.push_str(&format!("  {:<26} {}\n", label, value));
    }
    out.push('\n');
}

/// Indian-locale date and time in the timestamp's own offset, e.g.
/// `18/10/2026, 12:00:00 pm`. Unparseable input is shown as is.
fn processed_on(processed_at: &str) -> String {
    match DateTime::parse_from_rfc3339(processed_at) {
        Ok(at) => at.format("%-d/%-m/%Y, %-I:%M:%S %P").to_string(),
        Err(_) => processed_at.to_string(),
    }
}
