// Formats and sends the weekly GPQ reminder.

use crate::core::reminders::{batches, ReminderReport, MENTION_BATCH_SIZE};
use poise::serenity_prelude as serenity;

/// Shown to people who ran but forgot to submit.
const SUBMIT_NOTE: &str = "**NOTE: If you are getting pinged but already ran culvert this week, \
     it means your score isn't in the system. Enter it with /gpq <score>!**";

/// Builds the reminder messages. The first message carries the totals
/// and the deadline; extra messages carry overflow mention batches.
pub fn format_report(report: &ReminderReport, mention: bool) -> Vec<String> {
    if report.everyone_done() {
        return vec!["Everyone has done GPQ this week?!".to_string()];
    }

    // Shown a few minutes before the real rollover so nobody starts a
    // run they can't finish.
    let deadline = (report.week.deadline() - chrono::Duration::minutes(10)).timestamp();

    let mentions: Vec<String> = report
        .missing
        .iter()
        .map(|id| {
            if mention {
                format!("<@{}>", id)
            } else {
                id.to_string()
            }
        })
        .collect();
    let mut chunks = batches(&mentions, MENTION_BATCH_SIZE).into_iter();

    let delta = match report.delta_percent() {
        Some(delta) if delta > 0 => format!(" (+{}%)", delta),
        Some(delta) => format!(" ({}%)", delta),
        None => String::new(),
    };

    let mut messages = vec![format!(
        "**Last week GPQ total:** {}\n\
         **Current GPQ total:** {}{}\n\
         \n\
         {}\n\
         \n\
         The following people have not run GPQ yet! Please run before <t:{ts}:F> (<t:{ts}:R>)!\n\
         \n\
         {}",
        report.last_week_total,
        report.current_total,
        delta,
        SUBMIT_NOTE,
        chunks.next().unwrap_or_default().join(" "),
        ts = deadline,
    )];
    messages.extend(chunks.map(|chunk| chunk.join(" ")));
    messages
}

/// Sends the reminder to the configured channel.
pub async fn send_reminder(
    http: &serenity::Http,
    channel: serenity::ChannelId,
    report: &ReminderReport,
) {
    for message in format_report(report, true) {
        if let Err(e) = channel.say(http, message).await {
            tracing::error!("Failed to send reminder message: {}", e);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::roster::week::WeekKey;

    fn report(missing: Vec<u64>) -> ReminderReport {
        ReminderReport {
            week: WeekKey::parse("01/09/2025").unwrap(),
            missing,
            last_week_total: 2_000_000,
            current_total: 1_000_000,
        }
    }

    #[test]
    fn completed_weeks_get_the_short_message() {
        let messages = format_report(&report(vec![]), true);
        assert_eq!(messages, vec!["Everyone has done GPQ this week?!"]);
    }

    #[test]
    fn the_first_message_carries_totals_and_deadline() {
        let messages = format_report(&report(vec![1, 2]), true);
        assert_eq!(messages.len(), 1);

        let body = &messages[0];
        assert!(body.contains("**Last week GPQ total:** 2000000"));
        assert!(body.contains("**Current GPQ total:** 1000000 (-50%)"));
        assert!(body.contains("<@1> <@2>"));
        // Deadline is 10 minutes before Thursday midnight UTC.
        let deadline = WeekKey::parse("01/09/2025").unwrap().deadline().timestamp() - 600;
        assert!(body.contains(&format!("<t:{}:F>", deadline)));
    }

    #[test]
    fn mention_false_prints_bare_ids() {
        let messages = format_report(&report(vec![42]), false);
        assert!(messages[0].contains("42"));
        assert!(!messages[0].contains("<@42>"));
    }

    #[test]
    fn long_rosters_overflow_into_extra_messages() {
        let missing: Vec<u64> = (0..120).collect();
        let messages = format_report(&report(missing), true);
        assert_eq!(messages.len(), 3);
        assert!(messages[1].starts_with("<@50>"));
        assert!(messages[2].ends_with("<@119>"));
    }
}
