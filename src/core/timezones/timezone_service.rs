// Timezone helpers for the `!time` converter and the `/timezones`
// overview. Members advertise their timezone through a Discord role
// named after the abbreviation; without one, UTC is assumed.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

/// Common abbreviations accepted in chat, mapped to IANA zone names.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("UTC", "Etc/UTC"),
    ("GMT", "Etc/GMT"),
    ("EST", "America/New_York"),
    ("EDT", "America/New_York"),
    ("CST", "America/Chicago"),
    ("CDT", "America/Chicago"),
    ("MST", "America/Denver"),
    ("MDT", "America/Denver"),
    ("PST", "America/Los_Angeles"),
    ("PDT", "America/Los_Angeles"),
    ("CET", "Europe/Paris"),
    ("CEST", "Europe/Paris"),
    ("BST", "Europe/London"),
    ("WEST", "Europe/Lisbon"),
    ("SGT", "Asia/Singapore"),
    ("JST", "Asia/Tokyo"),
    ("KST", "Asia/Seoul"),
    ("IST", "Asia/Kolkata"),
    ("AEST", "Australia/Sydney"),
    ("AEDT", "Australia/Sydney"),
    ("ACST", "Australia/Adelaide"),
    ("AWST", "Australia/Perth"),
    ("BRT", "America/Sao_Paulo"),
    ("ART", "America/Argentina/Buenos_Aires"),
];

/// Role names members can carry, mapped to zones. `BST_UK` avoids the
/// clash between British Summer Time and Bangladesh Standard Time.
const ROLE_TIMEZONES: &[(&str, &str)] = &[
    ("CET", "Europe/Paris"),
    ("BRT", "America/Sao_Paulo"),
    ("SGT", "Asia/Singapore"),
    ("BST_UK", "Europe/London"),
    ("EST", "America/New_York"),
    ("PST", "America/Los_Angeles"),
    ("AEST", "Australia/Sydney"),
];

/// Zones shown in the `/timezones` overview embed.
const OVERVIEW_TIMEZONES: &[GuildTimezone] = &[
    GuildTimezone {
        label: "🕐 Pacific",
        tz_name: "America/Los_Angeles",
        note: "PST / PDT",
    },
    GuildTimezone {
        label: "🕑 Eastern",
        tz_name: "America/New_York",
        note: "EST / EDT",
    },
    GuildTimezone {
        label: "🕒 Brazil",
        tz_name: "America/Sao_Paulo",
        note: "BRT",
    },
    GuildTimezone {
        label: "🕓 UK",
        tz_name: "Europe/London",
        note: "GMT / BST",
    },
    GuildTimezone {
        label: "🕔 Central Europe",
        tz_name: "Europe/Paris",
        note: "CET / CEST",
    },
    GuildTimezone {
        label: "🕕 Singapore",
        tz_name: "Asia/Singapore",
        note: "SGT",
    },
    GuildTimezone {
        label: "🕖 Australia",
        tz_name: "Australia/Sydney",
        note: "AEST / AEDT",
    },
];

pub struct GuildTimezone {
    pub label: &'static str,
    pub tz_name: &'static str,
    pub note: &'static str,
}

pub struct TimezoneDisplay {
    pub twelve_hour: String,
    pub twenty_four_hour: String,
    pub date_fragment: String,
    pub relative_timestamp: i64,
}

#[derive(Default)]
pub struct TimezoneService;

impl TimezoneService {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve_abbreviation(&self, abbr: &str) -> Option<Tz> {
        let abbr = abbr.trim().to_uppercase();
        ABBREVIATIONS
            .iter()
            .find(|(name, _)| *name == abbr)
            .and_then(|(_, zone)| zone.parse().ok())
    }

    /// Picks the first role name that matches a known timezone role.
    pub fn timezone_for_roles<'a, I>(&self, role_names: I) -> Option<Tz>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for name in role_names {
            if let Some((_, zone)) = ROLE_TIMEZONES.iter().find(|(role, _)| *role == name) {
                return zone.parse().ok();
            }
        }
        None
    }

    /// Interprets a casual time phrase ("today 8pm", "friday 19:30",
    /// "tomorrow noon") in the given zone, preferring the future when
    /// the phrase names no day.
    pub fn parse_time_phrase(
        &self,
        phrase: &str,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let phrase = phrase.trim().to_lowercase();
        let words: Vec<&str> = phrase.split_whitespace().collect();
        if words.is_empty() {
            return None;
        }

        let local_now = now.with_timezone(&tz);
        let mut day_offset: Option<i64> = None;
        let mut time: Option<NaiveTime> = None;

        for word in &words {
            match *word {
                "today" | "tonight" => day_offset = Some(0),
                "tomorrow" => day_offset = Some(1),
                "at" | "on" | "this" | "next" => {}
                other => {
                    if let Some(weekday) = parse_weekday(other) {
                        let today = local_now.weekday().num_days_from_monday() as i64;
                        let target = weekday.num_days_from_monday() as i64;
                        let mut ahead = (target - today).rem_euclid(7);
                        if ahead == 0 {
                            ahead = 7;
                        }
                        day_offset = Some(ahead);
                    } else if let Some(parsed) = parse_clock(other) {
                        time = Some(parsed);
                    } else {
                        return None;
                    }
                }
            }
        }

        let time = time?;
        let date = match day_offset {
            Some(offset) => local_now.date_naive() + Duration::days(offset),
            None => {
                // No day named: today if the time is still ahead,
                // otherwise tomorrow.
                if time > local_now.time() {
                    local_now.date_naive()
                } else {
                    local_now.date_naive() + Duration::days(1)
                }
            }
        };

        tz.from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Current time in every overview zone, for the embed.
    pub fn guild_snapshot(&self, now: DateTime<Utc>) -> Vec<(&'static GuildTimezone, TimezoneDisplay)> {
        OVERVIEW_TIMEZONES
            .iter()
            .map(|tz_def| {
                let tz: Tz = tz_def.tz_name.parse().unwrap_or(chrono_tz::UTC);
                let local = now.with_timezone(&tz);

                let twelve_hour = local.format("%I:%M %p").to_string();
                let twelve_hour = match twelve_hour.strip_prefix('0') {
                    Some(stripped) => stripped.to_string(),
                    None => twelve_hour,
                };

                (
                    tz_def,
                    TimezoneDisplay {
                        twelve_hour,
                        twenty_four_hour: local.format("%H:%M").to_string(),
                        date_fragment: local.format("%a %d %b").to_string(),
                        relative_timestamp: local.timestamp(),
                    },
                )
            })
            .collect()
    }
}

fn parse_weekday(word: &str) -> Option<Weekday> {
    match word {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Accepts `8pm`, `8:30pm`, `19:30`, `7am`, `noon`, `midnight`.
fn parse_clock(word: &str) -> Option<NaiveTime> {
    match word {
        "noon" => return NaiveTime::from_hms_opt(12, 0, 0),
        "midnight" => return NaiveTime::from_hms_opt(0, 0, 0),
        _ => {}
    }

    let (digits, meridiem) = if let Some(rest) = word.strip_suffix("am") {
        (rest, Some(false))
    } else if let Some(rest) = word.strip_suffix("pm") {
        (rest, Some(true))
    } else {
        (word, None)
    };

    let (hour_str, minute_str) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None => (digits, "0"),
    };
    let hour: u32 = hour_str.parse().ok()?;
    let minute: u32 = minute_str.parse().ok()?;

    let hour = match meridiem {
        Some(true) if hour < 12 => hour + 12,
        Some(true) => hour,
        Some(false) if hour == 12 => 0,
        // Bare numbers without am/pm are read as a 24h clock.
        Some(false) | None => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn svc() -> TimezoneService {
        TimezoneService::new()
    }

    // Monday 2025-01-06 15:00 UTC.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 15, 0, 0).unwrap()
    }

    #[test]
    fn abbreviations_resolve_case_insensitively() {
        assert_eq!(
            svc().resolve_abbreviation("pst"),
            Some(chrono_tz::America::Los_Angeles)
        );
        assert_eq!(svc().resolve_abbreviation("XYZ"), None);
    }

    #[test]
    fn the_first_matching_role_wins() {
        let tz = svc().timezone_for_roles(["Member", "BST_UK", "EST"]);
        assert_eq!(tz, Some(chrono_tz::Europe::London));

        assert_eq!(svc().timezone_for_roles(["Member"]), None);
    }

    #[test]
    fn today_8pm_lands_today_in_the_users_zone() {
        let parsed = svc()
            .parse_time_phrase("today 8pm", chrono_tz::Etc::UTC, now())
            .unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 6, 20, 0, 0).unwrap());
    }

    #[test]
    fn bare_times_prefer_the_future() {
        // 15:00 UTC now: 8am already passed, so tomorrow.
        let parsed = svc()
            .parse_time_phrase("8am", chrono_tz::Etc::UTC, now())
            .unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 7, 8, 0, 0).unwrap());

        // 8pm is still ahead today.
        let parsed = svc()
            .parse_time_phrase("8pm", chrono_tz::Etc::UTC, now())
            .unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 6, 20, 0, 0).unwrap());
    }

    #[test]
    fn weekday_names_pick_the_next_occurrence() {
        // From Monday, "friday 19:30" is the 10th.
        let parsed = svc()
            .parse_time_phrase("friday 19:30", chrono_tz::Etc::UTC, now())
            .unwrap();
        assert_eq!(
            parsed,
            Utc.with_ymd_and_hms(2025, 1, 10, 19, 30, 0).unwrap()
        );

        // "monday" from a Monday means next Monday, not today.
        let parsed = svc()
            .parse_time_phrase("monday noon", chrono_tz::Etc::UTC, now())
            .unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 13, 12, 0, 0).unwrap());
    }

    #[test]
    fn phrases_convert_from_the_users_zone() {
        // 8pm in Singapore (UTC+8) on Jan 7 is noon UTC.
        let parsed = svc()
            .parse_time_phrase("tomorrow 8pm", chrono_tz::Asia::Singapore, now())
            .unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 7, 12, 0, 0).unwrap());
    }

    #[test]
    fn nonsense_is_rejected() {
        assert!(svc()
            .parse_time_phrase("whenever lol", chrono_tz::Etc::UTC, now())
            .is_none());
        assert!(svc()
            .parse_time_phrase("", chrono_tz::Etc::UTC, now())
            .is_none());
        // A day without a clock time is not enough.
        assert!(svc()
            .parse_time_phrase("tomorrow", chrono_tz::Etc::UTC, now())
            .is_none());
    }

    #[test]
    fn snapshot_covers_every_overview_zone() {
        let rows = svc().guild_snapshot(now());
        assert_eq!(rows.len(), 7);
        for (_, display) in rows {
            assert!(!display.twelve_hour.starts_with('0'));
            assert_eq!(display.twenty_four_hour.len(), 5);
        }
    }
}
