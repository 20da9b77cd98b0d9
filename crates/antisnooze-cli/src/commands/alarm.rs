use clap::Subcommand;

use antisnooze_core::{next_alarm_date, AlarmSettings, SettingsStore, VibrationIntensity};
use chrono::{NaiveTime, Utc};

#[derive(Subcommand)]
pub enum AlarmCmd {
    /// Set the wake-up time (and optionally intensity and repeat days)
    Set {
        /// Wake-up time, HH:MM
        time: String,
        /// Vibration intensity: light, medium or strong
        #[arg(long)]
        intensity: Option<String>,
        /// Repeat days as comma-separated names (e.g. "mon,tue,fri"),
        /// or "none" for a one-shot alarm
        #[arg(long)]
        days: Option<String>,
    },
    /// Activate the alarm
    Enable,
    /// Deactivate the alarm
    Disable,
    /// Print current settings and the next fire time as JSON
    Status,
}

fn parse_intensity(raw: &str) -> Result<VibrationIntensity, Box<dyn std::error::Error>> {
    match raw {
        "light" => Ok(VibrationIntensity::Light),
        "medium" => Ok(VibrationIntensity::Medium),
        "strong" => Ok(VibrationIntensity::Strong),
        other => Err(format!("unknown intensity: {other} (expected light, medium or strong)").into()),
    }
}

/// Parse "mon,tue,fri" into the Sunday-first repeat-day flags.
fn parse_days(raw: &str) -> Result<[bool; 7], Box<dyn std::error::Error>> {
    let mut days = [false; 7];
    if raw == "none" {
        return Ok(days);
    }
    for part in raw.split(',') {
        let index = match part.trim().to_lowercase().as_str() {
            "sun" | "sunday" => 0,
            "mon" | "monday" => 1,
            "tue" | "tuesday" => 2,
            "wed" | "wednesday" => 3,
            "thu" | "thursday" => 4,
            "fri" | "friday" => 5,
            "sat" | "saturday" => 6,
            other => return Err(format!("unknown day: {other}").into()),
        };
        days[index] = true;
    }
    Ok(days)
}

fn print_status(settings: &AlarmSettings) -> Result<(), Box<dyn std::error::Error>> {
    let mut json = serde_json::to_value(settings)?;
    let next = next_alarm_date(settings, Utc::now());
    json["nextFireAt"] = match next {
        Some(at) => serde_json::Value::String(at.to_rfc3339()),
        None => serde_json::Value::Null,
    };
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

pub fn run(action: AlarmCmd) -> Result<(), Box<dyn std::error::Error>> {
    let store = SettingsStore::open_default()?;
    let mut settings = store.load()?;

    match action {
        AlarmCmd::Set { time, intensity, days } => {
            settings.wake_up_time = NaiveTime::parse_from_str(&time, "%H:%M")
                .map_err(|_| format!("invalid time: {time} (expected HH:MM)"))?;
            if let Some(raw) = intensity {
                settings.vibration_intensity = parse_intensity(&raw)?;
            }
            if let Some(raw) = days {
                settings.repeat_days = parse_days(&raw)?;
            }
            store.save(&settings)?;
            print_status(&settings)?;
        }
        AlarmCmd::Enable => {
            settings.is_active = true;
            store.save(&settings)?;
            print_status(&settings)?;
        }
        AlarmCmd::Disable => {
            settings.is_active = false;
            store.save(&settings)?;
            print_status(&settings)?;
        }
        AlarmCmd::Status => {
            print_status(&settings)?;
        }
    }
    Ok(())
}
