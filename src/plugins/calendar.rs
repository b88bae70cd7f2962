use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};
use icalendar::{
  Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime,
};
use log::debug;

const NOT_AVAILABLE: &str
  = "Calendar integration not available. Add ~/calendar.ics.";

/// Next upcoming event from a local iCalendar file
pub struct CalendarPlugin
{   path: Option<PathBuf>
}

impl CalendarPlugin
{   pub fn new(path: impl Into<PathBuf>) -> Self
    {   CalendarPlugin
        {   path: Some(path.into())
        }
    }

    /// `~/calendar.ics`
    pub fn from_home() -> Self
    {   CalendarPlugin
        {   path: dirs::home_dir().map(|home| home.join("calendar.ics"))
        }
    }
}

/// First event in file order that starts after `now`
///
/// All-day events are skipped. Zoned start times are read as local
/// wall-clock time.
pub fn next_event(calendar: &Calendar, now: NaiveDateTime) -> Option<String>
{   calendar.components
      .iter()
      .filter_map(|component| match component
      {   CalendarComponent::Event(event) => Some(event)
        , _ => None
      })
      .find_map(|event| {
        let start = match event.get_start()?
        {   DatePerhapsTime::DateTime(CalendarDateTime::Floating(t)) => t
          , DatePerhapsTime::DateTime(CalendarDateTime::Utc(t)) => {
              t.with_timezone(&Local).naive_local()
            }
          , DatePerhapsTime::DateTime(
              CalendarDateTime::WithTimezone { date_time, .. }
            ) => date_time
          , DatePerhapsTime::Date(_) => return None
        };
        (start > now).then(|| format!(
          "{} at {}",
          event.get_summary().unwrap_or_default(),
          start.format("%Y-%m-%d %H:%M")
        ))
      })
}

/// Render the plugin reply for calendar text
pub fn describe(ics: &str, now: NaiveDateTime) -> String
{   match ics.parse::<Calendar>()
    {   Ok(calendar) => match next_event(&calendar, now)
        {   Some(event) => format!("Next event: {}", event)
          , None => "No upcoming events found.".to_string()
        }
      , Err(e) => format!("Calendar error: {}", e)
    }
}

#[async_trait::async_trait]
impl super::Plugin for CalendarPlugin
{   fn name(&self) -> &str
    {   "calendar"
    }

    async fn run(
      &self
    , _context: &super::PluginContext
    ) -> Result<String, crate::error::Error>
    {   let path = match &self.path
        {   Some(path) => path
          , None => return Ok(NOT_AVAILABLE.to_string())
        };
        let ics = match tokio::fs::read_to_string(path).await
        {   Ok(text) => text
          , Err(e) => {
              debug!("No calendar at {}: {}", path.display(), e);
              return Ok(NOT_AVAILABLE.to_string());
            }
        };
        Ok(describe(&ics, Local::now().naive_local()))
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::plugins::{Plugin, PluginContext};
    use chrono::NaiveDate;

    const ICS: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//nova//tests//EN\r\n\
BEGIN:VEVENT\r\n\
UID:past@nova\r\n\
SUMMARY:Old standup\r\n\
DTSTART:20240101T090000\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:holiday@nova\r\n\
SUMMARY:Holiday\r\n\
DTSTART;VALUE=DATE:20240701\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:review@nova\r\n\
SUMMARY:Design review\r\n\
DTSTART:20240610T143000\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    fn june_first() -> NaiveDateTime
    {   NaiveDate::from_ymd_opt(2024, 6, 1)
          .unwrap()
          .and_hms_opt(8, 0, 0)
          .unwrap()
    }

    #[test]
    fn test_next_timed_event()
    {   assert_eq!(
          describe(ICS, june_first()),
          "Next event: Design review at 2024-06-10 14:30"
        );
    }

    #[test]
    fn test_nothing_upcoming()
    {   let later = NaiveDate::from_ymd_opt(2025, 1, 1)
          .unwrap()
          .and_hms_opt(0, 0, 0)
          .unwrap();
        assert_eq!(describe(ICS, later), "No upcoming events found.");
    }

    #[tokio::test]
    async fn test_missing_file()
    {   let dir = tempfile::tempdir().unwrap();
        let plugin = CalendarPlugin::new(dir.path().join("calendar.ics"));
        let reply = plugin.run(&PluginContext::default()).await.unwrap();
        assert_eq!(reply, NOT_AVAILABLE);
    }

    #[tokio::test]
    async fn test_reads_file()
    {   let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calendar.ics");
        std::fs::write(&path, ICS.replace("2024", "2999")).unwrap();
        let reply = CalendarPlugin::new(path)
          .run(&PluginContext::default())
          .await
          .unwrap();
        assert!(reply.starts_with("Next event: "));
    }
}
