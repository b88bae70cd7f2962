//! Bounded conversation history and reminders, stored as JSON files

use std::path::{Path, PathBuf};

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use log::{debug, info, warn};

/// Keywords that mark a recurring request
pub const ROUTINE_KEYWORDS: [&str; 5]
  = ["remind", "meeting", "drink water", "study", "exercise"];

/// One user/assistant exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn
{   #[serde(default)]
    pub user: String
  , #[serde(default)]
    pub nova: String
}

/// Append-only conversation log keeping the newest `limit` turns
#[derive(Debug, Clone)]
pub struct ConversationStore
{   path: PathBuf
  , limit: usize
}

impl ConversationStore
{   pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self
    {   ConversationStore
        {   path: path.into()
          , limit: limit.max(1)
        }
    }

    pub fn path(&self) -> &Path
    {   &self.path
    }

    /// Stored turns, oldest first; unreadable files read as empty
    pub fn load(&self) -> Vec<Turn>
    {   read_json_list(&self.path)
    }

    pub fn save_turn(
      &self
    , user_text: &str
    , nova_response: &str
    ) -> Result<(), crate::error::Error>
    {   let mut turns = self.load();
        turns.push(Turn
        {   user: user_text.to_string()
          , nova: nova_response.to_string()
        });
        if turns.len() > self.limit
        {   let excess = turns.len() - self.limit;
            turns.drain(..excess);
        }
        debug!("Saving {} turns to {}", turns.len(), self.path.display());
        write_json_list(&self.path, &turns)
    }

    pub fn clear(&self) -> Result<(), crate::error::Error>
    {   match std::fs::remove_file(&self.path)
        {   Ok(()) => {}
          , Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
          , Err(e) => return Err(e.into())
        }
        info!("Conversation memory cleared");
        Ok(())
    }

    /// Keywords that appear in more than one user turn
    pub fn routines(&self) -> Vec<String>
    {   detect_routines(&self.load())
    }

    pub fn suggest_routine(&self) -> String
    {   suggestion_for(&self.routines())
    }
}

/// Count keyword hits per turn, keep those seen more than once
///
/// Routines come back in the order their keyword first appeared.
pub fn detect_routines(turns: &[Turn]) -> Vec<String>
{   let mut counts: Vec<(&str, usize)> = Vec::new();
    for turn in turns
    {   let user_text = turn.user.to_lowercase();
        for keyword in ROUTINE_KEYWORDS
        {   if !user_text.contains(keyword)
            {   continue;
            }
            match counts.iter_mut().find(|(k, _)| *k == keyword)
            {   Some((_, n)) => *n += 1
              , None => counts.push((keyword, 1))
            }
        }
    }
    counts
      .into_iter()
      .filter(|(_, n)| *n > 1)
      .map(|(k, _)| k.to_string())
      .collect()
}

pub fn suggestion_for(routines: &[String]) -> String
{   if routines.is_empty()
    {   "No recurring routines detected yet.".to_string()
    } else
    {   format!(
          "You seem to often mention: {}. Would you like a regular reminder?",
          routines.join(", ")
        )
    }
}

/// A routine the user asked to be reminded of
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder
{   pub routine: String
  , /// Local time as `HH:MM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>
}

impl std::fmt::Display for Reminder
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   match &self.time
        {   Some(time) => write!(f, "{} at {}", self.routine, time)
          , None => f.write_str(&self.routine)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReminderStore
{   path: PathBuf
}

impl ReminderStore
{   pub fn new(path: impl Into<PathBuf>) -> Self
    {   ReminderStore
        {   path: path.into()
        }
    }

    pub fn list(&self) -> Vec<Reminder>
    {   read_json_list(&self.path)
    }

    /// Add a reminder unless an identical one exists
    pub fn add(
      &self
    , routine: &str
    , time: Option<&str>
    ) -> Result<(), crate::error::Error>
    {   let mut reminders = self.list();
        let reminder = Reminder
        {   routine: routine.to_string()
          , time: time.map(str::to_string)
        };
        if !reminders.contains(&reminder)
        {   reminders.push(reminder);
        }
        write_json_list(&self.path, &reminders)
    }

    /// Reminders whose time equals `now` at minute resolution
    pub fn due_at(&self, now: NaiveTime) -> Vec<Reminder>
    {   let minute = format!("{:02}:{:02}", now.hour(), now.minute());
        self.list()
          .into_iter()
          .filter(|r| r.time.as_deref() == Some(minute.as_str()))
          .collect()
    }

    pub fn due_now(&self) -> Vec<Reminder>
    {   self.due_at(chrono::Local::now().time())
    }
}

fn read_json_list<T: serde::de::DeserializeOwned>(path: &Path) -> Vec<T>
{   let text = match std::fs::read_to_string(path)
    {   Ok(text) => text
      , Err(_) => return Vec::new()
    };
    serde_json::from_str(&text).unwrap_or_else(|e| {
      warn!("Ignoring unreadable {}: {}", path.display(), e);
      Vec::new()
    })
}

fn write_json_list<T: Serialize>(
  path: &Path
, items: &[T]
) -> Result<(), crate::error::Error>
{   if let Some(parent) = path.parent()
    {   if !parent.as_os_str().is_empty()
        {   std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(items)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests
{   use super::*;

    fn store(dir: &tempfile::TempDir, limit: usize) -> ConversationStore
    {   ConversationStore::new(dir.path().join("logs/history.json"), limit)
    }

    #[test]
    fn test_save_and_trim()
    {   let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, 3);
        for i in 0..5
        {   store.save_turn(&format!("q{}", i), &format!("a{}", i)).unwrap();
        }
        let turns = store.load();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].user, "q2");
        assert_eq!(turns[2].nova, "a4");
    }

    #[test]
    fn test_clear_and_missing()
    {   let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, 20);
        assert!(store.clear().is_ok());
        store.save_turn("Hello", "Hi there!").unwrap();
        store.clear().unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_file_reads_empty()
    {   let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = ConversationStore::new(path, 20);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_routines()
    {   let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, 20);
        store.save_turn("Remind me to STUDY", "ok").unwrap();
        store.save_turn("study again", "ok").unwrap();
        store.save_turn("remind me of the meeting", "ok").unwrap();
        assert_eq!(store.routines(), vec!["remind", "study"]);
        assert_eq!(
          store.suggest_routine(),
          "You seem to often mention: remind, study. Would you like a regular reminder?"
        );
    }

    #[test]
    fn test_routines_in_first_seen_order()
    {   let turns: Vec<Turn> = ["study", "remind me to study", "remind"]
          .iter()
          .map(|text| Turn
          {   user: text.to_string()
            , nova: "ok".to_string()
          })
          .collect();
        assert_eq!(detect_routines(&turns), vec!["study", "remind"]);
    }

    #[test]
    fn test_no_routines()
    {   assert_eq!(suggestion_for(&[]), "No recurring routines detected yet.");
    }

    #[test]
    fn test_reminders_dedupe_and_due()
    {   let dir = tempfile::tempdir().unwrap();
        let reminders = ReminderStore::new(dir.path().join("reminders.json"));
        reminders.add("study", None).unwrap();
        reminders.add("study", None).unwrap();
        reminders.add("drink water", Some("09:30")).unwrap();
        assert_eq!(reminders.list().len(), 2);

        let due = reminders.due_at(NaiveTime::from_hms_opt(9, 30, 59).unwrap());
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].routine, "drink water");
        assert!(reminders
          .due_at(NaiveTime::from_hms_opt(9, 31, 0).unwrap())
          .is_empty());
    }
}
