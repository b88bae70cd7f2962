//! HTML status page: conversation, routines, reminders and a text chat

use std::sync::Arc;

use axum::extract::{Form, State};
use axum::response::{Html, Redirect};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::sync::Mutex;
use log::{debug, error, info};

use crate::assistant::{Assistant, NO_ANSWER_MESSAGE};
use crate::config::Voice;
use crate::memory::{suggestion_for, detect_routines, ReminderStore, Reminder, Turn};
use crate::request::{DispatchResult, LastResultInfo};

/// Per-process preferences set through the page
#[derive(Debug, Clone, Default)]
pub struct Session
{   pub selected_voice: String
  , /// `None` follows the configured backend order
    pub use_secondary: Option<bool>
  , /// Shown once on the next page load
    pub text_response: Option<DispatchResult>
}

pub struct WebState
{   pub assistant: Arc<Assistant>
  , pub backend: Arc<crate::NovaBackend>
  , pub reminders: ReminderStore
  , pub voices: Vec<Voice>
  , pub session: Mutex<Session>
}

impl WebState
{   pub fn new(
      assistant: Arc<Assistant>
    , backend: Arc<crate::NovaBackend>
    , config: &crate::AssistantConfig
    ) -> Self
    {   WebState
        {   assistant
          , backend
          , reminders: ReminderStore::new(config.reminder_file.clone())
          , voices: config.voices.clone()
          , session: Mutex::new(Session
            {   selected_voice: config.default_voice.clone()
              , ..Session::default()
            })
        }
    }
}

pub fn router(state: Arc<WebState>) -> Router
{   Router::new()
      .route("/", get(index))
      .route("/status", get(status))
      .route("/text_input", post(text_input))
      .route("/set_backend", post(set_backend))
      .route("/set_tts_voice", post(set_tts_voice))
      .route("/add_reminder", post(add_reminder))
      .route("/clear_memory", post(clear_memory))
      .with_state(state)
}

/// Bind and serve until the process exits
pub async fn serve(
  state: Arc<WebState>
, bind: &str
) -> Result<(), crate::error::Error>
{   let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Status page listening on {}", bind);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn index(State(state): State<Arc<WebState>>) -> Html<String>
{   let turns = state.assistant.store().load();
    let routines = detect_routines(&turns);
    let reminders = state.reminders.list();
    let last = state.backend.last_result_info();
    let mut session = state.session.lock().await;
    let text_response = session.text_response.take();

    let page = IndexPage
    {   turns: &turns
      , routine_suggestion: suggestion_for(&routines)
      , routines: &routines
      , reminders: &reminders
      , voices: &state.voices
      , selected_voice: &session.selected_voice
      , use_secondary: session.use_secondary
      , text_response: text_response.as_ref()
      , last
    };
    Html(page.render())
}

async fn status(State(state): State<Arc<WebState>>) -> Json<LastResultInfo>
{   Json(state.backend.last_result_info())
}

#[derive(Debug, Deserialize)]
struct TextInput
{   #[serde(default)]
    user_text: String
}

async fn text_input(
  State(state): State<Arc<WebState>>
, Form(form): Form<TextInput>
) -> Redirect
{   let text = form.user_text.trim();
    if !text.is_empty()
    {   let use_secondary = state.session.lock().await.use_secondary;
        let result = state.assistant.ask(text, use_secondary).await;
        state.session.lock().await.text_response = Some(result);
    }
    Redirect::to("/")
}

#[derive(Debug, Deserialize)]
struct BackendChoice
{   #[serde(default)]
    backend: String
}

/// Map a form value to a secondary-first override
pub fn backend_override(choice: &str) -> Option<bool>
{   match choice.trim().to_ascii_lowercase().as_str()
    {   "secondary" | "open_webui" => Some(true)
      , "primary" | "ollama" => Some(false)
      , _ => None
    }
}

async fn set_backend(
  State(state): State<Arc<WebState>>
, Form(form): Form<BackendChoice>
) -> Redirect
{   let choice = backend_override(&form.backend);
    debug!("Backend preference set to {:?}", choice);
    state.session.lock().await.use_secondary = choice;
    Redirect::to("/")
}

#[derive(Debug, Deserialize)]
struct VoiceChoice
{   #[serde(default)]
    voice: String
}

async fn set_tts_voice(
  State(state): State<Arc<WebState>>
, Form(form): Form<VoiceChoice>
) -> Redirect
{   if state.voices.iter().any(|v| v.name == form.voice)
    {   state.session.lock().await.selected_voice = form.voice;
    }
    Redirect::to("/")
}

#[derive(Debug, Deserialize)]
struct ReminderForm
{   #[serde(default)]
    routine: String
  , time: Option<String>
}

async fn add_reminder(
  State(state): State<Arc<WebState>>
, Form(form): Form<ReminderForm>
) -> Redirect
{   if !form.routine.is_empty()
    {   let time = form.time
          .as_deref()
          .map(str::trim)
          .filter(|t| !t.is_empty());
        if let Err(e) = state.reminders.add(&form.routine, time)
        {   error!("Failed to add reminder: {}", e);
        }
    }
    Redirect::to("/")
}

async fn clear_memory(State(state): State<Arc<WebState>>) -> Redirect
{   if let Err(e) = state.assistant.store().clear()
    {   error!("Failed to clear memory: {}", e);
    }
    Redirect::to("/")
}

pub fn escape_html(text: &str) -> String
{   let mut out = String::with_capacity(text.len());
    for c in text.chars()
    {   match c
        {   '&' => out.push_str("&amp;")
          , '<' => out.push_str("&lt;")
          , '>' => out.push_str("&gt;")
          , '"' => out.push_str("&quot;")
          , '\'' => out.push_str("&#39;")
          , c => out.push(c)
        }
    }
    out
}

const STYLE: &str = "\
body { font-family: sans-serif; background: #f7f7f7; }
.container { max-width: 600px; margin: 40px auto; background: #fff; padding: 24px; border-radius: 8px; box-shadow: 0 2px 8px #ccc; }
.turn { margin-bottom: 16px; }
.user { color: #0074d9; }
.nova { color: #ff851b; }
.note { color: #777; font-size: 0.9em; }
.clear-btn { background: #e74c3c; color: #fff; border: none; padding: 8px 16px; border-radius: 4px; }
.routine { background: #eafaf1; color: #2a7b4f; padding: 12px; border-radius: 6px; margin-bottom: 18px; }
.reminders { background: #fffbe6; color: #b8860b; padding: 10px; border-radius: 6px; margin-bottom: 18px; }
.panel { background: #eaf1fa; padding: 10px; border-radius: 6px; margin-bottom: 18px; }
";

struct IndexPage<'a>
{   turns: &'a [Turn]
  , routine_suggestion: String
  , routines: &'a [String]
  , reminders: &'a [Reminder]
  , voices: &'a [Voice]
  , selected_voice: &'a str
  , use_secondary: Option<bool>
  , text_response: Option<&'a DispatchResult>
  , last: LastResultInfo
}

impl IndexPage<'_>
{   fn render(&self) -> String
    {   let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<title>Nova Status</title>\n<style>");
        html.push_str(STYLE);
        html.push_str("</style>\n</head>\n<body>\n<div class=\"container\">\n");
        html.push_str("<h1>Nova Status &amp; Memory</h1>\n");

        html.push_str("<div class=\"panel\"><form method=\"POST\" action=\"/set_tts_voice\"><strong>TTS Voice:</strong> <select name=\"voice\">");
        for v in self.voices
        {   let selected = if v.name == self.selected_voice { " selected" } else { "" };
            html.push_str(&format!(
              "<option value=\"{0}\"{1}>{0} ({2}, {3})</option>",
              escape_html(&v.name), selected,
              escape_html(&v.language), escape_html(&v.style)
            ));
        }
        html.push_str("</select> <button type=\"submit\">Set Voice</button></form></div>\n");

        html.push_str("<div class=\"panel\"><form method=\"POST\" action=\"/set_backend\"><strong>Backend:</strong> <select name=\"backend\">");
        for (value, label, choice) in [
          ("auto", "Configured order", None)
        , ("secondary", "Secondary first", Some(true))
        , ("primary", "Primary only", Some(false))
        ]
        {   let selected = if choice == self.use_secondary { " selected" } else { "" };
            html.push_str(&format!("<option value=\"{}\"{}>{}</option>", value, selected, label));
        }
        html.push_str(&format!(
          "</select> <button type=\"submit\">Set Backend</button></form>\
           <div class=\"note\">Last request: {}{}</div></div>\n",
          self.last.backend,
          if self.last.fallback { " (fallback)" } else { "" }
        ));

        html.push_str(&format!(
          "<div class=\"routine\"><strong>Routine Suggestion:</strong> {}",
          escape_html(&self.routine_suggestion)
        ));
        for routine in self.routines
        {   let routine = escape_html(routine);
            html.push_str(&format!(
              "<form method=\"POST\" action=\"/add_reminder\" style=\"display:inline;\">\
               <input type=\"hidden\" name=\"routine\" value=\"{0}\">\
               <button type=\"submit\">Set Reminder for '{0}'</button></form>",
              routine
            ));
        }
        html.push_str("</div>\n");

        html.push_str("<div class=\"reminders\"><strong>Active Reminders:</strong> ");
        if self.reminders.is_empty()
        {   html.push_str("None");
        } else
        {   let list: Vec<String> = self.reminders
              .iter()
              .map(|r| escape_html(&r.to_string()))
              .collect();
            html.push_str(&list.join(", "));
        }
        html.push_str("</div>\n");

        html.push_str("<form method=\"POST\" action=\"/clear_memory\"><button class=\"clear-btn\" type=\"submit\">Clear Memory</button></form>\n");
        html.push_str("<h2>Talk to Nova (Text)</h2>\n<form method=\"POST\" action=\"/text_input\">\
          <input type=\"text\" name=\"user_text\" placeholder=\"Type your message...\" style=\"width:80%;padding:8px;\">\
          <button type=\"submit\">Send</button></form>\n");

        if let Some(result) = self.text_response
        {   let text = if result.is_answer() { result.text.as_str() } else { NO_ANSWER_MESSAGE };
            html.push_str(&format!(
              "<div class=\"nova\" style=\"margin-top:16px;\"><strong>Nova:</strong> {}</div>\n",
              escape_html(text)
            ));
            html.push_str(&format!(
              "<div class=\"note\">Response served by {}{}</div>\n",
              result.backend_used,
              if result.fallback_occurred { " (fallback)" } else { "" }
            ));
        }

        html.push_str("<h2>Recent Conversation</h2>\n");
        if self.turns.is_empty()
        {   html.push_str("<p>No conversation history.</p>\n");
        }
        for turn in self.turns
        {   html.push_str(&format!(
              "<div class=\"turn\"><div class=\"user\"><strong>User:</strong> {}</div>\
               <div class=\"nova\"><strong>Nova:</strong> {}</div></div>\n",
              escape_html(&turn.user), escape_html(&turn.nova)
            ));
        }
        html.push_str("</div>\n</body>\n</html>\n");
        html
    }
}
