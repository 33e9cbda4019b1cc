//! Messages exchanged between the menu-bar process and its popup
//! windows, plus the editor form logic both sides agree on.

use std::collections::BTreeMap;

use serde::{
  Deserialize,
  Serialize
};
use uuid::Uuid;

/// Longest task title shown in the menu
/// before it is cut and suffixed.
pub const MAX_TITLE_CHARS: usize = 45;

const ELLIPSIS: &str = "...";

/// Display title for a raw input: trimmed,
/// and cut to [`MAX_TITLE_CHARS`]
/// characters plus `"..."` when longer.
pub fn truncate_title(
  input: &str
) -> String {
  let trimmed = input.trim();
  if trimmed.chars().count()
    > MAX_TITLE_CHARS
  {
    let head: String = trimmed
      .chars()
      .take(MAX_TITLE_CHARS)
      .collect();
    format!("{head}{ELLIPSIS}")
  } else {
    trimmed.to_string()
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskDraft {
  pub title: String,
  pub text:  String
}

impl TaskDraft {
  /// `None` when the input is empty or
  /// whitespace only.
  pub fn from_input(
    input: &str
  ) -> Option<Self> {
    if input.trim().is_empty() {
      return None;
    }

    Some(Self {
      title: truncate_title(input),
      text:  input.to_string()
    })
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskUpdate {
  pub task:  TaskDraft,
  pub index: i64,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub id:    Option<Uuid>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
  PartialEq,
)]
pub struct PreferenceUpdate {
  pub key:   String,
  pub value: serde_json::Value
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "snake_case")]
pub enum ButtonId {
  ClearAll,
  CloseWelcomeWindow
}

/// Window → main process.
#[derive(
  Debug, Clone, Serialize, Deserialize,
  PartialEq,
)]
#[serde(
  tag = "channel",
  content = "data",
  rename_all = "camelCase"
)]
pub enum Inbound {
  AddTask(TaskDraft),
  UpdateTask(TaskUpdate),
  UpdatePreferences(PreferenceUpdate),
  CloseWindow,
  RendererButtonClicked(ButtonId)
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct EditRequest {
  pub index: usize,
  pub id:    Uuid,
  pub text:  String
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "lowercase")]
pub enum WindowState {
  Blur,
  Focus
}

/// Main process → window.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(
  tag = "channel",
  content = "data",
  rename_all = "camelCase"
)]
pub enum Outbound {
  EditTask(EditRequest),
  ResetWin,
  LoadPreferences(BTreeMap<String, bool>),
  UpdateAccentColor(Option<String>),
  StateChange(WindowState)
}

#[derive(
  Debug, Clone, PartialEq, Eq, Default,
)]
pub enum FormMode {
  #[default]
  Add,
  Edit {
    index: i64,
    id:    Option<Uuid>
  }
}

/// State of the add/edit popup form as the
/// window script sees it.
#[derive(Debug, Clone, Default)]
pub struct EditorForm {
  mode:  FormMode,
  input: String
}

impl EditorForm {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn mode(&self) -> &FormMode {
    &self.mode
  }

  pub fn input(&self) -> &str {
    &self.input
  }

  pub fn set_input(
    &mut self,
    value: impl Into<String>
  ) {
    self.input = value.into();
  }

  /// The submit button only shows once
  /// something has been typed.
  pub fn submit_visible(&self) -> bool {
    !self.input.is_empty()
  }

  /// Messages to send for a submit. Empty
  /// when the input is blank, in which case
  /// the window stays open.
  pub fn submit(&self) -> Vec<Inbound> {
    let Some(draft) =
      TaskDraft::from_input(&self.input)
    else {
      return vec![];
    };

    let message = match &self.mode {
      | FormMode::Add => {
        Inbound::AddTask(draft)
      }
      | FormMode::Edit { index, id } => {
        Inbound::UpdateTask(TaskUpdate {
          task:  draft,
          index: *index,
          id:    *id
        })
      }
    };

    vec![message, Inbound::CloseWindow]
  }

  pub fn escape(&self) -> Inbound {
    Inbound::CloseWindow
  }

  /// Apply a message pushed by the main
  /// process. Returns whether the form
  /// state changed.
  pub fn receive(
    &mut self,
    message: &Outbound
  ) -> bool {
    match message {
      | Outbound::EditTask(request) => {
        self.mode = FormMode::Edit {
          index: i64::try_from(request.index)
            .unwrap_or(-1),
          id:    Some(request.id)
        };
        self.input = request.text.clone();
        true
      }
      | Outbound::ResetWin => {
        self.reset();
        true
      }
      | _ => false
    }
  }

  pub fn reset(&mut self) {
    self.mode = FormMode::Add;
    self.input.clear();
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn truncation_keeps_exactly_max_chars()
  {
    let exact = "a".repeat(45);
    assert_eq!(truncate_title(&exact), exact);

    let long = "a".repeat(46);
    let title = truncate_title(&long);
    assert_eq!(
      title,
      format!("{}...", "a".repeat(45))
    );
    assert_eq!(title.chars().count(), 48);
  }

  #[test]
  fn truncation_trims_and_counts_chars()
  {
    assert_eq!(
      truncate_title("  buy milk \n"),
      "buy milk"
    );

    let accented = "é".repeat(45);
    assert_eq!(
      truncate_title(&accented),
      accented
    );
  }

  #[test]
  fn draft_keeps_raw_text() {
    let draft =
      TaskDraft::from_input("  call mom ")
        .expect("non-empty input");
    assert_eq!(draft.title, "call mom");
    assert_eq!(draft.text, "  call mom ");

    assert!(
      TaskDraft::from_input("   ").is_none()
    );
    assert!(
      TaskDraft::from_input("").is_none()
    );
  }

  #[test]
  fn blank_submit_sends_nothing() {
    let mut form = EditorForm::new();
    assert!(form.submit().is_empty());

    form.set_input(" \t ");
    assert!(form.submit().is_empty());
    assert!(form.submit_visible());
  }

  #[test]
  fn add_mode_submits_add_then_close() {
    let mut form = EditorForm::new();
    form.set_input("water plants");

    let messages = form.submit();
    assert_eq!(messages.len(), 2);
    assert_eq!(
      messages[0],
      Inbound::AddTask(TaskDraft {
        title: "water plants".to_string(),
        text:  "water plants".to_string()
      })
    );
    assert_eq!(
      messages[1],
      Inbound::CloseWindow
    );
  }

  #[test]
  fn edit_request_switches_mode_until_reset()
   {
    let id = Uuid::new_v4();
    let mut form = EditorForm::new();
    assert!(form.receive(
      &Outbound::EditTask(EditRequest {
        index: 2,
        id,
        text: "old text".to_string()
      })
    ));
    assert_eq!(form.input(), "old text");

    form.set_input("new text");
    let messages = form.submit();
    assert_eq!(
      messages[0],
      Inbound::UpdateTask(TaskUpdate {
        task:  TaskDraft {
          title: "new text".to_string(),
          text:  "new text".to_string()
        },
        index: 2,
        id:    Some(id)
      })
    );

    form.receive(&Outbound::ResetWin);
    assert_eq!(form.mode(), &FormMode::Add);
    assert_eq!(form.input(), "");
    assert!(!form.submit_visible());
  }

  #[test]
  fn oversized_edit_index_is_out_of_range()
  {
    let id = Uuid::new_v4();
    let mut form = EditorForm::new();
    form.receive(&Outbound::EditTask(
      EditRequest {
        index: usize::MAX,
        id,
        text: "far away".to_string()
      }
    ));
    assert_eq!(
      form.mode(),
      &FormMode::Edit {
        index: -1,
        id:    Some(id)
      }
    );
  }

  #[test]
  fn inbound_wire_format() {
    let parsed: Inbound =
      serde_json::from_value(json!({
        "channel": "updateTask",
        "data": {
          "task": { "title": "t", "text": "t" },
          "index": 0
        }
      }))
      .expect("parse updateTask");
    assert_eq!(
      parsed,
      Inbound::UpdateTask(TaskUpdate {
        task:  TaskDraft {
          title: "t".to_string(),
          text:  "t".to_string()
        },
        index: 0,
        id:    None
      })
    );

    let close: Inbound =
      serde_json::from_value(
        json!({ "channel": "closeWindow" })
      )
      .expect("parse closeWindow");
    assert_eq!(close, Inbound::CloseWindow);

    let button: Inbound =
      serde_json::from_value(json!({
        "channel": "rendererButtonClicked",
        "data": "close_welcome_window"
      }))
      .expect("parse button");
    assert_eq!(
      button,
      Inbound::RendererButtonClicked(
        ButtonId::CloseWelcomeWindow
      )
    );
  }

  #[test]
  fn outbound_wire_format() {
    let value = serde_json::to_value(
      Outbound::UpdateAccentColor(None)
    )
    .expect("serialize");
    assert_eq!(
      value,
      json!({ "channel": "updateAccentColor", "data": null })
    );

    let value = serde_json::to_value(
      Outbound::StateChange(
        WindowState::Blur
      )
    )
    .expect("serialize");
    assert_eq!(
      value,
      json!({ "channel": "stateChange", "data": "blur" })
    );
  }
}
