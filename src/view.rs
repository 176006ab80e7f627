use crate::model::{NoteId, NoteState};
use crate::urgency::{classify, Urgency};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub deadline: String,
    pub urgency: Urgency,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub id: NoteId,
    pub text: String,
    pub created: String,
    pub updated: Option<String>,
    pub deadline: Option<Badge>,
}

/// Projection of the filtered note list at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListView {
    pub items: Vec<ItemView>,
    pub empty: bool,
}

pub fn render(state: &NoteState, now: DateTime<Utc>) -> ListView {
    let items: Vec<ItemView> = state
        .filtered()
        .into_iter()
        .map(|note| ItemView {
            id: note.id,
            text: note.text.clone(),
            created: note.created_at.clone(),
            updated: note.updated_at.clone(),
            deadline: note
                .deadline
                .as_deref()
                .filter(|d| !d.is_empty())
                .map(|d| Badge {
                    deadline: d.to_string(),
                    urgency: classify(Some(d), now),
                }),
        })
        .collect();
    ListView {
        empty: items.is_empty(),
        items,
    }
}

impl ListView {
    /// Re-classifies every deadline badge in place. Item order and content
    /// are left alone.
    pub fn refresh_urgency(&mut self, now: DateTime<Utc>) -> usize {
        let mut changed = 0;
        for badge in self.items.iter_mut().filter_map(|i| i.deadline.as_mut()) {
            let urgency = classify(Some(&badge.deadline), now);
            if urgency != badge.urgency {
                badge.urgency = urgency;
                changed += 1;
            }
        }
        changed
    }

    pub fn position(&self, id: NoteId) -> Option<usize> {
        self.items.iter().position(|i| i.id == id)
    }

    /// Markup for the list section. All note content is escaped.
    pub fn to_html(&self) -> String {
        if self.empty {
            return r#"<div class="empty-state" id="emptyState">No notes yet.</div>"#.to_string();
        }
        let items: Vec<String> = self.items.iter().map(item_html).collect();
        format!(
            "<section class=\"notes\" id=\"notesList\">\n{}\n</section>",
            items.join("\n")
        )
    }
}

fn item_html(item: &ItemView) -> String {
    let text = escape_html(&item.text);
    let deadline_pill = match &item.deadline {
        Some(badge) => {
            let mut class = String::from("meta-pill meta-deadline");
            if badge.urgency != Urgency::None {
                class.push(' ');
                class.push_str(badge.urgency.css_class());
            }
            let deadline = escape_html(&badge.deadline);
            format!(
                "<span class=\"{}\" data-deadline=\"{}\" title=\"Deadline\">{}</span>",
                class, deadline, deadline
            )
        }
        None => String::new(),
    };
    format!(
        concat!(
            "<article class=\"note\" data-id=\"{id}\" data-text=\"{text}\">",
            "<div class=\"note-main\">",
            "<div class=\"note-text\">{text}</div>",
            "<div class=\"note-meta\">",
            "<span class=\"meta-pill\" title=\"Created\">{created}</span>{pill}",
            "</div></div>",
            "<div class=\"note-actions\">",
            "<button class=\"btn btn-ghost btn-sm js-edit\" type=\"button\">Edit</button>",
            "<button class=\"btn btn-danger btn-sm js-delete\" type=\"button\">Delete</button>",
            "</div></article>"
        ),
        id = item.id,
        text = text,
        created = escape_html(&item.created),
        pill = deadline_pill,
    )
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{note, Note};
    use crate::urgency::parse_timestamp;
    use chrono::Duration;

    fn with_deadline(id: NoteId, text: &str, deadline: &str) -> Note {
        Note {
            deadline: Some(deadline.to_string()),
            ..note(id, text)
        }
    }

    #[test]
    fn renders_filtered_items_in_order() {
        let mut state = NoteState::new(vec![note(1, "buy milk"), note(2, "call mom")]);
        state.set_query("MILK");
        let view = render(&state, Utc::now());
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].text, "buy milk");
        assert!(!view.empty);
    }

    #[test]
    fn empty_filter_result_sets_empty_state() {
        let mut state = NoteState::new(vec![note(1, "buy milk")]);
        state.set_query("zzz");
        let view = render(&state, Utc::now());
        assert!(view.empty);
        assert!(view.to_html().contains("emptyState"));
        assert!(!view.to_html().contains("notesList"));
    }

    #[test]
    fn badge_only_when_deadline_present() {
        let mut blank = note(3, "blank deadline");
        blank.deadline = Some(String::new());
        let state = NoteState::new(vec![note(1, "none"), with_deadline(2, "due", "2026-05-01T09:00:00"), blank]);
        let view = render(&state, Utc::now());
        assert!(view.items[0].deadline.is_none());
        assert!(view.items[1].deadline.is_some());
        assert!(view.items[2].deadline.is_none());
        assert!(!item_html(&view.items[0]).contains("meta-deadline"));
    }

    #[test]
    fn badge_urgency_uses_render_instant() {
        let deadline = "2026-05-01T09:00:00";
        let at = parse_timestamp(deadline).unwrap();
        let state = NoteState::new(vec![with_deadline(1, "x", deadline)]);
        let soon = render(&state, at - Duration::hours(2));
        assert_eq!(soon.items[0].deadline.as_ref().unwrap().urgency, Urgency::Soon);
        assert!(soon.to_html().contains("is-soon"));
        let late = render(&state, at + Duration::minutes(1));
        assert!(late.to_html().contains("meta-pill meta-deadline is-overdue"));
    }

    #[test]
    fn rendering_twice_is_identical() {
        let state = NoteState::new(vec![
            with_deadline(1, "a", "2026-05-01T09:00:00"),
            note(2, "b"),
        ]);
        let now = Utc::now();
        let first = render(&state, now);
        let second = render(&state, now);
        assert_eq!(first, second);
        assert_eq!(first.to_html(), second.to_html());
    }

    #[test]
    fn markup_never_contains_raw_specials() {
        let nasty = r#"<script>alert("x") & 'y'</script>"#;
        let mut n = with_deadline(1, nasty, "<b>");
        n.created_at = "\"now\"".into();
        let view = render(&NoteState::new(vec![n]), Utc::now());
        let html = view.to_html();
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>"));
        assert!(html.contains("&lt;script&gt;alert(&quot;x&quot;) &amp; &#039;y&#039;&lt;/script&gt;"));
        assert!(html.contains("&quot;now&quot;"));
    }

    #[test]
    fn escape_covers_all_five() {
        assert_eq!(escape_html(r#"&<>"'"#), "&amp;&lt;&gt;&quot;&#039;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn refresh_updates_badges_without_touching_items() {
        let deadline = "2026-05-01T09:00:00";
        let at = parse_timestamp(deadline).unwrap();
        let state = NoteState::new(vec![note(2, "no deadline"), with_deadline(1, "x", deadline)]);
        let mut view = render(&state, at - Duration::days(3));
        assert_eq!(view.items[1].deadline.as_ref().unwrap().urgency, Urgency::None);

        assert_eq!(view.refresh_urgency(at - Duration::hours(1)), 1);
        assert_eq!(view.items[1].deadline.as_ref().unwrap().urgency, Urgency::Soon);
        assert_eq!(view.refresh_urgency(at - Duration::hours(1)), 0);
        assert_eq!(view.refresh_urgency(at + Duration::hours(1)), 1);
        assert_eq!(view.items[1].deadline.as_ref().unwrap().urgency, Urgency::Overdue);
        assert_eq!(view.items[0].text, "no deadline");
        assert_eq!(view.position(1), Some(1));
    }
}
