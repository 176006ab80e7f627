use crate::config::Config;
use crate::model::{NoteId, NoteState};
use crate::remote::{HttpTransport, RemoteClient, Transport};
use crate::storage::{PreferenceStore, Theme};
use crate::ui;
use crate::urgency::{to_minute_precision, Urgency};
use crate::view::{render, ItemView};
use crate::workflow::{Action, NoticeKind, Workflow};
use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use serde_json::Value;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

pub async fn tui(config: &Config) -> Result<()> {
    let (workflow, client) = open_workflow(config).await?;
    ui::run(workflow, client).await
}

pub async fn list(config: &Config, query: Option<String>) -> Result<()> {
    let client = remote_client(config)?;
    let mut state = load_state(config, &client).await;
    if state.is_empty() {
        println!("(no notes)");
        return Ok(());
    }
    state.set_query(query.unwrap_or_default());
    let view = render(&state, Utc::now());
    if view.empty {
        println!("(no notes match \"{}\")", state.query());
        return Ok(());
    }
    for item in &view.items {
        print_item(item);
    }
    Ok(())
}

pub async fn add(config: &Config, text: String, deadline: Option<String>) -> Result<()> {
    if text.trim().is_empty() {
        bail!("note text is required");
    }
    let (mut workflow, client) = open_workflow(config).await?;
    workflow.dispatch(Action::SetCreateText(text));
    workflow.dispatch(Action::SetCreateDeadline(deadline.unwrap_or_default()));
    workflow.perform(Action::SubmitCreate, &client).await;
    report(&workflow)?;
    if let Some(note) = workflow.state().all().first() {
        println!("  [{}] {}", note.id, note.text);
    }
    Ok(())
}

pub async fn edit(
    config: &Config,
    note_id: NoteId,
    text: Option<String>,
    deadline: Option<String>,
    clear_deadline: bool,
) -> Result<()> {
    let (mut workflow, client) = open_workflow(config).await?;
    if workflow.state().get(note_id).is_none() {
        bail!("note {} not found", note_id);
    }
    workflow.dispatch(Action::OpenEdit(note_id));
    if let Some(text) = text {
        if text.trim().is_empty() {
            bail!("note text is required");
        }
        workflow.dispatch(Action::SetEditText(text));
    }
    if clear_deadline {
        workflow.dispatch(Action::SetEditDeadline(String::new()));
    } else if let Some(deadline) = deadline {
        workflow.dispatch(Action::SetEditDeadline(deadline));
    }
    workflow.perform(Action::SubmitEdit, &client).await;
    report(&workflow)
}

pub async fn delete(config: &Config, note_id: NoteId, yes: bool) -> Result<()> {
    let (mut workflow, client) = open_workflow(config).await?;
    let note = workflow
        .state()
        .get(note_id)
        .cloned()
        .ok_or_else(|| anyhow!("note {} not found", note_id))?;
    workflow.dispatch(Action::RequestDelete(note_id));
    if !yes && !confirm(&format!("Delete \"{}\"?", note.text))? {
        workflow.dispatch(Action::CancelDelete);
        println!("Delete canceled");
        return Ok(());
    }
    workflow.perform(Action::ConfirmDelete, &client).await;
    report(&workflow)
}

pub async fn export(config: &Config, query: Option<String>) -> Result<()> {
    let client = remote_client(config)?;
    let mut state = load_state(config, &client).await;
    state.set_query(query.unwrap_or_default());
    println!("{}", render(&state, Utc::now()).to_html());
    Ok(())
}

pub fn theme(theme: Option<Theme>) -> Result<()> {
    let store = PreferenceStore::locate()?;
    match theme {
        Some(theme) => {
            store.set(theme);
            println!("Theme set to {} ({})", theme, store.path().display());
        }
        None => println!("{}", store.get()),
    }
    Ok(())
}

fn remote_client(config: &Config) -> Result<RemoteClient<HttpTransport>> {
    let transport = HttpTransport::new(&config.server).context("building HTTP client")?;
    Ok(RemoteClient::new(transport))
}

async fn open_workflow(config: &Config) -> Result<(Workflow, RemoteClient<HttpTransport>)> {
    let client = remote_client(config)?;
    let state = load_state(config, &client).await;
    let prefs = PreferenceStore::locate()?;
    Ok((Workflow::new(state, prefs), client))
}

/// Initial notes: the snapshot file when given, otherwise the server's list.
/// Any failure degrades to an empty list.
pub async fn load_state<T: Transport>(config: &Config, client: &RemoteClient<T>) -> NoteState {
    let snapshot = match &config.snapshot {
        Some(path) => read_snapshot(path),
        None => client
            .list_notes()
            .await
            .map_err(|err| anyhow!(err).context("fetching notes")),
    };
    match snapshot {
        Ok(value) => NoteState::from_snapshot(&value),
        Err(err) => {
            tracing::warn!(error = %format!("{:#}", err), "starting with no notes");
            NoteState::default()
        }
    }
}

fn read_snapshot(path: &Path) -> Result<Value> {
    let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let value = serde_json::from_str(&data).context("parsing snapshot")?;
    Ok(value)
}

/// Prints the workflow's latest notification, failing on errors.
fn report(workflow: &Workflow) -> Result<()> {
    match workflow.notifier().last() {
        Some(notice) if notice.kind == NoticeKind::Error => bail!("{}", notice.message),
        Some(notice) => {
            println!("{}", notice.message);
            Ok(())
        }
        None => bail!("nothing was sent"),
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn print_item(item: &ItemView) {
    println!("  - {}: {}", item.id, item.text);
    println!("    created: {}", item.created);
    if let Some(badge) = &item.deadline {
        let marker = match badge.urgency {
            Urgency::None => String::new(),
            other => format!(" [{}]", other.label()),
        };
        println!("    due: {}{}", to_minute_precision(Some(&badge.deadline)), marker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::ScriptedTransport;
    use std::path::PathBuf;

    fn config(snapshot: Option<PathBuf>) -> Config {
        Config {
            server: "http://127.0.0.1:5000".into(),
            snapshot,
            debug: false,
            data_dir: PathBuf::new(),
        }
    }

    #[tokio::test]
    async fn snapshot_file_wins_over_server() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        fs::write(
            &path,
            r#"[{"id":4,"text":"from file","created_at":"2026-01-01T10:00:00","deadline":null}]"#,
        )
        .unwrap();
        let transport = ScriptedTransport::default();
        let client = RemoteClient::new(transport.clone());
        let state = load_state(&config(Some(path)), &client).await;
        assert_eq!(state.all()[0].text, "from file");
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn server_list_seeds_state() {
        let transport = ScriptedTransport::default();
        transport.reply(
            200,
            r#"{"notes":[{"id":2,"text":"b","created_at":"x"},{"id":1,"text":"a","created_at":"y"}]}"#,
        );
        let client = RemoteClient::new(transport);
        let state = load_state(&config(None), &client).await;
        let ids: Vec<NoteId> = state.all().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn unreachable_server_or_bad_file_gives_empty_state() {
        let transport = ScriptedTransport::default();
        transport.fail("connection refused");
        let client = RemoteClient::new(transport);
        assert!(load_state(&config(None), &client).await.is_empty());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(load_state(&config(Some(path)), &client).await.is_empty());
        let missing = dir.path().join("missing.json");
        assert!(load_state(&config(Some(missing)), &client).await.is_empty());
    }
}
