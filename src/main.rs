use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use support_assistant_lib::host::LocalBrowser;
use support_assistant_lib::view::{project, TextRenderer, ViewRenderer};
use support_assistant_lib::{
    init_tracing, open_popup, CollectionKind, CommitOutcome, NoteField, PopupCore, Settings,
};

#[derive(Debug, Parser)]
#[command(name = "support-assistant", about = "Support assistant popup from the command line")]
struct Cli {
    /// Directory holding settings, state and logs.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print links, templates and checklist.
    Show,
    Add {
        kind: CollectionKind,
        label: String,
        #[arg(default_value = "")]
        value: String,
    },
    Edit {
        kind: CollectionKind,
        index: usize,
        label: String,
        #[arg(default_value = "")]
        value: String,
    },
    Remove {
        kind: CollectionKind,
        index: usize,
    },
    Toggle {
        index: usize,
    },
    Note {
        field: NoteField,
        value: String,
    },
    Reset,
    Open {
        index: usize,
    },
    Copy {
        index: usize,
    },
    /// Ask a tab's content script for a page snapshot.
    Snapshot {
        /// Page markup; without it the tab is a blank page with no content script.
        #[arg(long)]
        html: Option<PathBuf>,
        #[arg(long, default_value = "about:blank")]
        url: String,
        /// Load the markup without injecting the content script.
        #[arg(long)]
        no_content_script: bool,
    },
    /// Change one setting in settings.json, e.g. `config messageTimeoutMs 2000`.
    Config {
        key: String,
        value: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    let settings = Settings::load(&data_dir).context("failed to load settings")?;
    if let Err(error) = init_tracing(&data_dir, &settings.log_filter) {
        eprintln!("logging disabled: {}", error);
    }

    if let Command::Config { key, value } = &cli.command {
        let updated = Settings::set_key(&data_dir, key, value).context("failed to update settings")?;
        println!("{}", serde_json::to_string_pretty(&updated)?);
        return Ok(());
    }

    let renderer: Box<dyn ViewRenderer> = match cli.command {
        Command::Show => Box::new(TextRenderer::new(std::io::stdout())),
        _ => Box::new(TextRenderer::new(std::io::sink())),
    };
    let browser = Arc::new(LocalBrowser::new());
    let mut popup = open_popup(&data_dir, &settings, renderer, browser.clone())
        .await
        .context("failed to open popup state")?;

    match cli.command {
        Command::Show => print_notes(&popup),
        Command::Add { kind, label, value } => {
            popup.open_add(kind);
            finish_commit(&mut popup, &label, &value).await?;
        }
        Command::Edit {
            kind,
            index,
            label,
            value,
        } => {
            let form = popup.open_edit(kind, index)?;
            let value = if value.is_empty() { form.value } else { value };
            finish_commit(&mut popup, &label, &value).await?;
        }
        Command::Remove { kind, index } => {
            popup.remove(kind, index).await?;
            print_collection(&popup, kind);
        }
        Command::Toggle { index } => {
            let done = popup.toggle_checklist(index).await?;
            println!("checklist {} is now {}", index, if done { "done" } else { "open" });
        }
        Command::Note { field, value } => {
            popup.set_note(field, &value).await?;
            print_notes(&popup);
        }
        Command::Reset => {
            popup.reset().await?;
            println!("restored defaults");
        }
        Command::Open { index } => {
            let tab_id = popup.open_link(index).await?;
            println!("opened {} in tab {}", popup.document().links[index].value, tab_id);
        }
        Command::Copy { index } => {
            if popup.copy_template(index).await? {
                if let Some(text) = browser.clipboard_contents().await {
                    println!("{}", text);
                }
            } else {
                bail!("clipboard copy failed");
            }
        }
        Command::Snapshot {
            html,
            url,
            no_content_script,
        } => {
            let markup = match html {
                Some(path) => Some(
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?,
                ),
                None => None,
            };
            browser
                .open_inspected_page(&url, markup, !no_content_script)
                .await;
            let result = popup.log_page_info().await;
            println!("{}", popup.page_status());
            if let Ok(info) = result {
                println!("{}", serde_json::to_string_pretty(&info)?);
            }
        }
        Command::Config { .. } => {}
    }

    Ok(())
}

async fn finish_commit(popup: &mut PopupCore, label: &str, value: &str) -> anyhow::Result<()> {
    match popup.commit(label, value).await? {
        CommitOutcome::Committed { kind, index } => {
            println!("saved {} {}", kind.as_str(), index);
            print_collection(popup, kind);
            Ok(())
        }
        CommitOutcome::Rejected(rejection) => bail!("not saved: {:?}", rejection),
        CommitOutcome::Cancelled => Ok(()),
    }
}

fn print_collection(popup: &PopupCore, kind: CollectionKind) {
    let mut renderer = TextRenderer::new(std::io::stdout());
    renderer.render_collection(kind, &project(popup.document(), kind));
}

fn print_notes(popup: &PopupCore) {
    let notes = &popup.document().notes;
    println!("[notes]");
    for field in [NoteField::TicketNumber, NoteField::ConfigurationId, NoteField::Domain] {
        println!("  {}: {}", field.as_str(), notes.get(field));
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("support-assistant"))
        .unwrap_or_else(|| PathBuf::from(".support-assistant"))
}
