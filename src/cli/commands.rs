use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;

use tex_outline::config::{load_settings, load_settings_file, OutlineSettings};
use tex_outline::error::{OutlineError, Result};
use tex_outline::outline::{AnnotationQueue, SessionManager};
use tex_outline::refs::{load_aux, load_out};
use tex_outline::scanner::{find_env_pairs, uses_comment_package, CommentFilter, DocumentEvent, FileWatcher};
use tex_outline::source::{DocumentSource, FsSource};

#[derive(Parser)]
#[command(name = "tex-outline")]
#[command(about = "Structural outline of LaTeX documents with cross-reference numbers")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Table of contents of a document
    tex-outline outline thesis.tex

    # Sections and labels, as JSON
    tex-outline outline thesis.tex --view full --format json

    # Outline row for a cursor position in an included file
    tex-outline locate thesis.tex --file chapters/intro.tex --offset 1200

    # Dump what the last LaTeX run wrote to thesis.aux and thesis.out
    tex-outline aux thesis.tex

    # Keep the outline in sync while editing and compiling
    tex-outline watch thesis.tex --view full
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (default: .tex-outline.yml next to the document)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the outline of a document
    Outline {
        /// Root .tex file
        file: PathBuf,

        /// toc, full, or a command name such as subsection
        #[arg(long)]
        view: Option<String>,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,

        /// Document title shown first
        #[arg(long)]
        title: Option<String>,

        /// Hide reference numbers
        #[arg(long)]
        no_refs: bool,

        /// Hide environment names on labels
        #[arg(long)]
        no_envs: bool,
    },

    /// Find the outline row for a cursor offset
    Locate {
        /// Root .tex file
        root: PathBuf,

        /// File holding the cursor (default: the root)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Cursor byte offset
        #[arg(long)]
        offset: usize,

        #[arg(long)]
        view: Option<String>,
    },

    /// Show parsed .aux and .out entries
    Aux {
        /// Root .tex file
        file: PathBuf,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// List matched environments of one file
    Envs {
        file: PathBuf,
    },

    /// Watch a document and print the outline on every change
    Watch {
        /// Root .tex file
        file: PathBuf,

        #[arg(long)]
        view: Option<String>,
    },
}

fn settings_for(root: &Path, config: Option<&Path>) -> Result<OutlineSettings> {
    match config {
        Some(path) => load_settings_file(path),
        None => load_settings(root),
    }
}

fn canonical_root(file: &Path) -> Result<PathBuf> {
    if !file.is_file() {
        return Err(OutlineError::FileNotFound(file.display().to_string()));
    }
    Ok(fs::canonicalize(file)?)
}

pub fn outline(
    file: &Path,
    config: Option<&Path>,
    view: Option<String>,
    format: &str,
    title: Option<String>,
    no_refs: bool,
    no_envs: bool,
) -> Result<()> {
    let root = canonical_root(file)?;
    let mut settings = settings_for(&root, config)?;
    if let Some(view) = view {
        settings.default_view = view;
    }
    settings.show_ref_numbers &= !no_refs;
    settings.show_environment_names &= !no_envs;

    let manager = SessionManager::new();
    let id = manager.open(root, title, settings);
    let output = manager.with_session(&id, |session| {
        session.full_refresh(&FsSource);
        session.annotate_now(&FsSource);
        match format {
            "json" => serde_json::to_string_pretty(&session.visible_entries())
                .map_err(|e| OutlineError::Parse(e.to_string())),
            _ => Ok(session.rendered_lines().join("\n")),
        }
    });

    if let Some(output) = output {
        println!("{}", output?);
    }
    Ok(())
}

pub fn locate(
    root: &Path,
    file: Option<&Path>,
    config: Option<&Path>,
    offset: usize,
    view: Option<String>,
) -> Result<()> {
    let root = canonical_root(root)?;
    let active = match file {
        Some(f) => canonical_root(f)?,
        None => root.clone(),
    };
    let mut settings = settings_for(&root, config)?;
    if let Some(view) = view {
        settings.default_view = view;
    }

    let manager = SessionManager::new();
    let id = manager.open(root, None, settings);
    let located = manager
        .with_session(&id, |session| {
            session.full_refresh(&FsSource);
            session.annotate_now(&FsSource);
            let row = session.locate(&FsSource, &active, offset)?;
            let label = session.attached_label(&FsSource, row);
            Some((row, session.rendered_lines(), label))
        })
        .flatten();

    match located {
        Some((row, lines, label)) => {
            println!("{}\t{}", row, lines.get(row).map(String::as_str).unwrap_or(""));
            if let Some(label) = label {
                println!("label\t{}", label);
            }
        }
        None => println!("No outline entries"),
    }
    Ok(())
}

#[derive(Serialize)]
struct CompanionDump {
    aux: Option<Vec<tex_outline::refs::AuxEntry>>,
    out: Option<Vec<tex_outline::refs::OutEntry>>,
}

pub fn aux(file: &Path, config: Option<&Path>, format: &str) -> Result<()> {
    let root = canonical_root(file)?;
    let settings = settings_for(&root, config)?;
    let dump = CompanionDump {
        aux: load_aux(&root, &FsSource),
        out: load_out(&root, &FsSource, settings.strip_bookmark_numbers),
    };

    if format == "json" {
        let output = serde_json::to_string_pretty(&dump).map_err(|e| OutlineError::Parse(e.to_string()))?;
        println!("{}", output);
        return Ok(());
    }

    match &dump.aux {
        Some(entries) => {
            println!("{} aux entries", entries.len());
            for entry in entries {
                println!(
                    "  {:<14} {:<10} {}",
                    entry.entry_type().unwrap_or("-"),
                    entry.reference(),
                    match entry {
                        tex_outline::refs::AuxEntry::Label(l) => l.key.as_str(),
                        tex_outline::refs::AuxEntry::Section(s) => s.title.as_str(),
                    }
                );
            }
        }
        None => println!("No .aux file"),
    }
    match &dump.out {
        Some(bookmarks) => {
            println!("{} bookmarks", bookmarks.len());
            for b in bookmarks {
                println!("  {:>3} {}.{} {}", b.sequence, b.major, b.minor, b.title);
            }
        }
        None => println!("No .out file"),
    }
    Ok(())
}

pub fn envs(file: &Path) -> Result<()> {
    let content = FsSource
        .read(file)
        .ok_or_else(|| OutlineError::FileNotFound(file.display().to_string()))?;
    let filter = CommentFilter::for_text(&content, uses_comment_package(&content));
    let pairs = find_env_pairs(&content, &filter);

    println!("{} environments", pairs.len());
    for pair in pairs {
        println!("  {:>7}..{:<7} {}", pair.begin.start, pair.end.end, pair.name);
    }
    Ok(())
}

fn print_outline(manager: &SessionManager, id: &str) {
    if let Some(lines) = manager.with_session(id, |s| s.rendered_lines()) {
        println!("{}", lines.join("\n"));
        println!();
    }
}

/// Requests annotation of the current outline and prints it once applied.
async fn annotate(manager: &SessionManager, queue: &AnnotationQueue, id: &str, background: bool) {
    if !background {
        manager.with_session(id, |s| s.annotate_now(&FsSource));
        print_outline(manager, id);
        return;
    }
    let Some(snapshot) = manager.snapshot(id) else {
        return;
    };
    let (manager, queue, id) = (manager.clone(), queue.clone(), id.to_string());
    tokio::spawn(async move {
        match queue.annotate(snapshot).await {
            Ok(true) => print_outline(&manager, &id),
            Ok(false) => {}
            Err(e) => tracing::warn!("Annotation failed: {}", e),
        }
    });
}

pub async fn watch(file: &Path, config: Option<&Path>, view: Option<String>) -> Result<()> {
    let root = canonical_root(file)?;
    let mut settings = settings_for(&root, config)?;
    if let Some(view) = view {
        settings.default_view = view;
    }
    let background = settings.background_annotation;
    let aux_path = root.with_extension("aux");

    let source: Arc<dyn DocumentSource> = Arc::new(FsSource);
    let manager = SessionManager::new();
    let id = manager.open(root.clone(), None, settings);
    let queue = AnnotationQueue::new(manager.clone(), Arc::clone(&source));

    manager.with_session(&id, |s| s.full_refresh(source.as_ref()));
    print_outline(&manager, &id);
    annotate(&manager, &queue, &id, background).await;

    let dir = root
        .parent()
        .ok_or_else(|| OutlineError::FileNotFound(root.display().to_string()))?;
    let watcher = FileWatcher::new(dir)?;
    tracing::info!("Watching {} for changes", dir.display());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_millis(200)) => {}
        }

        while let Some(events) = watcher.try_recv() {
            let mut changed = false;
            for event in events {
                match event {
                    DocumentEvent::SourceSaved(path) => {
                        tracing::info!("Saved: {}", path.display());
                        changed |= manager
                            .with_session(&id, |s| s.light_refresh(source.as_ref(), &path))
                            .unwrap_or(false);
                    }
                    DocumentEvent::CompanionUpdated(path) if path == aux_path => {
                        let settled = manager
                            .with_session(&id, |s| s.aux_changed(source.as_ref()))
                            .unwrap_or(false);
                        if settled {
                            tracing::info!("References updated: {}", path.display());
                            manager.with_session(&id, |s| s.full_refresh(source.as_ref()));
                            changed = true;
                        } else {
                            tracing::debug!("{} unchanged, skipping refresh", path.display());
                        }
                    }
                    DocumentEvent::CompanionUpdated(_) => {}
                    DocumentEvent::Removed(path) => {
                        let included = manager
                            .with_session(&id, |s| s.files.contains(&path))
                            .unwrap_or(false);
                        if included {
                            tracing::info!("Removed: {}", path.display());
                            manager.with_session(&id, |s| s.full_refresh(source.as_ref()));
                            changed = true;
                        }
                    }
                }
            }
            if changed {
                print_outline(&manager, &id);
                annotate(&manager, &queue, &id, background).await;
            }
        }
    }

    queue.shutdown().await?;
    manager.close(&id);
    Ok(())
}
