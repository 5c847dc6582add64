//! Subcommand definitions and their handlers.

use std::{fmt::Write as _, path::PathBuf, sync::Arc};

use anyhow::{Context as _, Result};
use axum::Router;
use clap::Subcommand;
use kc_core::{
  Id,
  factory::{SourceFactory, SourceTarget},
  project::{NewProject, ProjectUpdate},
  sort::SortKey,
  source::{IngestType, KnowledgeSource},
  tree::{self, TreeNode},
};
use kc_repository::{BasicSourceFactory, ProjectRepository, RandomIdSource};
use kc_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::settings::Settings;

pub type Repository = ProjectRepository<SqliteStore, RandomIdSource>;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Print the project tree. The selected project is marked with `*`.
  Tree,
  /// List every project with its id.
  List,
  /// Create a project and select it.
  Create {
    name:   String,
    /// Create under this project instead of at the root.
    #[arg(long, value_name = "ID")]
    parent: Option<Id>,
    /// Also create a sub-project with this name (repeatable).
    #[arg(long = "sub", value_name = "NAME")]
    subs:   Vec<String>,
  },
  /// Rename a project.
  Rename { id: Id, name: String },
  /// Delete a project and all of its descendants.
  Delete { id: Id },
  /// Print the chain from the root down to a project.
  Ancestors { id: Id },
  /// Select a project; without an id, selects the first one.
  Select { id: Option<Id> },
  /// List a project's knowledge sources in the active sort order.
  Sources {
    project: Id,
    /// Apply the project's manual order first.
    #[arg(long)]
    custom:  bool,
  },
  /// Add a note to a project.
  AddNote { project: Id, title: String },
  /// Add a web link to a project.
  AddLink { project: Id, url: String },
  /// Add a local file to a project.
  AddFile { project: Id, path: PathBuf },
  /// Move a knowledge source to another project.
  MoveSource { from: Id, to: Id, source: Id },
  /// Show the active sort key, or set it (az, za, modified, accessed,
  /// created).
  Sort { key: Option<SortKey> },
  /// Serve the JSON API under `/api`.
  Serve,
}

pub async fn run(command: Command, repo: Repository, settings: &Settings) -> Result<()> {
  match command {
    Command::Tree => {
      let current = repo.current().await.map(|p| p.id);
      print!("{}", render_tree(&repo.tree().await, current.as_ref()));
    }
    Command::List => {
      for project in repo.projects().await {
        println!("{}  {}", project.id, project.name);
      }
    }
    Command::Create { name, parent, subs } => {
      let mut request = NewProject::new(name);
      request.parent_id = parent;
      for sub in subs {
        request = request.with_sub_project(NewProject::new(sub));
      }
      let project = repo.create(request).await?;
      println!("{}", project.id);
      for child in &project.subproject_ids {
        println!("  {child}");
      }
    }
    Command::Rename { id, name } => {
      let project = repo.update(ProjectUpdate::new(id).name(name)).await?;
      println!("{}  {}", project.id, project.name);
    }
    Command::Delete { id } => {
      for deleted in repo.delete(&id).await? {
        println!("deleted {deleted}");
      }
    }
    Command::Ancestors { id } => {
      let chain = repo.get_ancestors(&id).await?;
      let names: Vec<&str> = chain.iter().map(|p| p.name.as_str()).collect();
      println!("{}", names.join(" / "));
    }
    Command::Select { id } => match repo.set_current(id.as_ref()).await? {
      Some(project) => println!("{}  {}", project.id, project.name),
      None => println!("no projects"),
    },
    Command::Sources { project, custom } => {
      let sources = if custom {
        repo.ordered_sources(&project).await?
      } else {
        repo.sorted_sources(&project).await?
      };
      for source in &sources {
        println!("{}", render_source(source));
      }
    }
    Command::AddNote { project, title } => {
      add_source(&repo, project, IngestType::Note, SourceTarget::Note { title }).await?;
    }
    Command::AddLink { project, url } => {
      add_source(&repo, project, IngestType::Website, SourceTarget::Link { url }).await?;
    }
    Command::AddFile { project, path } => {
      add_source(&repo, project, IngestType::File, SourceTarget::File { path }).await?;
    }
    Command::MoveSource { from, to, source } => {
      let moved = repo.move_source(&from, &to, &source).await?;
      println!("{}", render_source(&moved));
    }
    Command::Sort { key: Some(key) } => {
      repo.set_sort_key(key).await?;
      println!("{key}  {}", key.label());
    }
    Command::Sort { key: None } => {
      let active = repo.sort_key().await;
      for key in SortKey::ALL {
        let mark = if key == active { '*' } else { ' ' };
        println!("{mark} {key:<9} {}", key.label());
      }
    }
    Command::Serve => serve(repo, settings).await?,
  }
  Ok(())
}

async fn add_source(
  repo: &Repository,
  project: Id,
  ingest_type: IngestType,
  target: SourceTarget,
) -> Result<()> {
  // Fail before allocating an id for a project that does not exist.
  repo
    .get_project(&project)
    .await
    .with_context(|| format!("project {project} not found"))?;

  let factory = BasicSourceFactory::new(repo.ids().clone());
  let source = factory.make(ingest_type, target).await?;
  let update = ProjectUpdate::new(project).add_sources(vec![source.clone()]);
  repo.update(update).await?;
  println!("{}", render_source(&source));
  Ok(())
}

async fn serve(repo: Repository, settings: &Settings) -> Result<()> {
  let app = Router::new()
    .nest("/api", kc_api::api_router(Arc::new(repo)))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", settings.host, settings.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}

// ─── Rendering ───────────────────────────────────────────────────────────────

fn render_tree(forest: &[TreeNode], current: Option<&Id>) -> String {
  let mut out = String::new();
  for row in tree::flatten(forest) {
    let mark = if current == Some(&row.id) { '*' } else { ' ' };
    let fold = match (row.expandable, row.expanded) {
      (false, _) => ' ',
      (true, true) => '-',
      (true, false) => '+',
    };
    let _ = writeln!(
      out,
      "{mark} {indent}{fold} {name}  ({id})",
      indent = "  ".repeat(row.level),
      name = row.name,
      id = row.id,
    );
  }
  out
}

fn render_source(source: &KnowledgeSource) -> String {
  let mut line = format!("{}  [{}] {}", source.id, source.ingest_type, source.title);
  if !source.access_link.is_empty() {
    let _ = write!(line, "  <{}>", source.access_link);
  }
  line
}

#[cfg(test)]
mod tests {
  use clap::Parser;

  use super::*;

  #[derive(Parser)]
  struct Wrapper {
    #[command(subcommand)]
    command: Command,
  }

  fn node(id: &str, children: Vec<TreeNode>) -> TreeNode {
    TreeNode {
      id:         Id::new(id),
      name:       id.to_uppercase(),
      expandable: !children.is_empty(),
      expanded:   true,
      children,
    }
  }

  #[test]
  fn tree_marks_selection_and_indents() {
    let forest = vec![node("a", vec![node("b", vec![])]), node("c", vec![])];
    let text = render_tree(&forest, Some(&Id::new("b")));
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["  - A  (a)", "*     B  (b)", "    C  (c)"]);
  }

  #[test]
  fn create_accepts_parent_and_subs() {
    let parsed = Wrapper::try_parse_from([
      "kc", "create", "Thesis", "--parent", "p-1", "--sub", "Lit", "--sub", "Data",
    ])
    .unwrap();
    let Command::Create { name, parent, subs } = parsed.command else {
      panic!("expected create");
    };
    assert_eq!(name, "Thesis");
    assert_eq!(parent, Some(Id::new("p-1")));
    assert_eq!(subs, vec!["Lit", "Data"]);
  }

  #[test]
  fn sort_parses_codes() {
    let parsed = Wrapper::try_parse_from(["kc", "sort", "za"]).unwrap();
    assert!(matches!(parsed.command, Command::Sort { key: Some(SortKey::TitleDescending) }));
    assert!(Wrapper::try_parse_from(["kc", "sort", "rating"]).is_err());
  }
}
