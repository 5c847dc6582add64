//! A minimal [`SourceFactory`]: derives a title from the target and takes
//! the id from the allocator. No network access; enrichment (favicons, page
//! metadata) arrives later through
//! [`ProjectRepository::enrich_source`](crate::ProjectRepository::enrich_source).

use std::{collections::BTreeMap, path::Path};

use kc_core::{
  Error, IdSource, Result,
  factory::{SourceFactory, SourceTarget},
  source::{
    FileMetadata, IngestType, KnowledgeSource, SearchResult, SourceReference,
    WebsiteMetadata,
  },
};

use url::Url;

use crate::allocator::IdAllocator;

pub struct BasicSourceFactory<I> {
  ids: IdAllocator<I>,
}

impl<I> BasicSourceFactory<I> {
  pub fn new(ids: IdAllocator<I>) -> Self { Self { ids } }
}

impl<I: IdSource + 'static> SourceFactory for BasicSourceFactory<I> {
  type Error = Error;

  async fn make(
    &self,
    ingest_type: IngestType,
    target: SourceTarget,
  ) -> Result<KnowledgeSource> {
    let (title, reference, access_link) = match target {
      SourceTarget::Link { url } => {
        let url = parse_link(&url)?;
        let link = url.as_str().to_owned();
        let reference = SourceReference::Website(WebsiteMetadata {
          url:      link.clone(),
          metadata: BTreeMap::new(),
        });
        (title_from_url(&url), reference, link)
      }
      SourceTarget::File { path } => {
        let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
          Error::validation(format!("cannot read {}: {e}", path.display()))
        })?;
        if !metadata.is_file() {
          return Err(Error::validation(format!("{} is not a file", path.display())));
        }
        let filename = path
          .file_name()
          .map(|n| n.to_string_lossy().into_owned())
          .unwrap_or_default();
        let location = path.to_string_lossy().into_owned();
        let reference = SourceReference::File(FileMetadata {
          filename:  filename.clone(),
          path:      location.clone(),
          size:      Some(metadata.len()),
          mime_type: mime_type(&path).map(str::to_owned),
        });
        (filename, reference, location)
      }
      SourceTarget::Search { query, url } => {
        let url = parse_link(&url)?.as_str().to_owned();
        let reference = SourceReference::Search(SearchResult {
          query:   query.clone(),
          url:     url.clone(),
          snippet: None,
        });
        (query, reference, url)
      }
      SourceTarget::Note { title } => {
        if title.trim().is_empty() {
          return Err(Error::validation("note title must not be empty"));
        }
        (title.trim().to_owned(), SourceReference::None, String::new())
      }
    };

    if !ingest_type.accepts(&reference) {
      return Err(Error::validation(format!(
        "ingest type {ingest_type} does not match the given target"
      )));
    }

    let id = self.ids.generate(1).await?.into_iter().next().ok_or(
      Error::AllocationShortfall { requested: 1, available: 0 },
    )?;

    Ok(KnowledgeSource::new(id, title, ingest_type, reference, access_link))
  }
}

/// An absolute URL with a host. Anything else is not a website.
fn parse_link(raw: &str) -> Result<Url> {
  let url = Url::parse(raw.trim())
    .map_err(|e| Error::validation(format!("invalid link {raw:?}: {e}")))?;
  if url.host_str().is_none_or(str::is_empty) {
    return Err(Error::validation(format!("link {raw:?} has no host")));
  }
  Ok(url)
}

/// Host plus the last non-empty path segment. Credentials and the port
/// never appear in the title.
fn title_from_url(url: &Url) -> String {
  let host = url.host_str().unwrap_or_default();
  let host = host.strip_prefix("www.").unwrap_or(host);
  let last = url
    .path_segments()
    .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back());
  match last {
    Some(last) => format!("{host} / {last}"),
    None => host.to_owned(),
  }
}

fn mime_type(path: &Path) -> Option<&'static str> {
  let ext = path.extension()?.to_str()?.to_ascii_lowercase();
  Some(match ext.as_str() {
    "pdf" => "application/pdf",
    "txt" => "text/plain",
    "md" => "text/markdown",
    "html" | "htm" => "text/html",
    "json" => "application/json",
    "png" => "image/png",
    "jpg" | "jpeg" => "image/jpeg",
    "docx" => {
      "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    }
    _ => return None,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::allocator::{AllocatorConfig, RandomIdSource};

  fn factory() -> BasicSourceFactory<RandomIdSource> {
    let ids = IdAllocator::new(RandomIdSource, AllocatorConfig::default()).unwrap();
    BasicSourceFactory::new(ids)
  }

  fn title(raw: &str) -> String { title_from_url(&Url::parse(raw).unwrap()) }

  #[test]
  fn url_titles() {
    assert_eq!(title("https://www.example.com"), "example.com");
    assert_eq!(title("https://arxiv.org/abs/1706.03762?context=cs"), "arxiv.org / 1706.03762");
    assert_eq!(title("https://example.com/docs/"), "example.com / docs");
  }

  #[test]
  fn url_titles_drop_credentials_and_port() {
    assert_eq!(title("https://user:pw@example.com:8080/"), "example.com");
    assert_eq!(title("http://www.example.com:8443"), "example.com");
  }

  #[tokio::test]
  async fn non_url_links_are_rejected() {
    for raw in ["not a url", "", "mailto:someone@example.com", "/relative/path"] {
      let err = factory()
        .make(IngestType::Website, SourceTarget::Link { url: raw.into() })
        .await
        .unwrap_err();
      assert!(matches!(err, Error::Validation(_)), "{raw:?} was accepted");
    }
  }

  #[tokio::test]
  async fn makes_website_source() {
    let ks = factory()
      .make(IngestType::Website, SourceTarget::Link {
        url: "https://example.com/paper".into(),
      })
      .await
      .unwrap();
    assert_eq!(ks.title, "example.com / paper");
    assert_eq!(ks.access_link, "https://example.com/paper");
    assert!(ks.associated_project_id.is_none());
    assert!(!ks.id.is_empty());
  }

  #[tokio::test]
  async fn makes_file_source() {
    let path = std::env::temp_dir().join(format!("kc-factory-{}.pdf", kc_core::Id::random()));
    std::fs::write(&path, b"%PDF-1.4").unwrap();

    let ks = factory()
      .make(IngestType::File, SourceTarget::File { path: path.clone() })
      .await
      .unwrap();
    std::fs::remove_file(&path).unwrap();

    let SourceReference::File(meta) = ks.reference else {
      panic!("expected file reference");
    };
    assert_eq!(meta.size, Some(8));
    assert_eq!(meta.mime_type.as_deref(), Some("application/pdf"));
  }

  #[tokio::test]
  async fn mismatched_ingest_type_is_rejected() {
    let err = factory()
      .make(IngestType::File, SourceTarget::Note { title: "n".into() })
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[tokio::test]
  async fn missing_file_is_rejected() {
    let err = factory()
      .make(IngestType::File, SourceTarget::File {
        path: "/definitely/not/here.pdf".into(),
      })
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }
}
