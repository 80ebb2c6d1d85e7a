use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use xray_history::{from_history_json, HistoryEvent};

use crate::error::SourceError;
use crate::record::{ExecutionDescription, ExecutionPage, ExecutionRef, ListFilter};
use crate::traits::HistorySource;

/// A history source over a directory of exported history JSON files.
///
/// Layout:
///
/// ```text
/// <root>/<namespace>/<workflow_id>.json           latest run
/// <root>/<namespace>/<workflow_id>.<run_id>.json  a specific run
/// ```
///
/// Listings only consider `<workflow_id>.json` files.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileSource { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &str) -> Result<PathBuf, SourceError> {
        if !is_plain_name(namespace) {
            return Err(SourceError::NamespaceNotFound {
                namespace: namespace.to_string(),
            });
        }
        Ok(self.root.join(namespace))
    }

    async fn load(&self, execution: &ExecutionRef) -> Result<Vec<HistoryEvent>, SourceError> {
        let not_found = || SourceError::NotFound {
            workflow_id: execution.workflow_id.clone(),
        };
        if !is_plain_name(&execution.workflow_id) {
            return Err(not_found());
        }
        let dir = self.namespace_dir(&execution.namespace)?;
        let latest = dir.join(format!("{}.json", execution.workflow_id));

        let Some(run_id) = &execution.run_id else {
            return read_history(&latest, execution).await;
        };
        if !is_plain_name(run_id) {
            return Err(not_found());
        }

        let run_path = dir.join(format!("{}.{}.json", execution.workflow_id, run_id));
        match read_history(&run_path, execution).await {
            Err(SourceError::NotFound { .. }) => {}
            other => return other,
        }

        // The latest file may itself hold the requested run.
        let events = read_history(&latest, execution).await?;
        let description = ExecutionDescription::from_history(&execution.workflow_id, &events);
        if &description.run_id == run_id {
            Ok(events)
        } else {
            Err(not_found())
        }
    }
}

/// Identifiers become file names, so they must not traverse directories.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c: char| c == '/' || c == '\\')
}

async fn read_history(
    path: &Path,
    execution: &ExecutionRef,
) -> Result<Vec<HistoryEvent>, SourceError> {
    debug!(path = %path.display(), "reading history");
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SourceError::NotFound {
                workflow_id: execution.workflow_id.clone(),
            },
            io::ErrorKind::PermissionDenied => SourceError::PermissionDenied {
                namespace: execution.namespace.clone(),
            },
            _ => SourceError::Read {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
    parse_history(path, &text)
}

fn parse_history(path: &Path, text: &str) -> Result<Vec<HistoryEvent>, SourceError> {
    let doc: serde_json::Value = serde_json::from_str(text).map_err(|e| SourceError::Parse {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    from_history_json(&doc).map_err(|e| SourceError::Parse {
        path: path.to_path_buf(),
        source: Box::new(e),
    })
}

#[async_trait]
impl HistorySource for FileSource {
    async fn fetch_history(
        &self,
        execution: &ExecutionRef,
    ) -> Result<Vec<HistoryEvent>, SourceError> {
        self.load(execution).await
    }

    async fn describe(
        &self,
        execution: &ExecutionRef,
    ) -> Result<ExecutionDescription, SourceError> {
        let events = self.load(execution).await?;
        Ok(ExecutionDescription::from_history(
            &execution.workflow_id,
            &events,
        ))
    }

    async fn list_executions(&self, filter: &ListFilter) -> Result<ExecutionPage, SourceError> {
        let dir = self.namespace_dir(&filter.namespace)?;
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SourceError::NamespaceNotFound {
                namespace: filter.namespace.clone(),
            },
            io::ErrorKind::PermissionDenied => SourceError::PermissionDenied {
                namespace: filter.namespace.clone(),
            },
            _ => SourceError::Read {
                path: dir.clone(),
                source: e,
            },
        })?;

        let mut matches = Vec::new();
        loop {
            let entry = entries.next_entry().await.map_err(|e| SourceError::Read {
                path: dir.clone(),
                source: e,
            })?;
            let Some(entry) = entry else { break };
            let path = entry.path();
            let Some(workflow_id) = latest_run_workflow_id(&path) else {
                continue;
            };

            let execution = ExecutionRef::latest(&filter.namespace, &workflow_id);
            let events = match read_history(&path, &execution).await {
                Ok(events) => events,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable history");
                    continue;
                }
            };
            let description = ExecutionDescription::from_history(&workflow_id, &events);
            if filter.matches(&description) {
                matches.push(description);
            }
        }

        Ok(ExecutionPage::paginate(matches, filter))
    }
}

/// `<workflow_id>.json` yields the workflow id; run-specific files and
/// anything else yield `None`.
fn latest_run_workflow_id(path: &Path) -> Option<String> {
    if path.extension()? != "json" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.contains('.') {
        return None;
    }
    Some(stem.to_string())
}
