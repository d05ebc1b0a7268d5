use csv::ByteRecord;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::models::{Catalog, Event, EventId};

const EVENT_ID_COLUMN: &str = "eventid";
const TEXT_COLUMNS: [&str; 4] = ["title", "category", "location", "description"];
const STATUS_COLUMN: &str = "status";
const HEADER: [&str; 6] = [
    EVENT_ID_COLUMN,
    "title",
    "category",
    "location",
    "description",
    STATUS_COLUMN,
];

/// CSV file holding the event catalog
///
/// Reads are lenient: missing text columns become empty strings and invalid
/// UTF-8 is replaced. Writes go through a temporary file and a rename.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and deduplicates the catalog; a missing file is an error
    pub fn load(&self) -> AppResult<Catalog> {
        tracing::debug!(path = %self.path.display(), "Loading catalog");

        if !self.path.exists() {
            tracing::error!(path = %self.path.display(), "Catalog file not found");
            return Err(AppError::Catalog(format!(
                "catalog file not found: {}",
                self.path.display()
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;

        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|h| {
                String::from_utf8_lossy(h)
                    .trim_start_matches('\u{feff}')
                    .trim()
                    .to_string()
            })
            .collect();
        let column = |name: &str| headers.iter().position(|h| h == name);

        let id_column = column(EVENT_ID_COLUMN).ok_or_else(|| {
            AppError::Catalog(format!(
                "catalog {} has no {} column",
                self.path.display(),
                EVENT_ID_COLUMN
            ))
        })?;

        let text_columns: Vec<Option<usize>> = TEXT_COLUMNS
            .iter()
            .map(|&name| {
                let index = column(name);
                if index.is_none() {
                    tracing::warn!(column = name, "Catalog column missing, using empty strings");
                }
                index
            })
            .collect();

        let status_column = column(STATUS_COLUMN);
        if status_column.is_none() {
            tracing::debug!("Catalog has no status column");
        }

        let mut events = Vec::new();
        for (row, record) in reader.byte_records().enumerate() {
            let record = record?;
            let eventid = field(&record, Some(id_column));
            let eventid = eventid.trim();
            if eventid.is_empty() {
                // header is line 1
                tracing::warn!(line = row + 2, "Skipping catalog row without eventid");
                continue;
            }

            let status = field(&record, status_column).trim().to_string();
            events.push(Event {
                eventid: EventId::new(eventid),
                title: field(&record, text_columns[0]),
                category: field(&record, text_columns[1]),
                location: field(&record, text_columns[2]),
                description: field(&record, text_columns[3]),
                status: (!status.is_empty()).then_some(status),
            });
        }

        let rows = events.len();
        let catalog = Catalog::from_events(events);

        if status_column.is_some() {
            tracing::debug!(statuses = ?catalog.status_counts(), "Catalog status distribution");
        }
        tracing::info!(
            path = %self.path.display(),
            rows,
            events = catalog.len(),
            "Catalog loaded"
        );

        Ok(catalog)
    }

    /// Like `load`, but starts an empty catalog file when none exists
    pub fn load_or_init(&self) -> AppResult<Catalog> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "Catalog file not found, creating it");
            self.write(&Catalog::new())?;
            return Ok(Catalog::new());
        }
        self.load()
    }

    /// Replaces events sharing an id and appends the rest. The merged catalog
    /// is staged next to the file and only replaces it on `commit`.
    pub fn upsert(&self, events: Vec<Event>) -> AppResult<(Catalog, StagedCatalog)> {
        let mut catalog = self.load_or_init()?;
        let incoming = events.len();
        catalog.upsert(events);
        let staged = self.stage(&catalog)?;

        tracing::debug!(incoming, total = catalog.len(), "Catalog update staged");
        Ok((catalog, staged))
    }

    /// Stages an empty catalog, keeping the header
    pub fn reset(&self) -> AppResult<StagedCatalog> {
        self.stage(&Catalog::new())
    }

    fn write(&self, catalog: &Catalog) -> AppResult<()> {
        self.stage(catalog)?.commit()
    }

    fn stage(&self, catalog: &Catalog) -> AppResult<StagedCatalog> {
        let staged = StagedCatalog {
            temp_path: self.path.with_extension("csv.tmp"),
            path: self.path.clone(),
            committed: false,
        };

        let mut writer = csv::Writer::from_path(&staged.temp_path)?;
        writer.write_record(HEADER)?;
        for event in catalog.iter() {
            writer.write_record([
                event.eventid.as_str(),
                event.title.as_str(),
                event.category.as_str(),
                event.location.as_str(),
                event.description.as_str(),
                event.status.as_deref().unwrap_or(""),
            ])?;
        }
        writer.flush()?;
        Ok(staged)
    }
}

/// A catalog written to a temporary file, waiting to be renamed over the
/// catalog file. Dropping it without `commit` discards the temporary file.
#[derive(Debug)]
pub struct StagedCatalog {
    temp_path: PathBuf,
    path: PathBuf,
    committed: bool,
}

impl StagedCatalog {
    pub fn commit(mut self) -> AppResult<()> {
        fs::rename(&self.temp_path, &self.path)?;
        self.committed = true;
        tracing::info!(path = %self.path.display(), "Catalog file updated");
        Ok(())
    }
}

impl Drop for StagedCatalog {
    fn drop(&mut self) {
        if !self.committed {
            match fs::remove_file(&self.temp_path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => tracing::warn!(
                    path = %self.temp_path.display(),
                    error = %e,
                    "Failed to discard staged catalog"
                ),
                _ => {}
            }
        }
    }
}

fn field(record: &ByteRecord, column: Option<usize>) -> String {
    column
        .and_then(|c| record.get(c))
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with(contents: &str) -> (TempDir, CatalogStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eventlist.csv");
        fs::write(&path, contents).unwrap();
        (dir, CatalogStore::new(path))
    }

    #[test]
    fn test_load_reads_events_in_order() {
        let (_dir, store) = store_with(
            "eventid,title,category,location,description\n\
             1,jazz festival,music,seoul,\n\
             2,food fair,food,busan,street food\n",
        );
        let catalog = store.load().unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.events()[0].title, "jazz festival");
        assert_eq!(catalog.events()[1].description, "street food");
        assert!(!catalog.has_status());
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path().join("missing.csv"));
        assert!(matches!(store.load(), Err(AppError::Catalog(_))));
    }

    #[test]
    fn test_load_without_eventid_column_is_an_error() {
        let (_dir, store) = store_with("title,category\njazz,music\n");
        assert!(matches!(store.load(), Err(AppError::Catalog(_))));
    }

    #[test]
    fn test_missing_text_columns_read_as_empty() {
        let (_dir, store) = store_with("eventid,title\n7,lantern festival\n");
        let catalog = store.load().unwrap();
        let event = &catalog.events()[0];
        assert_eq!(event.title, "lantern festival");
        assert_eq!(event.category, "");
        assert_eq!(event.description, "");
        assert_eq!(event.status, None);
    }

    #[test]
    fn test_status_column_and_duplicates() {
        let (_dir, store) = store_with(
            "eventid,title,category,location,description,status\n\
             3,a,,,,\n\
             4,c,,,,END\n\
             3,b,,,,ONGOING\n",
        );
        let catalog = store.load().unwrap();
        assert_eq!(catalog.len(), 2);
        let titles: Vec<&str> = catalog.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "b"]);
        assert_eq!(catalog.events()[0].status.as_deref(), Some("END"));
    }

    #[test]
    fn test_rows_without_eventid_are_skipped() {
        let (_dir, store) = store_with("eventid,title\n,orphan\n5,kept\n");
        let catalog = store.load().unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.events()[0].eventid, EventId::from("5"));
    }

    #[test]
    fn test_upsert_creates_file_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path().join("eventlist.csv"));

        let (catalog, staged) = store
            .upsert(vec![
                Event::new("1", "jazz festival", "music", "seoul", ""),
                Event::new("2", "food, fair", "food", "busan", "quoted \"text\""),
            ])
            .unwrap();
        staged.commit().unwrap();
        assert_eq!(catalog.len(), 2);

        let (catalog, staged) = store
            .upsert(vec![Event::new("1", "jazz night", "music", "seoul", "").with_status("END")])
            .unwrap();
        staged.commit().unwrap();
        assert_eq!(catalog.len(), 2);

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded, catalog);
        assert_eq!(reloaded.events()[0].title, "food, fair");
        assert_eq!(reloaded.events()[0].description, "quoted \"text\"");
        assert_eq!(reloaded.events()[1].title, "jazz night");
        assert!(reloaded.events()[1].is_ended());
    }

    #[test]
    fn test_reset_empties_catalog() {
        let (_dir, store) = store_with("eventid,title\n1,jazz\n");
        store.reset().unwrap().commit().unwrap();
        assert!(store.load().unwrap().is_empty());
        let contents = fs::read_to_string(store.path()).unwrap();
        assert!(contents.starts_with("eventid,title,category,location,description,status"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eventlist.csv");
        let mut bytes = b"eventid,title\n1,jazz ".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b" night\n");
        fs::write(&path, bytes).unwrap();

        let catalog = CatalogStore::new(path).load().unwrap();
        assert!(catalog.events()[0].title.starts_with("jazz "));
        assert!(catalog.events()[0].title.ends_with(" night"));
    }
}
