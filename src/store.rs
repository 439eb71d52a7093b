//! The route list and its JSON file.
//!
//! The whole list is read on every invocation and, if it changed, written back in
//! full. Order of insertion is the display order.

use fs_err::File;
use serde::Serialize;
use serde_json::{Map, Value, ser::PrettyFormatter};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use super::config::StoreConfig;
use super::error::StoreError;
use super::records::{Route, RouteNumber};
use super::time::TimeOfDay;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RouteStore {
    routes: Vec<Route>,
}

impl RouteStore {
    /// Loads the list from `path`. A file that does not exist is an empty list.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let exists = path
            .try_exists()
            .map_err(|source| StoreError::FileNotReadable {
                path: path.to_path_buf(),
                source,
            })?;
        if !exists {
            debug!(path = %path.display(), "route file absent, starting empty");
            return Ok(RouteStore::default());
        }

        let text = fs_err::read_to_string(path).map_err(|source| StoreError::FileNotReadable {
            path: path.to_path_buf(),
            source,
        })?;
        let malformed = |source: serde_json::Error| StoreError::MalformedStore {
            path: path.to_path_buf(),
            source,
        };

        // Parse as plain objects first so that arrays of arrays are rejected
        // rather than read positionally into the struct.
        let objects: Vec<Map<String, Value>> = serde_json::from_str(&text).map_err(malformed)?;
        let routes = objects
            .into_iter()
            .map(|object| serde_json::from_value::<Route>(Value::Object(object)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(malformed)?;

        debug!(path = %path.display(), count = routes.len(), "loaded routes");
        Ok(RouteStore { routes })
    }

    /// Writes the full list to `path`, replacing any previous content.
    pub fn save(&self, path: &Path, config: &StoreConfig) -> Result<(), StoreError> {
        let not_writable = |source: io::Error| StoreError::FileNotWritable {
            path: path.to_path_buf(),
            source,
        };

        if config.atomic_save {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(not_writable)?;
            // The temp file is created private; a replaced file keeps its own mode.
            match fs_err::metadata(path) {
                Ok(metadata) => temp
                    .as_file()
                    .set_permissions(metadata.permissions())
                    .map_err(not_writable)?,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(not_writable(e)),
            }
            self.write_json(temp.as_file_mut(), config.indent).map_err(not_writable)?;
            temp.persist(path).map_err(|e| not_writable(e.error))?;
        } else {
            let file = File::create(path).map_err(not_writable)?;
            self.write_json(file, config.indent).map_err(not_writable)?;
        }

        info!(path = %path.display(), count = self.routes.len(), "saved routes");
        Ok(())
    }

    fn write_json<W: Write>(&self, writer: W, indent: usize) -> io::Result<()> {
        let indent = vec![b' '; indent];
        let mut writer = BufWriter::new(writer);
        let formatter = PrettyFormatter::with_indent(&indent);
        let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
        self.routes.serialize(&mut serializer)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }

    /// Adds a route to the end of the list.
    pub fn append(
        mut self,
        destination: String,
        number: Option<RouteNumber>,
        time: TimeOfDay,
    ) -> Self {
        debug!(%destination, %time, "appending route");
        self.routes.push(Route::new(destination, number, time));
        self
    }

    /// Returns the routes departing strictly after `cutoff`, in list order.
    /// Fails on the first route whose stored time does not parse.
    pub fn select(&self, cutoff: TimeOfDay) -> Result<RouteStore, StoreError> {
        let mut selected = Vec::new();
        for route in &self.routes {
            if route.departure()? > cutoff {
                selected.push(route.clone());
            }
        }
        debug!(
            %cutoff,
            total = self.routes.len(),
            selected = selected.len(),
            "selected routes"
        );
        Ok(RouteStore { routes: selected })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn time(s: &str) -> TimeOfDay {
        TimeOfDay::parse_hhmm(s).unwrap()
    }

    fn sample_store() -> RouteStore {
        RouteStore::default()
            .append(
                "Central".to_string(),
                Some(RouteNumber::Integer(12)),
                time("08:30"),
            )
            .append(
                "Airport".to_string(),
                Some(RouteNumber::Text("A1".to_string())),
                time("14:00"),
            )
            .append("Вокзал".to_string(), None, time("10:15"))
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let store = RouteStore::load(&dir.path().join("absent.json")).unwrap();
        assert!(store.routes().is_empty());
    }

    #[test]
    fn not_json_is_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("routes.json");
        fs_err::write(&path, "not json").unwrap();
        assert!(matches!(
            RouteStore::load(&path),
            Err(StoreError::MalformedStore { .. })
        ));
    }

    #[test]
    fn non_array_or_non_object_entries_are_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("routes.json");
        for content in [
            r#"{"destination": "A"}"#,
            r#"[["A", 1, "08:00"]]"#,
            r#"[1, 2]"#,
            r#"[{"destination": "A"}, null]"#,
        ] {
            fs_err::write(&path, content).unwrap();
            assert!(
                matches!(RouteStore::load(&path), Err(StoreError::MalformedStore { .. })),
                "{content} should be rejected"
            );
        }
    }

    #[test]
    fn null_and_odd_typed_fields_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("routes.json");
        let stored = json!([
            {"destination": null, "number": null, "time": null},
            {"destination": "A", "number": 1.5, "time": 830},
            {"destination": 5}
        ]);
        fs_err::write(&path, stored.to_string()).unwrap();

        let store = RouteStore::load(&path).unwrap();
        assert_eq!(store.routes().len(), 3);
        assert_eq!(store.routes()[0].destination, "");
        assert_eq!(store.routes()[2].destination, "5");
        assert!(matches!(
            store.select(time("09:00")),
            Err(StoreError::InvalidTimeFormat { .. })
        ));
    }

    #[test]
    fn odd_typed_fields_survive_a_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("routes.json");
        let stored = json!([{"destination": "A", "number": 1.5, "time": 830}]);
        fs_err::write(&path, stored.to_string()).unwrap();

        RouteStore::load(&path)
            .unwrap()
            .save(&path, &StoreConfig::default())
            .unwrap();
        let saved: Value = serde_json::from_str(&fs_err::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved, stored);
    }

    #[test]
    fn unreachable_parent_is_not_readable() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("routes.json");
        fs_err::write(&file, "[]").unwrap();
        assert!(matches!(
            RouteStore::load(&file.join("nested.json")),
            Err(StoreError::FileNotReadable { .. })
        ));
    }

    #[test]
    fn directory_is_not_readable() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            RouteStore::load(dir.path()),
            Err(StoreError::FileNotReadable { .. })
        ));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = sample_store();
        for atomic_save in [true, false] {
            let path = dir.path().join(format!("routes-{atomic_save}.json"));
            let config = StoreConfig { atomic_save, indent: 4 };
            store.save(&path, &config).unwrap();
            assert_eq!(RouteStore::load(&path).unwrap(), store);
        }
    }

    #[test]
    fn save_writes_readable_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("routes.json");
        RouteStore::default()
            .append("Вокзал".to_string(), Some(RouteNumber::Integer(3)), time("07:05"))
            .save(&path, &StoreConfig::default())
            .unwrap();

        let text = fs_err::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            concat!(
                "[\n",
                "    {\n",
                "        \"destination\": \"Вокзал\",\n",
                "        \"number\": 3,\n",
                "        \"time\": \"07:05\"\n",
                "    }\n",
                "]\n"
            )
        );
    }

    #[test]
    fn save_replaces_previous_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("routes.json");
        sample_store().save(&path, &StoreConfig::default()).unwrap();
        RouteStore::default().save(&path, &StoreConfig::default()).unwrap();
        assert!(RouteStore::load(&path).unwrap().routes().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn atomic_save_keeps_existing_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("routes.json");
        fs_err::write(&path, "[]").unwrap();
        fs_err::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        sample_store().save(&path, &StoreConfig::default()).unwrap();

        let mode = fs_err::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("routes.json");
        for atomic_save in [true, false] {
            let config = StoreConfig { atomic_save, indent: 4 };
            assert!(matches!(
                sample_store().save(&path, &config),
                Err(StoreError::FileNotWritable { .. })
            ));
        }
    }

    #[test]
    fn append_adds_one_route_at_the_end() {
        let store = sample_store();
        let before = store.routes().len();
        let store = store.append("Depot".to_string(), None, time("23:59"));
        assert_eq!(store.routes().len(), before + 1);
        let last = store.routes().last().unwrap();
        assert_eq!(last.destination, "Depot");
        assert_eq!(last.time, json!("23:59"));
    }

    #[test]
    fn select_keeps_later_routes_in_order() {
        let selected = sample_store().select(time("10:00")).unwrap();
        let destinations: Vec<_> = selected
            .routes()
            .iter()
            .map(|r| r.destination.as_str())
            .collect();
        assert_eq!(destinations, ["Airport", "Вокзал"]);
    }

    #[test]
    fn select_is_strictly_after_cutoff() {
        let selected = sample_store().select(time("14:00")).unwrap();
        assert!(selected.routes().is_empty());
    }

    #[test]
    fn select_fails_on_bad_stored_time() {
        let store = RouteStore {
            routes: vec![
                Route {
                    destination: "A".to_string(),
                    number: None,
                    time: json!("12:00"),
                },
                Route {
                    destination: "B".to_string(),
                    number: None,
                    time: json!(""),
                },
            ],
        };
        assert!(matches!(
            store.select(time("09:00")),
            Err(StoreError::InvalidTimeFormat { .. })
        ));
    }

    fn arb_store() -> impl Strategy<Value = RouteStore> {
        prop::collection::vec((0u32..24, 0u32..60, "[a-z]{1,8}"), 0..20).prop_map(|entries| {
            entries
                .into_iter()
                .fold(RouteStore::default(), |store, (h, m, name)| {
                    store.append(name, None, time(&format!("{h:02}:{m:02}")))
                })
        })
    }

    proptest! {
        #[test]
        fn select_is_an_ordered_filter(
            store in arb_store(),
            h in 0u32..24,
            m in 0u32..60,
        ) {
            let cutoff = time(&format!("{h:02}:{m:02}"));
            let selected = store.select(cutoff).unwrap();

            let expected: Vec<Route> = store
                .routes()
                .iter()
                .filter(|r| r.departure().unwrap() > cutoff)
                .cloned()
                .collect();
            prop_assert_eq!(selected.routes(), expected.as_slice());
            prop_assert_eq!(selected.select(cutoff).unwrap(), selected);
        }
    }
}
