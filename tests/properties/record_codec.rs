//! Property tests for the deploy record file codec.

use proptest::prelude::*;
use tempfile::tempdir;

use baton::domain::ports::RecordStore;
use baton::infrastructure::PropFileStore;
use baton::{keys, DeployRecord};

fn field_key() -> impl Strategy<Value = String> {
    // Uppercase keys in the style of the real record. The X_ prefix keeps
    // generated keys clear of LOCK_DIR, which the loader checks against
    // the directory it read from.
    proptest::string::string_regex("X_[A-Z_]{0,12}").unwrap()
}

fn field_value() -> impl Strategy<Value = String> {
    // Printable ASCII plus the characters the codec escapes. The printable
    // range already includes '\\' and '=', so both get exercised.
    proptest::string::string_regex("(\\n|\\r|[ -~]){0,32}").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: any field values survive a save/load cycle unchanged, and
    /// the file on disk stays one line per field.
    #[test]
    fn property_record_round_trips_any_values(
        fields in proptest::collection::btree_map(field_key(), field_value(), 0..8),
        last_error in field_value()
    ) {
        let dir = tempdir().unwrap();
        let store = PropFileStore::new();

        let mut record = DeployRecord::new();
        record.set_lock_dir(dir.path());
        record.set(keys::LAST_ERROR, last_error);
        for (key, value) in &fields {
            record.set(key.clone(), value.clone());
        }

        store.save(&record).unwrap();

        let content = std::fs::read_to_string(dir.path().join("deploy.props")).unwrap();
        prop_assert_eq!(content.lines().count(), record.fields().len());

        let loaded = store.load(dir.path()).unwrap();
        prop_assert_eq!(loaded.fields(), record.fields());
    }

    /// PROPERTY: saving twice is idempotent on the bytes written.
    #[test]
    fn property_save_is_deterministic(
        fields in proptest::collection::btree_map(field_key(), field_value(), 0..8)
    ) {
        let dir = tempdir().unwrap();
        let store = PropFileStore::new();

        let mut record = DeployRecord::new();
        record.set_lock_dir(dir.path());
        for (key, value) in &fields {
            record.set(key.clone(), value.clone());
        }

        store.save(&record).unwrap();
        let first = std::fs::read_to_string(dir.path().join("deploy.props")).unwrap();
        store.save(&record).unwrap();
        let second = std::fs::read_to_string(dir.path().join("deploy.props")).unwrap();
        prop_assert_eq!(first, second);
    }

    /// PROPERTY: loading arbitrary bytes never panics; it either yields a
    /// record or a clean error.
    #[test]
    fn property_load_never_panics_on_garbage(
        bytes in proptest::collection::vec(any::<u8>(), 0..256)
    ) {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("deploy.props"), &bytes).unwrap();
        let _ = PropFileStore::new().load(dir.path());
    }
}
