//! SettingsStore interface tests.

use codici::storage::SettingsStore;

pub async fn test_get_missing<S: SettingsStore>(store: &S) {
    let value = store.get("missing").await.expect("get should succeed");
    assert!(value.is_none());
}

pub async fn test_put_and_overwrite<S: SettingsStore>(store: &S) {
    store.put("email_template", "first").await.unwrap();
    store.put("email_template", "second").await.unwrap();

    assert_eq!(
        store.get("email_template").await.unwrap().as_deref(),
        Some("second")
    );
}

pub async fn test_put_if_absent<S: SettingsStore>(store: &S) {
    assert!(store.put_if_absent("notification_threshold", "2").await.unwrap());
    assert!(!store.put_if_absent("notification_threshold", "9").await.unwrap());

    assert_eq!(
        store.get("notification_threshold").await.unwrap().as_deref(),
        Some("2")
    );
}

pub async fn test_empty_value_is_stored<S: SettingsStore>(store: &S) {
    store.put("notification_email", "").await.unwrap();
    assert_eq!(
        store.get("notification_email").await.unwrap().as_deref(),
        Some("")
    );
}

/// Run all SettingsStore tests, building a fresh store for each.
#[macro_export]
macro_rules! run_settings_store_tests {
    ($make:expr) => {
        use $crate::storage::settings_store_tests::*;

        test_get_missing(&$make).await;
        println!("  test_get_missing: PASSED");

        test_put_and_overwrite(&$make).await;
        println!("  test_put_and_overwrite: PASSED");

        test_put_if_absent(&$make).await;
        println!("  test_put_if_absent: PASSED");

        test_empty_value_is_stored(&$make).await;
        println!("  test_empty_value_is_stored: PASSED");
    };
}
