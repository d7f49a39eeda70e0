use chorepoints_server::storage::Store;
use chorepoints_shared::domain::Child;

pub const CHILD: &str = "mia";
pub const PARENT: &str = "dad";

/// Fresh store on a temp SQLite file, with one child seeded. The TempDir
/// must stay alive for the duration of the test.
pub async fn test_store() -> (Store, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let store = Store::connect_sqlite(db_path.to_str().unwrap())
        .await
        .unwrap();
    store
        .seed_children(&[
            Child {
                id: CHILD.to_string(),
                display_name: "Mia".to_string(),
            },
            Child {
                id: "leo".to_string(),
                display_name: "Leo".to_string(),
            },
        ])
        .await
        .unwrap();
    (store, dir)
}
