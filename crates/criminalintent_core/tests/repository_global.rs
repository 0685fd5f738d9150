use criminalintent_core::repo::global;
use criminalintent_core::{Crime, RepositoryConfig};
use std::time::Duration;

#[test]
fn initialize_once_then_second_call_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let other = tempfile::tempdir().unwrap();

    global::initialize(RepositoryConfig::from_files_dir(dir.path())).unwrap();
    global::initialize(RepositoryConfig::from_files_dir(other.path())).unwrap();

    let repo = global::get().unwrap();
    assert_eq!(repo.photo_dir(), dir.path().join("photos"));

    let crime = Crime::new();
    repo.save(&crime).unwrap();
    repo.flush().unwrap();

    let loaded = repo
        .crime(crime.id())
        .recv_timeout(Duration::from_secs(5))
        .unwrap()
        .unwrap();
    assert_eq!(loaded, Some(crime));
}
